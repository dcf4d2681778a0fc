//! Gradient paint servers; the `linearGradient` and `radialGradient` elements.

use crate::color::Rgba;
use crate::coord_units;
use crate::coord_units::CoordUnits;
use crate::document::AcquiredNodes;
use crate::drawing_ctx::RenderConfig;
use crate::element::ElementKind;
use crate::error::*;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::paint_server::lenient_attr;
use crate::parsers::UnitInterval;
use crate::rect::Rect;
use crate::session::Session;
use crate::surface::{self, ColorStop, Source, SpreadMethod};
use crate::svg_log;
use crate::transform::Transform;

// gradientUnits attribute; its default is objectBoundingBox
coord_units!(GradientUnits, CoordUnits::ObjectBoundingBox);

/// Parameters specific to each gradient type, before being resolved.
///
/// These will be composed together with the `UnresolvedVariant` from fallback nodes
/// (referenced with e.g. `<linearGradient href="#fallback">`) to form a final, resolved
/// variant.
#[derive(Debug, Copy, Clone, PartialEq)]
enum UnresolvedVariant {
    Linear {
        x1: Option<Length<Horizontal>>,
        y1: Option<Length<Vertical>>,
        x2: Option<Length<Horizontal>>,
        y2: Option<Length<Vertical>>,
    },

    Radial {
        cx: Option<Length<Horizontal>>,
        cy: Option<Length<Vertical>>,
        r: Option<Length<Both>>,
        fx: Option<Length<Horizontal>>,
        fy: Option<Length<Vertical>>,
    },
}

/// Parameters specific to each gradient type, after resolving.
#[derive(Debug, Copy, Clone, PartialEq)]
enum ResolvedVariant {
    Linear {
        x1: Length<Horizontal>,
        y1: Length<Vertical>,
        x2: Length<Horizontal>,
        y2: Length<Vertical>,
    },

    Radial {
        cx: Length<Horizontal>,
        cy: Length<Vertical>,
        r: Length<Both>,
        fx: Length<Horizontal>,
        fy: Length<Vertical>,
    },
}

fn percent<N: Normalize>(v: f64) -> Length<N> {
    Length::new(v, LengthUnit::Percent)
}

impl UnresolvedVariant {
    fn from_node(node: &Node, kind: ElementKind, session: &Session) -> UnresolvedVariant {
        match kind {
            ElementKind::RadialGradient => UnresolvedVariant::Radial {
                cx: lenient_attr(node, "cx", session),
                cy: lenient_attr(node, "cy", session),
                r: lenient_attr(node, "r", session),
                fx: lenient_attr(node, "fx", session),
                fy: lenient_attr(node, "fy", session),
            },

            _ => UnresolvedVariant::Linear {
                x1: lenient_attr(node, "x1", session),
                y1: lenient_attr(node, "y1", session),
                x2: lenient_attr(node, "x2", session),
                y2: lenient_attr(node, "y2", session),
            },
        }
    }

    fn is_resolved(&self) -> bool {
        match *self {
            UnresolvedVariant::Linear { x1, y1, x2, y2 } => {
                x1.is_some() && y1.is_some() && x2.is_some() && y2.is_some()
            }

            UnresolvedVariant::Radial { cx, cy, r, fx, fy } => {
                cx.is_some() && cy.is_some() && r.is_some() && fx.is_some() && fy.is_some()
            }
        }
    }

    fn resolve_from_fallback(&self, fallback: &UnresolvedVariant) -> UnresolvedVariant {
        match (*self, *fallback) {
            (
                UnresolvedVariant::Linear { x1, y1, x2, y2 },
                UnresolvedVariant::Linear {
                    x1: fx1,
                    y1: fy1,
                    x2: fx2,
                    y2: fy2,
                },
            ) => UnresolvedVariant::Linear {
                x1: x1.or(fx1),
                y1: y1.or(fy1),
                x2: x2.or(fx2),
                y2: y2.or(fy2),
            },

            (
                UnresolvedVariant::Radial { cx, cy, r, fx, fy },
                UnresolvedVariant::Radial {
                    cx: f_cx,
                    cy: f_cy,
                    r: f_r,
                    fx: f_fx,
                    fy: f_fy,
                },
            ) => UnresolvedVariant::Radial {
                cx: cx.or(f_cx),
                cy: cy.or(f_cy),
                r: r.or(f_r),
                fx: fx.or(f_fx),
                fy: fy.or(f_fy),
            },

            _ => *self, // If variants are of different types, then nothing to resolve
        }
    }

    // https://www.w3.org/TR/SVG/pservers.html#LinearGradients
    // https://www.w3.org/TR/SVG/pservers.html#RadialGradients
    fn into_resolved(self) -> ResolvedVariant {
        match self {
            UnresolvedVariant::Linear { x1, y1, x2, y2 } => ResolvedVariant::Linear {
                x1: x1.unwrap_or_else(|| percent(0.0)),
                y1: y1.unwrap_or_else(|| percent(0.0)),
                x2: x2.unwrap_or_else(|| percent(1.0)),
                y2: y2.unwrap_or_else(|| percent(0.0)),
            },

            UnresolvedVariant::Radial { cx, cy, r, fx, fy } => {
                let cx = cx.unwrap_or_else(|| percent(0.5));
                let cy = cy.unwrap_or_else(|| percent(0.5));

                ResolvedVariant::Radial {
                    cx,
                    cy,
                    r: r.unwrap_or_else(|| percent(0.5)),

                    // fx and fy fall back to the value of cx and cy
                    fx: fx.unwrap_or(cx),
                    fy: fy.unwrap_or(cy),
                }
            }
        }
    }
}

/// Main structure used during gradient resolution.
///
/// For unresolved gradients, all fields are `Option<T>`: `None` means that the field
/// is not specified in any of the nodes seen so far.
struct UnresolvedGradient {
    units: Option<GradientUnits>,
    transform: Option<Transform>,
    spread: Option<SpreadMethod>,
    stops: Option<Vec<ColorStop>>,

    variant: UnresolvedVariant,
}

/// A gradient with all of its `href` fallbacks applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGradient {
    units: GradientUnits,
    transform: Transform,
    spread: SpreadMethod,
    stops: Vec<ColorStop>,

    variant: ResolvedVariant,
}

impl UnresolvedGradient {
    fn from_node(node: &Node, session: &Session) -> UnresolvedGradient {
        let kind = ElementKind::from_tag(&node.tag());

        UnresolvedGradient {
            units: lenient_attr(node, "gradientUnits", session),
            transform: lenient_attr(node, "gradientTransform", session),
            spread: lenient_attr(node, "spreadMethod", session),
            stops: color_stops(node, session),
            variant: UnresolvedVariant::from_node(node, kind, session),
        }
    }

    fn is_resolved(&self) -> bool {
        self.units.is_some()
            && self.transform.is_some()
            && self.spread.is_some()
            && self.stops.is_some()
            && self.variant.is_resolved()
    }

    fn resolve_from_fallback(self, fallback: UnresolvedGradient) -> UnresolvedGradient {
        UnresolvedGradient {
            units: self.units.or(fallback.units),
            transform: self.transform.or(fallback.transform),
            spread: self.spread.or(fallback.spread),
            stops: self.stops.or(fallback.stops),
            variant: self.variant.resolve_from_fallback(&fallback.variant),
        }
    }

    fn into_resolved(self) -> ResolvedGradient {
        ResolvedGradient {
            units: self.units.unwrap_or_default(),
            transform: self.transform.unwrap_or_default(),
            spread: self.spread.unwrap_or_default(),
            stops: self.stops.unwrap_or_default(),
            variant: self.variant.into_resolved(),
        }
    }
}

/// Collects the `stop` children of a gradient node, or `None` if it has none.
///
/// Offsets are clamped to `[0, 1]` and forward to the offset of the previous stop, so
/// that they never decrease.
fn color_stops(node: &Node, session: &Session) -> Option<Vec<ColorStop>> {
    let mut stops: Vec<ColorStop> = Vec::new();

    for child in node.children().filter(|c| c.has_tag("stop")) {
        let offset = match child.parse_attr_or("offset", UnitInterval(0.0)) {
            Ok(UnitInterval(o)) => o,
            Err(e) => {
                svg_log!(session, "(not using gradient stop {} because of {})", child.data(), e);
                continue;
            }
        };

        let color = lenient_attr(&child, "stop-color", session).unwrap_or(Rgba::BLACK);
        let opacity = lenient_attr::<UnitInterval>(&child, "stop-opacity", session).map_or(1.0, |o| o.0);

        let last_offset = stops.last().map_or(0.0, |s| s.offset);

        stops.push(ColorStop {
            offset: offset.max(last_offset),
            color: color.with_opacity(opacity),
        });
    }

    if stops.is_empty() {
        None
    } else {
        Some(stops)
    }
}

/// Resolves a gradient node by following its `href` chain.
///
/// Each field takes the value from the first node in the chain that specifies it; the
/// stops come from the first node that has any.  Gradients of either kind may be
/// referenced.
pub fn resolve(
    node: &Node,
    acquired_nodes: &mut AcquiredNodes<'_>,
) -> Result<ResolvedGradient, AcquireError> {
    let session = acquired_nodes.document().session().clone();

    let mut gradient = UnresolvedGradient::from_node(node, &session);
    let mut current = node.clone();

    // Keeps the chain acquired, so that a cycle shows up as a circular reference.
    let mut chain = Vec::new();

    while !gradient.is_resolved() {
        let href = match current.attr("xlink:href").or_else(|| current.attr("href")) {
            Some(href) => href,
            None => break,
        };

        let acquired = acquired_nodes.acquire_href(&href, &current)?;
        let fallback = acquired.get().clone();

        if !ElementKind::from_tag(&fallback.tag()).is_gradient() {
            return Err(AcquireError::InvalidLinkType(href));
        }

        gradient = gradient.resolve_from_fallback(UnresolvedGradient::from_node(&fallback, &session));

        chain.push(acquired);
        current = fallback;
    }

    Ok(gradient.into_resolved())
}

impl ResolvedGradient {
    /// Turns the gradient into a paint source for an element.
    ///
    /// `bbox` is the element's bounding box, needed for `objectBoundingBox` units; the
    /// gradient paints nothing if that is not available.  `opacity` multiplies the alpha
    /// of every stop.
    pub fn to_source(
        &self,
        params: &NormalizeParams,
        bbox: Option<Rect>,
        opacity: f64,
        config: &RenderConfig,
    ) -> Option<Source> {
        let color = |c: Rgba| config.adjust_color(c).with_opacity(opacity);

        match self.stops.as_slice() {
            [] => return None,
            [stop] => return Some(Source::Solid(color(stop.color))),
            _ => (),
        }

        let units = CoordUnits::from(self.units);
        let bbox_transform = units.to_user_space(bbox)?;
        let params = match units {
            CoordUnits::UserSpaceOnUse => *params,
            CoordUnits::ObjectBoundingBox => params.for_unit_square(),
        };

        let matrix = bbox_transform.pre_transform(&self.transform).invert()?;

        let stops = self
            .stops
            .iter()
            .map(|s| ColorStop {
                offset: s.offset,
                color: color(s.color),
            })
            .collect();

        let source = match self.variant {
            ResolvedVariant::Linear { x1, y1, x2, y2 } => Source::Linear(surface::LinearGradient {
                x1: x1.to_user(&params),
                y1: y1.to_user(&params),
                x2: x2.to_user(&params),
                y2: y2.to_user(&params),
                matrix,
                spread: self.spread,
                stops,
            }),

            ResolvedVariant::Radial { cx, cy, r, fx, fy } => Source::Radial(surface::RadialGradient {
                cx: cx.to_user(&params),
                cy: cy.to_user(&params),
                r: r.to_user(&params),
                fx: fx.to_user(&params),
                fy: fy.to_user(&params),
                matrix,
                spread: self.spread,
                stops,
            }),
        };

        Some(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cond::UserLanguage;
    use crate::document::{Document, LoadOptions};

    fn load(s: &str) -> Document {
        Document::load_from_bytes(
            s.as_bytes().to_vec(),
            None,
            LoadOptions::new(false).with_user_language(UserLanguage::from_locale_str("en")),
            Session::new_for_test_suite(),
        )
        .unwrap()
    }

    fn resolve_id(doc: &Document, id: &str) -> Result<ResolvedGradient, AcquireError> {
        let mut acquired_nodes = AcquiredNodes::new(doc);
        let node = doc.lookup(id).unwrap();
        resolve(&node, &mut acquired_nodes)
    }

    fn params() -> NormalizeParams {
        NormalizeParams::new((100.0, 100.0), 12.0, 96.0)
    }

    #[test]
    fn gradient_resolved_from_defaults() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="l"/>
                 <radialGradient id="r" cx="20%"/>
               </svg>"#,
        );

        let l = resolve_id(&doc, "l").unwrap();
        assert_eq!(l.units, GradientUnits(CoordUnits::ObjectBoundingBox));
        assert_eq!(l.spread, SpreadMethod::Pad);
        assert!(l.stops.is_empty());
        assert_eq!(
            l.variant,
            ResolvedVariant::Linear {
                x1: percent(0.0),
                y1: percent(0.0),
                x2: percent(1.0),
                y2: percent(0.0),
            }
        );

        let r = resolve_id(&doc, "r").unwrap();
        assert_eq!(
            r.variant,
            ResolvedVariant::Radial {
                cx: percent(0.2),
                cy: percent(0.5),
                r: percent(0.5),
                fx: percent(0.2),
                fy: percent(0.5),
            }
        );
    }

    #[test]
    fn href_chain_supplies_missing_fields_and_stops() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
                 <linearGradient id="base" x1="10%" spreadMethod="reflect">
                   <stop offset="0" stop-color="red"/>
                   <stop offset="1" stop-color="blue"/>
                 </linearGradient>
                 <linearGradient id="mid" xlink:href="#base" x1="30%" gradientUnits="userSpaceOnUse"/>
                 <linearGradient id="top" xlink:href="#mid" y2="40%"/>
               </svg>"##,
        );

        let g = resolve_id(&doc, "top").unwrap();
        assert_eq!(g.units, GradientUnits(CoordUnits::UserSpaceOnUse));
        assert_eq!(g.spread, SpreadMethod::Reflect);
        assert_eq!(g.stops.len(), 2);
        assert_eq!(
            g.variant,
            ResolvedVariant::Linear {
                x1: percent(0.3),
                y1: percent(0.0),
                x2: percent(1.0),
                y2: percent(0.4),
            }
        );
    }

    #[test]
    fn own_stops_take_precedence() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="base">
                   <stop offset="0"/><stop offset="0.5"/><stop offset="1"/>
                 </linearGradient>
                 <linearGradient id="g" href="#base">
                   <stop offset="0" stop-color="lime"/>
                 </linearGradient>
               </svg>"##,
        );

        let g = resolve_id(&doc, "g").unwrap();
        assert_eq!(g.stops.len(), 1);
        assert_eq!(g.stops[0].color, Rgba::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn stop_offsets_are_clamped_forward() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="g">
                   <stop offset="0.5"/>
                   <stop offset="20%"/>
                   <stop offset="3"/>
                   <stop offset="-1"/>
                 </linearGradient>
               </svg>"##,
        );

        let g = resolve_id(&doc, "g").unwrap();
        let offsets: Vec<f64> = g.stops.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn stop_opacity_multiplies_color() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="g">
                   <stop offset="0" stop-color="rgba(255, 0, 0, 0.5)" stop-opacity="0.5"/>
                 </linearGradient>
               </svg>"##,
        );

        let g = resolve_id(&doc, "g").unwrap();
        assert_eq!(g.stops[0].color, Rgba::new(1.0, 0.0, 0.0, 0.25));
    }

    #[test]
    fn circular_href_is_an_error() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="a" href="#b"/>
                 <linearGradient id="b" href="#a"/>
               </svg>"##,
        );

        let mut acquired_nodes = AcquiredNodes::new(&doc);
        let acquired = acquired_nodes.acquire_id("a").unwrap();
        let node = acquired.get().clone();

        assert!(matches!(
            resolve(&node, &mut acquired_nodes),
            Err(AcquireError::CircularReference(_))
        ));
    }

    #[test]
    fn href_to_non_gradient_is_invalid() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="g" href="#r"/>
                 <rect id="r"/>
               </svg>"##,
        );

        assert!(matches!(
            resolve_id(&doc, "g"),
            Err(AcquireError::InvalidLinkType(_))
        ));
    }

    #[test]
    fn stop_count_decides_the_source() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <linearGradient id="none"/>
                 <linearGradient id="one"><stop stop-color="blue"/></linearGradient>
                 <linearGradient id="two" gradientUnits="userSpaceOnUse" x2="50">
                   <stop offset="0"/><stop offset="1" stop-color="white"/>
                 </linearGradient>
               </svg>"##,
        );

        let config = RenderConfig::default();
        let bbox = Some(Rect::from_size(10.0, 10.0));

        let none = resolve_id(&doc, "none").unwrap();
        assert_eq!(none.to_source(&params(), bbox, 1.0, &config), None);

        let one = resolve_id(&doc, "one").unwrap();
        assert_eq!(
            one.to_source(&params(), bbox, 0.5, &config),
            Some(Source::Solid(Rgba::new(0.0, 0.0, 1.0, 0.5)))
        );

        let two = resolve_id(&doc, "two").unwrap();
        match two.to_source(&params(), None, 1.0, &config) {
            Some(Source::Linear(l)) => {
                assert_eq!((l.x1, l.y1, l.x2, l.y2), (0.0, 0.0, 50.0, 0.0));
                assert_eq!(l.matrix, Transform::identity());
                assert_eq!(l.stops.len(), 2);
            }
            s => panic!("unexpected source {:?}", s),
        }
    }

    #[test]
    fn bounding_box_units_map_unit_square() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <radialGradient id="g">
                   <stop offset="0"/><stop offset="1"/>
                 </radialGradient>
               </svg>"##,
        );

        let config = RenderConfig::default();
        let g = resolve_id(&doc, "g").unwrap();

        assert_eq!(g.to_source(&params(), None, 1.0, &config), None);

        match g.to_source(&params(), Some(Rect::from_xywh(10.0, 20.0, 100.0, 50.0)), 1.0, &config) {
            Some(Source::Radial(r)) => {
                assert_eq!((r.cx, r.cy, r.r), (0.5, 0.5, 0.5));

                // user space point at the bbox center maps to the gradient center
                let (x, y) = r.matrix.transform_point(60.0, 45.0);
                assert!((x - 0.5).abs() < 1e-9 && (y - 0.5).abs() < 1e-9);
            }
            s => panic!("unexpected source {:?}", s),
        }
    }
}
