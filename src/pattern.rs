//! The `pattern` element.

use crate::aspect_ratio::AspectRatio;
use crate::coord_units;
use crate::coord_units::CoordUnits;
use crate::document::AcquiredNodes;
use crate::drawing_ctx::DrawingCtx;
use crate::error::*;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::paint_server::lenient_attr;
use crate::rect::Rect;
use crate::session::Session;
use crate::surface::Source;
use crate::svg_log;
use crate::transform::Transform;
use crate::viewbox::ViewBox;

coord_units!(PatternUnits, CoordUnits::ObjectBoundingBox);
coord_units!(PatternContentUnits, CoordUnits::UserSpaceOnUse);

/// Main structure used during pattern resolution.
///
/// For unresolved patterns, we store all fields as `Option<T>`: if `None`, the field is
/// not specified by any node seen so far.
#[derive(Default)]
struct UnresolvedPattern {
    units: Option<PatternUnits>,
    content_units: Option<PatternContentUnits>,
    vbox: Option<ViewBox>,
    preserve_aspect_ratio: Option<AspectRatio>,
    transform: Option<Transform>,
    x: Option<Length<Horizontal>>,
    y: Option<Length<Vertical>>,
    width: Option<ULength<Horizontal>>,
    height: Option<ULength<Vertical>>,

    // The first pattern in the chain that has element children.
    children: Option<Node>,
}

/// A pattern with all of its `href` fallbacks applied.
pub struct ResolvedPattern {
    units: PatternUnits,
    content_units: PatternContentUnits,
    vbox: Option<ViewBox>,
    preserve_aspect_ratio: AspectRatio,
    transform: Transform,
    x: Length<Horizontal>,
    y: Length<Vertical>,
    width: ULength<Horizontal>,
    height: ULength<Vertical>,

    // Node whose children are the pattern's contents; `None` if no pattern in the
    // chain has any, so there is nothing to render.
    children: Option<Node>,
}

impl UnresolvedPattern {
    fn from_node(node: &Node, session: &Session) -> UnresolvedPattern {
        UnresolvedPattern {
            units: lenient_attr(node, "patternUnits", session),
            content_units: lenient_attr(node, "patternContentUnits", session),
            vbox: lenient_attr(node, "viewBox", session),
            preserve_aspect_ratio: lenient_attr(node, "preserveAspectRatio", session),
            transform: lenient_attr(node, "patternTransform", session),
            x: lenient_attr(node, "x", session),
            y: lenient_attr(node, "y", session),
            width: lenient_attr(node, "width", session),
            height: lenient_attr(node, "height", session),
            children: if node.has_children() {
                Some(node.clone())
            } else {
                None
            },
        }
    }

    fn is_resolved(&self) -> bool {
        self.units.is_some()
            && self.content_units.is_some()
            && self.vbox.is_some()
            && self.preserve_aspect_ratio.is_some()
            && self.transform.is_some()
            && self.x.is_some()
            && self.y.is_some()
            && self.width.is_some()
            && self.height.is_some()
            && self.children.is_some()
    }

    fn resolve_from_fallback(self, fallback: UnresolvedPattern) -> UnresolvedPattern {
        UnresolvedPattern {
            units: self.units.or(fallback.units),
            content_units: self.content_units.or(fallback.content_units),
            vbox: self.vbox.or(fallback.vbox),
            preserve_aspect_ratio: self.preserve_aspect_ratio.or(fallback.preserve_aspect_ratio),
            transform: self.transform.or(fallback.transform),
            x: self.x.or(fallback.x),
            y: self.y.or(fallback.y),
            width: self.width.or(fallback.width),
            height: self.height.or(fallback.height),
            children: self.children.or(fallback.children),
        }
    }

    fn into_resolved(self) -> ResolvedPattern {
        ResolvedPattern {
            units: self.units.unwrap_or_default(),
            content_units: self.content_units.unwrap_or_default(),
            vbox: self.vbox,
            preserve_aspect_ratio: self.preserve_aspect_ratio.unwrap_or_default(),
            transform: self.transform.unwrap_or_default(),
            x: self.x.unwrap_or_default(),
            y: self.y.unwrap_or_default(),
            width: self.width.unwrap_or_default(),
            height: self.height.unwrap_or_default(),
            children: self.children,
        }
    }
}

/// Resolves a pattern node by following its `href` chain.
pub fn resolve(
    node: &Node,
    acquired_nodes: &mut AcquiredNodes<'_>,
) -> Result<ResolvedPattern, AcquireError> {
    let session = acquired_nodes.document().session().clone();

    let mut pattern = UnresolvedPattern::from_node(node, &session);
    let mut current = node.clone();
    let mut chain = Vec::new();

    while !pattern.is_resolved() {
        let href = match current.attr("xlink:href").or_else(|| current.attr("href")) {
            Some(href) => href,
            None => break,
        };

        match acquired_nodes.acquire_href(&href, &current) {
            Ok(acquired) => {
                let fallback = acquired.get().clone();

                if !fallback.has_tag("pattern") {
                    return Err(AcquireError::InvalidLinkType(href));
                }

                pattern = pattern.resolve_from_fallback(UnresolvedPattern::from_node(&fallback, &session));

                chain.push(acquired);
                current = fallback;
            }

            Err(AcquireError::MaxReferencesExceeded) => {
                return Err(AcquireError::MaxReferencesExceeded)
            }

            Err(e) => {
                svg_log!(session, "Stopping pattern resolution: {}", e);
                break;
            }
        }
    }

    Ok(pattern.into_resolved())
}

impl ResolvedPattern {
    /// Renders one tile of the pattern and returns it as a paint source.
    ///
    /// Returns `None` when there is nothing to paint: no contents, an empty tile, or
    /// `objectBoundingBox` units with no bounding box.
    pub fn to_source(
        &self,
        draw_ctx: &mut DrawingCtx<'_>,
        acquired_nodes: &mut AcquiredNodes<'_>,
        bbox: Option<Rect>,
    ) -> Result<Option<Source>, InternalRenderingError> {
        let node_with_children = match self.children {
            Some(ref node) => node.clone(),
            None => return Ok(None),
        };

        let units: CoordUnits = self.units.into();
        let content_units: CoordUnits = self.content_units.into();

        let needs_bbox = units == CoordUnits::ObjectBoundingBox
            || (content_units == CoordUnits::ObjectBoundingBox && self.vbox.is_none());

        let bbox = match (needs_bbox, bbox) {
            (false, _) => Rect::default(),
            (true, Some(r)) => r,
            (true, None) => return Ok(None),
        };

        let params = draw_ctx.view_params();

        let unit_params = match units {
            CoordUnits::UserSpaceOnUse => params,
            CoordUnits::ObjectBoundingBox => params.for_unit_square(),
        };

        let rect = units.to_user_space(Some(bbox)).unwrap_or_default().transform_rect(&Rect::from_xywh(
            self.x.to_user(&unit_params),
            self.y.to_user(&unit_params),
            self.width.to_user(&unit_params),
            self.height.to_user(&unit_params),
        ));

        if rect.is_empty() {
            return Ok(None);
        }

        // Transform from the pattern's contents to the tile, and the viewport for
        // percentages in the contents.
        let (content_transform, viewport) = match self.vbox {
            Some(vbox) => {
                let r = self
                    .preserve_aspect_ratio
                    .compute(&vbox, &Rect::from_size(rect.width(), rect.height()));

                match vbox.map_onto(&r) {
                    Some(t) => (t, Some(vbox.size())),
                    None => return Ok(None),
                }
            }

            None if content_units == CoordUnits::ObjectBoundingBox => (
                Transform::new_scale(bbox.width(), bbox.height()),
                Some((1.0, 1.0)),
            ),

            None => (Transform::identity(), None),
        };

        // The tile is rendered at the resolution it will be painted with.
        let pattern_to_device = draw_ctx
            .surface()
            .current_transform()
            .pre_transform(&self.transform);

        let sx = pattern_to_device.xx.hypot(pattern_to_device.yx);
        let sy = pattern_to_device.xy.hypot(pattern_to_device.yy);

        if sx == 0.0 || sy == 0.0 {
            return Ok(None);
        }

        let pattern_space = self.transform.pre_translate(rect.x0, rect.y0);

        let matrix = match pattern_space.invert() {
            Some(inverse) => Transform::new_scale(sx, sy).pre_transform(&inverse),
            None => return Ok(None),
        };

        draw_ctx
            .surface()
            .begin_tile(rect.width() * sx, rect.height() * sy)?;

        let res = draw_ctx.with_saved_state(|dc| {
            dc.surface()
                .transform(&Transform::new_scale(sx, sy).pre_transform(&content_transform));

            match viewport {
                Some((w, h)) => {
                    dc.with_view_box(w, h, |dc| dc.draw_children(acquired_nodes, &node_with_children))?
                }
                None => dc.draw_children(acquired_nodes, &node_with_children)?,
            }

            Ok(())
        });

        // The tile has to be finished even if its contents failed.
        let tile = draw_ctx.surface().end_tile(matrix)?;
        res?;

        Ok(Some(Source::Tile(tile)))
    }
}
