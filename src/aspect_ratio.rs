//! Handling of `preserveAspectRatio` values.
//!
//! ```text
//! preserveAspectRatio ::= "defer"? <align> <meetOrSlice>?
//! align               ::= "none" | "xMinYMin" | ... | "xMaxYMax"
//! meetOrSlice         ::= "meet" | "slice"
//! ```
//!
//! `none` stretches the viewBox to fill the viewport exactly.  Otherwise the viewBox is
//! scaled uniformly, by the smaller of the two axis ratios for `meet` or the larger one
//! for `slice`, and the result is aligned inside the viewport.

use cssparser::{Parser, Token};

use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::Parse;
use crate::rect::Rect;
use crate::transform::Transform;
use crate::viewbox::ViewBox;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum FitMode {
    #[default]
    Meet,
    Slice,
}

/// Where the scaled viewBox goes along one axis of the viewport.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum Align1D {
    Min,
    #[default]
    Mid,
    Max,
}

impl Align1D {
    fn from_name(name: &str) -> Option<Align1D> {
        match name {
            "Min" => Some(Align1D::Min),
            "Mid" => Some(Align1D::Mid),
            "Max" => Some(Align1D::Max),
            _ => None,
        }
    }

    /// Offset of an object of `inner` size placed inside `outer`.
    fn offset(self, outer: f64, inner: f64) -> f64 {
        let slack = outer - inner;

        match self {
            Align1D::Min => 0.0,
            Align1D::Mid => slack / 2.0,
            Align1D::Max => slack,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct Align {
    x: Align1D,
    y: Align1D,
    fit: FitMode,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("viewBox maps to a non-invertible transform")]
pub struct NonInvertibleTransform;

/// A parsed `preserveAspectRatio`; `align` is `None` for `none`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AspectRatio {
    align: Option<Align>,
}

impl Default for AspectRatio {
    fn default() -> AspectRatio {
        AspectRatio {
            align: Some(Align::default()),
        }
    }
}

impl AspectRatio {
    /// `preserveAspectRatio="none"`
    pub fn none() -> AspectRatio {
        AspectRatio { align: None }
    }

    pub fn is_slice(&self) -> bool {
        self.align.map_or(false, |a| a.fit == FitMode::Slice)
    }

    /// The rectangle inside `viewport` where the `vbox` ends up.
    pub fn compute(&self, vbox: &ViewBox, viewport: &Rect) -> Rect {
        let Some(Align { x, y, fit }) = self.align else {
            return *viewport;
        };

        let (vb_width, vb_height) = vbox.size();
        let (vp_width, vp_height) = viewport.size();

        let (sx, sy) = (vp_width / vb_width, vp_height / vb_height);
        let scale = if fit == FitMode::Slice { sx.max(sy) } else { sx.min(sy) };

        let (w, h) = (vb_width * scale, vb_height * scale);

        Rect::from_xywh(
            viewport.x0 + x.offset(vp_width, w),
            viewport.y0 + y.offset(vp_height, h),
            w,
            h,
        )
    }

    /// Computes the viewport to viewbox transformation.
    ///
    /// The `(vbox.x0, vbox.y0)` corner is mapped to the viewport's upper-left corner,
    /// and `(vbox.x1, vbox.y1)` to its lower-right corner, modulo alignment.
    ///
    /// Returns `Ok(None)` if the vbox or viewport are empty; the element should not be
    /// rendered then.  Returns an error if the vbox would create a non-invertible
    /// transform.
    pub fn viewport_to_viewbox_transform(
        &self,
        vbox: Option<ViewBox>,
        viewport: &Rect,
    ) -> Result<Option<Transform>, NonInvertibleTransform> {
        if viewport.is_empty() {
            return Ok(None);
        }

        let transform = match vbox {
            Some(vbox) => match vbox.map_onto(&self.compute(&vbox, viewport)) {
                Some(t) => t,
                None => return Ok(None),
            },

            None => Transform::new_translate(viewport.x0, viewport.y0),
        };

        if transform.is_invertible() {
            Ok(Some(transform))
        } else {
            Err(NonInvertibleTransform)
        }
    }
}

/// Parses an alignment keyword like `xMidYMax`; `none` gives `None`.
fn parse_align<'i>(parser: &mut Parser<'i, '_>) -> Result<Option<(Align1D, Align1D)>, ParseError<'i>> {
    let loc = parser.current_source_location();
    let ident = parser.expect_ident()?.clone();

    if ident.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let name: &str = &ident;
    let xy = name
        .strip_prefix('x')
        .filter(|rest| rest.len() == 7 && rest.is_char_boundary(3))
        .and_then(|rest| {
            let (x, y) = rest.split_at(3);
            let y = y.strip_prefix('Y')?;
            Some((Align1D::from_name(x)?, Align1D::from_name(y)?))
        });

    match xy {
        Some(xy) => Ok(Some(xy)),
        None => Err(loc.new_unexpected_token_error(Token::Ident(ident))),
    }
}

impl Parse for AspectRatio {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<AspectRatio, ParseError<'i>> {
        // `defer` only applied to images in SVG 1.1 and is accepted and ignored.
        let _ = parser.try_parse(|p| p.expect_ident_matching("defer"));

        let align_xy = parse_align(parser)?;

        let fit = parser
            .try_parse(|p| {
                parse_identifiers!(
                    p,
                    "meet" => FitMode::Meet,
                    "slice" => FitMode::Slice,
                )
            })
            .unwrap_or_default();

        let align = align_xy.map(|(x, y)| Align { x, y, fit });

        Ok(AspectRatio { align })
    }
}
