//! 2D affine transforms and the `transform` attribute.
//!
//! The same grammar is used for `transform`, `gradientTransform` and
//! `patternTransform`:
//!
//! ```text
//! transform-list ::= transform (","? transform)*
//! transform      ::= matrix(a b c d e f) | translate(x [y]) | scale(x [y])
//!                  | rotate(a [cx cy]) | skewX(a) | skewY(a)
//! ```

use cssparser::{Parser, Token};

use crate::angle::Angle;
use crate::error::*;
use crate::number_list::List;
use crate::parsers::{optional_comma, Parse};
use crate::rect::Rect;

/// An affine matrix.
///
/// Points transform as `x' = xx * x + xy * y + x0` and `y' = yx * x + yy * y + y0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Transform {
    fn default() -> Transform {
        Transform::identity()
    }
}

impl Transform {
    /// Builds a matrix from its columns without checking that it is invertible.
    pub const fn new_unchecked(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Transform { xx, yx, xy, yy, x0, y0 }
    }

    pub const fn identity() -> Self {
        Transform::new_translate(0.0, 0.0)
    }

    pub const fn new_translate(tx: f64, ty: f64) -> Self {
        Transform { x0: tx, y0: ty, ..Transform::linear(1.0, 0.0, 0.0, 1.0) }
    }

    pub const fn new_scale(sx: f64, sy: f64) -> Self {
        Transform::linear(sx, 0.0, 0.0, sy)
    }

    pub fn new_rotate(a: Angle) -> Self {
        let (sin, cos) = a.radians().sin_cos();
        Transform::linear(cos, sin, -sin, cos)
    }

    pub fn new_skew(ax: Angle, ay: Angle) -> Self {
        Transform::linear(1.0, ay.radians().tan(), ax.radians().tan(), 1.0)
    }

    const fn linear(xx: f64, yx: f64, xy: f64, yy: f64) -> Self {
        Transform::new_unchecked(xx, yx, xy, yy, 0.0, 0.0)
    }

    /// The transform that applies `self` and then `next`.
    #[must_use]
    pub fn then(&self, next: &Transform) -> Transform {
        let (x0, y0) = next.transform_point(self.x0, self.y0);
        let (xx, yx) = next.transform_distance(self.xx, self.yx);
        let (xy, yy) = next.transform_distance(self.xy, self.yy);

        Transform { xx, yx, xy, yy, x0, y0 }
    }

    /// Applies `t` before `self`, like composing onto a drawing context.
    pub fn pre_transform(&self, t: &Transform) -> Self {
        t.then(self)
    }

    pub fn pre_translate(&self, x: f64, y: f64) -> Self {
        Transform::new_translate(x, y).then(self)
    }

    pub fn pre_scale(&self, sx: f64, sy: f64) -> Self {
        Transform::new_scale(sx, sy).then(self)
    }

    pub fn pre_rotate(&self, angle: Angle) -> Self {
        Transform::new_rotate(angle).then(self)
    }

    fn usable_determinant(&self) -> Option<f64> {
        let det = self.xx * self.yy - self.xy * self.yx;
        (det != 0.0 && det.is_finite()).then_some(det)
    }

    pub fn is_invertible(&self) -> bool {
        self.usable_determinant().is_some()
    }

    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let det = self.usable_determinant()?;

        let linear = Transform::linear(self.yy / det, -self.yx / det, -self.xy / det, self.xx / det);
        let (x0, y0) = linear.transform_distance(-self.x0, -self.y0);

        Some(Transform { x0, y0, ..linear })
    }

    pub fn transform_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.xx * dx + self.xy * dy, self.yx * dx + self.yy * dy)
    }

    pub fn transform_point(&self, px: f64, py: f64) -> (f64, f64) {
        let (dx, dy) = self.transform_distance(px, py);
        (dx + self.x0, dy + self.y0)
    }

    /// Bounding rectangle of the transformed corners of `rect`.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = [(rect.x0, rect.y0), (rect.x1, rect.y0), (rect.x0, rect.y1), (rect.x1, rect.y1)]
            .map(|(x, y)| self.transform_point(x, y));

        let (xs, ys): (Vec<f64>, Vec<f64>) = corners.iter().copied().unzip();
        let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
        let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Rect::new(min(&xs), min(&ys), max(&xs), max(&ys))
    }
}

impl Parse for Transform {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Transform, ParseError<'i>> {
        let mut list = Transform::identity();

        while !parser.is_exhausted() {
            list = parse_transform_function(parser)?.then(&list);
            optional_comma(parser);
        }

        Ok(list)
    }
}

/// One function of a transform list, with its arguments.
fn parse_transform_function<'i>(parser: &mut Parser<'i, '_>) -> Result<Transform, ParseError<'i>> {
    let loc = parser.current_source_location();

    let name = match parser.next()?.clone() {
        Token::Function(name) => name,

        Token::Ident(name) => {
            parser.expect_parenthesis_block()?;
            name
        }

        tok => return Err(loc.new_unexpected_token_error(tok)),
    };

    let List(args) = parser.parse_nested_block(List::<f64>::parse)?;

    // Values that went through a stylesheet are lowercased, so "skewx" must work too.
    let t = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("matrix", &[a, b, c, d, e, f]) => Transform::new_unchecked(a, b, c, d, e, f),

        ("translate", &[tx]) => Transform::new_translate(tx, 0.0),
        ("translate", &[tx, ty]) => Transform::new_translate(tx, ty),

        ("scale", &[s]) => Transform::new_scale(s, s),
        ("scale", &[sx, sy]) => Transform::new_scale(sx, sy),

        ("rotate", &[a]) => Transform::new_rotate(Angle::from_degrees(a)),
        ("rotate", &[a, cx, cy]) => Transform::new_translate(cx, cy)
            .pre_rotate(Angle::from_degrees(a))
            .pre_translate(-cx, -cy),

        ("skewx", &[a]) => Transform::new_skew(Angle::from_degrees(a), Angle::new(0.0)),
        ("skewy", &[a]) => Transform::new_skew(Angle::new(0.0), Angle::from_degrees(a)),

        ("matrix" | "translate" | "scale" | "rotate" | "skewx" | "skewy", _) => {
            return Err(loc.new_custom_error(ValueErrorKind::parse_error(&format!(
                "wrong number of arguments for {}",
                name
            ))))
        }

        _ => {
            return Err(loc.new_custom_error(ValueErrorKind::parse_error(
                "expected matrix|translate|scale|rotate|skewX|skewY",
            )))
        }
    };

    Ok(t)
}
