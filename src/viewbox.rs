//! The `viewBox` attribute: a user coordinate system fitted into a viewport.

use cssparser::Parser;
use std::ops::Deref;

use crate::error::*;
use crate::number_list::List;
use crate::parsers::Parse;
use crate::rect::Rect;
use crate::transform::Transform;

/// The rectangle of user space that an `svg`, `marker`, `pattern` or `symbol` shows.
///
/// Derefs to [`Rect`], so `vbox.x0` and `vbox.width()` work directly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewBox(Rect);

impl Deref for ViewBox {
    type Target = Rect;

    fn deref(&self) -> &Rect {
        &self.0
    }
}

impl From<Rect> for ViewBox {
    fn from(r: Rect) -> ViewBox {
        ViewBox(r)
    }
}

impl ViewBox {
    /// Maps this box onto `target`, stretching it if the aspect ratios differ.
    ///
    /// An empty box has no mapping.
    pub fn map_onto(&self, target: &Rect) -> Option<Transform> {
        if self.is_empty() {
            return None;
        }

        let sx = target.width() / self.width();
        let sy = target.height() / self.height();

        Some(Transform::new_unchecked(
            sx,
            0.0,
            0.0,
            sy,
            target.x0 - self.x0 * sx,
            target.y0 - self.y0 * sy,
        ))
    }
}

impl Parse for ViewBox {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<ViewBox, ParseError<'i>> {
        let loc = parser.current_source_location();

        match List::<f64>::parse(parser)?.0[..] {
            [x, y, w, h] if w >= 0.0 && h >= 0.0 => Ok(ViewBox(Rect::from_xywh(x, y, w, h))),

            _ => Err(loc.new_custom_error(ValueErrorKind::value_error(
                "viewBox needs four numbers, with non-negative width and height",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_commas_or_spaces() {
        assert_eq!(
            ViewBox::parse_str("-10,-10,20,20").unwrap(),
            ViewBox(Rect::new(-10.0, -10.0, 10.0, 10.0))
        );
        assert_eq!(
            ViewBox::parse_str(" 0 0  100 50 ").unwrap(),
            ViewBox(Rect::new(0.0, 0.0, 100.0, 50.0))
        );
    }

    #[test]
    fn rejects_negative_sizes_and_wrong_counts() {
        for s in &["0 0 -1 10", "0 0 10 -1", "0 0 10", "0 0 10 10 10", "a b c d"] {
            assert!(ViewBox::parse_str(s).is_err(), "{} should not parse", s);
        }
    }

    #[test]
    fn maps_corners_onto_the_target() {
        let vbox = ViewBox::parse_str("10 20 50 100").unwrap();
        let t = vbox.map_onto(&Rect::from_xywh(0.0, 0.0, 100.0, 100.0)).unwrap();

        assert_eq!(t.transform_point(10.0, 20.0), (0.0, 0.0));
        assert_eq!(t.transform_point(60.0, 120.0), (100.0, 100.0));
    }

    #[test]
    fn empty_box_has_no_mapping() {
        let vbox = ViewBox::parse_str("0 0 0 10").unwrap();
        assert!(vbox.map_onto(&Rect::from_size(10.0, 10.0)).is_none());
    }
}
