//! Units of clip paths, masks and paint servers: `userSpaceOnUse` or `objectBoundingBox`.

use cssparser::Parser;

use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::Parse;
use crate::rect::Rect;
use crate::transform::Transform;

/// The coordinate system of an element's geometry attributes or of its content.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordUnits {
    UserSpaceOnUse,
    ObjectBoundingBox,
}

impl CoordUnits {
    /// Maps coordinates in these units to the user space of the referencing element.
    ///
    /// For `objectBoundingBox` the unit square is mapped onto `bbox`, so there is no
    /// mapping when the element has no bounding box.
    pub fn to_user_space(self, bbox: Option<Rect>) -> Option<Transform> {
        match self {
            CoordUnits::UserSpaceOnUse => Some(Transform::identity()),
            CoordUnits::ObjectBoundingBox => {
                bbox.map(|r| Transform::new_translate(r.x0, r.y0).pre_scale(r.width(), r.height()))
            }
        }
    }
}

impl Parse for CoordUnits {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "userSpaceOnUse" => CoordUnits::UserSpaceOnUse,
            "objectBoundingBox" => CoordUnits::ObjectBoundingBox,
        )?)
    }
}

/// Declares the type of a units attribute, like `gradientUnits`, with its default.
///
/// Each of these attributes has its own initial value, so each gets its own type that
/// can be used with `parse_attr_or(key, Default::default())`.
#[macro_export]
macro_rules! coord_units {
    ($name:ident, $default:expr) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        pub struct $name(pub $crate::coord_units::CoordUnits);

        impl Default for $name {
            fn default() -> Self {
                $name($default)
            }
        }

        impl From<$name> for $crate::coord_units::CoordUnits {
            fn from(u: $name) -> Self {
                u.0
            }
        }

        impl $crate::parsers::Parse for $name {
            fn parse<'i>(
                parser: &mut ::cssparser::Parser<'i, '_>,
            ) -> Result<Self, $crate::error::ParseError<'i>> {
                $crate::coord_units::CoordUnits::parse(parser).map($name)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    coord_units!(ContentUnits, CoordUnits::UserSpaceOnUse);

    #[test]
    fn parses_units_with_their_own_default() {
        assert_eq!(ContentUnits::default().0, CoordUnits::UserSpaceOnUse);
        assert_eq!(
            ContentUnits::parse_str("objectBoundingBox").unwrap(),
            ContentUnits(CoordUnits::ObjectBoundingBox)
        );

        assert!(ContentUnits::parse_str("").is_err());
        assert!(ContentUnits::parse_str("userSpace").is_err());
    }

    #[test]
    fn bounding_box_units_map_the_unit_square() {
        let bbox = Rect::from_xywh(10.0, 20.0, 100.0, 50.0);

        let t = CoordUnits::ObjectBoundingBox.to_user_space(Some(bbox)).unwrap();
        assert_eq!(t.transform_point(0.0, 0.0), (10.0, 20.0));
        assert_eq!(t.transform_point(1.0, 1.0), (110.0, 70.0));

        assert!(CoordUnits::ObjectBoundingBox.to_user_space(None).is_none());
        assert_eq!(
            CoordUnits::UserSpaceOnUse.to_user_space(None),
            Some(Transform::identity())
        );
    }
}
