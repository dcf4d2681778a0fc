//! Lengths with units, like `x="2cm"` or `stroke-width="5%"`.
//!
//! A length is resolved to user units with [`NormalizeParams`].  Percentages need to
//! know which side of the viewport they refer to, so the type carries an orientation:
//! `Length<Horizontal>` for `x` and `width`, `Length<Vertical>` for `y` and `height`,
//! and `ULength<Both>` for things like `r`, which resolve against the normalized
//! diagonal of the viewport.  The `U` variants reject negative values when parsing.

use cssparser::{Parser, Token};
use std::marker::PhantomData;

use crate::error::*;
use crate::parsers::{next_numeric, Numeric, Parse};

pub const POINTS_PER_INCH: f64 = 72.0;

/// Font size used when no element specifies one: 12pt.
pub const DEFAULT_FONT_SIZE_PT: f64 = 12.0;

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum LengthUnit {
    /// `1.0` is 100% of the relevant viewport dimension.
    Percent,
    Px,
    Em,
    /// Half an em; there is no font machinery to measure a real x-height.
    Ex,
    In,
    Cm,
    Mm,
    Pt,
    Pc,
}

impl LengthUnit {
    fn from_suffix(suffix: &str) -> Option<LengthUnit> {
        let unit = match suffix.to_ascii_lowercase().as_str() {
            "px" => LengthUnit::Px,
            "em" => LengthUnit::Em,
            "ex" => LengthUnit::Ex,
            "in" => LengthUnit::In,
            "cm" => LengthUnit::Cm,
            "mm" => LengthUnit::Mm,
            "pt" => LengthUnit::Pt,
            "pc" => LengthUnit::Pc,
            _ => return None,
        };

        Some(unit)
    }

    /// How many of this unit fit in an inch, for the physical units.
    fn per_inch(self) -> Option<f64> {
        match self {
            LengthUnit::In => Some(1.0),
            LengthUnit::Cm => Some(2.54),
            LengthUnit::Mm => Some(25.4),
            LengthUnit::Pt => Some(POINTS_PER_INCH),
            LengthUnit::Pc => Some(POINTS_PER_INCH / 12.0),
            _ => None,
        }
    }
}

/// Picks the viewport dimension that percentages refer to.
pub trait Normalize {
    fn normalize(width: f64, height: f64) -> f64;
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Horizontal;

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Vertical;

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Both;

impl Normalize for Horizontal {
    #[inline]
    fn normalize(width: f64, _height: f64) -> f64 {
        width
    }
}

impl Normalize for Vertical {
    #[inline]
    fn normalize(_width: f64, height: f64) -> f64 {
        height
    }
}

impl Normalize for Both {
    #[inline]
    fn normalize(width: f64, height: f64) -> f64 {
        width.hypot(height) / std::f64::consts::SQRT_2
    }
}

/// Decides which parsed values are acceptable.
pub trait Validate {
    fn validate(v: f64) -> Result<f64, ValueErrorKind> {
        Ok(v)
    }
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Signed;

impl Validate for Signed {}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Unsigned;

impl Validate for Unsigned {
    fn validate(v: f64) -> Result<f64, ValueErrorKind> {
        if v < 0.0 {
            Err(ValueErrorKind::value_error("length must not be negative"))
        } else {
            Ok(v)
        }
    }
}

/// A number with a unit, typed by how percentages resolve and by what values it accepts.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct CssLength<N: Normalize, V: Validate> {
    pub length: f64,
    pub unit: LengthUnit,

    orientation: PhantomData<N>,
    validation: PhantomData<V>,
}

impl<N: Normalize, V: Validate> Default for CssLength<N, V> {
    fn default() -> Self {
        CssLength::new(0.0, LengthUnit::Px)
    }
}

impl<N: Normalize, V: Validate> Parse for CssLength<N, V> {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<CssLength<N, V>, ParseError<'i>> {
        parser.skip_whitespace();
        let loc = parser.current_source_location();

        let (value, unit) = match next_numeric(parser)? {
            Numeric::Number(v) => (v, LengthUnit::Px),
            Numeric::Percentage(v) => (v, LengthUnit::Percent),
            Numeric::Dimension(v, unit) => match LengthUnit::from_suffix(&unit) {
                Some(u) => (v, u),
                None => return Err(loc.new_unexpected_token_error(Token::Ident(unit))),
            },
        };

        let value = V::validate(value).map_err(|e| loc.new_custom_error(e))?;

        Ok(CssLength::new(value, unit))
    }
}

/// Everything needed to turn a length into user-space units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalizeParams {
    /// Width and height of the current viewport, for percentages.
    pub viewport: (f64, f64),

    /// Font size of the current element in user units, for `em` and `ex`.
    pub font_size: f64,

    /// Dots per inch, for physical units.
    pub dpi: f64,
}

impl NormalizeParams {
    pub fn new(viewport: (f64, f64), font_size: f64, dpi: f64) -> NormalizeParams {
        NormalizeParams {
            viewport,
            font_size,
            dpi,
        }
    }

    /// Parameters for resolving relative to a bounding box, where lengths are fractions
    /// of a unit square.
    pub fn for_unit_square(&self) -> NormalizeParams {
        NormalizeParams {
            viewport: (1.0, 1.0),
            ..*self
        }
    }

    pub fn with_viewport(&self, width: f64, height: f64) -> NormalizeParams {
        NormalizeParams {
            viewport: (width, height),
            ..*self
        }
    }

    /// The default font size in user units at this DPI.
    pub fn default_font_size(dpi: f64) -> f64 {
        DEFAULT_FONT_SIZE_PT * dpi / POINTS_PER_INCH
    }
}

impl<N: Normalize, V: Validate> CssLength<N, V> {
    pub fn new(length: f64, unit: LengthUnit) -> CssLength<N, V> {
        CssLength {
            length,
            unit,
            orientation: PhantomData,
            validation: PhantomData,
        }
    }

    /// Resolves the length to user units.
    pub fn to_user(&self, params: &NormalizeParams) -> f64 {
        let factor = match self.unit {
            LengthUnit::Px => 1.0,
            LengthUnit::Percent => N::normalize(params.viewport.0, params.viewport.1),
            LengthUnit::Em => params.font_size,
            LengthUnit::Ex => params.font_size / 2.0,
            physical => physical.per_inch().map_or(1.0, |n| params.dpi / n),
        };

        self.length * factor
    }
}

/// A length that may be negative.
pub type Length<N> = CssLength<N, Signed>;

/// A length that must not be negative.
pub type ULength<N> = CssLength<N, Unsigned>;

#[cfg(test)]
mod tests {
    use super::*;

    use float_cmp::approx_eq;

    fn params() -> NormalizeParams {
        NormalizeParams::new((100.0, 200.0), 12.0, 96.0)
    }

    #[test]
    fn parses_units() {
        assert_eq!(
            Length::<Horizontal>::parse_str("42").unwrap(),
            Length::<Horizontal>::new(42.0, LengthUnit::Px)
        );
        assert_eq!(
            Length::<Horizontal>::parse_str("50%").unwrap(),
            Length::<Horizontal>::new(0.5, LengthUnit::Percent)
        );
        assert_eq!(
            Length::<Vertical>::parse_str("2.5MM").unwrap(),
            Length::<Vertical>::new(2.5, LengthUnit::Mm)
        );

        assert!(Length::<Both>::parse_str("").is_err());
        assert!(Length::<Both>::parse_str("10furlongs").is_err());
        assert!(ULength::<Both>::parse_str("-1").is_err());
    }

    #[test]
    fn percentages_use_orientation() {
        let p = params();

        assert_eq!(Length::<Horizontal>::parse_str("10%").unwrap().to_user(&p), 10.0);
        assert_eq!(Length::<Vertical>::parse_str("10%").unwrap().to_user(&p), 20.0);

        let diag = Length::<Both>::parse_str("100%").unwrap().to_user(&p);
        assert!(approx_eq!(
            f64,
            diag,
            (100.0f64 * 100.0 + 200.0 * 200.0).sqrt() / std::f64::consts::SQRT_2
        ));
    }

    #[test]
    fn physical_units_follow_dpi() {
        let p = params();

        assert_eq!(Length::<Both>::parse_str("1in").unwrap().to_user(&p), 96.0);
        assert_eq!(Length::<Both>::parse_str("72pt").unwrap().to_user(&p), 96.0);
        assert_eq!(Length::<Both>::parse_str("6pc").unwrap().to_user(&p), 96.0);
        assert!(approx_eq!(
            f64,
            Length::<Both>::parse_str("25.4mm").unwrap().to_user(&p),
            96.0
        ));
        assert!(approx_eq!(
            f64,
            Length::<Both>::parse_str("2.54cm").unwrap().to_user(&p),
            96.0
        ));
    }

    #[test]
    fn font_relative_units() {
        let p = params();

        assert_eq!(Length::<Both>::parse_str("2em").unwrap().to_user(&p), 24.0);
        assert_eq!(Length::<Both>::parse_str("2ex").unwrap().to_user(&p), 12.0);
    }

    #[test]
    fn default_font_size_is_twelve_points() {
        assert_eq!(NormalizeParams::default_font_size(72.0), 12.0);
        assert_eq!(NormalizeParams::default_font_size(96.0), 16.0);
    }
}
