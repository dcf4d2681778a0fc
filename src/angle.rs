//! Angles for marker orientation and for the `rotate` attribute of text.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use cssparser::Parser;
use float_cmp::approx_eq;

use crate::error::*;
use crate::parsers::{next_numeric, Numeric, Parse};

/// An angle in radians, always in `[0, 2π)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Angle(f64);

impl Angle {
    pub fn new(rad: f64) -> Angle {
        let r = rad.rem_euclid(TAU);

        if approx_eq!(f64, r, 0.0) || approx_eq!(f64, r, TAU) {
            Angle(0.0)
        } else {
            Angle(r)
        }
    }

    pub fn from_degrees(deg: f64) -> Angle {
        Angle::new(deg.to_radians())
    }

    /// Direction of the vector `(vx, vy)`. A zero vector points at angle 0.
    pub fn from_vector(vx: f64, vy: f64) -> Angle {
        match vy.atan2(vx) {
            rad if rad.is_nan() => Angle(0.0),
            rad => Angle::new(rad),
        }
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    /// Halfway between the two angles, going around the shorter way.
    pub fn bisect(self, other: Angle) -> Angle {
        let half = (other.0 - self.0) / 2.0;
        let mid = self.0 + half;

        if half.abs() > FRAC_PI_2 {
            Angle::new(mid - PI)
        } else {
            Angle::new(mid)
        }
    }

    pub fn flip(self) -> Angle {
        Angle::new(self.0 + PI)
    }
}

/// Degrees per unit, for `deg`, `grad` and `turn`; `rad` is handled separately.
const ANGLE_UNITS: &[(&str, f64)] = &[("deg", 1.0), ("grad", 0.9), ("turn", 360.0)];

impl Parse for Angle {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Angle, ParseError<'i>> {
        parser.skip_whitespace();
        let loc = parser.current_source_location();

        let bad_unit = || loc.new_custom_error(ValueErrorKind::parse_error("expected an angle"));

        match next_numeric(parser)? {
            Numeric::Number(deg) => Ok(Angle::from_degrees(deg)),
            Numeric::Dimension(v, unit) if unit.eq_ignore_ascii_case("rad") => Ok(Angle::new(v)),
            Numeric::Dimension(v, unit) => ANGLE_UNITS
                .iter()
                .find(|(name, _)| unit.eq_ignore_ascii_case(name))
                .map(|(_, factor)| Angle::from_degrees(v * factor))
                .ok_or_else(bad_unit),
            Numeric::Percentage(_) => Err(bad_unit()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn close(a: Angle, rad: f64) -> bool {
        approx_eq!(f64, a.radians(), rad, epsilon = 1e-9)
    }

    #[test]
    fn normalizes_into_one_turn() {
        assert!(close(Angle::new(-FRAC_PI_2), 1.5 * PI));
        assert!(close(Angle::new(5.0 * PI), PI));
        assert_eq!(Angle::new(TAU).radians(), 0.0);
        assert_eq!(Angle::new(-1e-17).radians(), 0.0);
    }

    #[test]
    fn parses_numbers_and_units() {
        assert!(close(Angle::parse_str("90").unwrap(), FRAC_PI_2));
        assert!(close(Angle::parse_str("45deg").unwrap(), FRAC_PI_4));
        assert!(close(Angle::parse_str("-100grad").unwrap(), 1.5 * PI));
        assert!(close(Angle::parse_str("1rad").unwrap(), 1.0));
        assert!(close(Angle::parse_str("0.25turn").unwrap(), FRAC_PI_2));

        for s in &["", "deg", "12px", "10%", "1e500"] {
            assert!(Angle::parse_str(s).is_err(), "{} should not parse", s);
        }
    }

    #[test]
    fn vector_directions() {
        assert_eq!(Angle::from_vector(0.0, 0.0).radians(), 0.0);
        assert!(close(Angle::from_vector(0.0, 1.0), FRAC_PI_2));
        assert!(close(Angle::from_vector(0.0, -1.0), 1.5 * PI));
    }

    #[test]
    fn bisection_takes_the_short_way() {
        let a = Angle::from_vector(1.0, -0.1);
        let b = Angle::from_vector(1.0, 0.1);
        let mid = a.bisect(b).radians();
        assert!(mid < 1e-9 || mid > TAU - 1e-9);

        assert!(close(Angle::new(0.0).bisect(Angle::new(FRAC_PI_2)), FRAC_PI_4));
        assert!(close(Angle::new(1.5 * PI).bisect(Angle::new(PI)), 1.25 * PI));
    }

    #[test]
    fn flipping_adds_half_a_turn() {
        assert!(close(Angle::new(0.0).flip(), PI));
        assert!(close(Angle::new(1.5 * PI).flip(), FRAC_PI_2));
    }
}
