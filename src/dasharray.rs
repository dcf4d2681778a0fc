//! Parser for the `stroke-dasharray` property.

use cssparser::Parser;

use crate::error::*;
use crate::length::*;
use crate::parsers::{optional_comma, Parse};

#[derive(Debug, Default, PartialEq, Clone)]
pub enum Dasharray {
    #[default]
    None,
    Array(Vec<ULength<Both>>),
}

impl Parse for Dasharray {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Dasharray, ParseError<'i>> {
        if parser
            .try_parse(|p| p.expect_ident_matching("none"))
            .is_ok()
        {
            return Ok(Dasharray::None);
        }

        let mut dasharray = Vec::new();

        loop {
            dasharray.push(ULength::<Both>::parse(parser)?);

            if parser.is_exhausted() {
                break;
            }

            optional_comma(parser);
        }

        Ok(Dasharray::Array(dasharray))
    }
}

impl Dasharray {
    /// Dash lengths in user units, or `None` when nothing should be dashed.
    ///
    /// An array whose lengths add up to zero draws a solid line.  An odd number of
    /// lengths is repeated to yield an even number.
    pub fn resolve(&self, params: &NormalizeParams) -> Option<Vec<f64>> {
        match self {
            Dasharray::None => None,

            Dasharray::Array(lengths) => {
                let dashes: Vec<f64> = lengths.iter().map(|l| l.to_user(params)).collect();
                let total: f64 = dashes.iter().sum();

                if total > 0.0 {
                    if dashes.len() % 2 == 1 {
                        Some(dashes.iter().chain(dashes.iter()).copied().collect())
                    } else {
                        Some(dashes)
                    }
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NormalizeParams {
        NormalizeParams::new((100.0, 100.0), 12.0, 96.0)
    }

    #[test]
    fn parses_dash_arrays() {
        assert_eq!(Dasharray::parse_str("none").unwrap(), Dasharray::None);

        let d = Dasharray::parse_str("5, 10 1in").unwrap();
        assert_eq!(d.resolve(&params()), Some(vec![5.0, 10.0, 96.0, 5.0, 10.0, 96.0]));

        assert!(Dasharray::parse_str("").is_err());
        assert!(Dasharray::parse_str("5 -1").is_err());
        assert!(Dasharray::parse_str("5,,1").is_err());
    }

    #[test]
    fn all_zero_dashes_are_solid() {
        let d = Dasharray::parse_str("0 0").unwrap();
        assert_eq!(d.resolve(&params()), None);
    }
}
