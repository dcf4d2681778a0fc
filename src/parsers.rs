//! The `Parse` trait for attribute values, and utilities for parsers.

use cssparser::{CowRcStr, Parser, ParserInput, Token};

use crate::error::*;

/// Values that can be parsed from an attribute with `cssparser`.
pub trait Parse: Sized {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>>;

    /// Parses a whole string; trailing garbage is an error.
    fn parse_str(s: &str) -> Result<Self, ParseError<'_>> {
        let mut input = ParserInput::new(s);
        let mut parser = Parser::new(&mut input);

        let res = Self::parse(&mut parser)?;
        parser.expect_exhausted()?;

        Ok(res)
    }
}

/// Consumes a comma if there is one.
pub fn optional_comma(parser: &mut Parser<'_, '_>) {
    let _ = parser.try_parse(|p| p.expect_comma());
}

/// A numeric token with its value read at `f64` precision.
///
/// The tokenizer only keeps an `f32`, which would turn `0.2` into `0.200000003`, so
/// the value is parsed again from the token's source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric<'i> {
    Number(f64),
    /// Already divided by 100.
    Percentage(f64),
    Dimension(f64, CowRcStr<'i>),
}

/// Reads the next token, which must be a finite number, percentage or dimension.
pub fn next_numeric<'i>(parser: &mut Parser<'i, '_>) -> Result<Numeric<'i>, ParseError<'i>> {
    parser.skip_whitespace();

    let loc = parser.current_source_location();
    let start = parser.position();
    let token = parser.next()?.clone();
    let source = parser.slice_from(start);

    let finite = |text: &str| text.parse::<f64>().ok().filter(|v| v.is_finite());

    let numeric = match token {
        Token::Number { .. } => finite(source).map(Numeric::Number),

        Token::Percentage { .. } => source
            .strip_suffix('%')
            .and_then(finite)
            .map(|v| Numeric::Percentage(v / 100.0)),

        Token::Dimension { ref unit, .. } => source
            .len()
            .checked_sub(unit.len())
            .and_then(|n| source.get(..n))
            .and_then(finite)
            .map(|v| Numeric::Dimension(v, unit.clone())),

        tok => return Err(loc.new_unexpected_token_error(tok)),
    };

    numeric.ok_or_else(|| loc.new_custom_error(ValueErrorKind::value_error("expected finite number")))
}

/// Parses the value of the attribute named `attr`, which annotates the error.
pub fn parse_value<T: Parse>(attr: &str, value: &str) -> Result<T, ElementError> {
    T::parse_str(value).attribute(attr)
}

impl<T: Parse> Parse for Option<T> {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        T::parse(parser).map(Some)
    }
}

impl Parse for f64 {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        let loc = parser.current_source_location();

        match next_numeric(parser)? {
            Numeric::Number(n) => Ok(n),
            _ => Err(loc.new_custom_error(ValueErrorKind::parse_error("expected number"))),
        }
    }
}

/// A number or a percentage, clamped to `[0, 1]`.
///
/// This is the type of `opacity`, `fill-opacity`, `stroke-opacity`, `stop-opacity` and
/// of gradient stop offsets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UnitInterval(pub f64);

impl Parse for UnitInterval {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        let loc = parser.current_source_location();

        let value = match next_numeric(parser)? {
            Numeric::Number(v) | Numeric::Percentage(v) => v,
            Numeric::Dimension(..) => {
                return Err(loc.new_custom_error(ValueErrorKind::parse_error(
                    "expected number or percentage",
                )))
            }
        };

        Ok(UnitInterval(value.clamp(0.0, 1.0)))
    }
}

/// Parses one of a list of case-insensitive identifiers.
///
/// ```ignore
/// let cap = parse_identifiers!(
///     parser,
///     "butt" => LineCap::Butt,
///     "round" => LineCap::Round,
/// )?;
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! parse_identifiers {
    ($parser:expr,
     $($str:expr => $val:expr,)+) => {
        {
            let loc = $parser.current_source_location();
            let token = $parser.next()?;

            match token {
                $(cssparser::Token::Ident(ref cow) if cow.eq_ignore_ascii_case($str) => Ok($val),)+

                _ => Err(loc.new_basic_unexpected_token_error(token.clone()))
            }
        }
    };
}
