//! Lists separated by whitespace or single commas: numbers, points, lengths.

use cssparser::Parser;

use crate::error::*;
use crate::parsers::{optional_comma, Parse};

/// A list of any parsable value, like the `x`, `dx` or `rotate` lists of text elements.
///
/// An empty list is valid; a trailing or doubled comma is not.
#[derive(Debug, PartialEq)]
pub struct List<T>(pub Vec<T>);

impl<T> Default for List<T> {
    fn default() -> Self {
        List(Vec::new())
    }
}

impl<T: Parse> Parse for List<T> {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<List<T>, ParseError<'i>> {
        let mut items = Vec::new();

        if parser.is_exhausted() {
            return Ok(List(items));
        }

        items.push(T::parse(parser)?);

        while !parser.is_exhausted() {
            optional_comma(parser);
            items.push(T::parse(parser)?);
        }

        Ok(List(items))
    }
}

/// The `points` attribute of `polyline` and `polygon`.
#[derive(Debug, Default, PartialEq)]
pub struct Points(pub Vec<(f64, f64)>);

impl Parse for Points {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Points, ParseError<'i>> {
        let loc = parser.current_source_location();
        let List(coords) = List::<f64>::parse(parser)?;

        let pairs = coords.chunks_exact(2);
        if !pairs.remainder().is_empty() {
            return Err(loc.new_custom_error(ValueErrorKind::value_error(
                "points need an even number of coordinates",
            )));
        }

        Ok(Points(pairs.map(|c| (c[0], c[1])).collect()))
    }
}
