//! CSS color values.

use cssparser::{ParseErrorKind, Parser};
use cssparser_color::{hsl_to_rgb, hwb_to_rgb, Color};

use crate::error::*;
use crate::parsers::Parse;

/// A color with straight (not premultiplied) alpha; all channels are in `[0.0, 1.0]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Rgba {
        Rgba {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Same color with its alpha multiplied by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Rgba {
        Rgba {
            alpha: self.alpha * opacity.clamp(0.0, 1.0),
            ..self
        }
    }

    /// The color with each channel inverted; used by the `negate_colors` option.
    pub fn negate(self) -> Rgba {
        Rgba {
            red: 1.0 - self.red,
            green: 1.0 - self.green,
            blue: 1.0 - self.blue,
            ..self
        }
    }
}

/// Turn a short-lived [`cssparser::ParseError`] into one of our own.
///
/// cssparser-color reports errors with the `()` custom error type; we only care about the
/// basic ones.
fn map_color_parse_error(err: cssparser::ParseError<'_, ()>) -> ParseError<'_> {
    let string_err = match err.kind {
        ParseErrorKind::Basic(ref e) => format!("{}", e),
        ParseErrorKind::Custom(()) => "could not parse color".to_string(),
    };

    ParseError {
        kind: ParseErrorKind::Custom(ValueErrorKind::Parse(string_err)),
        location: err.location,
    }
}

/// Normalizes `h` (a hue value in degrees) to be in the interval `[0.0, 1.0]`, the scale
/// that `hsl_to_rgb()` and `hwb_to_rgb()` expect.
fn normalize_hue(h: f32) -> f32 {
    h.rem_euclid(360.0) / 360.0
}

fn from_floats(r: f32, g: f32, b: f32, alpha: Option<f32>) -> Rgba {
    Rgba::new(
        f64::from(r.clamp(0.0, 1.0)),
        f64::from(g.clamp(0.0, 1.0)),
        f64::from(b.clamp(0.0, 1.0)),
        f64::from(alpha.unwrap_or(1.0).clamp(0.0, 1.0)),
    )
}

impl Parse for Rgba {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Rgba, ParseError<'i>> {
        let loc = parser.current_source_location();

        let color = Color::parse(parser).map_err(map_color_parse_error)?;

        match color {
            Color::Rgba(rgba) => Ok(Rgba::new(
                f64::from(rgba.red) / 255.0,
                f64::from(rgba.green) / 255.0,
                f64::from(rgba.blue) / 255.0,
                f64::from(rgba.alpha),
            )),

            Color::Hsl(hsl) => {
                let (r, g, b) = hsl_to_rgb(
                    normalize_hue(hsl.hue.unwrap_or(0.0)),
                    hsl.saturation.unwrap_or(0.0),
                    hsl.lightness.unwrap_or(0.0),
                );
                Ok(from_floats(r, g, b, hsl.alpha))
            }

            Color::Hwb(hwb) => {
                let (r, g, b) = hwb_to_rgb(
                    normalize_hue(hwb.hue.unwrap_or(0.0)),
                    hwb.whiteness.unwrap_or(0.0),
                    hwb.blackness.unwrap_or(0.0),
                );
                Ok(from_floats(r, g, b, hwb.alpha))
            }

            // currentColor was already substituted while building the tree
            _ => Err(loc.new_custom_error(ValueErrorKind::parse_error(
                "unsupported color syntax",
            ))),
        }
    }
}
