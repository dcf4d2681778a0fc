//! The drawing surface that the render walker emits operations to.
//!
//! The walker never rasterizes anything itself.  It drives a [`Surface`], which has
//! the shape of a cairo context: a current path, a current source, a stack of saved
//! states and a stack of groups.  The `cairo` feature provides an implementation on top
//! of cairo-rs; tests use recording implementations.

use cssparser::Parser;
use image::RgbaImage;

use crate::color::Rgba;
use crate::error::{ParseError, RenderingError};
use crate::parse_identifiers;
use crate::parsers::Parse;
use crate::rect::Rect;
use crate::transform::Transform;

mod recording;

pub use recording::{Op, RecordingSurface};

/// `fill-rule` and `clip-rule`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// `stroke-linecap`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// `stroke-linejoin`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl Parse for FillRule {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<FillRule, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "nonzero" => FillRule::NonZero,
            "evenodd" => FillRule::EvenOdd,
        )?)
    }
}

impl Parse for LineCap {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<LineCap, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "butt" => LineCap::Butt,
            "round" => LineCap::Round,
            "square" => LineCap::Square,
        )?)
    }
}

impl Parse for LineJoin {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<LineJoin, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "miter" => LineJoin::Miter,
            "round" => LineJoin::Round,
            "bevel" => LineJoin::Bevel,
        )?)
    }
}

/// Everything needed to stroke the current path.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,

    /// Dash lengths and offset; `None` for solid lines.
    pub dashes: Option<(Vec<f64>, f64)>,
}

impl Default for StrokeStyle {
    fn default() -> StrokeStyle {
        StrokeStyle {
            width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 4.0,
            dashes: None,
        }
    }
}

/// `spreadMethod` for gradients.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum SpreadMethod {
    #[default]
    Pad,
    Reflect,
    Repeat,
}

impl Parse for SpreadMethod {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<SpreadMethod, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "pad" => SpreadMethod::Pad,
            "reflect" => SpreadMethod::Reflect,
            "repeat" => SpreadMethod::Repeat,
        )?)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorStop {
    /// In `[0.0, 1.0]`, never smaller than the offset of the previous stop.
    pub offset: f64,
    pub color: Rgba,
}

/// A resolved linear gradient.
///
/// Coordinates are in the gradient's own space; `matrix` maps user space to that space,
/// like the matrix of a cairo pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub matrix: Transform,
    pub spread: SpreadMethod,
    pub stops: Vec<ColorStop>,
}

/// A resolved radial gradient, from the focus `(fx, fy)` with radius 0 to the circle at
/// `(cx, cy)` with radius `r`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fx: f64,
    pub fy: f64,
    pub matrix: Transform,
    pub spread: SpreadMethod,
    pub stops: Vec<ColorStop>,
}

/// A tile rendered with [`Surface::begin_tile`] and [`Surface::end_tile`], to be repeated
/// in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    /// Identifies the tile within the surface that rendered it.
    pub id: usize,

    /// Maps user space to tile space.
    pub matrix: Transform,
}

/// A paint source.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Solid(Rgba),
    Linear(LinearGradient),
    Radial(RadialGradient),
    Tile(TileSource),
}

/// Font selection for text.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,

    /// In user units.
    pub size: f64,

    pub bold: bool,
    pub italic: bool,
}

/// The drawing operations needed by the render walker.
///
/// All coordinates are in user space, that is, they are transformed by the current
/// transformation matrix of the surface.
pub trait Surface {
    /// Pushes a copy of the current state: transform, clip, source and path styles.
    fn save(&mut self) -> Result<(), RenderingError>;

    fn restore(&mut self) -> Result<(), RenderingError>;

    /// Applies `t` before the current transform.
    fn transform(&mut self, t: &Transform);

    fn current_transform(&self) -> Transform;

    fn new_path(&mut self);

    fn move_to(&mut self, x: f64, y: f64);

    fn line_to(&mut self, x: f64, y: f64);

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64);

    /// Circular arc in the positive angle direction, like `cairo_arc`.
    fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64);

    /// Circular arc in the negative angle direction, like `cairo_arc_negative`.
    fn arc_negative(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64);

    fn close_path(&mut self);

    /// The current point, or `None` if the path is empty.
    fn current_point(&self) -> Option<(f64, f64)>;

    fn set_source(&mut self, source: &Source);

    fn fill(&mut self, rule: FillRule, preserve: bool) -> Result<(), RenderingError>;

    fn stroke(&mut self, style: &StrokeStyle, preserve: bool) -> Result<(), RenderingError>;

    /// Intersects the clip with the current path, and clears the path.
    fn clip(&mut self, rule: FillRule);

    /// Paints the current source everywhere inside the clip.
    fn paint(&mut self) -> Result<(), RenderingError>;

    /// Redirects drawing to an offscreen group; this also saves the state.
    fn push_group(&mut self);

    /// Ends the current group and makes it the source; this also restores the state.
    fn pop_group_to_source(&mut self) -> Result<(), RenderingError>;

    fn paint_with_alpha(&mut self, alpha: f64) -> Result<(), RenderingError>;

    /// Ends the current group and uses its alpha channel as a mask to paint the source
    /// that was current when the group was pushed.
    fn mask_with_current_group(&mut self) -> Result<(), RenderingError>;

    /// Starts rendering a pattern tile of the given size, in device units of the tile.
    fn begin_tile(&mut self, width: f64, height: f64) -> Result<(), RenderingError>;

    /// Finishes the current tile; `matrix` maps user space to tile space.
    fn end_tile(&mut self, matrix: Transform) -> Result<TileSource, RenderingError>;

    /// Paints an image scaled to fill `rect`.
    fn paint_image(&mut self, image: &RgbaImage, rect: Rect) -> Result<(), RenderingError>;

    fn set_font(&mut self, font: &FontSpec);

    /// Advance width of a string in the current font.
    fn text_width(&mut self, text: &str) -> f64;

    /// Appends the outlines of `text`, starting at the current point, to the path.
    fn text_path(&mut self, text: &str);

    /// Sets the size of the page that is being drawn, for paged output.
    fn set_page_size(&mut self, width: f64, height: f64) -> Result<(), RenderingError>;

    fn show_page(&mut self) -> Result<(), RenderingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stroke_properties() {
        assert_eq!(FillRule::parse_str("evenodd").unwrap(), FillRule::EvenOdd);
        assert_eq!(LineCap::parse_str("round").unwrap(), LineCap::Round);
        assert_eq!(LineJoin::parse_str("bevel").unwrap(), LineJoin::Bevel);
        assert_eq!(SpreadMethod::parse_str("reflect").unwrap(), SpreadMethod::Reflect);

        assert!(FillRule::parse_str("inherit").is_err());
        assert!(LineCap::parse_str("").is_err());
    }
}
