//! Rendering to cairo surfaces, and conversion to the output formats.

use std::io;
use std::mem;

use image::RgbaImage;

use crate::api::{self, OutputFormat};
use crate::document::Document;
use crate::drawing_ctx::RenderConfig;
use crate::error::RenderingError;
use crate::rect::Rect;
use crate::surface::{
    self, ColorStop, FillRule, FontSpec, LineCap, LineJoin, Source, SpreadMethod, StrokeStyle,
    TileSource,
};
use crate::transform::Transform;

impl From<cairo::Error> for RenderingError {
    fn from(e: cairo::Error) -> RenderingError {
        RenderingError::Rendering(format!("cairo error: {:?}", e))
    }
}

impl From<Transform> for cairo::Matrix {
    fn from(t: Transform) -> cairo::Matrix {
        cairo::Matrix::new(t.xx, t.yx, t.xy, t.yy, t.x0, t.y0)
    }
}

impl From<cairo::Matrix> for Transform {
    fn from(m: cairo::Matrix) -> Transform {
        Transform::new_unchecked(m.xx(), m.yx(), m.xy(), m.yy(), m.x0(), m.y0())
    }
}

/// Paged cairo surfaces, whose page size can change between pages.
enum PageTarget {
    Pdf(cairo::PdfSurface),
    Ps(cairo::PsSurface),
    Svg,
}

/// A [`surface::Surface`] that draws with a cairo context.
pub struct CairoSurface {
    cr: cairo::Context,

    /// Device units per pixel: 1 for raster surfaces, 72/dpi for vector ones.
    units: f64,

    page: Option<PageTarget>,

    tiles: Vec<cairo::SurfacePattern>,

    // Contexts that were current when tiles were started, with the tiles' surfaces.
    tile_stack: Vec<(cairo::Context, cairo::RecordingSurface)>,
}

impl CairoSurface {
    /// Creates a surface that draws with `cr` in its current user space.
    ///
    /// Page sizes requested by the renderer are ignored; the caller owns the target.
    pub fn new(cr: &cairo::Context) -> CairoSurface {
        CairoSurface {
            cr: cr.clone(),
            units: 1.0,
            page: None,
            tiles: Vec::new(),
            tile_stack: Vec::new(),
        }
    }

    fn set_gradient_source(
        &self,
        gradient: &cairo::Gradient,
        matrix: Transform,
        spread: SpreadMethod,
        stops: &[ColorStop],
    ) {
        for stop in stops {
            let c = stop.color;
            gradient.add_color_stop_rgba(stop.offset, c.red, c.green, c.blue, c.alpha);
        }

        gradient.set_extend(match spread {
            SpreadMethod::Pad => cairo::Extend::Pad,
            SpreadMethod::Reflect => cairo::Extend::Reflect,
            SpreadMethod::Repeat => cairo::Extend::Repeat,
        });
        gradient.set_matrix(matrix.into());

        // Errors are sticky in the context; the next drawing operation reports them.
        let _ = self.cr.set_source(gradient);
    }
}

fn cairo_fill_rule(rule: FillRule) -> cairo::FillRule {
    match rule {
        FillRule::NonZero => cairo::FillRule::Winding,
        FillRule::EvenOdd => cairo::FillRule::EvenOdd,
    }
}

/// Converts an image to a cairo surface, with premultiplied alpha.
fn image_surface(image: &RgbaImage) -> Result<cairo::ImageSurface, RenderingError> {
    let width = checked_dimension(f64::from(image.width()))?;
    let height = checked_dimension(f64::from(image.height()))?;

    let mut surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)?;
    let stride = surface.stride() as usize;

    {
        let mut data = surface
            .data()
            .map_err(|e| RenderingError::Rendering(format!("{}", e)))?;

        for (y, row) in image.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                let [r, g, b, a] = pixel.0;
                let premultiply = |c: u8| (u32::from(c) * u32::from(a) + 127) / 255;

                let argb = u32::from(a) << 24
                    | premultiply(r) << 16
                    | premultiply(g) << 8
                    | premultiply(b);

                let offset = y * stride + x * 4;
                data[offset..offset + 4].copy_from_slice(&argb.to_ne_bytes());
            }
        }
    }

    surface.mark_dirty();
    Ok(surface)
}

impl surface::Surface for CairoSurface {
    fn save(&mut self) -> Result<(), RenderingError> {
        Ok(self.cr.save()?)
    }

    fn restore(&mut self) -> Result<(), RenderingError> {
        Ok(self.cr.restore()?)
    }

    fn transform(&mut self, t: &Transform) {
        self.cr.transform((*t).into());
    }

    fn current_transform(&self) -> Transform {
        self.cr.matrix().into()
    }

    fn new_path(&mut self) {
        self.cr.new_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.cr.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.cr.line_to(x, y);
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.cr.curve_to(x1, y1, x2, y2, x3, y3);
    }

    fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) {
        self.cr.arc(xc, yc, radius, angle1, angle2);
    }

    fn arc_negative(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) {
        self.cr.arc_negative(xc, yc, radius, angle1, angle2);
    }

    fn close_path(&mut self) {
        self.cr.close_path();
    }

    fn current_point(&self) -> Option<(f64, f64)> {
        match self.cr.has_current_point() {
            Ok(true) => self.cr.current_point().ok(),
            _ => None,
        }
    }

    fn set_source(&mut self, source: &Source) {
        match *source {
            Source::Solid(c) => self.cr.set_source_rgba(c.red, c.green, c.blue, c.alpha),

            Source::Linear(ref g) => self.set_gradient_source(
                &cairo::LinearGradient::new(g.x1, g.y1, g.x2, g.y2),
                g.matrix,
                g.spread,
                &g.stops,
            ),

            Source::Radial(ref g) => self.set_gradient_source(
                &cairo::RadialGradient::new(g.fx, g.fy, 0.0, g.cx, g.cy, g.r),
                g.matrix,
                g.spread,
                &g.stops,
            ),

            Source::Tile(TileSource { id, matrix }) => match self.tiles.get(id) {
                Some(pattern) => {
                    pattern.set_matrix(matrix.into());
                    let _ = self.cr.set_source(pattern);
                }
                None => self.cr.set_source_rgba(0.0, 0.0, 0.0, 0.0),
            },
        }
    }

    fn fill(&mut self, rule: FillRule, preserve: bool) -> Result<(), RenderingError> {
        self.cr.set_fill_rule(cairo_fill_rule(rule));

        if preserve {
            self.cr.fill_preserve()?;
        } else {
            self.cr.fill()?;
        }

        Ok(())
    }

    fn stroke(&mut self, style: &StrokeStyle, preserve: bool) -> Result<(), RenderingError> {
        self.cr.set_line_width(style.width);
        self.cr.set_line_cap(match style.cap {
            LineCap::Butt => cairo::LineCap::Butt,
            LineCap::Round => cairo::LineCap::Round,
            LineCap::Square => cairo::LineCap::Square,
        });
        self.cr.set_line_join(match style.join {
            LineJoin::Miter => cairo::LineJoin::Miter,
            LineJoin::Round => cairo::LineJoin::Round,
            LineJoin::Bevel => cairo::LineJoin::Bevel,
        });
        self.cr.set_miter_limit(style.miter_limit);

        match style.dashes {
            Some((ref dashes, offset)) => self.cr.set_dash(dashes, offset),
            None => self.cr.set_dash(&[], 0.0),
        }

        if preserve {
            self.cr.stroke_preserve()?;
        } else {
            self.cr.stroke()?;
        }

        Ok(())
    }

    fn clip(&mut self, rule: FillRule) {
        self.cr.set_fill_rule(cairo_fill_rule(rule));
        self.cr.clip();
    }

    fn paint(&mut self) -> Result<(), RenderingError> {
        Ok(self.cr.paint()?)
    }

    fn push_group(&mut self) {
        self.cr.push_group();
    }

    fn pop_group_to_source(&mut self) -> Result<(), RenderingError> {
        Ok(self.cr.pop_group_to_source()?)
    }

    fn paint_with_alpha(&mut self, alpha: f64) -> Result<(), RenderingError> {
        Ok(self.cr.paint_with_alpha(alpha)?)
    }

    fn mask_with_current_group(&mut self) -> Result<(), RenderingError> {
        let mask = self.cr.pop_group()?;
        Ok(self.cr.mask(&mask)?)
    }

    fn begin_tile(&mut self, width: f64, height: f64) -> Result<(), RenderingError> {
        let extents = cairo::Rectangle::new(0.0, 0.0, width.ceil().max(1.0), height.ceil().max(1.0));
        let surface = cairo::RecordingSurface::create(cairo::Content::ColorAlpha, Some(extents))?;
        let cr = cairo::Context::new(&surface)?;

        let parent = mem::replace(&mut self.cr, cr);
        self.tile_stack.push((parent, surface));

        Ok(())
    }

    fn end_tile(&mut self, matrix: Transform) -> Result<TileSource, RenderingError> {
        let (parent, surface) = self
            .tile_stack
            .pop()
            .ok_or_else(|| RenderingError::Rendering("no tile to end".to_string()))?;

        let tile_cr = mem::replace(&mut self.cr, parent);
        tile_cr.target().flush();

        let pattern = cairo::SurfacePattern::create(&surface);
        pattern.set_extend(cairo::Extend::Repeat);

        let id = self.tiles.len();
        self.tiles.push(pattern);

        Ok(TileSource { id, matrix })
    }

    fn paint_image(&mut self, image: &RgbaImage, rect: Rect) -> Result<(), RenderingError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(());
        }

        let surface = image_surface(image)?;

        self.cr.save()?;
        self.cr.translate(rect.x0, rect.y0);
        self.cr.scale(
            rect.width() / f64::from(image.width()),
            rect.height() / f64::from(image.height()),
        );
        self.cr.set_source_surface(&surface, 0.0, 0.0)?;
        self.cr.paint()?;
        self.cr.restore()?;

        Ok(())
    }

    fn set_font(&mut self, font: &FontSpec) {
        let slant = if font.italic {
            cairo::FontSlant::Italic
        } else {
            cairo::FontSlant::Normal
        };

        let weight = if font.bold {
            cairo::FontWeight::Bold
        } else {
            cairo::FontWeight::Normal
        };

        self.cr.select_font_face(&font.family, slant, weight);
        self.cr.set_font_size(font.size);
    }

    fn text_width(&mut self, text: &str) -> f64 {
        self.cr.text_extents(text).map_or(0.0, |e| e.x_advance())
    }

    fn text_path(&mut self, text: &str) {
        self.cr.text_path(text);
    }

    fn set_page_size(&mut self, width: f64, height: f64) -> Result<(), RenderingError> {
        let (w, h) = (width * self.units, height * self.units);

        match self.page {
            Some(PageTarget::Pdf(ref s)) => s.set_size(w, h)?,
            Some(PageTarget::Ps(ref s)) => s.set_size(w, h),
            Some(PageTarget::Svg) | None => (),
        }

        Ok(())
    }

    fn show_page(&mut self) -> Result<(), RenderingError> {
        if self.page.is_some() {
            self.cr.show_page()?;
        }

        Ok(())
    }
}

fn checked_dimension(x: f64) -> Result<i32, RenderingError> {
    let x = x.round().max(1.0);

    if x.is_finite() && x <= 32767.0 {
        Ok(x as i32)
    } else {
        Err(RenderingError::Rendering(
            "The resulting image would be larger than 32767 pixels on either dimension.\n\
             Please specify a smaller size."
                .to_string(),
        ))
    }
}

/// Renders a document in `format` and writes it to `output`, which is returned.
///
/// PNG output has the size of the first page in pixels.  Vector formats are measured
/// in points, using the DPI of `config`; PDF and PostScript get one page per top-level
/// `svg` element when there are several.
pub fn convert<W: io::Write + 'static>(
    document: &Document,
    config: &RenderConfig,
    format: OutputFormat,
    mut output: W,
) -> Result<W, RenderingError> {
    let pages = api::pages(document, format.is_paged());
    let first = api::page_geometry(document, &pages[0], config);

    if format == OutputFormat::Png {
        let width = checked_dimension(first.width)?;
        let height = checked_dimension(first.height)?;

        let target = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)?;

        {
            let cr = cairo::Context::new(&target)?;
            let mut surface = CairoSurface::new(&cr);
            api::render_document(document, &mut surface, config, false)?;
        }

        target
            .write_to_png(&mut output)
            .map_err(|e| RenderingError::Rendering(format!("could not write PNG: {}", e)))?;

        return Ok(output);
    }

    let units = 72.0 / config.dpi;
    let (w, h) = (first.width * units, first.height * units);

    let (target, page): (cairo::Surface, PageTarget) = match format {
        OutputFormat::Pdf => {
            let s = cairo::PdfSurface::for_stream(w, h, output)?;
            ((*s).clone(), PageTarget::Pdf(s))
        }

        OutputFormat::Ps => {
            let s = cairo::PsSurface::for_stream(w, h, output)?;
            ((*s).clone(), PageTarget::Ps(s))
        }

        _ => {
            let s = cairo::SvgSurface::for_stream(w, h, output)?;
            ((*s).clone(), PageTarget::Svg)
        }
    };

    {
        let cr = cairo::Context::new(&target)?;
        cr.scale(units, units);

        let mut surface = CairoSurface {
            units,
            page: Some(page),
            ..CairoSurface::new(&cr)
        };

        api::render_document(document, &mut surface, config, format.is_paged())?;
    }

    let stream = target
        .finish_output_stream()
        .map_err(|e| RenderingError::Rendering(format!("could not write output: {}", e)))?;

    stream
        .downcast::<W>()
        .map(|w| *w)
        .map_err(|_| RenderingError::Rendering("unexpected output stream".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Options;
    use crate::session::Session;

    fn load(s: &str) -> Document {
        Options::new()
            .with_session(Session::new_for_test_suite())
            .load_bytes(s.as_bytes().to_vec(), None)
            .unwrap()
    }

    #[test]
    fn premultiplies_image_data() {
        let mut image = RgbaImage::new(1, 1);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 128]));

        let mut surface = image_surface(&image).unwrap();
        let data = surface.data().unwrap();

        let argb = u32::from_ne_bytes([data[0], data[1], data[2], data[3]]);
        assert_eq!(argb, 0x8080_0000);
    }

    #[test]
    fn renders_png() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                 <rect width="10" height="10" fill="lime"/>
               </svg>"#,
        );

        let png = convert(&doc, &RenderConfig::default(), OutputFormat::Png, Vec::new()).unwrap();

        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (10, 10));
        assert_eq!(image.get_pixel(5, 5).0, [0, 255, 0, 255]);
    }

    #[test]
    fn renders_background_and_scale() {
        let doc = load(r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="2"/>"#);

        let config = RenderConfig {
            scale: 2.0,
            background_color: Some(crate::color::Rgba::new(0.0, 0.0, 1.0, 1.0)),
            ..RenderConfig::default()
        };

        let png = convert(&doc, &config, OutputFormat::Png, Vec::new()).unwrap();

        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(7, 3).0, [0, 0, 255, 255]);
    }

    #[test]
    fn renders_pdf() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <svg width="10" height="10"/>
                 <svg width="20" height="20"/>
               </svg>"#,
        );

        let pdf = convert(&doc, &RenderConfig::default(), OutputFormat::Pdf, Vec::new()).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn too_large_image_is_an_error() {
        let doc = load(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100000" height="10"/>"#);

        assert!(matches!(
            convert(&doc, &RenderConfig::default(), OutputFormat::Png, Vec::new()),
            Err(RenderingError::Rendering(_))
        ));
    }
}
