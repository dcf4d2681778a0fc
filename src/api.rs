//! Public API for loading documents and converting them to pages.
//!
//! This gets re-exported from the toplevel `lib.rs`.

#![warn(missing_docs)]

use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use url::Url;

pub use crate::{
    color::Rgba,
    cond::UserLanguage,
    document::Document,
    drawing_ctx::RenderConfig,
    error::{LoadingError, RenderingError},
    io::{BinaryData, DefaultFetcher, UrlFetcher},
    limits::ImplementationLimit,
    session::Session,
};

use crate::aspect_ratio::AspectRatio;
use crate::document::LoadOptions;
use crate::drawing_ctx::draw_tree;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::paint_server::lenient_attr;
use crate::rect::Rect;
use crate::surface::{Source, Surface};
use crate::svg_log;
use crate::transform::Transform;
use crate::viewbox::ViewBox;

/// Output formats supported by the conversion functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// PDF, one page per top-level `svg` if there are several.
    Pdf,

    /// A single raster image.
    Png,

    /// PostScript, paged like PDF.
    Ps,

    /// A single SVG page, as written by the rendering backend.
    Svg,
}

impl OutputFormat {
    /// Guesses a format from a file extension, like `"pdf"` or `"PNG"`.
    pub fn from_extension(ext: &str) -> Option<OutputFormat> {
        ext.parse().ok()
    }

    /// Whether documents with several top-level `svg` elements are split into pages.
    pub fn is_paged(self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Ps)
    }

    /// Whether lengths on the output surface are in points instead of pixels.
    pub fn is_vector(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }
}

/// Error returned when parsing an unknown [`OutputFormat`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format \"{0}\"; expected pdf, png, ps or svg")]
pub struct UnknownFormat(String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<OutputFormat, UnknownFormat> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "png" => Ok(OutputFormat::Png),
            "ps" => Ok(OutputFormat::Ps),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
            OutputFormat::Ps => "ps",
            OutputFormat::Svg => "svg",
        };

        write!(f, "{}", name)
    }
}

/// Builder for loading a [`Document`] and for the settings used to render it.
///
/// This is the starting point for using pagesvg.  Call the `with_*` methods in
/// sequence to configure loading and rendering, then use one of the loading functions.
/// The same `Options` should be passed to the conversion functions afterwards, so that
/// the document is rendered with the settings it was loaded with.
///
/// # Example:
///
/// ```
/// let options = pagesvg::Options::new().with_dpi(72.0).with_scale(2.0);
///
/// let document = options
///     .load_bytes(
///         br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#.to_vec(),
///         None,
///     )
///     .unwrap();
///
/// let size = pagesvg::page_geometry(&document, &document.root(), options.config());
/// assert_eq!((size.width, size.height), (20.0, 20.0));
/// ```
#[derive(Clone)]
pub struct Options {
    config: RenderConfig,
    fetcher: Option<Rc<dyn UrlFetcher>>,
    session: Session,
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}

impl Options {
    /// Creates `Options` with the defaults: 96 DPI, no scaling, safe mode, and the
    /// languages of the current locale for `systemLanguage`.
    pub fn new() -> Options {
        Options {
            config: RenderConfig::default(),
            fetcher: None,
            session: Session::new(),
        }
    }

    /// Sets the ratio between one inch and one pixel, used for physical units.
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.config.dpi = dpi;
        self
    }

    /// Sets the size of the container of the document, for percentages in the size
    /// of its outermost `svg` element.
    pub fn with_parent_size(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.config.parent_width = width;
        self.config.parent_height = height;
        self
    }

    /// Sets the factor applied to the document size to get the output size.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.config.scale = scale;
        self
    }

    /// Forces the size of the output, in pixels.
    ///
    /// When only one of them is given, the other one is computed to keep the aspect
    /// ratio of the document.  This overrides [`with_scale`](#method.with_scale).
    pub fn with_output_size(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.config.output_width = width;
        self.config.output_height = height;
        self
    }

    /// Fills each page with a color before drawing the document.
    pub fn with_background_color(mut self, color: Option<Rgba>) -> Self {
        self.config.background_color = color;
        self
    }

    /// Inverts every color painted by the document.
    pub fn with_negate_colors(mut self, negate: bool) -> Self {
        self.config.negate_colors = negate;
        self
    }

    /// Inverts the colors of raster images.
    pub fn with_invert_images(mut self, invert: bool) -> Self {
        self.config.invert_images = invert;
        self
    }

    /// Lifts the security policy.
    ///
    /// By default, documents larger than 10 MiB and documents with external entity
    /// declarations are rejected, and references may only point to `data:` URLs or to
    /// files next to the main document.  Set this to `true` only for trusted input.
    pub fn with_unsafe(mut self, unsafe_mode: bool) -> Self {
        self.config.unsafe_mode = unsafe_mode;
        self
    }

    /// Sets the languages that `systemLanguage` attributes are matched against.
    pub fn with_user_language(mut self, user_language: UserLanguage) -> Self {
        self.config.user_language = user_language;
        self
    }

    /// Uses a custom fetcher for referenced documents, stylesheets and images.
    ///
    /// The default is a [`DefaultFetcher`] that follows the security policy.
    pub fn with_fetcher(mut self, fetcher: Rc<dyn UrlFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Uses a specific session, for example to enable logging.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// The render settings gathered so far.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn load_options(&self) -> LoadOptions {
        let options = LoadOptions::new(self.config.unsafe_mode)
            .with_user_language(self.config.user_language.clone());

        match self.fetcher {
            Some(ref fetcher) => options.with_fetcher(fetcher.clone()),
            None => options,
        }
    }

    /// Loads a document from bytes, which may be gzip-compressed.
    ///
    /// `base_url` is used to resolve relative references in the document.
    pub fn load_bytes(&self, data: Vec<u8>, base_url: Option<Url>) -> Result<Document, LoadingError> {
        Document::load_from_bytes(data, base_url, self.load_options(), self.session.clone())
    }

    /// Fetches and loads the document at `url`.
    pub fn load_url(&self, url: &Url) -> Result<Document, LoadingError> {
        Document::load_from_url(url, self.load_options(), self.session.clone())
    }

    /// Loads the document in a file.
    ///
    /// # Example:
    ///
    /// ```no_run
    /// let document = pagesvg::Options::new().load_path("example.svg").unwrap();
    /// ```
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Document, LoadingError> {
        let path = std::fs::canonicalize(path.as_ref())
            .map_err(|e| LoadingError::Io(format!("{}: {}", path.as_ref().display(), e)))?;

        let url = Url::from_file_path(&path).map_err(|_| LoadingError::BadUrl)?;
        self.load_url(&url)
    }
}

/// Size and placement of one page.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PageGeometry {
    /// Width of the page in pixels, after scaling.
    pub width: f64,

    /// Height of the page in pixels, after scaling.
    pub height: f64,

    /// Size of the page's user space, for percentages in the page contents.
    pub viewport: (f64, f64),

    /// Maps the page's user space to the page; `None` when the page has an empty
    /// size or `viewBox`, and nothing should be drawn.
    pub transform: Option<Transform>,
}

/// Computes the size of the page for an outermost `svg` element.
///
/// The size comes from the element's `width` and `height`, whose percentages refer to
/// the parent size of the render settings; an unspecified or zero dimension falls back
/// to the `viewBox`, and then to the parent size.  The result is multiplied by the
/// scale, unless an output size is forced.  The `viewBox` is then fitted into the page
/// according to `preserveAspectRatio`.
pub fn page_geometry(document: &Document, node: &Node, config: &RenderConfig) -> PageGeometry {
    let session = document.session();

    let parent = (
        config.parent_width.unwrap_or(0.0),
        config.parent_height.unwrap_or(0.0),
    );
    let params = NormalizeParams::new(parent, NormalizeParams::default_font_size(config.dpi), config.dpi);

    let vbox: Option<ViewBox> = lenient_attr(node, "viewBox", session);
    let aspect: AspectRatio = lenient_attr(node, "preserveAspectRatio", session).unwrap_or_default();

    let width = lenient_attr::<ULength<Horizontal>>(node, "width", session)
        .map(|l| l.to_user(&params))
        .filter(|w| *w != 0.0)
        .or_else(|| vbox.map(|v| v.width()))
        .or(config.parent_width)
        .unwrap_or(0.0);

    let height = lenient_attr::<ULength<Vertical>>(node, "height", session)
        .map(|l| l.to_user(&params))
        .filter(|h| *h != 0.0)
        .or_else(|| vbox.map(|v| v.height()))
        .or(config.parent_height)
        .unwrap_or(0.0);

    let (page_width, page_height) = match (config.output_width, config.output_height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if width != 0.0 => (w, height * w / width),
        (None, Some(h)) if height != 0.0 => (width * h / height, h),
        (Some(w), None) => (w, height),
        (None, Some(h)) => (width, h),
        (None, None) => (width * config.scale, height * config.scale),
    };

    let vbox = vbox.unwrap_or_else(|| ViewBox::from(Rect::from_size(width, height)));

    let transform = match aspect
        .viewport_to_viewbox_transform(Some(vbox), &Rect::from_size(page_width, page_height))
    {
        Ok(t) => t,
        Err(e) => {
            svg_log!(session, "not rendering page {}: {}", node.data(), e);
            None
        }
    };

    PageGeometry {
        width: page_width,
        height: page_height,
        viewport: vbox.size(),
        transform,
    }
}

/// The elements that are rendered as pages.
///
/// For paged formats, a root whose children include `svg` elements has one page per
/// such child; everything else in the root is not rendered.  Otherwise the root is the
/// only page.
pub fn pages(document: &Document, paged: bool) -> Vec<Node> {
    let root = document.root();

    if paged {
        let children: Vec<Node> = root.children().filter(|c| c.has_tag("svg")).collect();

        if !children.is_empty() {
            return children;
        }
    }

    vec![root]
}

/// Renders one page to a surface, without showing it.
///
/// The page size is set on the surface, the background is painted, and the page's
/// user space is set up before drawing `node` as an outermost element.
pub fn render_page(
    document: &Document,
    node: &Node,
    surface: &mut dyn Surface,
    config: &RenderConfig,
) -> Result<(), RenderingError> {
    let geometry = page_geometry(document, node, config);

    surface.set_page_size(geometry.width, geometry.height)?;
    surface.save()?;

    if let Some(color) = config.background_color {
        surface.set_source(&Source::Solid(config.adjust_color(color)));
        surface.paint()?;
    }

    let res = match geometry.transform {
        Some(transform) => {
            surface.transform(&transform);
            draw_tree(document, node, surface, config, geometry.viewport)
        }

        None => Ok(()),
    };

    surface.restore()?;
    res
}

/// Renders every page of a document to a surface.
///
/// Each page is followed by [`Surface::show_page`].  See [`pages`] for how documents are
/// split when `paged` is `true`.
pub fn render_document(
    document: &Document,
    surface: &mut dyn Surface,
    config: &RenderConfig,
    paged: bool,
) -> Result<(), RenderingError> {
    for page in pages(document, paged) {
        render_page(document, &page, surface, config)?;
        surface.show_page()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Op, RecordingSurface};

    fn load(options: &Options, s: &str) -> Document {
        options
            .clone()
            .with_session(Session::new_for_test_suite())
            .load_bytes(s.as_bytes().to_vec(), None)
            .unwrap()
    }

    fn geometry(options: &Options, s: &str) -> PageGeometry {
        let doc = load(options, s);
        page_geometry(&doc, &doc.root(), options.config())
    }

    #[test]
    fn parses_output_formats() {
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert_eq!(OutputFormat::from_extension("ps"), Some(OutputFormat::Ps));
        assert!("jpeg".parse::<OutputFormat>().is_err());
        assert!(OutputFormat::Pdf.is_paged());
        assert!(!OutputFormat::Png.is_vector());
    }

    #[test]
    fn size_from_attributes_and_scale() {
        let g = geometry(
            &Options::new().with_scale(2.0),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1in" height="50"/>"#,
        );

        assert_eq!((g.width, g.height), (192.0, 100.0));
        assert_eq!(g.viewport, (96.0, 50.0));
        assert_eq!(g.transform, Some(Transform::new_scale(2.0, 2.0)));
    }

    #[test]
    fn size_falls_back_to_view_box_then_parent() {
        let g = geometry(
            &Options::new(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="10 10 30 40"/>"#,
        );
        assert_eq!((g.width, g.height), (30.0, 40.0));
        assert_eq!(g.transform, Some(Transform::new_translate(-10.0, -10.0)));

        let g = geometry(
            &Options::new().with_parent_size(Some(200.0), Some(100.0)),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="50%"/>"#,
        );
        assert_eq!((g.width, g.height), (100.0, 100.0));
    }

    #[test]
    fn output_width_keeps_aspect_ratio() {
        let g = geometry(
            &Options::new().with_output_size(Some(50.0), None).with_scale(3.0),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="40"/>"#,
        );

        assert_eq!((g.width, g.height), (50.0, 20.0));
        assert_eq!(g.viewport, (100.0, 40.0));
    }

    #[test]
    fn view_box_is_fitted_into_page() {
        let g = geometry(
            &Options::new(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 10 10"/>"#,
        );

        assert_eq!(
            g.transform,
            Some(Transform::new_translate(50.0, 0.0).pre_scale(10.0, 10.0))
        );
    }

    #[test]
    fn empty_page_draws_nothing() {
        let g = geometry(&Options::new(), r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        assert_eq!(g.transform, None);
    }

    #[test]
    fn renders_background_and_pages() {
        let options = Options::new().with_background_color(Some(Rgba::new(1.0, 1.0, 1.0, 1.0)));

        let doc = load(
            &options,
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <svg width="10" height="20"><rect width="1" height="1"/></svg>
                 <svg width="30" height="40"><rect width="1" height="1"/></svg>
               </svg>"#,
        );

        let mut surface = RecordingSurface::new();
        render_document(&doc, &mut surface, options.config(), true).unwrap();

        let pages: Vec<&Op> = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, Op::PageSize(..) | Op::ShowPage))
            .collect();

        assert_eq!(
            pages,
            vec![
                &Op::PageSize(10.0, 20.0),
                &Op::ShowPage,
                &Op::PageSize(30.0, 40.0),
                &Op::ShowPage
            ]
        );

        assert_eq!(
            surface.ops()[1],
            Op::Paint(Source::Solid(Rgba::new(1.0, 1.0, 1.0, 1.0)))
        );
        assert_eq!(surface.save_depth(), 0);
    }

    #[test]
    fn only_paged_formats_split_pages() {
        let options = Options::new();
        let doc = load(
            &options,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="5" height="5">
                 <svg width="10" height="20"/>
               </svg>"#,
        );

        assert_eq!(pages(&doc, false), vec![doc.root()]);

        let paged = pages(&doc, true);
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].attr("width").as_deref(), Some("10"));
    }
}
