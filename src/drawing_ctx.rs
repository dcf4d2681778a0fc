//! The main context structure which drives the drawing process.

use std::mem;

use cssparser::Parser;

use crate::bbox;
use crate::color::Rgba;
use crate::cond::UserLanguage;
use crate::coord_units;
use crate::coord_units::CoordUnits;
use crate::dasharray::Dasharray;
use crate::document::{AcquiredNodes, Document};
use crate::element::ElementKind;
use crate::error::*;
use crate::image;
use crate::length::*;
use crate::marker;
use crate::node::{Node, NodeExt};
use crate::paint_server::PaintServer;
use crate::parsers::{optional_comma, Parse, UnitInterval};
use crate::rect::Rect;
use crate::session::Session;
use crate::shapes::{self, Markers};
use crate::structure;
use crate::surface::{FillRule, LineCap, LineJoin, Source, StrokeStyle, Surface};
use crate::svg_log;
use crate::text::{self, TextCursor};
use crate::transform::Transform;
use crate::url_resolver::local_id;

coord_units!(ClipPathUnits, CoordUnits::UserSpaceOnUse);
coord_units!(MaskUnits, CoordUnits::ObjectBoundingBox);
coord_units!(MaskContentUnits, CoordUnits::UserSpaceOnUse);

/// Settings that stay fixed for a whole render.
///
/// Lengths in physical units are resolved with `dpi`; the other fields control the
/// size of the output and a few color tweaks.  See [`crate::Options`] for the public
/// way to build one.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub dpi: f64,

    /// Size used for percentages in the size of the outermost `svg` element.
    pub parent_width: Option<f64>,
    pub parent_height: Option<f64>,

    /// Factor applied to the document size to get the output size.
    pub scale: f64,

    /// Output size overrides, in pixels; if only one is given, the other one keeps the
    /// document's aspect ratio.
    pub output_width: Option<f64>,
    pub output_height: Option<f64>,

    pub background_color: Option<Rgba>,
    pub negate_colors: bool,
    pub invert_images: bool,

    /// Lifts the security policy for loading documents and their references.
    pub unsafe_mode: bool,

    /// Languages to match against `systemLanguage`.
    pub user_language: UserLanguage,
}

impl Default for RenderConfig {
    fn default() -> RenderConfig {
        RenderConfig {
            dpi: 96.0,
            parent_width: None,
            parent_height: None,
            scale: 1.0,
            output_width: None,
            output_height: None,
            background_color: None,
            negate_colors: false,
            invert_images: false,
            unsafe_mode: false,
            user_language: UserLanguage::current(),
        }
    }
}

impl RenderConfig {
    /// Applies the `negate_colors` option to a color.
    pub fn adjust_color(&self, color: Rgba) -> Rgba {
        if self.negate_colors {
            color.negate()
        } else {
            color
        }
    }
}

/// Draws `node` as the outermost element of a render.
///
/// The surface is expected to be already set up so that its user space is the
/// viewport of `node`, of size `viewport`; this is what [`crate::api`] does for each page.
pub fn draw_tree(
    document: &Document,
    node: &Node,
    surface: &mut dyn Surface,
    config: &RenderConfig,
    viewport: (f64, f64),
) -> Result<(), RenderingError> {
    let mut acquired_nodes = AcquiredNodes::new(document);
    let mut draw_ctx = DrawingCtx::new(surface, config, document.session().clone(), viewport);

    draw_ctx.draw_node_with_mode(&mut acquired_nodes, node, true)
}

/// State of one render pass.
///
/// Everything that changes while the tree is walked lives here and not in the nodes:
/// the stack of viewports for percentages, the font size for `em` units, the text
/// cursor, and whether we are collecting the geometry of a clip path instead of
/// painting.
pub struct DrawingCtx<'a> {
    session: Session,
    surface: &'a mut dyn Surface,
    config: &'a RenderConfig,

    viewport_stack: Vec<(f64, f64)>,
    font_size: f64,
    cursor: TextCursor,
    clipping: bool,
}

impl<'a> DrawingCtx<'a> {
    pub fn new(
        surface: &'a mut dyn Surface,
        config: &'a RenderConfig,
        session: Session,
        viewport: (f64, f64),
    ) -> DrawingCtx<'a> {
        DrawingCtx {
            session,
            surface,
            config,
            viewport_stack: vec![viewport],
            font_size: NormalizeParams::default_font_size(config.dpi),
            cursor: TextCursor::default(),
            clipping: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    pub fn surface(&mut self) -> &mut (dyn Surface + 'a) {
        &mut *self.surface
    }

    /// Whether shapes only contribute their geometry to a clip path.
    pub fn is_clipping(&self) -> bool {
        self.clipping
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn text_cursor(&mut self) -> &mut TextCursor {
        &mut self.cursor
    }

    /// Parameters to normalize lengths against the current viewport and font size.
    pub fn view_params(&self) -> NormalizeParams {
        let viewport = self.viewport_stack.last().copied().unwrap_or_default();
        NormalizeParams::new(viewport, self.font_size, self.config.dpi)
    }

    /// Runs `f` with a new viewport size for percentages.
    pub fn with_view_box<O, F>(&mut self, width: f64, height: f64, f: F) -> O
    where
        F: FnOnce(&mut DrawingCtx<'a>) -> O,
    {
        self.viewport_stack.push((width, height));
        let res = f(self);
        self.viewport_stack.pop();
        res
    }

    /// Runs `f` between a save and a restore of the surface and of the font size.
    ///
    /// The state is restored even if `f` fails, so that the walker can go on with the
    /// next sibling after a node-level error.
    pub fn with_saved_state<O, F>(&mut self, f: F) -> Result<O, InternalRenderingError>
    where
        F: FnOnce(&mut DrawingCtx<'a>) -> Result<O, InternalRenderingError>,
    {
        self.surface.save()?;

        let font_size = self.font_size;
        let depth = self.viewport_stack.len();

        let res = f(self);

        self.viewport_stack.truncate(depth);
        self.font_size = font_size;
        self.surface.restore()?;

        res
    }

    /// Draws a node and its children.
    ///
    /// Errors in the node's attributes are logged and the node is skipped; only errors
    /// that must abort the whole render are returned.
    pub fn draw_node(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
    ) -> Result<(), RenderingError> {
        self.draw_node_with_mode(acquired_nodes, node, false)
    }

    pub fn draw_children(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
    ) -> Result<(), RenderingError> {
        for child in node.children() {
            self.draw_node(acquired_nodes, &child)?;
        }

        Ok(())
    }

    fn draw_node_with_mode(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        is_root: bool,
    ) -> Result<(), RenderingError> {
        match self.draw_element(acquired_nodes, node, is_root) {
            Ok(()) => Ok(()),

            Err(InternalRenderingError::Attribute(e)) => {
                svg_log!(self.session, "element {} will not be rendered: {}", node.data(), e);
                Ok(())
            }

            Err(InternalRenderingError::Fatal(e)) => Err(e),
        }
    }

    fn draw_element(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        is_root: bool,
    ) -> Result<(), InternalRenderingError> {
        let kind = ElementKind::from_tag(&node.tag());

        if kind == ElementKind::Defs {
            return Ok(());
        }

        let params = self.view_params();

        // A zero width or height disables rendering of the element and its children.
        if is_zero::<Horizontal>(node, "width", &params)?
            || is_zero::<Vertical>(node, "height", &params)?
        {
            return Ok(());
        }

        let font_size = self.compute_font_size(node);

        if is_root {
            // The outermost element shares its state with the page; nothing to restore.
            self.font_size = font_size;
            self.draw_in_state(acquired_nodes, node, kind, true)
        } else {
            self.with_saved_state(|dc| {
                dc.font_size = font_size;
                dc.draw_in_state(acquired_nodes, node, kind, false)
            })
        }
    }

    fn compute_font_size(&self, node: &Node) -> f64 {
        match node.parse_attr::<Length<Both>>("font-size") {
            // Percentages and em are relative to the font size of the parent.
            Ok(Some(l)) => l.to_user(
                &self
                    .view_params()
                    .with_viewport(self.font_size, self.font_size),
            ),

            Ok(None) => NormalizeParams::default_font_size(self.config.dpi),

            Err(e) => {
                svg_log!(self.session, "ignoring font size of {}: {}", node.data(), e);
                self.font_size
            }
        }
    }

    fn draw_in_state(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        kind: ElementKind,
        is_root: bool,
    ) -> Result<(), InternalRenderingError> {
        let transform = node.parse_attr_or("transform", Transform::identity())?;

        if !transform.is_invertible() {
            svg_log!(
                self.session,
                "element {} has a non-invertible transform; not rendering it",
                node.data()
            );
            return Ok(());
        }

        self.surface.transform(&transform);

        let opacity = node
            .parse_attr::<UnitInterval>("opacity")?
            .map_or(1.0, |o| o.0);

        let mask = node
            .attr("mask")
            .and_then(|m| local_id(&m).map(String::from));

        let has_filter = node.attr("filter").is_some_and(|f| f.trim() != "none");

        let group = !self.clipping
            && (mask.is_some() || has_filter || (opacity < 1.0 && !paints_once(node, kind)));

        if group {
            self.surface.push_group();
        }

        let paint_opacity = if group { 1.0 } else { opacity };
        let res = self.draw_contents(acquired_nodes, node, kind, is_root, paint_opacity);

        if group {
            self.surface.pop_group_to_source()?;

            match mask {
                Some(ref id) => self.paint_mask(acquired_nodes, node, id, opacity)?,
                None => self.surface.paint_with_alpha(opacity)?,
            }
        }

        res
    }

    fn draw_contents(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        kind: ElementKind,
        is_root: bool,
        opacity: f64,
    ) -> Result<(), InternalRenderingError> {
        let params = self.view_params();

        if !self.clipping {
            self.clip_to_clip_rect(node, &params)?;

            if let Some(id) = node.attr("clip-path").and_then(|c| local_id(&c).map(String::from)) {
                self.clip_to_node(acquired_nodes, node, &id)?;
            }
        }

        let display = node.attr("display").as_deref() != Some("none");
        let visible = display
            && !matches!(node.attr("visibility").as_deref(), Some("hidden") | Some("collapse"));

        let shape = if kind.is_shape() {
            match shapes::make_shape(node, kind, &params, &self.session) {
                // A degenerate shape paints nothing, markers included.
                Ok(shape) => shape.filter(|s| !s.path.is_empty()),

                Err(InternalRenderingError::Attribute(e)) => {
                    svg_log!(self.session, "shape {} will not be rendered: {}", node.data(), e);
                    None
                }

                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let mut viewport = None;

        match kind {
            _ if shape.is_some() => {
                if !self.clipping {
                    self.surface.new_path();
                }

                if let Some(ref shape) = shape {
                    shape.path.to_surface(&mut *self.surface)?;
                }
            }

            ElementKind::Text | ElementKind::TSpan | ElementKind::TextPath => {
                if !self.clipping {
                    self.surface.new_path();
                }

                text::draw_text_span(self, acquired_nodes, node, kind)?;
            }

            ElementKind::Use => structure::draw_use(self, acquired_nodes, node)?,

            ElementKind::Image if visible && !self.clipping => {
                image::draw_image(self, acquired_nodes, node)?
            }

            ElementKind::Svg if !is_root => match structure::push_svg_viewport(self, node)? {
                Some(size) => viewport = Some(size),
                None => return Ok(()),
            },

            _ => (),
        }

        if (shape.is_some() || kind.is_text()) && !self.clipping {
            if visible {
                self.fill_and_stroke(acquired_nodes, node, opacity)?;
            } else {
                self.surface.new_path();
            }
        }

        if let Some(ref shape) = shape {
            if shape.markers == Markers::Yes && visible && !self.clipping {
                marker::render_markers_for_shape(self, acquired_nodes, node, &shape.path)?;
            }
        }

        if display && !kind.is_invisible() {
            match viewport {
                Some((w, h)) => {
                    self.with_view_box(w, h, |dc| dc.draw_children(acquired_nodes, node))?
                }
                None => self.draw_children(acquired_nodes, node)?,
            }
        }

        if kind == ElementKind::Text {
            self.cursor = TextCursor::default();
        }

        Ok(())
    }

    /// Appends a rectangle to the current path.
    pub fn rectangle(&mut self, r: &Rect) {
        self.surface.move_to(r.x0, r.y0);
        self.surface.line_to(r.x1, r.y0);
        self.surface.line_to(r.x1, r.y1);
        self.surface.line_to(r.x0, r.y1);
        self.surface.close_path();
    }

    /// Intersects the clip with a rectangle in the current user space.
    pub fn clip_rect(&mut self, r: &Rect) {
        self.surface.new_path();
        self.rectangle(r);
        self.surface.clip(FillRule::NonZero);
    }

    /// Applies the `clip` property, `rect(top, right, bottom, left)`, whose offsets are
    /// relative to the element's `x`, `y`, `width` and `height`.
    fn clip_to_clip_rect(
        &mut self,
        node: &Node,
        params: &NormalizeParams,
    ) -> Result<(), InternalRenderingError> {
        let clip = match node.parse_attr::<ClipRect>("clip")? {
            Some(ClipRect::Rect(offsets)) => offsets,
            _ => return Ok(()),
        };

        let x = length_or_zero::<Horizontal>(node, "x", params)?;
        let y = length_or_zero::<Vertical>(node, "y", params)?;
        let width = length_or_zero::<Horizontal>(node, "width", params)?;
        let height = length_or_zero::<Vertical>(node, "height", params)?;

        let [top, right, bottom, left] = clip.map(|l| l.map_or(0.0, |l| l.to_user(params)));

        self.clip_rect(&Rect::from_xywh(
            x + left,
            y + top,
            width - left - right,
            height - top - bottom,
        ));

        Ok(())
    }

    /// Intersects the clip with the geometry of a `clipPath` element.
    ///
    /// A reference to something that is not a `clipPath` is ignored.
    fn clip_to_node(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        clip_id: &str,
    ) -> Result<(), InternalRenderingError> {
        let acquired = match acquired_nodes.acquire_id(clip_id) {
            Ok(acquired) => acquired,

            Err(AcquireError::MaxReferencesExceeded) => {
                return Err(AcquireError::MaxReferencesExceeded.into())
            }

            Err(e) => {
                svg_log!(self.session, "ignoring clip-path of {}: {}", node.data(), e);
                return Ok(());
            }
        };

        let clip_node = acquired.get().clone();

        if !clip_node.has_tag("clipPath") {
            svg_log!(self.session, "element {} is not a clipPath", clip_node.data());
            return Ok(());
        }

        let units: CoordUnits = clip_node
            .parse_attr_or("clipPathUnits", ClipPathUnits::default())?
            .into();
        let clip_transform = clip_node.parse_attr_or("transform", Transform::identity())?;
        let rule = clip_node.parse_attr_or("clip-rule", FillRule::NonZero)?;

        let bbox = match units {
            CoordUnits::UserSpaceOnUse => None,
            CoordUnits::ObjectBoundingBox => bbox::node_bbox(node, acquired_nodes, &self.view_params()),
        };

        let bbox_transform = match units.to_user_space(bbox) {
            Some(t) => t,

            // Nothing to clip against; the element is clipped away.
            None => {
                self.surface.new_path();
                self.surface.clip(rule);
                return Ok(());
            }
        };

        self.surface.new_path();
        self.surface.save()?;
        self.surface
            .transform(&bbox_transform.pre_transform(&clip_transform));

        let was_clipping = mem::replace(&mut self.clipping, true);
        let res = self.draw_children(acquired_nodes, &clip_node);
        self.clipping = was_clipping;

        self.surface.restore()?;
        res?;

        self.surface.clip(rule);

        Ok(())
    }

    /// Paints the current source, which holds the element's content, through a mask.
    fn paint_mask(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        mask_id: &str,
        opacity: f64,
    ) -> Result<(), InternalRenderingError> {
        let acquired = match acquired_nodes.acquire_id(mask_id) {
            Ok(acquired) => Some(acquired),

            Err(AcquireError::MaxReferencesExceeded) => {
                return Err(AcquireError::MaxReferencesExceeded.into())
            }

            Err(e) => {
                svg_log!(self.session, "ignoring mask of {}: {}", node.data(), e);
                None
            }
        };

        let mask_node = match acquired {
            Some(ref a) if a.get().has_tag("mask") => a.get().clone(),

            _ => {
                self.surface.paint_with_alpha(opacity)?;
                return Ok(());
            }
        };

        let params = self.view_params();

        let units: CoordUnits = mask_node
            .parse_attr_or("maskUnits", MaskUnits::default())?
            .into();
        let content_units: CoordUnits = mask_node
            .parse_attr_or("maskContentUnits", MaskContentUnits::default())?
            .into();

        let needs_bbox = units == CoordUnits::ObjectBoundingBox
            || content_units == CoordUnits::ObjectBoundingBox;

        let bbox = if needs_bbox {
            match bbox::node_bbox(node, acquired_nodes, &params) {
                Some(r) => r,

                // An element without extents has nothing to mask.
                None => return Ok(()),
            }
        } else {
            Rect::default()
        };

        let mask_rect = {
            let unit_params = match units {
                CoordUnits::ObjectBoundingBox => params.for_unit_square(),
                CoordUnits::UserSpaceOnUse => params,
            };

            let x = mask_node
                .parse_attr_or("x", Length::<Horizontal>::new(-0.1, LengthUnit::Percent))?
                .to_user(&unit_params);
            let y = mask_node
                .parse_attr_or("y", Length::<Vertical>::new(-0.1, LengthUnit::Percent))?
                .to_user(&unit_params);
            let w = mask_node
                .parse_attr_or("width", ULength::<Horizontal>::new(1.2, LengthUnit::Percent))?
                .to_user(&unit_params);
            let h = mask_node
                .parse_attr_or("height", ULength::<Vertical>::new(1.2, LengthUnit::Percent))?
                .to_user(&unit_params);

            units
                .to_user_space(Some(bbox))
                .unwrap_or_default()
                .transform_rect(&Rect::from_xywh(x, y, w, h))
        };

        self.surface.push_group();

        let res = self.with_saved_state(|dc| {
            dc.clip_rect(&mask_rect);

            if let Some(t) = content_units.to_user_space(Some(bbox)) {
                dc.surface.transform(&t);
            }

            if opacity < 1.0 {
                dc.surface.push_group();
                dc.draw_children(acquired_nodes, &mask_node)?;
                dc.surface.pop_group_to_source()?;
                dc.surface.paint_with_alpha(opacity)?;
            } else {
                dc.draw_children(acquired_nodes, &mask_node)?;
            }

            Ok(())
        });

        self.surface.mask_with_current_group()?;

        res
    }

    /// Fills and strokes the current path with the element's paint properties.
    ///
    /// `opacity` is the element's own opacity when it was not applied to a group; it
    /// multiplies `fill-opacity` and `stroke-opacity`.
    fn fill_and_stroke(
        &mut self,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        opacity: f64,
    ) -> Result<(), InternalRenderingError> {
        let params = self.view_params();

        let fill = node.parse_attr_or("fill", PaintServer::SolidColor(Rgba::BLACK))?;
        let fill_opacity = node
            .parse_attr::<UnitInterval>("fill-opacity")?
            .map_or(1.0, |o| o.0)
            * opacity;

        let stroke = node.parse_attr_or("stroke", PaintServer::None)?;
        let stroke_opacity = node
            .parse_attr::<UnitInterval>("stroke-opacity")?
            .map_or(1.0, |o| o.0)
            * opacity;
        let stroke_width = stroke_width(node, &params)?;

        // Only computed for paint servers in objectBoundingBox units.
        let mut bbox = None;

        if let Some(source) = fill.resolve(self, acquired_nodes, node, &mut bbox, fill_opacity)? {
            let rule = node.parse_attr_or("fill-rule", FillRule::NonZero)?;
            self.with_source(&source, fill_opacity, |surface| surface.fill(rule, true))?;
        }

        if stroke_width > 0.0 {
            if let Some(source) =
                stroke.resolve(self, acquired_nodes, node, &mut bbox, stroke_opacity)?
            {
                let style = stroke_style(node, stroke_width, &params)?;
                self.with_source(&source, stroke_opacity, |surface| {
                    surface.stroke(&style, true)
                })?;
            }
        }

        self.surface.new_path();

        Ok(())
    }

    /// Sets a paint source and runs a painting operation with it.
    ///
    /// Colors and gradients already carry the opacity; a pattern tile is painted
    /// through a group instead.
    fn with_source<F>(
        &mut self,
        source: &Source,
        opacity: f64,
        f: F,
    ) -> Result<(), RenderingError>
    where
        F: FnOnce(&mut dyn Surface) -> Result<(), RenderingError>,
    {
        let through_group = matches!(source, Source::Tile(_)) && opacity < 1.0;

        if through_group {
            self.surface.push_group();
        }

        self.surface.set_source(source);
        f(&mut *self.surface)?;

        if through_group {
            self.surface.pop_group_to_source()?;
            self.surface.paint_with_alpha(opacity)?;
        }

        Ok(())
    }
}

/// `stroke-width`, defaulting to 1.
pub fn stroke_width(node: &Node, params: &NormalizeParams) -> Result<f64, ElementError> {
    Ok(node
        .parse_attr::<ULength<Both>>("stroke-width")?
        .map_or(1.0, |l| l.to_user(params)))
}

fn stroke_style(
    node: &Node,
    width: f64,
    params: &NormalizeParams,
) -> Result<StrokeStyle, ElementError> {
    let dasharray = node.parse_attr_or("stroke-dasharray", Dasharray::default())?;
    let dashoffset = node
        .parse_attr_or("stroke-dashoffset", Length::<Both>::new(0.0, LengthUnit::Px))?
        .to_user(params);

    Ok(StrokeStyle {
        width,
        cap: node.parse_attr_or("stroke-linecap", LineCap::Butt)?,
        join: node.parse_attr_or("stroke-linejoin", LineJoin::Miter)?,
        miter_limit: node.parse_attr_or("stroke-miterlimit", 4.0)?,
        dashes: dasharray.resolve(params).map(|d| (d, dashoffset)),
    })
}

/// Whether the element paints a single fill or stroke and nothing else, so that its
/// opacity can be folded into that paint instead of compositing a group.
fn paints_once(node: &Node, kind: ElementKind) -> bool {
    let paints = |key: &str, default: &str| {
        node.attr(key).as_deref().unwrap_or(default).trim() != "none"
    };

    let has_markers = ["marker", "marker-start", "marker-mid", "marker-end"]
        .iter()
        .any(|key| paints(key, "none"));

    kind.is_shape()
        && !node.has_children()
        && !has_markers
        && !(paints("fill", "black") && paints("stroke", "none"))
}

fn is_zero<N: Normalize>(
    node: &Node,
    key: &str,
    params: &NormalizeParams,
) -> Result<bool, ElementError> {
    Ok(node
        .parse_attr::<Length<N>>(key)?
        .is_some_and(|l| l.to_user(params) == 0.0))
}

fn length_or_zero<N: Normalize>(
    node: &Node,
    key: &str,
    params: &NormalizeParams,
) -> Result<f64, ElementError> {
    Ok(node
        .parse_attr::<Length<N>>(key)?
        .map_or(0.0, |l| l.to_user(params)))
}

/// The `clip` property: `auto`, or `rect(top, right, bottom, left)` where each offset
/// may be `auto`.
#[derive(Debug, Clone, PartialEq)]
enum ClipRect {
    Auto,
    Rect([Option<Length<Both>>; 4]),
}

impl Parse for ClipRect {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<ClipRect, ParseError<'i>> {
        if parser
            .try_parse(|p| p.expect_ident_matching("auto"))
            .is_ok()
        {
            return Ok(ClipRect::Auto);
        }

        parser.expect_function_matching("rect")?;

        parser.parse_nested_block(|p| {
            let mut offsets = [None; 4];

            for (i, offset) in offsets.iter_mut().enumerate() {
                if i > 0 {
                    optional_comma(p);
                }

                *offset = if p.try_parse(|p| p.expect_ident_matching("auto")).is_ok() {
                    None
                } else {
                    Some(Length::<Both>::parse(p)?)
                };
            }

            Ok(ClipRect::Rect(offsets))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clip_rect() {
        assert_eq!(ClipRect::parse_str("auto").unwrap(), ClipRect::Auto);

        assert_eq!(
            ClipRect::parse_str("rect(1, auto, 3px, 4)").unwrap(),
            ClipRect::Rect([
                Some(Length::new(1.0, LengthUnit::Px)),
                None,
                Some(Length::new(3.0, LengthUnit::Px)),
                Some(Length::new(4.0, LengthUnit::Px)),
            ])
        );

        assert!(ClipRect::parse_str("rect(1, 2, 3)").is_err());
        assert!(ClipRect::parse_str("circle(1)").is_err());
    }

    #[test]
    fn default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.dpi, 96.0);
        assert_eq!(config.scale, 1.0);
        assert!(!config.unsafe_mode);

        let negated = RenderConfig {
            negate_colors: true,
            ..RenderConfig::default()
        };
        assert_eq!(negated.adjust_color(Rgba::BLACK), Rgba::new(1.0, 1.0, 1.0, 1.0));
    }
}
