//! The `image` element.

use ::image::RgbaImage;

use crate::aspect_ratio::AspectRatio;
use crate::document::AcquiredNodes;
use crate::drawing_ctx::DrawingCtx;
use crate::error::*;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::rect::Rect;
use crate::svg_log;
use crate::viewbox::ViewBox;

/// Geometry of an `image` element; `width` and `height` default to the intrinsic size.
struct ImageGeometry {
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    aspect: AspectRatio,
}

impl ImageGeometry {
    fn from_node(node: &Node, params: &NormalizeParams) -> Result<ImageGeometry, ElementError> {
        Ok(ImageGeometry {
            x: node
                .parse_attr_or("x", Length::<Horizontal>::default())?
                .to_user(params),
            y: node
                .parse_attr_or("y", Length::<Vertical>::default())?
                .to_user(params),
            width: node
                .parse_attr::<ULength<Horizontal>>("width")?
                .map(|l| l.to_user(params)),
            height: node
                .parse_attr::<ULength<Vertical>>("height")?
                .map(|l| l.to_user(params)),
            aspect: node.parse_attr_or("preserveAspectRatio", AspectRatio::default())?,
        })
    }

    fn viewport(&self, intrinsic: (f64, f64)) -> Rect {
        Rect::from_xywh(
            self.x,
            self.y,
            self.width.unwrap_or(intrinsic.0),
            self.height.unwrap_or(intrinsic.1),
        )
    }
}

/// Draws a raster image or an SVG document referenced by an `image` element.
///
/// Fetching the data is a hard error; data that cannot be decoded as an image is logged
/// and not drawn.
pub fn draw_image(
    draw_ctx: &mut DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    node: &Node,
) -> Result<(), InternalRenderingError> {
    let href = match node.attr("xlink:href").or_else(|| node.attr("href")) {
        Some(href) => href,
        None => {
            svg_log!(draw_ctx.session(), "image without a reference: {}", node.data());
            return Ok(());
        }
    };

    let params = draw_ctx.view_params();
    let geometry = ImageGeometry::from_node(node, &params)?;

    let document = acquired_nodes.document();
    let (data, url) = document.fetch_href(&href, node)?;

    if data.data.len() < 5 {
        return Ok(());
    }

    if data.is_svg() {
        let root = document.load_image_document(data.data, url)?;
        return draw_svg_image(draw_ctx, acquired_nodes, &root, &geometry);
    }

    let image = match ::image::load_from_memory(&data.data) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            svg_log!(draw_ctx.session(), "could not decode image {}: {}", url, e);
            return Ok(());
        }
    };

    let image = if draw_ctx.config().invert_images {
        invert(image)
    } else {
        image
    };

    let (iw, ih) = (f64::from(image.width()), f64::from(image.height()));
    let viewport = geometry.viewport((iw, ih));

    if viewport.is_empty() || iw == 0.0 || ih == 0.0 {
        return Ok(());
    }

    let rect = geometry
        .aspect
        .compute(&ViewBox::from(Rect::from_size(iw, ih)), &viewport);

    draw_ctx.with_saved_state(|dc| {
        if geometry.aspect.is_slice() {
            dc.clip_rect(&viewport);
        }

        dc.surface().paint_image(&image, rect)?;
        Ok(())
    })
}

/// Draws an SVG document inside the viewport of an `image` element.
///
/// The document's `viewBox`, or its own size, is fitted into the viewport according to
/// the `preserveAspectRatio` of the `image` element.
fn draw_svg_image(
    draw_ctx: &mut DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    root: &Node,
    geometry: &ImageGeometry,
) -> Result<(), InternalRenderingError> {
    let params = draw_ctx.view_params();

    let vbox: Option<ViewBox> = root.parse_attr("viewBox")?;

    let intrinsic = (
        root.parse_attr::<ULength<Horizontal>>("width")?
            .map(|l| l.to_user(&params)),
        root.parse_attr::<ULength<Vertical>>("height")?
            .map(|l| l.to_user(&params)),
    );

    let size = match (intrinsic, vbox) {
        ((Some(w), Some(h)), _) => (w, h),
        (_, Some(vbox)) => vbox.size(),
        ((w, h), None) => (
            w.or(geometry.width).unwrap_or(0.0),
            h.or(geometry.height).unwrap_or(0.0),
        ),
    };

    let viewport = geometry.viewport(size);
    let vbox = vbox.or_else(|| Some(ViewBox::from(Rect::from_size(size.0, size.1))));

    let transform = match geometry.aspect.viewport_to_viewbox_transform(vbox, &viewport) {
        Ok(Some(t)) => t,
        Ok(None) => return Ok(()),
        Err(e) => {
            svg_log!(draw_ctx.session(), "not rendering image: {}", e);
            return Ok(());
        }
    };

    let (vw, vh) = vbox.map_or(size, |v| v.size());

    draw_ctx.with_saved_state(|dc| {
        dc.clip_rect(&viewport);
        dc.surface().transform(&transform);
        dc.with_view_box(vw, vh, |dc| dc.draw_children(acquired_nodes, root))?;
        Ok(())
    })
}

/// Negates the color channels of an image, keeping its alpha.
fn invert(mut image: RgbaImage) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [255 - r, 255 - g, 255 - b, a];
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cond::UserLanguage;
    use crate::document::{Document, LoadOptions};
    use crate::drawing_ctx::{draw_tree, RenderConfig};
    use crate::session::Session;
    use crate::surface::{Op, RecordingSurface};

    // A 2x1 PNG, red and transparent.
    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAIAAAABCAYAAAD0In+KAAAAD0lEQVR4nGP4z8AARAwMAAz8Af9c/RSVAAAAAElFTkSuQmCC";

    fn render(s: &str, config: &RenderConfig) -> Result<Vec<Op>, RenderingError> {
        let doc = Document::load_from_bytes(
            s.as_bytes().to_vec(),
            None,
            LoadOptions::new(false).with_user_language(UserLanguage::from_locale_str("en")),
            Session::new_for_test_suite(),
        )
        .unwrap();

        let mut surface = RecordingSurface::new();
        draw_tree(&doc, &doc.root(), &mut surface, config, (100.0, 100.0))?;
        Ok(surface.into_ops())
    }

    #[test]
    fn inverts_colors_but_not_alpha() {
        let mut image = RgbaImage::new(1, 1);
        image.put_pixel(0, 0, ::image::Rgba([255, 0, 10, 128]));

        let image = invert(image);
        assert_eq!(image.get_pixel(0, 0).0, [0, 255, 245, 128]);
    }

    #[test]
    fn fits_raster_image_into_viewport() {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <image href="{}" x="10" y="10" width="40" height="40"/>
               </svg>"#,
            PNG_DATA_URL
        );

        let ops = render(&svg, &RenderConfig::default()).unwrap();

        let images: Vec<&Op> = ops.iter().filter(|op| matches!(op, Op::Image { .. })).collect();
        assert_eq!(
            images,
            vec![&Op::Image {
                width: 2,
                height: 1,
                rect: Rect::new(10.0, 20.0, 50.0, 40.0),
            }]
        );
    }

    #[test]
    fn raster_image_defaults_to_intrinsic_size() {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><image href="{}"/></svg>"#,
            PNG_DATA_URL
        );

        let ops = render(&svg, &RenderConfig::default()).unwrap();
        assert!(ops.iter().any(|op| *op
            == Op::Image {
                width: 2,
                height: 1,
                rect: Rect::new(0.0, 0.0, 2.0, 1.0),
            }));
    }

    #[test]
    fn undecodable_image_is_skipped() {
        let ops = render(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <image href="data:image/png;base64,AAAAAAAAAAAA" width="10" height="10"/>
               </svg>"#,
            &RenderConfig::default(),
        )
        .unwrap();

        assert!(!ops.iter().any(|op| matches!(op, Op::Image { .. })));
    }

    #[test]
    fn draws_svg_image_in_viewport() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <image href="data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 10 10'%3E%3Crect width='10' height='10'/%3E%3C/svg%3E"
                        x="20" y="0" width="20" height="20"/>
               </svg>"#;

        let ops = render(svg, &RenderConfig::default()).unwrap();

        let moves: Vec<(f64, f64)> = ops
            .iter()
            .filter_map(|op| match *op {
                Op::MoveTo(x, y) => Some((x, y)),
                _ => None,
            })
            .collect();

        // The clip of the viewport, then the scaled rect.
        assert_eq!(moves, vec![(20.0, 0.0), (20.0, 0.0)]);
        assert!(ops.contains(&Op::LineTo(40.0, 20.0)));
    }
}
