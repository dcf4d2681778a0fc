//! Structural elements: nested `svg` viewports, and `use` references.

use crate::aspect_ratio::AspectRatio;
use crate::document::AcquiredNodes;
use crate::drawing_ctx::DrawingCtx;
use crate::error::*;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::rect::Rect;
use crate::svg_log;
use crate::transform::Transform;
use crate::viewbox::ViewBox;

/// Sets up the viewport of a nested `svg` element.
///
/// The viewport is given by `x`, `y`, `width` and `height`, the last two defaulting to
/// 100%.  It is clipped unless `overflow` is `visible` or `auto`, and the surface is
/// transformed to map the `viewBox` into it.  Returns the size of the new viewport for
/// percentages, or `None` if the element should not be rendered.
pub fn push_svg_viewport(
    draw_ctx: &mut DrawingCtx<'_>,
    node: &Node,
) -> Result<Option<(f64, f64)>, InternalRenderingError> {
    let params = draw_ctx.view_params();

    let x = node
        .parse_attr_or("x", Length::<Horizontal>::default())?
        .to_user(&params);
    let y = node
        .parse_attr_or("y", Length::<Vertical>::default())?
        .to_user(&params);
    let width = node
        .parse_attr_or("width", ULength::<Horizontal>::new(1.0, LengthUnit::Percent))?
        .to_user(&params);
    let height = node
        .parse_attr_or("height", ULength::<Vertical>::new(1.0, LengthUnit::Percent))?
        .to_user(&params);

    let vbox: Option<ViewBox> = node.parse_attr("viewBox")?;
    let aspect = node.parse_attr_or("preserveAspectRatio", AspectRatio::default())?;

    let viewport = Rect::from_xywh(x, y, width, height);

    let transform = match aspect.viewport_to_viewbox_transform(vbox, &viewport) {
        Ok(Some(t)) => t,
        Ok(None) => return Ok(None),
        Err(e) => {
            svg_log!(draw_ctx.session(), "not rendering {}: {}", node.data(), e);
            return Ok(None);
        }
    };

    let clip = !matches!(node.attr("overflow").as_deref(), Some("visible") | Some("auto"));

    if clip && !draw_ctx.is_clipping() {
        draw_ctx.clip_rect(&viewport);
    }

    draw_ctx.surface().transform(&transform);

    Ok(Some(vbox.map_or((width, height), |v| v.size())))
}

/// Draws the element referenced by a `use`, translated by its `x` and `y`.
///
/// The referenced subtree is rebuilt under the `use`, so it inherits from it.  A
/// referenced `symbol` is drawn as a nested `svg`; for both, the `width` and `height`
/// of the `use` override the ones of the referenced element.
///
/// Failed fetches, missing ids and circular references are errors for the whole
/// render.
pub fn draw_use(
    draw_ctx: &mut DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    node: &Node,
) -> Result<(), InternalRenderingError> {
    let href = match node.attr("xlink:href").or_else(|| node.attr("href")) {
        Some(href) => href,
        None => return Ok(()),
    };

    let params = draw_ctx.view_params();

    let x = node
        .parse_attr_or("x", Length::<Horizontal>::default())?
        .to_user(&params);
    let y = node
        .parse_attr_or("y", Length::<Vertical>::default())?
        .to_user(&params);

    let acquired = match acquired_nodes.acquire_href(&href, node) {
        Ok(acquired) => acquired,

        Err(e @ AcquireError::LinkNotFound(_)) | Err(e @ AcquireError::InvalidLinkType(_)) => {
            svg_log!(draw_ctx.session(), "not rendering {}: {}", node.data(), e);
            return Ok(());
        }

        Err(e) => return Err(e.into()),
    };

    let target = acquired.get().clone();

    let passes = target
        .data()
        .xml
        .as_ref()
        .map_or(true, |xml| acquired_nodes.document().loader().passes_conditions(xml));

    if !passes {
        return Ok(());
    }

    if target.has_tag("svg") || target.has_tag("symbol") {
        let mut data = target.borrow_mut();
        data.set_tag("svg");

        for key in ["width", "height"] {
            if let Some(value) = node.attr(key) {
                data.set(key, &value);
            }
        }
    }

    draw_ctx.surface().transform(&Transform::new_translate(x, y));

    draw_ctx.draw_node(acquired_nodes, &target)?;

    Ok(())
}
