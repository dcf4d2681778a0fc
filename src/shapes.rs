//! Basic SVG shapes: the `path`, `polygon`, `polyline`, `line`,
//! `rect`, `circle`, `ellipse` elements.
//!
//! Every shape is turned into a [`Path`] before drawing, so that the render walker
//! fills, strokes and measures all of them the same way.

use crate::element::ElementKind;
use crate::error::{ElementError, InternalRenderingError, RenderingError};
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::number_list::Points;
use crate::path_builder::{LargeArc, Path, PathBuilder, Sweep};
use crate::session::Session;
use crate::svg_log;

/// Whether a shape can have markers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Markers {
    No,
    Yes,
}

/// The geometry of a shape, ready to draw.
#[derive(Debug, Clone)]
pub struct ShapeDef {
    pub path: Path,
    pub markers: Markers,
}

impl ShapeDef {
    fn new(path: Path, markers: Markers) -> ShapeDef {
        ShapeDef { path, markers }
    }
}

/// Computes the geometry of a shape element.
///
/// Returns `Ok(None)` for elements that are not shapes.  An unparsable attribute is an
/// [`InternalRenderingError::Attribute`], which skips only this shape; an unknown path
/// command is fatal.
pub fn make_shape(
    node: &Node,
    kind: ElementKind,
    params: &NormalizeParams,
    session: &Session,
) -> Result<Option<ShapeDef>, InternalRenderingError> {
    let shape = match kind {
        ElementKind::Path => make_path(node, session)?,
        ElementKind::Rect => ShapeDef::new(make_rect(node, params)?, Markers::No),
        ElementKind::Circle => ShapeDef::new(make_circle(node, params)?, Markers::No),
        ElementKind::Ellipse => ShapeDef::new(make_ellipse_node(node, params)?, Markers::No),
        ElementKind::Line => ShapeDef::new(make_line(node, params)?, Markers::Yes),
        ElementKind::Polyline => ShapeDef::new(make_poly(node, false)?, Markers::Yes),
        ElementKind::Polygon => ShapeDef::new(make_poly(node, true)?, Markers::Yes),
        _ => return Ok(None),
    };

    Ok(Some(shape))
}

fn length<N: Normalize>(
    node: &Node,
    key: &str,
    params: &NormalizeParams,
) -> Result<f64, ElementError> {
    Ok(node
        .parse_attr::<Length<N>>(key)?
        .map(|l| l.to_user(params))
        .unwrap_or(0.0))
}

fn make_path(node: &Node, session: &Session) -> Result<ShapeDef, InternalRenderingError> {
    let d = node.attr("d").unwrap_or_default();

    let mut builder = PathBuilder::default();

    if let Err(e) = builder.parse(&d) {
        if e.is_fatal() {
            return Err(RenderingError::InvalidPath(format!("{} in \"{}\"", e, d)).into());
        }

        // Partial paths are rendered up to the error.
        svg_log!(session, "element {} has an invalid path: {}", node.id(), e);
    }

    Ok(ShapeDef::new(builder.into_path(), Markers::Yes))
}

fn make_poly(node: &Node, closed: bool) -> Result<Path, ElementError> {
    let points = node.parse_attr_or("points", Points::default())?;

    let mut builder = PathBuilder::default();

    for (i, &(x, y)) in points.0.iter().enumerate() {
        if i == 0 {
            builder.move_to(x, y);
        } else {
            builder.line_to(x, y);
        }
    }

    if closed && !points.0.is_empty() {
        builder.close_path();
    }

    Ok(builder.into_path())
}

fn make_line(node: &Node, params: &NormalizeParams) -> Result<Path, ElementError> {
    let x1 = length::<Horizontal>(node, "x1", params)?;
    let y1 = length::<Vertical>(node, "y1", params)?;
    let x2 = length::<Horizontal>(node, "x2", params)?;
    let y2 = length::<Vertical>(node, "y2", params)?;

    let mut builder = PathBuilder::default();
    builder.move_to(x1, y1);
    builder.line_to(x2, y2);

    Ok(builder.into_path())
}

/// The resolved geometry of a `rect`; also used for bounding boxes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rx: f64,
    pub ry: f64,
}

impl RectGeometry {
    pub fn from_node(node: &Node, params: &NormalizeParams) -> Result<RectGeometry, ElementError> {
        let x = length::<Horizontal>(node, "x", params)?;
        let y = length::<Vertical>(node, "y", params)?;
        let width = length::<Horizontal>(node, "width", params)?.max(0.0);
        let height = length::<Vertical>(node, "height", params)?.max(0.0);

        let norm_rx = node
            .parse_attr::<ULength<Horizontal>>("rx")?
            .map(|l| l.to_user(params));
        let norm_ry = node
            .parse_attr::<ULength<Vertical>>("ry")?
            .map(|l| l.to_user(params));

        let (mut rx, mut ry) = match (norm_rx, norm_ry) {
            (None, None) => (0.0, 0.0),
            (Some(rx), None) => (rx, rx),
            (None, Some(ry)) => (ry, ry),
            (Some(rx), Some(ry)) => (rx, ry),
        };

        rx = rx.min(width / 2.0);
        ry = ry.min(height / 2.0);

        if rx == 0.0 || ry == 0.0 {
            rx = 0.0;
            ry = 0.0;
        }

        Ok(RectGeometry {
            x,
            y,
            width,
            height,
            rx,
            ry,
        })
    }
}

#[allow(clippy::many_single_char_names)]
fn make_rect(node: &Node, params: &NormalizeParams) -> Result<Path, ElementError> {
    let RectGeometry {
        x,
        y,
        width: w,
        height: h,
        rx,
        ry,
    } = RectGeometry::from_node(node, params)?;

    let mut builder = PathBuilder::default();

    if w <= 0.0 || h <= 0.0 {
        return Ok(builder.into_path());
    }

    if rx == 0.0 {
        builder.move_to(x, y);
        builder.line_to(x + w, y);
        builder.line_to(x + w, y + h);
        builder.line_to(x, y + h);
        builder.line_to(x, y);
    } else {
        let left = x;
        let right = x + w;
        let top = y;
        let bottom = y + h;

        let corner = |b: &mut PathBuilder, x1: f64, y1: f64, x2: f64, y2: f64| {
            b.arc(x1, y1, rx, ry, 0.0, LargeArc(false), Sweep::Positive, x2, y2);
        };

        builder.move_to(left + rx, top);
        builder.line_to(right - rx, top);
        corner(&mut builder, right - rx, top, right, top + ry);
        builder.line_to(right, bottom - ry);
        corner(&mut builder, right, bottom - ry, right - rx, bottom);
        builder.line_to(left + rx, bottom);
        corner(&mut builder, left + rx, bottom, left, bottom - ry);
        builder.line_to(left, top + ry);
        corner(&mut builder, left, top + ry, left + rx, top);
    }

    builder.close_path();

    Ok(builder.into_path())
}

fn make_circle(node: &Node, params: &NormalizeParams) -> Result<Path, ElementError> {
    let cx = length::<Horizontal>(node, "cx", params)?;
    let cy = length::<Vertical>(node, "cy", params)?;
    let r = length::<Both>(node, "r", params)?;

    Ok(make_ellipse(cx, cy, r, r))
}

fn make_ellipse_node(node: &Node, params: &NormalizeParams) -> Result<Path, ElementError> {
    let cx = length::<Horizontal>(node, "cx", params)?;
    let cy = length::<Vertical>(node, "cy", params)?;
    let rx = length::<Horizontal>(node, "rx", params)?;
    let ry = length::<Vertical>(node, "ry", params)?;

    Ok(make_ellipse(cx, cy, rx, ry))
}

/// An ellipse made of two half-arcs, starting at its rightmost point.
pub fn make_ellipse(cx: f64, cy: f64, rx: f64, ry: f64) -> Path {
    let mut builder = PathBuilder::default();

    if rx <= 0.0 || ry <= 0.0 {
        return builder.into_path();
    }

    builder.move_to(cx + rx, cy);
    builder.arc(
        cx + rx,
        cy,
        rx,
        ry,
        0.0,
        LargeArc(false),
        Sweep::Positive,
        cx - rx,
        cy,
    );
    builder.arc(
        cx - rx,
        cy,
        rx,
        ry,
        0.0,
        LargeArc(false),
        Sweep::Positive,
        cx + rx,
        cy,
    );
    builder.close_path();

    builder.into_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;
    use crate::path_builder::PathCommand;

    fn node(tag: &str, attrs: &[(&str, &str)]) -> Node {
        let mut data = NodeData::new(tag, None, None);
        for (k, v) in attrs {
            data.set(k, v);
        }
        Node::new(data)
    }

    fn params() -> NormalizeParams {
        NormalizeParams::new((200.0, 100.0), 16.0, 96.0)
    }

    fn shape(n: &Node) -> Result<Option<ShapeDef>, InternalRenderingError> {
        let kind = ElementKind::from_tag(&n.tag());
        make_shape(n, kind, &params(), &Session::new_for_test_suite())
    }

    #[test]
    fn plain_rect_is_closed_polyline() {
        let n = node("rect", &[("x", "10"), ("y", "20"), ("width", "50%"), ("height", "5")]);
        let s = shape(&n).unwrap().unwrap();

        assert_eq!(s.markers, Markers::No);
        assert_eq!(
            s.path.points(),
            vec![(10.0, 20.0), (110.0, 20.0), (110.0, 25.0), (10.0, 25.0), (10.0, 20.0), (10.0, 20.0)]
        );
    }

    #[test]
    fn rect_radii_default_to_each_other_and_clamp() {
        let n = node("rect", &[("width", "10"), ("height", "4"), ("rx", "3")]);
        let g = RectGeometry::from_node(&n, &params()).unwrap();
        assert_eq!((g.rx, g.ry), (3.0, 2.0));

        let n = node("rect", &[("width", "10"), ("height", "4"), ("ry", "1")]);
        let g = RectGeometry::from_node(&n, &params()).unwrap();
        assert_eq!((g.rx, g.ry), (1.0, 1.0));

        let n = node("rect", &[("width", "10"), ("height", "4"), ("rx", "0"), ("ry", "1")]);
        let g = RectGeometry::from_node(&n, &params()).unwrap();
        assert_eq!((g.rx, g.ry), (0.0, 0.0));
    }

    #[test]
    fn rounded_rect_has_four_arcs() {
        let n = node("rect", &[("width", "10"), ("height", "10"), ("rx", "2")]);
        let s = shape(&n).unwrap().unwrap();

        let arcs = s
            .path
            .iter()
            .filter(|c| matches!(c, PathCommand::Arc(_)))
            .count();
        assert_eq!(arcs, 4);
    }

    #[test]
    fn empty_rect_has_no_path() {
        let n = node("rect", &[("width", "0"), ("height", "10")]);
        assert!(shape(&n).unwrap().unwrap().path.is_empty());
    }

    #[test]
    fn circle_is_two_arcs() {
        let n = node("circle", &[("cx", "5"), ("cy", "5"), ("r", "5")]);
        let s = shape(&n).unwrap().unwrap();

        assert_eq!(s.path.len(), 4);
        assert_eq!(s.path.end_point(), Some((10.0, 5.0)));
    }

    #[test]
    fn polygon_closes_and_polyline_does_not() {
        let poly = node("polyline", &[("points", "0,0 10,0 10,10")]);
        let s = shape(&poly).unwrap().unwrap();
        assert_eq!(s.markers, Markers::Yes);
        assert_eq!(s.path.len(), 3);

        let poly = node("polygon", &[("points", "0,0 10,0 10,10")]);
        let s = shape(&poly).unwrap().unwrap();
        assert_eq!(s.path.len(), 4);
        assert_eq!(s.path.end_point(), Some((0.0, 0.0)));
    }

    #[test]
    fn odd_points_skip_the_shape() {
        let poly = node("polyline", &[("points", "0,0 10")]);
        assert!(matches!(shape(&poly), Err(InternalRenderingError::Attribute(_))));
    }

    #[test]
    fn unknown_path_command_is_fatal() {
        let p = node("path", &[("d", "M0 0 L10 10 X 5 5")]);
        assert!(matches!(
            shape(&p),
            Err(InternalRenderingError::Fatal(RenderingError::InvalidPath(_)))
        ));
    }

    #[test]
    fn bad_path_keeps_valid_prefix() {
        let p = node("path", &[("d", "M0 0 L10 10 L20")]);
        let s = shape(&p).unwrap().unwrap();
        assert_eq!(s.path.len(), 2);
    }

    #[test]
    fn non_shapes_have_no_geometry() {
        let g = node("g", &[]);
        assert!(shape(&g).unwrap().is_none());
    }
}
