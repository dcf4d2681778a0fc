//! Bounding boxes of shapes, groups and references.
//!
//! These are the geometric extents used for `objectBoundingBox` units: they do not
//! include the stroke, and curves are bounded by their control points.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::document::AcquiredNodes;
use crate::element::ElementKind;
use crate::error::ElementError;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::number_list::Points;
use crate::path_builder::{Path, PathBuilder, PathCommand, Sweep};
use crate::rect::Rect;
use crate::shapes::RectGeometry;
use crate::svg_log;
use crate::transform::Transform;

/// A bounding box that knows its coordinate space.
#[derive(Debug, Default, Copy, Clone)]
pub struct BoundingBox {
    transform: Transform,
    pub rect: Option<Rect>,
}

impl BoundingBox {
    pub fn new() -> BoundingBox {
        Default::default()
    }

    pub fn with_transform(self, transform: Transform) -> BoundingBox {
        BoundingBox { transform, ..self }
    }

    pub fn with_rect(self, rect: Rect) -> BoundingBox {
        BoundingBox {
            rect: Some(rect),
            ..self
        }
    }

    /// Adds `src`, converted to this box's coordinate space.
    pub fn insert(&mut self, src: &BoundingBox) {
        let Some(r2) = src.rect else {
            return;
        };

        // A non-invertible transform collapses everything; there is nothing to add.
        let Some(inverse) = self.transform.invert() else {
            return;
        };

        let transform = inverse.pre_transform(&src.transform);
        let r2 = transform.transform_rect(&r2);

        self.rect = Some(match self.rect {
            Some(r1) => r1.union(&r2),
            None => r2,
        });
    }

    /// Extends the box to include a point.
    pub fn extend(&mut self, x: f64, y: f64) {
        self.rect = Some(match self.rect {
            Some(r) => Rect::new(r.x0.min(x), r.y0.min(y), r.x1.max(x), r.y1.max(y)),
            None => Rect::new(x, y, x, y),
        });
    }

    /// The box, if it has an area; boxes of lines and points are useless as units.
    pub fn non_empty(&self) -> Option<Rect> {
        self.rect
            .filter(|r| r.x0 != r.x1 && r.y0 != r.y1 && r.width().is_finite() && r.height().is_finite())
    }
}

/// Angle between the vector (1, 0) and `(bx, by)`, in `[0, 2π)`.
fn angle(bx: f64, by: f64) -> f64 {
    let sign = if by > 0.0 { 1.0 } else { -1.0 };
    (2.0 * PI + sign * (bx / (bx * bx + by * by).sqrt()).acos()) % (2.0 * PI)
}

fn line_box(x1: f64, y1: f64, x: f64, y: f64) -> Rect {
    Rect::new(x.min(x1), y.min(y1), x.max(x1), y.max(y1))
}

/// Bounding box of an elliptical arc from `(x1, y1)` to `(x, y)`.
///
/// `phi` is the x-axis rotation in radians.  The arc is first converted to center
/// parameterization; then the extremes of the full ellipse along each axis are kept only
/// when the arc actually passes through them, and otherwise replaced by the endpoints.
/// Zero radii make the arc a straight line.
///
/// Algorithm from <http://fridrich.blogspot.nl/2011/06/bounding-box-of-svg-elliptical-arc.html>
#[allow(clippy::too_many_arguments, clippy::many_single_char_names)]
pub fn elliptical_arc(
    x1: f64,
    y1: f64,
    rx: f64,
    ry: f64,
    phi: f64,
    large: bool,
    sweep: bool,
    x: f64,
    y: f64,
) -> Rect {
    let (mut rx, mut ry) = (rx.abs(), ry.abs());

    if rx == 0.0 || ry == 0.0 {
        return line_box(x1, y1, x, y);
    }

    let (sin_phi, cos_phi) = phi.sin_cos();

    let x1prime = cos_phi * (x1 - x) / 2.0 + sin_phi * (y1 - y) / 2.0;
    let y1prime = -sin_phi * (x1 - x) / 2.0 + cos_phi * (y1 - y) / 2.0;

    let mut radicant = rx * rx * ry * ry - rx * rx * y1prime * y1prime - ry * ry * x1prime * x1prime;
    radicant /= rx * rx * y1prime * y1prime + ry * ry * x1prime * x1prime;

    let (mut cxprime, mut cyprime) = (0.0, 0.0);

    if radicant.is_nan() {
        // Both endpoints coincide.
        return line_box(x1, y1, x, y);
    }

    if radicant < 0.0 {
        // The radii are too small; scale them up until the ellipse fits.
        let ratio = rx / ry;
        let radicant = y1prime * y1prime + x1prime * x1prime / (ratio * ratio);
        if radicant < 0.0 {
            return line_box(x1, y1, x, y);
        }
        ry = radicant.sqrt();
        rx = ratio * ry;
    } else {
        let factor = if large == sweep { -1.0 } else { 1.0 } * radicant.sqrt();

        cxprime = factor * rx * y1prime / ry;
        cyprime = -factor * ry * x1prime / rx;
    }

    let cx = cxprime * cos_phi - cyprime * sin_phi + (x1 + x) / 2.0;
    let cy = cxprime * sin_phi + cyprime * cos_phi + (y1 + y) / 2.0;

    let (mut minx, mut maxx, mut miny, mut maxy);
    let (tminx, tmaxx, tminy, tmaxy);

    if phi == 0.0 || phi == PI {
        minx = cx - rx;
        tminx = angle(-rx, 0.0);
        maxx = cx + rx;
        tmaxx = angle(rx, 0.0);
        miny = cy - ry;
        tminy = angle(0.0, -ry);
        maxy = cy + ry;
        tmaxy = angle(0.0, ry);
    } else if phi == FRAC_PI_2 || phi == 3.0 * FRAC_PI_2 {
        minx = cx - ry;
        tminx = angle(-ry, 0.0);
        maxx = cx + ry;
        tmaxx = angle(ry, 0.0);
        miny = cy - rx;
        tminy = angle(0.0, -rx);
        maxy = cy + rx;
        tmaxy = angle(0.0, rx);
    } else {
        let tan_phi = phi.tan();

        let mut t0 = -(ry * tan_phi / rx).atan();
        let mut t1 = PI - (ry * tan_phi / rx).atan();
        minx = cx + rx * t0.cos() * cos_phi - ry * t0.sin() * sin_phi;
        maxx = cx + rx * t1.cos() * cos_phi - ry * t1.sin() * sin_phi;
        if minx > maxx {
            std::mem::swap(&mut minx, &mut maxx);
            std::mem::swap(&mut t0, &mut t1);
        }
        let tmp_y = cy + rx * t0.cos() * sin_phi + ry * t0.sin() * cos_phi;
        tminx = angle(minx - cx, tmp_y - cy);
        let tmp_y = cy + rx * t1.cos() * sin_phi + ry * t1.sin() * cos_phi;
        tmaxx = angle(maxx - cx, tmp_y - cy);

        let mut t0 = (ry / (tan_phi * rx)).atan();
        let mut t1 = (ry / (tan_phi * rx)).atan() + PI;
        miny = cy + rx * t0.cos() * sin_phi + ry * t0.sin() * cos_phi;
        maxy = cy + rx * t1.cos() * sin_phi + ry * t1.sin() * cos_phi;
        if miny > maxy {
            std::mem::swap(&mut miny, &mut maxy);
            std::mem::swap(&mut t0, &mut t1);
        }
        let tmp_x = cx + rx * t0.cos() * cos_phi - ry * t0.sin() * sin_phi;
        tminy = angle(tmp_x - cx, miny - cy);
        let tmp_x = cx + rx * t1.cos() * cos_phi - ry * t1.sin() * sin_phi;
        tmaxy = angle(tmp_x - cx, maxy - cy);
    }

    let mut angle1 = angle(x1 - cx, y1 - cy);
    let mut angle2 = angle(x - cx, y - cy);

    if !sweep {
        std::mem::swap(&mut angle1, &mut angle2);
    }

    let mut other_arc = false;
    if angle1 > angle2 {
        std::mem::swap(&mut angle1, &mut angle2);
        other_arc = true;
    }

    // Whether the arc misses the extreme point at angle `t`.
    let misses = |t: f64| {
        let outside = angle1 > t || angle2 < t;
        outside != other_arc
    };

    if misses(tminx) {
        minx = x.min(x1);
    }
    if misses(tmaxx) {
        maxx = x.max(x1);
    }
    if misses(tminy) {
        miny = y.min(y1);
    }
    if misses(tmaxy) {
        maxy = y.max(y1);
    }

    Rect::new(minx, miny, maxx, maxy)
}

/// Extents of a path.
pub fn path_bbox(path: &Path) -> BoundingBox {
    let mut bbox = BoundingBox::new();

    for cmd in path.iter() {
        match *cmd {
            PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => bbox.extend(x, y),

            PathCommand::CurveTo(ref c) => {
                bbox.extend(c.pt1.0, c.pt1.1);
                bbox.extend(c.pt2.0, c.pt2.1);
                bbox.extend(c.to.0, c.to.1);
            }

            PathCommand::Arc(ref a) => {
                let r = elliptical_arc(
                    a.from.0,
                    a.from.1,
                    a.r.0,
                    a.r.1,
                    a.x_axis_rotation.to_radians(),
                    a.large_arc.0,
                    a.sweep == Sweep::Positive,
                    a.to.0,
                    a.to.1,
                );
                bbox.extend(r.x0, r.y0);
                bbox.extend(r.x1, r.y1);
            }

            PathCommand::ClosePath => (),
        }
    }

    bbox
}

fn length<N: Normalize>(node: &Node, key: &str, params: &NormalizeParams) -> Result<f64, ElementError> {
    Ok(node
        .parse_attr::<Length<N>>(key)?
        .map(|l| l.to_user(params))
        .unwrap_or(0.0))
}

fn shape_bbox(node: &Node, kind: ElementKind, params: &NormalizeParams) -> Result<BoundingBox, ElementError> {
    let mut bbox = BoundingBox::new();

    match kind {
        ElementKind::Rect => {
            let r = RectGeometry::from_node(node, params)?;
            bbox.extend(r.x, r.y);
            bbox.extend(r.x + r.width, r.y + r.height);
        }

        ElementKind::Circle => {
            let cx = length::<Horizontal>(node, "cx", params)?;
            let cy = length::<Vertical>(node, "cy", params)?;
            let r = length::<Both>(node, "r", params)?.max(0.0);
            bbox.extend(cx - r, cy - r);
            bbox.extend(cx + r, cy + r);
        }

        ElementKind::Ellipse => {
            let cx = length::<Horizontal>(node, "cx", params)?;
            let cy = length::<Vertical>(node, "cy", params)?;
            let rx = length::<Horizontal>(node, "rx", params)?.max(0.0);
            let ry = length::<Vertical>(node, "ry", params)?.max(0.0);
            bbox.extend(cx - rx, cy - ry);
            bbox.extend(cx + rx, cy + ry);
        }

        ElementKind::Line => {
            bbox.extend(
                length::<Horizontal>(node, "x1", params)?,
                length::<Vertical>(node, "y1", params)?,
            );
            bbox.extend(
                length::<Horizontal>(node, "x2", params)?,
                length::<Vertical>(node, "y2", params)?,
            );
        }

        ElementKind::Polyline | ElementKind::Polygon => {
            let points = node.parse_attr_or("points", Points::default())?;
            for (x, y) in points.0 {
                bbox.extend(x, y);
            }
        }

        ElementKind::Path => {
            let mut builder = PathBuilder::default();
            // The valid prefix of a bad path still has extents.
            let _ = builder.parse(&node.attr("d").unwrap_or_default());
            bbox = path_bbox(&builder.into_path());
        }

        _ => (),
    }

    Ok(bbox)
}

/// Bounding box of a node in its own user space, or `None` if it has no extents.
///
/// Groups combine their children, including their `transform` attributes, and `use`
/// elements measure the element they reference.  Text has no geometric extents here.
pub fn node_bbox(
    node: &Node,
    acquired_nodes: &mut AcquiredNodes<'_>,
    params: &NormalizeParams,
) -> Option<Rect> {
    compute(node, acquired_nodes, params).non_empty()
}

fn compute(node: &Node, acquired_nodes: &mut AcquiredNodes<'_>, params: &NormalizeParams) -> BoundingBox {
    let kind = ElementKind::from_tag(&node.tag());

    match kind {
        ElementKind::G | ElementKind::A | ElementKind::Switch | ElementKind::Svg => {
            let mut bbox = BoundingBox::new();
            for child in node.children() {
                let transform = child
                    .parse_attr_or("transform", Transform::identity())
                    .unwrap_or_default();
                let child_bbox = compute(&child, acquired_nodes, params).with_transform(transform);
                bbox.insert(&child_bbox);
            }
            bbox
        }

        ElementKind::Use => {
            let href = node
                .attr("xlink:href")
                .or_else(|| node.attr("href"))
                .unwrap_or_default();

            match acquired_nodes.acquire_href(&href, node) {
                Ok(acquired) => {
                    let referenced = acquired.get().clone();
                    let x = length::<Horizontal>(node, "x", params).unwrap_or(0.0);
                    let y = length::<Vertical>(node, "y", params).unwrap_or(0.0);

                    let mut bbox = BoundingBox::new();
                    bbox.insert(
                        &compute(&referenced, acquired_nodes, params)
                            .with_transform(Transform::new_translate(x, y)),
                    );
                    bbox
                }

                Err(e) => {
                    svg_log!(
                        acquired_nodes.document().session(),
                        "cannot measure {}: {}",
                        href,
                        e
                    );
                    BoundingBox::new()
                }
            }
        }

        kind if kind.is_shape() => shape_bbox(node, kind, params).unwrap_or_else(|e| {
            svg_log!(
                acquired_nodes.document().session(),
                "cannot measure element {}: {}",
                node.id(),
                e
            );
            BoundingBox::new()
        }),

        _ => BoundingBox::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn assert_rect(r: Rect, x0: f64, y0: f64, x1: f64, y1: f64) {
        assert!(approx_eq!(f64, r.x0, x0, epsilon = 1e-9), "x0 {} != {}", r.x0, x0);
        assert!(approx_eq!(f64, r.y0, y0, epsilon = 1e-9), "y0 {} != {}", r.y0, y0);
        assert!(approx_eq!(f64, r.x1, x1, epsilon = 1e-9), "x1 {} != {}", r.x1, x1);
        assert!(approx_eq!(f64, r.y1, y1, epsilon = 1e-9), "y1 {} != {}", r.y1, y1);
    }

    #[test]
    fn degenerate_arcs_are_lines() {
        let r = elliptical_arc(10.0, 20.0, 0.0, 5.0, 0.0, false, true, 0.0, 30.0);
        assert_rect(r, 0.0, 20.0, 10.0, 30.0);

        let r = elliptical_arc(10.0, 20.0, 5.0, 0.0, 0.3, true, false, 0.0, 30.0);
        assert_rect(r, 0.0, 20.0, 10.0, 30.0);
    }

    #[test]
    fn half_circle_arcs() {
        // Upper half of the unit circle, going clockwise in y-down space.
        let r = elliptical_arc(-1.0, 0.0, 1.0, 1.0, 0.0, false, true, 1.0, 0.0);
        assert_rect(r, -1.0, -1.0, 1.0, 0.0);

        // Lower half.
        let r = elliptical_arc(-1.0, 0.0, 1.0, 1.0, 0.0, false, false, 1.0, 0.0);
        assert_rect(r, -1.0, 0.0, 1.0, 1.0);
    }

    #[test]
    fn small_radii_are_scaled_up() {
        let r = elliptical_arc(-2.0, 0.0, 1.0, 1.0, 0.0, false, true, 2.0, 0.0);
        assert!(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite());
        assert_rect(r, -2.0, -2.0, 2.0, 0.0);
    }

    #[test]
    fn insert_converts_spaces() {
        let mut bbox = BoundingBox::new().with_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        let other = BoundingBox::new()
            .with_transform(Transform::new_translate(10.0, 0.0))
            .with_rect(Rect::new(0.0, 0.0, 2.0, 2.0));

        bbox.insert(&other);
        assert_eq!(bbox.rect, Some(Rect::new(0.0, 0.0, 12.0, 2.0)));
    }

    #[test]
    fn lines_are_empty_boxes() {
        let mut bbox = BoundingBox::new();
        bbox.extend(0.0, 0.0);
        bbox.extend(10.0, 0.0);
        assert!(bbox.non_empty().is_none());
    }
}
