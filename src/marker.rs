//! The `marker` element, and geometry computations for markers.

use cssparser::Parser;

use crate::angle::Angle;
use crate::aspect_ratio::AspectRatio;
use crate::document::AcquiredNodes;
use crate::drawing_ctx::{self, DrawingCtx};
use crate::error::*;
use crate::length::*;
use crate::node::{Node, NodeExt};
use crate::parse_identifiers;
use crate::parsers::Parse;
use crate::path_builder::{Path, PathCommand};
use crate::rect::Rect;
use crate::svg_log;
use crate::transform::Transform;
use crate::url_resolver::local_id;
use crate::viewbox::ViewBox;

// markerUnits attribute: https://www.w3.org/TR/SVG/painting.html#MarkerElement
#[derive(Debug, Default, Copy, Clone, PartialEq)]
enum MarkerUnits {
    UserSpaceOnUse,
    #[default]
    StrokeWidth,
}

impl Parse for MarkerUnits {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<MarkerUnits, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "userSpaceOnUse" => MarkerUnits::UserSpaceOnUse,
            "strokeWidth" => MarkerUnits::StrokeWidth,
        )?)
    }
}

// orient attribute: https://www.w3.org/TR/SVG/painting.html#MarkerElement
#[derive(Debug, Copy, Clone, PartialEq)]
enum MarkerOrient {
    Auto,
    AutoStartReverse,
    Angle(Angle),
}

impl Default for MarkerOrient {
    fn default() -> MarkerOrient {
        MarkerOrient::Angle(Angle::new(0.0))
    }
}

impl Parse for MarkerOrient {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<MarkerOrient, ParseError<'i>> {
        if parser
            .try_parse(|p| p.expect_ident_matching("auto"))
            .is_ok()
        {
            return Ok(MarkerOrient::Auto);
        }

        if parser
            .try_parse(|p| p.expect_ident_matching("auto-start-reverse"))
            .is_ok()
        {
            return Ok(MarkerOrient::AutoStartReverse);
        }

        Angle::parse(parser).map(MarkerOrient::Angle)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MarkerType {
    Start,
    Middle,
    End,
}

/// Calls `emit_fn` for each vertex of a path, with the direction the marker at that
/// vertex should be oriented to.
///
/// Every command contributes one vertex at its end point.  The first vertex gets a
/// start marker, the last one an end marker, and all the others get mid markers.  At
/// interior vertices the angle bisects the incoming and the outgoing directions; a
/// close-path vertex continues into the first segment of its subpath.
pub fn emit_markers<E, F>(path: &Path, emit_fn: &mut F) -> Result<(), E>
where
    F: FnMut(MarkerType, f64, f64, Angle) -> Result<(), E>,
{
    let commands: Vec<&PathCommand> = path.iter().collect();
    let points = path.points();
    let tangents = path.tangents();

    // Index of the move-to that starts the subpath of each command.
    let mut subpath_starts = Vec::with_capacity(commands.len());
    let mut start = 0;
    for (i, cmd) in commands.iter().enumerate() {
        if let PathCommand::MoveTo(..) = cmd {
            start = i;
        }
        subpath_starts.push(start);
    }

    let line = |from: (f64, f64), to: (f64, f64)| -> Option<Angle> {
        if from == to {
            None
        } else {
            Some(Angle::from_vector(to.0 - from.0, to.1 - from.1))
        }
    };

    // Direction of the first drawn segment of the subpath starting at `start`.
    let first_segment = |start: usize| -> Option<Angle> {
        match commands.get(start + 1) {
            Some(PathCommand::MoveTo(..)) | Some(PathCommand::ClosePath) | None => None,
            Some(_) => Some(tangents[start + 1].start),
        }
    };

    let incoming = |i: usize| -> Option<Angle> {
        match commands[i] {
            PathCommand::MoveTo(..) => None,

            PathCommand::ClosePath if i > 0 => {
                line(points[i - 1], points[i]).or_else(|| match commands[i - 1] {
                    PathCommand::MoveTo(..) | PathCommand::ClosePath => None,
                    _ => Some(tangents[i - 1].end),
                })
            }

            PathCommand::ClosePath => None,

            _ => Some(tangents[i].end),
        }
    };

    let outgoing = |i: usize| -> Option<Angle> {
        if let PathCommand::ClosePath = commands[i] {
            return first_segment(subpath_starts[i]);
        }

        match commands.get(i + 1) {
            None | Some(PathCommand::MoveTo(..)) => None,

            Some(PathCommand::ClosePath) => line(points[i], points[subpath_starts[i + 1]])
                .or_else(|| first_segment(subpath_starts[i + 1])),

            Some(_) => Some(tangents[i + 1].start),
        }
    };

    let last = commands.len().saturating_sub(1);

    for (i, &(x, y)) in points.iter().enumerate() {
        let marker_type = if i == 0 {
            MarkerType::Start
        } else if i == last {
            MarkerType::End
        } else {
            MarkerType::Middle
        };

        let angle = match (incoming(i), outgoing(i)) {
            (Some(a), Some(b)) => a.bisect(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => Angle::new(0.0),
        };

        emit_fn(marker_type, x, y, angle)?;
    }

    Ok(())
}

/// Draws the markers referenced by a shape along its path.
pub fn render_markers_for_shape(
    draw_ctx: &mut DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    node: &Node,
    path: &Path,
) -> Result<(), InternalRenderingError> {
    let line_width = drawing_ctx::stroke_width(node, &draw_ctx.view_params())?;

    if line_width == 0.0 {
        return Ok(());
    }

    // The specific properties take precedence over the `marker` shorthand.
    let shorthand = node.attr("marker");
    let marker_id = |key: &str| -> Option<String> {
        node.attr(key)
            .or_else(|| shorthand.clone())
            .and_then(|v| local_id(&v).map(String::from))
    };

    let start = marker_id("marker-start");
    let mid = marker_id("marker-mid");
    let end = marker_id("marker-end");

    if start.is_none() && mid.is_none() && end.is_none() {
        return Ok(());
    }

    emit_markers(path, &mut |marker_type, x, y, angle| {
        let id = match marker_type {
            MarkerType::Start => &start,
            MarkerType::Middle => &mid,
            MarkerType::End => &end,
        };

        match id {
            Some(id) => render_marker(
                draw_ctx,
                acquired_nodes,
                id,
                marker_type,
                (x, y),
                angle,
                line_width,
            ),
            None => Ok(()),
        }
    })
}

fn render_marker(
    draw_ctx: &mut DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    marker_id: &str,
    marker_type: MarkerType,
    (xpos, ypos): (f64, f64),
    computed_angle: Angle,
    line_width: f64,
) -> Result<(), InternalRenderingError> {
    let acquired = match acquired_nodes.acquire_id(marker_id) {
        Ok(acquired) => acquired,

        Err(AcquireError::MaxReferencesExceeded) => {
            return Err(AcquireError::MaxReferencesExceeded.into())
        }

        Err(e) => {
            svg_log!(draw_ctx.session(), "marker \"{}\" not found: {}", marker_id, e);
            return Ok(());
        }
    };

    let node = acquired.get().clone();

    if !node.has_tag("marker") {
        svg_log!(draw_ctx.session(), "element {} is not a marker", node.data());
        return Ok(());
    }

    let units = node.parse_attr_or("markerUnits", MarkerUnits::default())?;
    let ref_x: Length<Horizontal> = node.parse_attr_or("refX", Default::default())?;
    let ref_y: Length<Vertical> = node.parse_attr_or("refY", Default::default())?;
    let orient = node.parse_attr_or("orient", MarkerOrient::default())?;
    let aspect = node.parse_attr_or("preserveAspectRatio", AspectRatio::default())?;
    let vbox = node.parse_attr::<ViewBox>("viewBox")?;

    let params = draw_ctx.view_params();

    // both default to 3
    let marker_width = node
        .parse_attr_or("markerWidth", ULength::<Horizontal>::new(3.0, LengthUnit::Px))?
        .to_user(&params);
    let marker_height = node
        .parse_attr_or("markerHeight", ULength::<Vertical>::new(3.0, LengthUnit::Px))?
        .to_user(&params);

    if marker_width == 0.0 || marker_height == 0.0 {
        // markerWidth or markerHeight set to 0 disables rendering of the element
        return Ok(());
    }

    let overflow_visible = matches!(node.attr("overflow").as_deref(), Some("visible" | "auto"));

    draw_ctx.with_saved_state(|dc| {
        let rotation = match orient {
            MarkerOrient::Auto => computed_angle,
            MarkerOrient::AutoStartReverse if marker_type == MarkerType::Start => {
                computed_angle.flip()
            }
            MarkerOrient::AutoStartReverse => computed_angle,
            MarkerOrient::Angle(a) => a,
        };

        let mut transform = Transform::new_translate(xpos, ypos).pre_rotate(rotation);

        if units == MarkerUnits::StrokeWidth {
            transform = transform.pre_scale(line_width, line_width);
        }

        let (view_width, view_height) = match vbox {
            Some(vbox) => {
                if vbox.is_empty() {
                    return Ok(());
                }

                let r = aspect.compute(&vbox, &Rect::from_size(marker_width, marker_height));

                let (vb_width, vb_height) = vbox.size();
                transform = transform.pre_scale(r.width() / vb_width, r.height() / vb_height);

                (vb_width, vb_height)
            }

            None => (marker_width, marker_height),
        };

        dc.surface().transform(&transform);

        dc.with_view_box(view_width, view_height, |dc| {
            let params = dc.view_params();

            dc.surface().transform(&Transform::new_translate(
                -ref_x.to_user(&params),
                -ref_y.to_user(&params),
            ));

            if !overflow_visible {
                let clip_rect =
                    vbox.map_or_else(|| Rect::from_size(marker_width, marker_height), |vb| *vb);

                dc.clip_rect(&clip_rect);
            }

            dc.draw_children(acquired_nodes, &node)?;

            Ok(())
        })
    })
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn parsing_invalid_marker_units_yields_error() {
        assert!(MarkerUnits::parse_str("").is_err());
        assert!(MarkerUnits::parse_str("foo").is_err());
    }

    #[test]
    fn parses_marker_units() {
        assert_eq!(
            MarkerUnits::parse_str("userSpaceOnUse").unwrap(),
            MarkerUnits::UserSpaceOnUse
        );
        assert_eq!(
            MarkerUnits::parse_str("strokeWidth").unwrap(),
            MarkerUnits::StrokeWidth
        );
    }

    #[test]
    fn parsing_invalid_marker_orient_yields_error() {
        assert!(MarkerOrient::parse_str("").is_err());
        assert!(MarkerOrient::parse_str("blah").is_err());
        assert!(MarkerOrient::parse_str("45blah").is_err());
    }

    #[test]
    fn parses_marker_orient() {
        assert_eq!(MarkerOrient::parse_str("auto").unwrap(), MarkerOrient::Auto);
        assert_eq!(
            MarkerOrient::parse_str("auto-start-reverse").unwrap(),
            MarkerOrient::AutoStartReverse
        );

        assert_eq!(
            MarkerOrient::parse_str("0").unwrap(),
            MarkerOrient::Angle(Angle::new(0.0))
        );
        assert_eq!(
            MarkerOrient::parse_str("180").unwrap(),
            MarkerOrient::Angle(Angle::from_degrees(180.0))
        );
        assert_eq!(
            MarkerOrient::parse_str("180deg").unwrap(),
            MarkerOrient::Angle(Angle::from_degrees(180.0))
        );
        assert_eq!(
            MarkerOrient::parse_str("1rad").unwrap(),
            MarkerOrient::Angle(Angle::new(1.0))
        );
    }
}
