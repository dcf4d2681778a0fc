//! Text elements: `text`, `tspan`, `tref` and `textPath`.
//!
//! Text is handled in two stages.  While the tree is built, [`text_children`] turns the
//! character data of a text element into nodes: the element keeps the text that comes
//! before its first child, and text after a child element becomes an anonymous `tspan`.
//! White space is normalized across the whole run, and the per-character `rotate` values
//! of the text element are distributed among the spans.
//!
//! While rendering, each span lays out its own characters with [`draw_text_span`],
//! starting from the [`TextCursor`] that the previous span left behind.

use std::collections::VecDeque;
use std::rc::Rc;

use itertools::Itertools;

use crate::angle::Angle;
use crate::document::{generate_id, inherit_attributes, AcquiredNodes, LoadedDocument, Loader};
use crate::drawing_ctx::DrawingCtx;
use crate::element::ElementKind;
use crate::error::*;
use crate::length::*;
use crate::node::{Node, NodeData, NodeExt};
use crate::number_list::List;
use crate::path_builder::{ArcParameterization, Path, PathCommand};
use crate::shapes;
use crate::surface::FontSpec;
use crate::svg_log;
use crate::transform::Transform;
use crate::url_resolver::local_id;
use crate::xml::{XmlNode, XmlNodeExt};

/// Number of straight segments used to flatten each curve of a text path.
const CURVE_SEGMENTS: usize = 16;

/// Normalizes white space as for `xml:space`.
///
/// With `preserve`, newlines and tabs become spaces.  Otherwise newlines are removed,
/// tabs become spaces and runs of spaces are collapsed into one.
fn handle_white_space(s: &str, preserve: bool) -> String {
    if preserve {
        return s
            .chars()
            .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
            .collect();
    }

    let mut result = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\n' | '\r' => (),
            ' ' | '\t' => {
                if !result.ends_with(' ') {
                    result.push(' ');
                }
            }
            c => result.push(c),
        }
    }

    result
}

fn is_preserve(node: &Node) -> bool {
    node.attr("xml:space").as_deref() == Some("preserve")
}

/// The `rotate` values of a text element, handed out one per character.
///
/// Once the list runs out, every character gets the last value.
struct Rotations {
    values: VecDeque<f64>,
    last: f64,
}

impl Rotations {
    /// Reads the `rotate` attribute; `None` if it is absent, empty or invalid.
    fn from_node(node: &Node, loader: &Loader) -> Option<Rotations> {
        let List(values) = match node.parse_attr::<List<f64>>("rotate") {
            Ok(Some(list)) => list,
            Ok(None) => return None,
            Err(e) => {
                svg_log!(loader.session(), "ignoring rotation of {}: {}", node.data(), e);
                return None;
            }
        };

        let last = *values.last()?;

        Some(Rotations {
            values: values.into(),
            last,
        })
    }

    /// Gives the node one rotation per character of its text.
    fn assign(&mut self, node: &Node) {
        let count = node.data().text.chars().count();

        let values = (0..count)
            .map(|_| self.values.pop_front().unwrap_or(self.last))
            .map(|v| v.to_string())
            .join(" ");

        node.borrow_mut().set("rotate", &values);
    }
}

/// Builds the children of a text element, and sets its own text.
///
/// `trailing_space` tells whether the text laid out before this element ends with a
/// space, so that a leading space here is dropped.  Returns the children, which are
/// not yet appended to `node`, and whether the text up to the end of this element
/// ends with a space.
pub fn text_children(
    loader: &Loader,
    node: &Node,
    xml_node: &XmlNode,
    doc: &Rc<LoadedDocument>,
    trailing_space: bool,
    text_root: bool,
) -> Result<(Vec<Node>, bool), LoadingError> {
    let preserve = is_preserve(node);
    let mut trailing_space = trailing_space;

    let mut text = handle_white_space(&xml_node.leading_text().unwrap_or_default(), preserve);
    if trailing_space && !preserve {
        text = text.trim_start_matches(' ').to_string();
    }
    node.borrow_mut().text = text;

    let mut rotations = Rotations::from_node(node, loader);
    if let Some(ref mut r) = rotations {
        r.assign(node);
    }

    if let Some(last) = node.data().text.chars().last() {
        trailing_space = last == ' ';
    }

    let mut children = Vec::new();

    for child_xml in xml_node.child_elements() {
        if !loader.passes_conditions(&child_xml) {
            continue;
        }

        let child = Node::new(loader.styled_data(&child_xml, doc, Some(node)));

        if child_xml.is_svg_element("tref") {
            trailing_space = build_tref(loader, &child, &child_xml, trailing_space)?;
        } else {
            let (grandchildren, t) =
                text_children(loader, &child, &child_xml, doc, trailing_space, false)?;

            for grandchild in grandchildren {
                child.append(grandchild);
            }

            trailing_space = t;
        }

        if let Some(ref mut r) = rotations {
            if !child_xml.element().is_some_and(|e| e.attributes.get("rotate").is_some()) {
                r.assign(&child);
            }
        }

        children.push(child);

        if let Some(tail) = child_xml.tail_text() {
            let mut data = NodeData::new("tspan", None, node.data().url.clone());
            inherit_attributes(&mut data, node);
            data.set("id", &generate_id());

            let mut text = handle_white_space(&tail, preserve);
            if trailing_space && !preserve {
                text = text.trim_start_matches(' ').to_string();
            }

            if let Some(last) = text.chars().last() {
                trailing_space = last == ' ';
            }

            data.text = text;
            let anonymous = Node::new(data);

            if let Some(ref mut r) = rotations {
                r.assign(&anonymous);
            }

            children.push(anonymous);
        }
    }

    if text_root && children.is_empty() && !preserve {
        let trimmed = node.data().text.trim_end_matches(' ').to_string();
        node.borrow_mut().text = trimmed;
    }

    Ok((children, trailing_space))
}

/// Turns a `tref` into a `tspan` with the text of the element it references.
///
/// The referenced text is flattened: its own structure is lost.
fn build_tref(
    loader: &Loader,
    node: &Node,
    xml_node: &XmlNode,
    trailing_space: bool,
) -> Result<bool, LoadingError> {
    node.borrow_mut().set_tag("tspan");

    let href = xml_node
        .attribute("xlink:href")
        .or_else(|| xml_node.attribute("href"));

    let flattened = match href {
        Some(href) => {
            let base_url = node.data().url.clone();
            let parsed = loader.resolve_href(&href, base_url.as_ref())?;
            loader.fetch_tree(&parsed)?.element.flattened_text()
        }

        None => {
            svg_log!(loader.session(), "tref without a reference: {}", node.data());
            String::new()
        }
    };

    let preserve = is_preserve(node);

    let mut text = handle_white_space(&flattened, preserve);
    if trailing_space && !preserve {
        text = text.trim_start_matches(' ').to_string();
    }

    let trailing_space = match text.chars().last() {
        Some(last) => last == ' ',
        None => trailing_space,
    };

    node.borrow_mut().text = text;

    Ok(trailing_space)
}

/// Layout state shared by the spans of one text element.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TextCursor {
    /// Where the next character goes, before relative offsets.
    pub position: (f64, f64),

    /// Accumulated `dx` and `dy` offsets.
    pub d_position: (f64, f64),

    /// Distance along the text path of the next character.
    pub path_offset: f64,
}

/// A path flattened into straight segments, for laying out text along it.
struct Polyline {
    subpaths: Vec<Vec<(f64, f64)>>,
}

impl Polyline {
    fn new(path: &Path) -> Polyline {
        let mut subpaths: Vec<Vec<(f64, f64)>> = Vec::new();
        let mut current = (0.0, 0.0);
        let mut subpath_start = (0.0, 0.0);

        for cmd in path.iter() {
            if subpaths.is_empty() && !matches!(*cmd, PathCommand::MoveTo(..)) {
                subpaths.push(vec![current]);
            }

            match *cmd {
                PathCommand::MoveTo(x, y) => {
                    current = (x, y);
                    subpath_start = current;
                    subpaths.push(vec![current]);
                }

                PathCommand::LineTo(x, y) => {
                    current = (x, y);
                    push_point(&mut subpaths, current);
                }

                PathCommand::CurveTo(ref c) => {
                    let p0 = current;
                    for i in 1..=CURVE_SEGMENTS {
                        let t = i as f64 / CURVE_SEGMENTS as f64;
                        let u = 1.0 - t;
                        let bezier = |a: f64, b: f64, c2: f64, d: f64| {
                            u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c2 + t * t * t * d
                        };
                        push_point(
                            &mut subpaths,
                            (
                                bezier(p0.0, c.pt1.0, c.pt2.0, c.to.0),
                                bezier(p0.1, c.pt1.1, c.pt2.1, c.to.1),
                            ),
                        );
                    }
                    current = c.to;
                }

                PathCommand::Arc(ref a) => {
                    match a.center_parameterization() {
                        ArcParameterization::CenterParameters {
                            center,
                            radii,
                            theta1,
                            delta_theta,
                        } => {
                            let (sin_phi, cos_phi) = a.x_axis_rotation.to_radians().sin_cos();
                            for i in 1..=CURVE_SEGMENTS {
                                let theta =
                                    theta1 + delta_theta * i as f64 / CURVE_SEGMENTS as f64;
                                let (x, y) = (radii.0 * theta.cos(), radii.1 * theta.sin());
                                push_point(
                                    &mut subpaths,
                                    (
                                        center.0 + cos_phi * x - sin_phi * y,
                                        center.1 + sin_phi * x + cos_phi * y,
                                    ),
                                );
                            }
                        }
                        ArcParameterization::LineTo => push_point(&mut subpaths, a.to),
                        ArcParameterization::Omit => (),
                    }
                    current = a.to;
                }

                PathCommand::ClosePath => {
                    current = subpath_start;
                    push_point(&mut subpaths, current);
                }
            }
        }

        Polyline { subpaths }
    }

    fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.subpaths
            .iter()
            .flat_map(|points| points.iter().copied().tuple_windows())
    }

    fn length(&self) -> f64 {
        self.segments()
            .map(|(a, b)| (b.0 - a.0).hypot(b.1 - a.1))
            .sum()
    }

    /// The point at a distance along the path, or `None` outside of it.
    fn point_at(&self, distance: f64) -> Option<(f64, f64)> {
        if distance < 0.0 {
            return None;
        }

        let mut total = 0.0;

        for (a, b) in self.segments() {
            let length = (b.0 - a.0).hypot(b.1 - a.1);

            if total + length >= distance {
                let t = if length > 0.0 {
                    (distance - total) / length
                } else {
                    0.0
                };

                return Some((a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t));
            }

            total += length;
        }

        None
    }
}

fn push_point(subpaths: &mut [Vec<(f64, f64)>], point: (f64, f64)) {
    if let Some(points) = subpaths.last_mut() {
        points.push(point);
    }
}

fn font_spec(node: &Node, font_size: f64) -> FontSpec {
    let family = node
        .attr("font-family")
        .and_then(|f| {
            f.split(',')
                .next()
                .map(|s| s.trim_matches(|c| c == '"' || c == '\'' || c == ' ').to_string())
        })
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "sans-serif".to_string());

    let bold = match node.attr("font-weight").as_deref() {
        Some("bold") | Some("bolder") => true,
        Some(w) => w.parse::<u32>().is_ok_and(|w| w >= 600),
        None => false,
    };

    let italic = matches!(
        node.attr("font-style").as_deref(),
        Some("italic") | Some("oblique")
    );

    FontSpec {
        family,
        size: font_size,
        bold,
        italic,
    }
}

fn lengths<N: Normalize>(
    node: &Node,
    key: &str,
    params: &NormalizeParams,
) -> Result<Vec<f64>, ElementError> {
    let List(values) = node.parse_attr_or::<List<Length<N>>>(key, List::default())?;
    Ok(values.iter().map(|l| l.to_user(params)).collect())
}

/// Finds the path that a span is laid out along, if any.
///
/// That is the one referenced by a `textPath`, or by the `textPath` that is the parent
/// of a span.  References that cannot be used are logged and ignored, so the text is
/// laid out as if there was no path.
fn text_path_for(
    draw_ctx: &DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    node: &Node,
    kind: ElementKind,
) -> Result<Option<Polyline>, InternalRenderingError> {
    let path_node = if kind == ElementKind::TextPath {
        node.clone()
    } else {
        match node.parent() {
            Some(parent) if parent.has_tag("textPath") => parent,
            _ => return Ok(None),
        }
    };

    let href = match path_node
        .attr("xlink:href")
        .or_else(|| path_node.attr("href"))
    {
        Some(href) => href,
        None => return Ok(None),
    };

    let id = match local_id(&href) {
        Some(id) => id.to_string(),
        None => {
            svg_log!(draw_ctx.session(), "text path {} must be a local reference", href);
            return Ok(None);
        }
    };

    let acquired = match acquired_nodes.acquire_id(&id) {
        Ok(acquired) => acquired,
        Err(AcquireError::MaxReferencesExceeded) => {
            return Err(AcquireError::MaxReferencesExceeded.into())
        }
        Err(e) => {
            svg_log!(draw_ctx.session(), "ignoring text path of {}: {}", node.data(), e);
            return Ok(None);
        }
    };

    let target = acquired.get();
    let target_kind = ElementKind::from_tag(&target.tag());

    if !target_kind.is_shape() {
        svg_log!(draw_ctx.session(), "text path {} is not a shape", target.data());
        return Ok(None);
    }

    let params = draw_ctx.view_params();
    let shape = shapes::make_shape(target, target_kind, &params, draw_ctx.session())?;

    Ok(shape.map(|s| Polyline::new(&s.path)))
}

/// Appends the outlines of a span's characters to the current path.
///
/// Characters are positioned from the `x`, `y`, `dx`, `dy` and `rotate` lists of the
/// span, falling back to the text cursor; along a text path, the cursor is a distance
/// along the path and each character is rotated to follow it.
pub fn draw_text_span(
    draw_ctx: &mut DrawingCtx<'_>,
    acquired_nodes: &mut AcquiredNodes<'_>,
    node: &Node,
    kind: ElementKind,
) -> Result<(), InternalRenderingError> {
    if kind == ElementKind::Text {
        *draw_ctx.text_cursor() = TextCursor::default();
    }

    let params = draw_ctx.view_params();
    let text = node.text();

    let font = font_spec(node, draw_ctx.font_size());
    draw_ctx.surface().set_font(&font);

    let letter_spacing = match node.attr("letter-spacing").as_deref() {
        None | Some("normal") => 0.0,
        Some(_) => node
            .parse_attr_or("letter-spacing", Length::<Horizontal>::default())?
            .to_user(&params),
    };

    let xs = lengths::<Horizontal>(node, "x", &params)?;
    let ys = lengths::<Vertical>(node, "y", &params)?;
    let dxs = lengths::<Horizontal>(node, "dx", &params)?;
    let dys = lengths::<Vertical>(node, "dy", &params)?;

    let List(rotate) = node.parse_attr_or::<List<f64>>("rotate", List::default())?;
    let last_rotate = rotate.last().copied().unwrap_or(0.0);

    let x_align = match node.attr("text-anchor").as_deref() {
        Some("middle") => draw_ctx.surface().text_width(&text) / 2.0,
        Some("end") => draw_ctx.surface().text_width(&text),
        _ => 0.0,
    };

    let text_path = text_path_for(draw_ctx, acquired_nodes, node, kind)?;
    let mut cursor = *draw_ctx.text_cursor();

    if text.is_empty() {
        let x = xs.first().copied().unwrap_or(cursor.position.0);
        let y = ys.first().copied().unwrap_or(cursor.position.1);
        let dx = dxs.first().copied().unwrap_or(0.0);
        let dy = dys.first().copied().unwrap_or(0.0);
        cursor.position = (x + dx, y + dy);
        *draw_ctx.text_cursor() = cursor;
        return Ok(());
    }

    let path_length = text_path.as_ref().map(Polyline::length).unwrap_or(0.0);

    if text_path.is_some() {
        if kind == ElementKind::TextPath {
            let start_offset = node
                .parse_attr_or("startOffset", Length::<Horizontal>::default())?
                .to_user(&params.with_viewport(path_length, path_length));
            cursor.path_offset += start_offset;
        }

        cursor.path_offset -= x_align;
    }

    for (i, letter) in text.chars().enumerate() {
        let letter = letter.to_string();

        if xs.get(i).is_some() {
            cursor.d_position.0 = 0.0;
        }
        if ys.get(i).is_some() {
            cursor.d_position.1 = 0.0;
        }
        cursor.d_position.0 += dxs.get(i).copied().unwrap_or(0.0);
        cursor.d_position.1 += dys.get(i).copied().unwrap_or(0.0);

        let advance = draw_ctx.surface().text_width(&letter);

        let placement = match text_path {
            Some(ref polyline) => {
                let start = cursor.path_offset + cursor.d_position.0;
                let middle = start + advance / 2.0;
                cursor.path_offset += advance + letter_spacing;

                if !(0.0..=path_length).contains(&middle) {
                    continue;
                }

                match (polyline.point_at(start), polyline.point_at(start + advance)) {
                    (Some(p0), Some(p1)) => Transform::new_translate(p0.0, p0.1)
                        .pre_rotate(Angle::from_vector(p1.0 - p0.0, p1.1 - p0.1))
                        .pre_translate(0.0, cursor.d_position.1),
                    _ => continue,
                }
            }

            None => {
                let x = xs.get(i).copied().unwrap_or(cursor.position.0);
                let y = ys.get(i).copied().unwrap_or(cursor.position.1);
                cursor.position = (x + letter_spacing + advance, y);

                let r = rotate.get(i).copied().unwrap_or(last_rotate);

                Transform::new_translate(
                    x + letter_spacing + cursor.d_position.0 - x_align,
                    y + cursor.d_position.1,
                )
                .pre_rotate(Angle::from_degrees(r))
            }
        };

        if !letter.trim().is_empty() {
            let surface = draw_ctx.surface();
            surface.save()?;
            surface.transform(&placement);
            surface.move_to(0.0, 0.0);
            surface.text_path(&letter);
            surface.restore()?;
        }
    }

    *draw_ctx.text_cursor() = cursor;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cond::UserLanguage;
    use crate::document::{Document, LoadOptions};
    use crate::drawing_ctx::{draw_tree, RenderConfig};
    use crate::session::Session;
    use crate::surface::{Op, RecordingSurface};

    fn load(s: &str) -> Document {
        Document::load_from_bytes(
            s.as_bytes().to_vec(),
            None,
            LoadOptions::new(false).with_user_language(UserLanguage::from_locale_str("en")),
            Session::new_for_test_suite(),
        )
        .unwrap()
    }

    fn texts(node: &Node) -> Vec<String> {
        node.children().map(|c| c.text()).collect()
    }

    fn glyphs(doc: &Document) -> Vec<(String, f64, f64, f64)> {
        let mut surface = RecordingSurface::new();
        draw_tree(doc, &doc.root(), &mut surface, &RenderConfig::default(), (100.0, 100.0))
            .unwrap();

        surface
            .into_ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Text { text, x, y, angle, .. } => Some((text, x, y, angle)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn handles_white_space() {
        assert_eq!(handle_white_space("  a \t\n b  ", false), " a b ");
        assert_eq!(handle_white_space("a\r\nb", false), "ab");
        assert_eq!(handle_white_space("  a\t\nb ", true), "  a  b ");
    }

    #[test]
    fn strips_single_text_run() {
        let doc = load(r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t">  a   b  </text></svg>"#);
        assert_eq!(doc.lookup("t").unwrap().text(), "a b");

        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t" xml:space="preserve"> a&#9;b </text></svg>"#,
        );
        assert_eq!(doc.lookup("t").unwrap().text(), " a b ");
    }

    #[test]
    fn collapses_spaces_across_spans() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t">a <tspan id="s"> b</tspan> c</text></svg>"#,
        );

        let text = doc.lookup("t").unwrap();
        assert_eq!(text.text(), "a ");
        assert_eq!(texts(&text), vec!["b", " c"]);

        let children: Vec<Node> = text.children().collect();
        assert_eq!(children[0].id(), "s");
        assert!(children[1].has_tag("tspan"));
        assert!(children[1].data().xml.is_none());
    }

    #[test]
    fn anonymous_spans_inherit_from_text() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t" fill="red" x="5"><tspan>a</tspan>b</text></svg>"#,
        );

        let text = doc.lookup("t").unwrap();
        let anonymous = text.last_child().unwrap();
        assert_eq!(anonymous.text(), "b");
        assert_eq!(anonymous.attr("fill").as_deref(), Some("red"));
        assert!(!anonymous.has_attr("x"));
        assert!(!anonymous.id().is_empty());
    }

    #[test]
    fn distributes_rotations() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t" rotate="10 20 30">ab<tspan id="s">cd</tspan>e<tspan id="own" rotate="5">f</tspan></text></svg>"#,
        );

        assert_eq!(doc.lookup("t").unwrap().attr("rotate").as_deref(), Some("10 20"));
        assert_eq!(doc.lookup("s").unwrap().attr("rotate").as_deref(), Some("30 30"));
        assert_eq!(doc.lookup("own").unwrap().attr("rotate").as_deref(), Some("5"));

        let anonymous = doc.lookup("s").unwrap().next_sibling().unwrap();
        assert_eq!(anonymous.attr("rotate").as_deref(), Some("30"));
    }

    #[test]
    fn tref_becomes_tspan_with_flattened_text() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
                 <defs><text id="src">Hello <tspan>world</tspan></text></defs>
                 <text id="t"><tref id="r" xlink:href="#src"/></text>
               </svg>"##,
        );

        let tref = doc.lookup("r").unwrap();
        assert!(tref.has_tag("tspan"));
        assert_eq!(tref.text(), "Hello world");
        assert!(!tref.has_children());
    }

    #[test]
    fn tref_to_missing_element_is_an_error() {
        let res = Document::load_from_bytes(
            br##"<svg xmlns="http://www.w3.org/2000/svg"><text><tref href="#nope"/></text></svg>"##
                .to_vec(),
            None,
            LoadOptions::new(false),
            Session::new_for_test_suite(),
        );

        assert!(matches!(res, Err(LoadingError::NoSuchId(_))));
    }

    #[test]
    fn lays_out_characters_along_cursor() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg" font-size="10">
                 <text x="10" y="20">a b<tspan dx="5">c</tspan></text>
               </svg>"#,
        );

        let glyphs = glyphs(&doc);
        let positions: Vec<(&str, f64, f64)> =
            glyphs.iter().map(|(t, x, y, _)| (t.as_str(), *x, *y)).collect();

        assert_eq!(
            positions,
            vec![("a", 10.0, 20.0), ("b", 20.0, 20.0), ("c", 30.0, 20.0)]
        );
    }

    #[test]
    fn anchors_text() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg" font-size="10">
                 <text x="50" y="0" text-anchor="middle">ab</text>
                 <text x="50" y="0" text-anchor="end">ab</text>
               </svg>"#,
        );

        let xs: Vec<f64> = glyphs(&doc).iter().map(|g| g.1).collect();
        assert_eq!(xs, vec![45.0, 50.0, 40.0, 45.0]);
    }

    #[test]
    fn rotates_characters() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text rotate="90">ab</text></svg>"#,
        );

        let angles: Vec<f64> = glyphs(&doc).iter().map(|g| g.3).collect();
        assert_eq!(angles.len(), 2);
        for a in angles {
            assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        }
    }

    #[test]
    fn follows_text_path() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg" font-size="10">
                 <defs><path id="p" d="M 0 0 L 20 0 L 20 100"/></defs>
                 <text><textPath href="#p" startOffset="10">abcdefghijklmnopqrstuvwxyz</textPath></text>
               </svg>"##,
        );

        let glyphs = glyphs(&doc);

        // "a" starts at 10 along the first segment.
        assert_eq!(glyphs[0].0, "a");
        assert!((glyphs[0].1 - 10.0).abs() < 1e-9);
        assert!(glyphs[0].2.abs() < 1e-9);

        // "c" starts at 20, right at the corner, and goes down.
        assert_eq!(glyphs[2].0, "c");
        assert!((glyphs[2].1 - 20.0).abs() < 1e-9);
        assert!((glyphs[2].3 - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

        // The path is 120 long; characters past its end are not drawn.
        assert_eq!(glyphs.len(), 22);
    }

    #[test]
    fn flattens_curves() {
        let mut builder = crate::path_builder::PathBuilder::default();
        builder.move_to(0.0, 0.0);
        builder.curve_to(0.0, 0.0, 10.0, 0.0, 10.0, 0.0);
        builder.close_path();
        let polyline = Polyline::new(&builder.into_path());

        assert!((polyline.length() - 20.0).abs() < 1e-9);
        let (x, y) = polyline.point_at(15.0).unwrap();
        assert!((x - 5.0).abs() < 1e-9 && y.abs() < 1e-9);
        assert_eq!(polyline.point_at(25.0), None);
    }
}
