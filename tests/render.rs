//! Rendering documents to a recording surface.

use matches::matches;
use pretty_assertions::assert_eq;

use pagesvg::surface::{FillRule, Op, RecordingSurface, Source};
use pagesvg::tests_only::draw_tree;
use pagesvg::{render_document, Document, Options, RenderConfig, RenderingError, Rgba};

const RED: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);
const LIME: Rgba = Rgba::new(0.0, 1.0, 0.0, 1.0);
const BLUE: Rgba = Rgba::new(0.0, 0.0, 1.0, 1.0);

fn load(s: &str) -> Document {
    Options::new().load_bytes(s.as_bytes().to_vec(), None).unwrap()
}

fn render(s: &str) -> Result<Vec<Op>, RenderingError> {
    let doc = load(s);

    let mut surface = RecordingSurface::new();
    draw_tree(&doc, &doc.root(), &mut surface, &RenderConfig::default(), (100.0, 100.0))?;
    assert_eq!(surface.save_depth(), 0);

    Ok(surface.into_ops())
}

fn fills_with(ops: &[Op], color: Rgba) -> usize {
    ops.iter()
        .filter(|op| matches!(op, Op::Fill(_, Source::Solid(c)) if *c == color))
        .count()
}

#[test]
fn fills_and_strokes_a_rect() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <rect x="10" y="20" width="30" height="40" fill="red" stroke="blue" stroke-width="2"/>
           </svg>"#,
    )
    .unwrap();

    assert_eq!(
        ops[..6],
        [
            Op::MoveTo(10.0, 20.0),
            Op::LineTo(40.0, 20.0),
            Op::LineTo(40.0, 60.0),
            Op::LineTo(10.0, 60.0),
            Op::LineTo(10.0, 20.0),
            Op::ClosePath,
        ]
    );

    assert_eq!(ops[6], Op::Fill(FillRule::NonZero, Source::Solid(RED)));
    assert!(matches!(
        ops[7],
        Op::Stroke(ref style, Source::Solid(c)) if style.width == 2.0 && c == BLUE
    ));
}

#[test]
fn applies_group_transforms() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <g transform="translate(5, 5)">
               <rect transform="scale(2)" x="1" y="1" width="1" height="1"/>
             </g>
           </svg>"#,
    )
    .unwrap();

    assert_eq!(ops[0], Op::MoveTo(7.0, 7.0));
    assert_eq!(ops[2], Op::LineTo(9.0, 9.0));
}

#[test]
fn markers_are_drawn_at_every_vertex() {
    let ops = render(
        r##"<svg xmlns="http://www.w3.org/2000/svg">
             <defs>
               <marker id="start" overflow="visible"><rect width="1" height="1" fill="red"/></marker>
               <marker id="mid" overflow="visible"><rect width="1" height="1" fill="lime"/></marker>
               <marker id="end" overflow="visible"><rect width="1" height="1" fill="blue"/></marker>
             </defs>
             <polyline points="0,0 10,0 20,0 30,0" fill="none" stroke="black"
                       marker-start="url(#start)" marker-mid="url(#mid)" marker-end="url(#end)"/>
           </svg>"##,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, RED), 1);
    assert_eq!(fills_with(&ops, LIME), 2);
    assert_eq!(fills_with(&ops, BLUE), 1);
}

#[test]
fn marker_shorthand_is_overridden_by_specific_properties() {
    let ops = render(
        r##"<svg xmlns="http://www.w3.org/2000/svg">
             <defs>
               <marker id="a" overflow="visible"><rect width="1" height="1" fill="red"/></marker>
               <marker id="b" overflow="visible"><rect width="1" height="1" fill="blue"/></marker>
             </defs>
             <path d="M 0 0 L 10 0 L 20 0" fill="none" marker="url(#a)" marker-end="url(#b)"/>
           </svg>"##,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, RED), 2);
    assert_eq!(fills_with(&ops, BLUE), 1);
}

#[test]
fn invalid_shapes_are_skipped() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <polyline points="0,0 10,10 20" fill="red"/>
             <rect width="-5" height="10" fill="red"/>
             <rect width="5" height="5" fill="lime"/>
           </svg>"#,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, RED), 0);
    assert_eq!(fills_with(&ops, LIME), 1);
}

#[test]
fn non_invertible_transform_skips_the_element() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <g transform="scale(0)"><rect width="5" height="5" fill="red"/></g>
             <rect width="5" height="5" fill="lime"/>
           </svg>"#,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, RED), 0);
    assert_eq!(fills_with(&ops, LIME), 1);
}

#[test]
fn unknown_path_command_fails_the_render() {
    let res = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <path d="M 0 0 L 10 10 X 5 5"/>
           </svg>"#,
    );

    assert!(matches!(res, Err(RenderingError::InvalidPath(_))));
}

#[test]
fn circular_use_fails_the_render() {
    let res = render(
        r##"<svg xmlns="http://www.w3.org/2000/svg">
             <g id="a"><g><use href="#b"/></g></g>
             <use id="b" href="#a"/>
           </svg>"##,
    );

    assert!(matches!(res, Err(RenderingError::CircularReference(_))));
}

#[test]
fn circular_gradients_use_the_alternate_color() {
    let ops = render(
        r##"<svg xmlns="http://www.w3.org/2000/svg">
             <linearGradient id="a" href="#b"/>
             <linearGradient id="b" href="#a"/>
             <rect width="10" height="10" fill="url(#a) lime"/>
             <rect width="10" height="10" fill="url(#a)" stroke="blue"/>
           </svg>"##,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, LIME), 1);
    assert_eq!(ops.iter().filter(|op| matches!(op, Op::Fill(..))).count(), 1);
    assert_eq!(ops.iter().filter(|op| matches!(op, Op::Stroke(..))).count(), 1);
}

#[test]
fn paint_in_other_documents_uses_the_alternate_color() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <rect width="5" height="5" fill="url(other.svg#grad) lime"/>
             <rect width="5" height="5" fill="url(other.svg#grad)" stroke="blue"/>
           </svg>"#,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, LIME), 1);
    assert_eq!(ops.iter().filter(|op| matches!(op, Op::Fill(..))).count(), 1);
    assert_eq!(ops.iter().filter(|op| matches!(op, Op::Stroke(..))).count(), 1);
}

#[test]
fn group_opacity_uses_a_group() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <g opacity="0.5"><rect width="5" height="5" fill="red"/></g>
             <rect width="5" height="5" fill="blue" opacity="0.5"/>
           </svg>"#,
    )
    .unwrap();

    let push = ops.iter().position(|op| *op == Op::PushGroup).unwrap();
    let pop = ops.iter().position(|op| *op == Op::PopGroup).unwrap();
    assert!(push < pop);
    assert_eq!(ops[pop + 1], Op::PaintWithAlpha(0.5));
    assert_eq!(fills_with(&ops[push..pop], RED), 1);

    // A single shape folds the opacity into its paint.
    assert_eq!(ops.iter().filter(|op| **op == Op::PushGroup).count(), 1);
    assert_eq!(fills_with(&ops, Rgba::new(0.0, 0.0, 1.0, 0.5)), 1);
}

#[test]
fn shape_opacity_composites_fill_and_stroke_together() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <rect width="5" height="5" fill="red" stroke="blue" stroke-width="2" opacity="0.5"/>
           </svg>"#,
    )
    .unwrap();

    let push = ops.iter().position(|op| *op == Op::PushGroup).unwrap();
    let pop = ops.iter().position(|op| *op == Op::PopGroup).unwrap();
    assert_eq!(ops[pop + 1], Op::PaintWithAlpha(0.5));

    // Both paints are opaque inside the group.
    assert_eq!(fills_with(&ops[push..pop], RED), 1);
    assert!(ops[push..pop]
        .iter()
        .any(|op| matches!(op, Op::Stroke(_, Source::Solid(c)) if *c == BLUE)));
}

#[test]
fn shape_opacity_groups_markers_with_the_shape() {
    let ops = render(
        r##"<svg xmlns="http://www.w3.org/2000/svg">
             <defs>
               <marker id="m" markerWidth="4" markerHeight="4">
                 <rect width="4" height="4" fill="lime"/>
               </marker>
             </defs>
             <line x1="10" y1="10" x2="50" y2="10" stroke="red" marker-end="url(#m)" opacity="0.5"/>
           </svg>"##,
    )
    .unwrap();

    let push = ops.iter().position(|op| *op == Op::PushGroup).unwrap();
    let pop = ops.iter().rposition(|op| *op == Op::PopGroup).unwrap();
    assert_eq!(ops[pop + 1], Op::PaintWithAlpha(0.5));
    assert_eq!(fills_with(&ops[push..pop], LIME), 1);
}

#[test]
fn zero_sized_elements_are_not_rendered() {
    for s in &[
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="0">
             <rect width="5" height="5" fill="red"/>
           </svg>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg" height="0%">
             <rect width="5" height="5" fill="red"/>
           </svg>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <svg width="20" height="0"><rect width="5" height="5" fill="red"/></svg>
           </svg>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <g width="0"><rect width="5" height="5" fill="red"/></g>
           </svg>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <rect width="0" height="5" fill="red"><rect width="5" height="5" fill="red"/></rect>
           </svg>"#,
    ] {
        let ops = render(s).unwrap();
        assert_eq!(fills_with(&ops, RED), 0, "{}", s);
    }

    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <g width="10"><rect width="5" height="5" fill="lime"/></g>
           </svg>"#,
    )
    .unwrap();
    assert_eq!(fills_with(&ops, LIME), 1);
}

#[test]
fn hidden_and_undisplayed_elements_are_not_painted() {
    let ops = render(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <g display="none"><rect width="5" height="5" fill="red"/></g>
             <rect width="5" height="5" fill="red" visibility="hidden"/>
             <g visibility="hidden"><rect width="5" height="5" fill="lime" visibility="visible"/></g>
           </svg>"#,
    )
    .unwrap();

    assert_eq!(fills_with(&ops, RED), 0);
    assert_eq!(fills_with(&ops, LIME), 1);
}

#[test]
fn renders_each_page_of_a_paged_document() {
    let doc = load(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <svg width="10" height="20"><rect width="1" height="1"/></svg>
             <rect width="1" height="1" fill="red"/>
             <svg width="30" height="40"><rect width="1" height="1"/></svg>
           </svg>"#,
    );

    let mut surface = RecordingSurface::new();
    render_document(&doc, &mut surface, &RenderConfig::default(), true).unwrap();

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
    assert_eq!(fills_with(surface.ops(), RED), 0);
    assert_eq!(surface.save_depth(), 0);
}

#[test]
fn negates_colors() {
    let doc = load(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
             <rect width="5" height="5" fill="red"/>
           </svg>"#,
    );

    let options = Options::new()
        .with_negate_colors(true)
        .with_background_color(Some(BLUE));

    let mut surface = RecordingSurface::new();
    render_document(&doc, &mut surface, options.config(), false).unwrap();

    let ops = surface.into_ops();
    assert!(ops.contains(&Op::Paint(Source::Solid(Rgba::new(1.0, 1.0, 0.0, 1.0)))));
    assert_eq!(fills_with(&ops, Rgba::new(0.0, 1.0, 1.0, 1.0)), 1);
}
