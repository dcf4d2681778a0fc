//! A surface that records drawing operations instead of rendering them.
//!
//! Text is measured with a fixed advance of half the font size per character, so that
//! layouts are predictable without any font machinery.

use image::RgbaImage;

use crate::error::RenderingError;
use crate::rect::Rect;
use crate::transform::Transform;

use super::{FillRule, FontSpec, Source, StrokeStyle, Surface, TileSource};

/// A recorded operation.
///
/// Path coordinates are recorded in device space, after the current transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    ClosePath,

    /// Outlines of text, with the device position and rotation of its origin.
    Text {
        text: String,
        x: f64,
        y: f64,
        angle: f64,
        font: FontSpec,
    },

    Fill(FillRule, Source),
    Stroke(StrokeStyle, Source),
    Clip(FillRule),
    Paint(Source),
    PushGroup,
    PopGroup,
    PaintWithAlpha(f64),
    Mask,
    BeginTile(f64, f64),
    EndTile(usize),
    Image { width: u32, height: u32, rect: Rect },
    PageSize(f64, f64),
    ShowPage,
}

#[derive(Clone)]
struct State {
    transform: Transform,
    source: Source,
    font: FontSpec,
}

/// Records everything it is asked to draw in [`RecordingSurface::ops`].
pub struct RecordingSurface {
    ops: Vec<Op>,
    state: State,
    saved: Vec<State>,
    groups: Vec<usize>,
    tiles: usize,
    current_point: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
}

impl Default for RecordingSurface {
    fn default() -> RecordingSurface {
        RecordingSurface::new()
    }
}

impl RecordingSurface {
    pub fn new() -> RecordingSurface {
        RecordingSurface {
            ops: Vec::new(),
            state: State {
                transform: Transform::identity(),
                source: Source::Solid(crate::color::Rgba::BLACK),
                font: FontSpec {
                    family: "sans-serif".to_string(),
                    size: 12.0,
                    bold: false,
                    italic: false,
                },
            },
            saved: Vec::new(),
            groups: Vec::new(),
            tiles: 0,
            current_point: None,
            subpath_start: None,
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    /// Number of `save` calls that were not matched by a `restore`.
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    fn device(&self, x: f64, y: f64) -> (f64, f64) {
        self.state.transform.transform_point(x, y)
    }

    fn record_point(&mut self, x: f64, y: f64) -> (f64, f64) {
        self.current_point = Some((x, y));
        self.device(x, y)
    }
}

impl Surface for RecordingSurface {
    fn save(&mut self) -> Result<(), RenderingError> {
        self.saved.push(self.state.clone());
        Ok(())
    }

    fn restore(&mut self) -> Result<(), RenderingError> {
        self.state = self
            .saved
            .pop()
            .ok_or_else(|| RenderingError::Rendering("restore without save".to_string()))?;
        Ok(())
    }

    fn transform(&mut self, t: &Transform) {
        self.state.transform = self.state.transform.pre_transform(t);
    }

    fn current_transform(&self) -> Transform {
        self.state.transform
    }

    fn new_path(&mut self) {
        self.current_point = None;
        self.subpath_start = None;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.subpath_start = Some((x, y));
        let (dx, dy) = self.record_point(x, y);
        self.ops.push(Op::MoveTo(dx, dy));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let (dx, dy) = self.record_point(x, y);
        self.ops.push(Op::LineTo(dx, dy));
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        let (ax, ay) = self.device(x1, y1);
        let (bx, by) = self.device(x2, y2);
        let (cx, cy) = self.record_point(x3, y3);
        self.ops.push(Op::CurveTo(ax, ay, bx, by, cx, cy));
    }

    fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) {
        let (sx, sy) = (xc + radius * angle1.cos(), yc + radius * angle1.sin());
        if self.current_point.is_some() {
            self.line_to(sx, sy);
        } else {
            self.move_to(sx, sy);
        }
        self.line_to(xc + radius * angle2.cos(), yc + radius * angle2.sin());
    }

    fn arc_negative(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) {
        self.arc(xc, yc, radius, angle1, angle2);
    }

    fn close_path(&mut self) {
        self.current_point = self.subpath_start;
        self.ops.push(Op::ClosePath);
    }

    fn current_point(&self) -> Option<(f64, f64)> {
        self.current_point
    }

    fn set_source(&mut self, source: &Source) {
        self.state.source = source.clone();
    }

    fn fill(&mut self, rule: FillRule, preserve: bool) -> Result<(), RenderingError> {
        self.ops.push(Op::Fill(rule, self.state.source.clone()));
        if !preserve {
            self.new_path();
        }
        Ok(())
    }

    fn stroke(&mut self, style: &StrokeStyle, preserve: bool) -> Result<(), RenderingError> {
        self.ops.push(Op::Stroke(style.clone(), self.state.source.clone()));
        if !preserve {
            self.new_path();
        }
        Ok(())
    }

    fn clip(&mut self, rule: FillRule) {
        self.ops.push(Op::Clip(rule));
        self.new_path();
    }

    fn paint(&mut self) -> Result<(), RenderingError> {
        self.ops.push(Op::Paint(self.state.source.clone()));
        Ok(())
    }

    fn push_group(&mut self) {
        self.saved.push(self.state.clone());
        self.groups.push(self.saved.len());
        self.ops.push(Op::PushGroup);
    }

    fn pop_group_to_source(&mut self) -> Result<(), RenderingError> {
        self.groups
            .pop()
            .ok_or_else(|| RenderingError::Rendering("no group to pop".to_string()))?;
        self.restore()?;
        self.ops.push(Op::PopGroup);
        Ok(())
    }

    fn paint_with_alpha(&mut self, alpha: f64) -> Result<(), RenderingError> {
        self.ops.push(Op::PaintWithAlpha(alpha));
        Ok(())
    }

    fn mask_with_current_group(&mut self) -> Result<(), RenderingError> {
        self.groups
            .pop()
            .ok_or_else(|| RenderingError::Rendering("no group for mask".to_string()))?;
        self.restore()?;
        self.ops.push(Op::Mask);
        Ok(())
    }

    fn begin_tile(&mut self, width: f64, height: f64) -> Result<(), RenderingError> {
        self.save()?;
        self.state.transform = Transform::identity();
        self.ops.push(Op::BeginTile(width, height));
        Ok(())
    }

    fn end_tile(&mut self, matrix: Transform) -> Result<TileSource, RenderingError> {
        self.restore()?;
        let id = self.tiles;
        self.tiles += 1;
        self.ops.push(Op::EndTile(id));
        Ok(TileSource { id, matrix })
    }

    fn paint_image(&mut self, image: &RgbaImage, rect: Rect) -> Result<(), RenderingError> {
        self.ops.push(Op::Image {
            width: image.width(),
            height: image.height(),
            rect,
        });
        Ok(())
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.state.font = font.clone();
    }

    fn text_width(&mut self, text: &str) -> f64 {
        text.chars().count() as f64 * self.state.font.size / 2.0
    }

    fn text_path(&mut self, text: &str) {
        let (x, y) = self.current_point.unwrap_or((0.0, 0.0));
        let (dx, dy) = self.device(x, y);
        let t = self.state.transform;

        self.ops.push(Op::Text {
            text: text.to_string(),
            x: dx,
            y: dy,
            angle: t.yx.atan2(t.xx),
            font: self.state.font.clone(),
        });

        let advance = self.text_width(text);
        self.current_point = Some((x + advance, y));
    }

    fn set_page_size(&mut self, width: f64, height: f64) -> Result<(), RenderingError> {
        self.ops.push(Op::PageSize(width, height));
        Ok(())
    }

    fn show_page(&mut self) -> Result<(), RenderingError> {
        self.ops.push(Op::ShowPage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_device_coordinates() {
        let mut s = RecordingSurface::new();
        s.save().unwrap();
        s.transform(&Transform::new_translate(10.0, 20.0));
        s.move_to(1.0, 2.0);
        s.line_to(3.0, 4.0);
        s.restore().unwrap();
        s.line_to(5.0, 6.0);

        assert_eq!(
            s.ops(),
            &[Op::MoveTo(11.0, 22.0), Op::LineTo(13.0, 24.0), Op::LineTo(5.0, 6.0)]
        );
        assert_eq!(s.save_depth(), 0);
    }

    #[test]
    fn unbalanced_restore_is_an_error() {
        let mut s = RecordingSurface::new();
        assert!(s.restore().is_err());
        assert!(s.pop_group_to_source().is_err());
    }
}
