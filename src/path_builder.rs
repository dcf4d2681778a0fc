//! Representation of Bézier paths.
//!
//! The path parser and the shape elements push commands into a [`PathBuilder`], which
//! then gets turned into an immutable [`Path`].  A `Path` knows how to emit itself to a
//! [`Surface`], and how to compute the direction of travel at the start and end of each
//! of its segments, which is what markers are oriented by.

use std::f64::consts::TAU;

use float_cmp::approx_eq;

use crate::angle::Angle;
use crate::error::RenderingError;
use crate::path_parser::{ParseError, PathParser};
use crate::surface::Surface;
use crate::transform::Transform;

/// The large-arc flag of an arc command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LargeArc(pub bool);

/// The sweep flag of an arc command; `Positive` goes in the direction of increasing
/// angles, which is clockwise on screen.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Sweep {
    Negative,
    Positive,
}

/// A cubic Bézier segment from the current point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CubicBezierCurve {
    pub pt1: (f64, f64),
    pub pt2: (f64, f64),
    pub to: (f64, f64),
}

/// An elliptical arc in center form, or what to do instead when there is none.
pub enum ArcParameterization {
    CenterParameters {
        center: (f64, f64),
        /// Radii after scaling up to reach both endpoints.
        radii: (f64, f64),
        /// Parametric angle of the start point.
        theta1: f64,
        /// Signed parametric angle swept to the end point.
        delta_theta: f64,
    },
    /// A radius is zero; the arc is a straight line.
    LineTo,
    /// The endpoints coincide; nothing is drawn.
    Omit,
}

/// An elliptical arc as written in path data: radii, rotation, flags and endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipticalArc {
    pub r: (f64, f64),
    /// Rotation of the ellipse's x axis, in degrees.
    pub x_axis_rotation: f64,
    pub large_arc: LargeArc,
    pub sweep: Sweep,
    pub from: (f64, f64),
    pub to: (f64, f64),
}

impl EllipticalArc {
    /// Converts the endpoint form to center form.
    ///
    /// This follows the conversion in the implementation notes of SVG 2
    /// (<https://www.w3.org/TR/SVG2/implnote.html#ArcConversionEndpointToCenter>),
    /// including the correction of radii that are too small.
    pub fn center_parameterization(&self) -> ArcParameterization {
        let (x1, y1) = self.from;
        let (x2, y2) = self.to;
        let (mut rx, mut ry) = (self.r.0.abs(), self.r.1.abs());

        if rx * rx < f64::EPSILON || ry * ry < f64::EPSILON {
            return ArcParameterization::LineTo;
        }

        let (sin_phi, cos_phi) = self.x_axis_rotation.to_radians().sin_cos();

        // The start point, relative to the middle of the chord, in the ellipse's axes.
        let (hx, hy) = ((x1 - x2) / 2.0, (y1 - y2) / 2.0);
        let px = cos_phi * hx + sin_phi * hy;
        let py = cos_phi * hy - sin_phi * hx;

        if px == 0.0 && py == 0.0 {
            return ArcParameterization::Omit;
        }

        let lambda = (px / rx).powi(2) + (py / ry).powi(2);
        if lambda > 1.0 {
            let grow = lambda.sqrt();
            rx *= grow;
            ry *= grow;
        }

        let (rx2, ry2) = (rx * rx, ry * ry);
        let den = rx2 * py * py + ry2 * px * px;
        let mut k = ((rx2 * ry2 - den) / den).max(0.0).sqrt();

        let positive = self.sweep == Sweep::Positive;
        if self.large_arc.0 == positive {
            k = -k;
        }

        let (cpx, cpy) = (k * rx * py / ry, -k * ry * px / rx);

        let center = (
            cos_phi * cpx - sin_phi * cpy + (x1 + x2) / 2.0,
            sin_phi * cpx + cos_phi * cpy + (y1 + y2) / 2.0,
        );

        // Start and end points on the unit circle that the ellipse maps to.
        let u = ((px - cpx) / rx, (py - cpy) / ry);
        let v = ((-px - cpx) / rx, (-py - cpy) / ry);

        if u == (0.0, 0.0) || v == (0.0, 0.0) {
            return ArcParameterization::Omit;
        }

        let theta1 = u.1.atan2(u.0);
        let mut delta_theta = (u.0 * v.1 - u.1 * v.0).atan2(u.0 * v.0 + u.1 * v.1);

        if positive && delta_theta < 0.0 {
            delta_theta += TAU;
        } else if !positive && delta_theta > 0.0 {
            delta_theta -= TAU;
        }

        ArcParameterization::CenterParameters {
            center,
            radii: (rx, ry),
            theta1,
            delta_theta,
        }
    }

    /// Direction of travel at the parametric angle `theta` of the ellipse.
    fn direction_at(&self, radii: (f64, f64), theta: f64, delta_theta: f64) -> Angle {
        let (rx, ry) = radii;
        let phi = self.x_axis_rotation.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_th, cos_th) = theta.sin_cos();

        let sign = if delta_theta < 0.0 { -1.0 } else { 1.0 };

        let dx = -rx * sin_th * sign;
        let dy = ry * cos_th * sign;

        Angle::from_vector(cos_phi * dx - sin_phi * dy, sin_phi * dx + cos_phi * dy)
    }
}

/// One command of a path, with absolute coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(CubicBezierCurve),
    Arc(EllipticalArc),
    ClosePath,
}

/// Direction of travel at both ends of a path segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tangents {
    pub start: Angle,
    pub end: Angle,
}

impl Tangents {
    fn new(start: Angle, end: Angle) -> Tangents {
        Tangents { start, end }
    }

    fn zero() -> Tangents {
        Tangents::new(Angle::new(0.0), Angle::new(0.0))
    }

    fn line(from: (f64, f64), to: (f64, f64)) -> Tangents {
        let a = Angle::from_vector(to.0 - from.0, to.1 - from.1);
        Tangents::new(a, a)
    }
}

fn points_equal(a: (f64, f64), b: (f64, f64)) -> bool {
    approx_eq!(f64, a.0, b.0) && approx_eq!(f64, a.1, b.1)
}

/// Collects commands, from path data or from a shape, until `into_path` freezes them.
#[derive(Default)]
pub struct PathBuilder {
    commands: Vec<PathCommand>,
}

impl PathBuilder {
    pub fn parse(&mut self, path_str: &str) -> Result<(), ParseError> {
        let mut parser = PathParser::new(self, path_str);
        parser.parse()
    }

    pub fn into_path(self) -> Path {
        Path {
            commands: self.commands.into_boxed_slice(),
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(PathCommand::MoveTo(x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.commands.push(PathCommand::LineTo(x, y));
    }

    pub fn curve_to(&mut self, x2: f64, y2: f64, x3: f64, y3: f64, x4: f64, y4: f64) {
        self.commands.push(PathCommand::CurveTo(CubicBezierCurve {
            pt1: (x2, y2),
            pt2: (x3, y3),
            to: (x4, y4),
        }));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        x1: f64,
        y1: f64,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: LargeArc,
        sweep: Sweep,
        x2: f64,
        y2: f64,
    ) {
        self.commands.push(PathCommand::Arc(EllipticalArc {
            r: (rx, ry),
            x_axis_rotation,
            large_arc,
            sweep,
            from: (x1, y1),
            to: (x2, y2),
        }));
    }

    pub fn close_path(&mut self) {
        self.commands.push(PathCommand::ClosePath);
    }
}

/// A finished path.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Path {
    commands: Box<[PathCommand]>,
}

impl Path {
    pub fn iter(&self) -> impl Iterator<Item = &PathCommand> + '_ {
        self.commands.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// The current point after the last command, or `None` for an empty path.
    pub fn end_point(&self) -> Option<(f64, f64)> {
        self.points().last().copied()
    }

    /// The current point after each command.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let mut current = (0.0, 0.0);
        let mut subpath_start = (0.0, 0.0);

        self.commands
            .iter()
            .map(|cmd| {
                match *cmd {
                    PathCommand::MoveTo(x, y) => {
                        current = (x, y);
                        subpath_start = current;
                    }
                    PathCommand::LineTo(x, y) => current = (x, y),
                    PathCommand::CurveTo(ref c) => current = c.to,
                    PathCommand::Arc(ref a) => current = a.to,
                    PathCommand::ClosePath => current = subpath_start,
                }
                current
            })
            .collect()
    }

    /// Direction of travel at the start and end of each command.
    ///
    /// Move-to and close-path commands get zero tangents.  Curves use the direction to
    /// their first control point that differs from the start point, and from the last
    /// control point that differs from the end point.
    pub fn tangents(&self) -> Vec<Tangents> {
        let mut current = (0.0, 0.0);
        let mut subpath_start = (0.0, 0.0);

        self.commands
            .iter()
            .map(|cmd| match *cmd {
                PathCommand::MoveTo(x, y) => {
                    current = (x, y);
                    subpath_start = current;
                    Tangents::zero()
                }

                PathCommand::LineTo(x, y) => {
                    let t = Tangents::line(current, (x, y));
                    current = (x, y);
                    t
                }

                PathCommand::CurveTo(ref c) => {
                    let start_to = if !points_equal(current, c.pt1) {
                        c.pt1
                    } else if !points_equal(current, c.pt2) {
                        c.pt2
                    } else {
                        c.to
                    };

                    let end_from = if !points_equal(c.pt2, c.to) {
                        c.pt2
                    } else if !points_equal(c.pt1, c.to) {
                        c.pt1
                    } else {
                        current
                    };

                    let t = Tangents::new(
                        Angle::from_vector(start_to.0 - current.0, start_to.1 - current.1),
                        Angle::from_vector(c.to.0 - end_from.0, c.to.1 - end_from.1),
                    );
                    current = c.to;
                    t
                }

                PathCommand::Arc(ref a) => {
                    let t = match a.center_parameterization() {
                        ArcParameterization::CenterParameters {
                            radii,
                            theta1,
                            delta_theta,
                            ..
                        } => Tangents::new(
                            a.direction_at(radii, theta1, delta_theta),
                            a.direction_at(radii, theta1 + delta_theta, delta_theta),
                        ),
                        ArcParameterization::LineTo => Tangents::line(a.from, a.to),
                        ArcParameterization::Omit => Tangents::zero(),
                    };
                    current = a.to;
                    t
                }

                PathCommand::ClosePath => {
                    current = subpath_start;
                    Tangents::zero()
                }
            })
            .collect()
    }

    /// Emits the path to a surface, after the surface's current path.
    ///
    /// Elliptical arcs become native circular arcs in a scaled and rotated space.
    pub fn to_surface(&self, surface: &mut dyn Surface) -> Result<(), RenderingError> {
        for cmd in self.commands.iter() {
            match *cmd {
                PathCommand::MoveTo(x, y) => surface.move_to(x, y),
                PathCommand::LineTo(x, y) => surface.line_to(x, y),
                PathCommand::CurveTo(ref c) => {
                    surface.curve_to(c.pt1.0, c.pt1.1, c.pt2.0, c.pt2.1, c.to.0, c.to.1)
                }
                PathCommand::Arc(ref a) => emit_arc(surface, a)?,
                PathCommand::ClosePath => surface.close_path(),
            }
        }

        Ok(())
    }
}

fn emit_arc(surface: &mut dyn Surface, arc: &EllipticalArc) -> Result<(), RenderingError> {
    match arc.center_parameterization() {
        ArcParameterization::CenterParameters {
            center: (cx, cy),
            radii: (rx, ry),
            theta1,
            delta_theta,
        } => {
            // The arc is circular in a space centered on the ellipse, rotated by its
            // x-axis rotation and squashed vertically by ry/rx.
            surface.save()?;
            surface.transform(
                &Transform::new_translate(cx, cy)
                    .pre_rotate(Angle::from_degrees(arc.x_axis_rotation))
                    .pre_scale(1.0, ry / rx),
            );

            if delta_theta > 0.0 {
                surface.arc(0.0, 0.0, rx, theta1, theta1 + delta_theta);
            } else {
                surface.arc_negative(0.0, 0.0, rx, theta1, theta1 + delta_theta);
            }

            surface.restore()?;
        }

        ArcParameterization::LineTo => surface.line_to(arc.to.0, arc.to.1),

        ArcParameterization::Omit => {}
    }

    Ok(())
}
