//! Parser for the `d` attribute of paths.
//!
//! The parser walks the bytes of the path data directly, resolves relative commands
//! against the current point, and pushes absolute commands into a [`PathBuilder`].
//! Separators are optional wherever the number boundaries are unambiguous, so
//! `M-10,20-30-40` means `M -10 20 -30 -40`, and `M.1-2,3E2-4` means `M 0.1 -2 300 -4`.
//! Arc flags are single characters and need no separator either: `a5 5 0 1010 0`.
//!
//! On a syntax error the commands parsed so far stay in the builder, so callers can
//! draw the valid prefix.  A letter that is not a path command at all is reported as
//! [`ErrorKind::UnknownCommand`], which callers treat as fatal.

use std::fmt;
use std::str;

use crate::path_builder::{LargeArc, PathBuilder, Sweep};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Command {
    MoveTo,
    LineTo,
    HorizontalLineTo,
    VerticalLineTo,
    CurveTo,
    SmoothCurveTo,
    QuadraticCurveTo,
    SmoothQuadraticCurveTo,
    Arc,
    ClosePath,
}

impl Command {
    fn from_letter(c: u8) -> Option<Command> {
        let cmd = match c.to_ascii_uppercase() {
            b'M' => Command::MoveTo,
            b'L' => Command::LineTo,
            b'H' => Command::HorizontalLineTo,
            b'V' => Command::VerticalLineTo,
            b'C' => Command::CurveTo,
            b'S' => Command::SmoothCurveTo,
            b'Q' => Command::QuadraticCurveTo,
            b'T' => Command::SmoothQuadraticCurveTo,
            b'A' => Command::Arc,
            b'Z' => Command::ClosePath,
            _ => return None,
        };

        Some(cmd)
    }
}

/// The control point that the next smooth curve reflects about the current point.
#[derive(Debug, Copy, Clone)]
enum LastControl {
    None,
    Cubic(f64, f64),
    Quadratic(f64, f64),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A byte that cannot appear at this point.
    UnexpectedByte(u8),

    /// A path command where a moveto was expected.
    UnexpectedCommand(u8),

    /// A letter that does not name any path command.
    UnknownCommand(u8),

    InvalidNumber,

    /// An arc flag that is not `0` or `1`.
    InvalidFlag(u8),

    UnexpectedEof,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseError {
    pub position: usize,
    pub kind: ErrorKind,
}

impl ParseError {
    /// Whether the error must abort rendering instead of drawing the parsed prefix.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::UnknownCommand(_))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error at position {}: ", self.position)?;

        match self.kind {
            ErrorKind::UnexpectedByte(b) => write!(f, "unexpected '{}'", b.escape_ascii()),
            ErrorKind::UnexpectedCommand(c) => {
                write!(f, "path must start with a moveto, not '{}'", c as char)
            }
            ErrorKind::UnknownCommand(c) => write!(f, "unknown path command '{}'", c as char),
            ErrorKind::InvalidNumber => write!(f, "invalid number"),
            ErrorKind::InvalidFlag(b) => write!(f, "invalid arc flag '{}'", b.escape_ascii()),
            ErrorKind::UnexpectedEof => write!(f, "unexpected end of data"),
        }
    }
}

fn starts_number(c: u8) -> bool {
    c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.')
}

pub struct PathParser<'b> {
    input: &'b [u8],
    pos: usize,

    builder: &'b mut PathBuilder,

    current: (f64, f64),
    subpath_start: (f64, f64),
    last_control: LastControl,
}

impl<'b> PathParser<'b> {
    pub fn new(builder: &'b mut PathBuilder, path_str: &'b str) -> PathParser<'b> {
        PathParser {
            input: path_str.as_bytes(),
            pos: 0,
            builder,
            current: (0.0, 0.0),
            subpath_start: (0.0, 0.0),
            last_control: LastControl::None,
        }
    }

    /// Parses the whole path data, pushing commands into the builder.
    ///
    /// Empty or whitespace-only data is valid and yields no commands.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        let mut seen_moveto = false;

        loop {
            self.skip_whitespace();

            if self.peek().is_none() {
                return Ok(());
            }

            let start = self.pos;
            let (cmd, letter) = self.command_letter()?;

            if !seen_moveto && cmd != Command::MoveTo {
                return Err(self.error_at(start, ErrorKind::UnexpectedCommand(letter)));
            }
            seen_moveto = true;

            self.command(cmd, letter.is_ascii_lowercase())?;
        }
    }

    fn command(&mut self, mut cmd: Command, relative: bool) -> Result<(), ParseError> {
        loop {
            self.segment(cmd, relative)?;

            if cmd == Command::ClosePath {
                return Ok(());
            }

            // Extra coordinate pairs after a moveto are implicit linetos.
            if cmd == Command::MoveTo {
                cmd = Command::LineTo;
            }

            if !self.more_arguments() {
                return Ok(());
            }
        }
    }

    fn segment(&mut self, cmd: Command, relative: bool) -> Result<(), ParseError> {
        let (cx, cy) = self.current;
        let abs = |(x, y): (f64, f64)| if relative { (x + cx, y + cy) } else { (x, y) };

        match cmd {
            Command::MoveTo => {
                let to = abs(self.pair()?);
                self.builder.move_to(to.0, to.1);
                self.subpath_start = to;
                self.set_current(to, LastControl::None);
            }

            Command::LineTo => {
                let to = abs(self.pair()?);
                self.line_to(to);
            }

            Command::HorizontalLineTo => {
                let x = self.number()?;
                self.line_to((if relative { cx + x } else { x }, cy));
            }

            Command::VerticalLineTo => {
                let y = self.number()?;
                self.line_to((cx, if relative { cy + y } else { y }));
            }

            Command::CurveTo => {
                let c1 = abs(self.pair()?);
                let c2 = abs(self.next_pair()?);
                let to = abs(self.next_pair()?);
                self.curve_to(c1, c2, to);
            }

            Command::SmoothCurveTo => {
                let c2 = abs(self.pair()?);
                let to = abs(self.next_pair()?);

                let c1 = match self.last_control {
                    LastControl::Cubic(x, y) => (2.0 * cx - x, 2.0 * cy - y),
                    _ => (cx, cy),
                };

                self.curve_to(c1, c2, to);
            }

            Command::QuadraticCurveTo => {
                let c = abs(self.pair()?);
                let to = abs(self.next_pair()?);
                self.quadratic_curve_to(c, to);
            }

            Command::SmoothQuadraticCurveTo => {
                let to = abs(self.pair()?);

                let c = match self.last_control {
                    LastControl::Quadratic(x, y) => (2.0 * cx - x, 2.0 * cy - y),
                    _ => (cx, cy),
                };

                self.quadratic_curve_to(c, to);
            }

            Command::Arc => {
                let rx = self.number()?.abs();
                let ry = self.next_number()?.abs();
                let rotation = self.next_number()?;
                let large_arc = LargeArc(self.flag()?);
                let sweep = if self.flag()? {
                    Sweep::Positive
                } else {
                    Sweep::Negative
                };
                let to = abs(self.next_pair()?);

                self.builder
                    .arc(cx, cy, rx, ry, rotation, large_arc, sweep, to.0, to.1);
                self.set_current(to, LastControl::None);
            }

            Command::ClosePath => {
                self.builder.close_path();
                self.set_current(self.subpath_start, LastControl::None);
            }
        }

        Ok(())
    }

    fn set_current(&mut self, point: (f64, f64), control: LastControl) {
        self.current = point;
        self.last_control = control;
    }

    fn line_to(&mut self, to: (f64, f64)) {
        self.builder.line_to(to.0, to.1);
        self.set_current(to, LastControl::None);
    }

    fn curve_to(&mut self, c1: (f64, f64), c2: (f64, f64), to: (f64, f64)) {
        self.builder.curve_to(c1.0, c1.1, c2.0, c2.1, to.0, to.1);
        self.set_current(to, LastControl::Cubic(c2.0, c2.1));
    }

    /// Quadratic curves are stored as the equivalent cubic.
    fn quadratic_curve_to(&mut self, c: (f64, f64), to: (f64, f64)) {
        let (x0, y0) = self.current;

        self.builder.curve_to(
            (x0 + 2.0 * c.0) / 3.0,
            (y0 + 2.0 * c.1) / 3.0,
            (to.0 + 2.0 * c.0) / 3.0,
            (to.1 + 2.0 * c.1) / 3.0,
            to.0,
            to.1,
        );
        self.set_current(to, LastControl::Quadratic(c.0, c.1));
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn error_at(&self, position: usize, kind: ErrorKind) -> ParseError {
        ParseError { position, kind }
    }

    fn error(&self, kind: ErrorKind) -> ParseError {
        self.error_at(self.pos, kind)
    }

    /// Consumes one byte if it is in `set`.
    fn eat(&mut self, set: &[u8]) -> bool {
        match self.peek() {
            Some(c) if set.contains(&c) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_separator(&mut self) {
        self.skip_whitespace();
        self.eat(b",");
    }

    /// Whether another group of arguments follows; a comma says that one must.
    fn more_arguments(&mut self) -> bool {
        self.skip_whitespace();

        if self.eat(b",") {
            return true;
        }

        self.peek().map_or(false, starts_number)
    }

    fn command_letter(&mut self) -> Result<(Command, u8), ParseError> {
        let c = self.peek().ok_or_else(|| self.error(ErrorKind::UnexpectedEof))?;

        match Command::from_letter(c) {
            Some(cmd) => {
                self.pos += 1;
                Ok((cmd, c))
            }
            None if c.is_ascii_alphabetic() => Err(self.error(ErrorKind::UnknownCommand(c))),
            None => Err(self.error(ErrorKind::UnexpectedByte(c))),
        }
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();

        match self.peek() {
            None => return Err(self.error(ErrorKind::UnexpectedEof)),
            Some(c) if !starts_number(c) => return Err(self.error(ErrorKind::UnexpectedByte(c))),
            Some(_) => (),
        }

        let start = self.pos;

        self.eat(b"+-");
        let mut digits = self.digits();
        if self.eat(b".") {
            digits += self.digits();
        }

        if digits == 0 {
            return Err(self.error_at(start, ErrorKind::InvalidNumber));
        }

        if self.eat(b"eE") {
            self.eat(b"+-");
            self.digits();
        }

        str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| self.error_at(start, ErrorKind::InvalidNumber))
    }

    fn next_number(&mut self) -> Result<f64, ParseError> {
        self.skip_separator();
        self.number()
    }

    fn pair(&mut self) -> Result<(f64, f64), ParseError> {
        Ok((self.number()?, self.next_number()?))
    }

    fn next_pair(&mut self) -> Result<(f64, f64), ParseError> {
        self.skip_separator();
        self.pair()
    }

    fn flag(&mut self) -> Result<bool, ParseError> {
        self.skip_separator();
        self.skip_whitespace();

        match self.peek() {
            Some(c @ (b'0' | b'1')) => {
                self.pos += 1;
                Ok(c == b'1')
            }
            Some(c) => Err(self.error(ErrorKind::InvalidFlag(c))),
            None => Err(self.error(ErrorKind::UnexpectedEof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_builder::{CubicBezierCurve, EllipticalArc, PathCommand};

    fn parse(path_str: &str) -> (Vec<PathCommand>, Result<(), ParseError>) {
        let mut builder = PathBuilder::default();
        let result = builder.parse(path_str);

        (builder.into_path().iter().cloned().collect(), result)
    }

    fn commands(path_str: &str) -> Vec<PathCommand> {
        let (commands, result) = parse(path_str);
        assert_eq!(result, Ok(()), "parsing {:?}", path_str);
        commands
    }

    fn m(x: f64, y: f64) -> PathCommand {
        PathCommand::MoveTo(x, y)
    }

    fn l(x: f64, y: f64) -> PathCommand {
        PathCommand::LineTo(x, y)
    }

    fn c(pt1: (f64, f64), pt2: (f64, f64), to: (f64, f64)) -> PathCommand {
        PathCommand::CurveTo(CubicBezierCurve { pt1, pt2, to })
    }

    #[test]
    fn blank_data_is_an_empty_path() {
        assert!(commands("").is_empty());
        assert!(commands(" \t\r\n").is_empty());
    }

    #[test]
    fn number_syntax() {
        assert_eq!(commands("M+10-20"), vec![m(10.0, -20.0)]);
        assert_eq!(commands("M.5 5."), vec![m(0.5, 5.0)]);
        assert_eq!(commands("M1e2 1E-1"), vec![m(100.0, 0.1)]);
        assert_eq!(commands("M1.5.5"), vec![m(1.5, 0.5)]);
    }

    #[test]
    fn separators_are_optional() {
        let expected = vec![m(10.0, 20.0), l(30.0, 40.0)];

        for s in &["M 10 20 30 40", "M10,20,30,40", "M 10 , 20 30 ,40", "M10 20L30 40"] {
            assert_eq!(commands(s), expected, "{}", s);
        }

        assert_eq!(commands("M-10,20-30-40"), vec![m(-10.0, 20.0), l(-30.0, -40.0)]);
        assert_eq!(commands("M.1-2,3E2-4"), vec![m(0.1, -2.0), l(300.0, -4.0)]);
    }

    #[test]
    fn relative_moveto_continues_with_relative_lines() {
        assert_eq!(
            commands("m10 20 30 40 50 60"),
            vec![m(10.0, 20.0), l(40.0, 60.0), l(90.0, 120.0)]
        );
    }

    #[test]
    fn closepath_returns_to_the_subpath_start() {
        assert_eq!(
            commands("M10 10 l10 0 v10 h-10 z l5 5"),
            vec![
                m(10.0, 10.0),
                l(20.0, 10.0),
                l(20.0, 20.0),
                l(10.0, 20.0),
                PathCommand::ClosePath,
                l(15.0, 15.0),
            ]
        );
    }

    #[test]
    fn smooth_curves_reflect_only_their_own_kind() {
        assert_eq!(
            commands("M0 0 C10 0 20 10 20 20 S30 40 40 40"),
            vec![
                m(0.0, 0.0),
                c((10.0, 0.0), (20.0, 10.0), (20.0, 20.0)),
                c((20.0, 30.0), (30.0, 40.0), (40.0, 40.0)),
            ]
        );

        // After a line there is nothing to reflect.
        assert_eq!(
            commands("M0 0 L20 20 S30 40 40 40"),
            vec![m(0.0, 0.0), l(20.0, 20.0), c((20.0, 20.0), (30.0, 40.0), (40.0, 40.0))]
        );

        // A quadratic control point is not reflected by a cubic smooth curve.
        assert_eq!(
            commands("M0 0 Q30 30 60 0 S90 0 90 0")[2],
            c((60.0, 0.0), (90.0, 0.0), (90.0, 0.0))
        );
    }

    #[test]
    fn quadratics_become_cubics() {
        assert_eq!(
            commands("M0 0 Q30 30 60 0 t60 0"),
            vec![
                m(0.0, 0.0),
                c((20.0, 20.0), (40.0, 20.0), (60.0, 0.0)),
                c((80.0, -20.0), (100.0, -20.0), (120.0, 0.0)),
            ]
        );
    }

    #[test]
    fn arcs_with_packed_flags() {
        let arc = |large_arc, sweep, to| {
            PathCommand::Arc(EllipticalArc {
                r: (10.0, 20.0),
                x_axis_rotation: 30.0,
                large_arc: LargeArc(large_arc),
                sweep,
                from: (10.0, 20.0),
                to,
            })
        };

        assert_eq!(
            commands("M10 20 a-10 20 30 1120 30"),
            vec![m(10.0, 20.0), arc(true, Sweep::Positive, (30.0, 50.0))]
        );
        assert_eq!(
            commands("M10 20 A10,20,30,0,0,40,50"),
            vec![m(10.0, 20.0), arc(false, Sweep::Negative, (40.0, 50.0))]
        );
    }

    #[test]
    fn errors_keep_the_valid_prefix() {
        let (cmds, result) = parse("M10 20 L30 40 L50");
        assert_eq!(cmds, vec![m(10.0, 20.0), l(30.0, 40.0)]);
        assert_eq!(
            result,
            Err(ParseError {
                position: 17,
                kind: ErrorKind::UnexpectedEof
            })
        );

        let (cmds, result) = parse("M10 20 A10 20 30 2 1 40 50");
        assert_eq!(cmds, vec![m(10.0, 20.0)]);
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidFlag(b'2'));

        let (cmds, result) = parse("M10 20 Z 5");
        assert_eq!(cmds, vec![m(10.0, 20.0), PathCommand::ClosePath]);
        assert_eq!(result.unwrap_err().kind, ErrorKind::UnexpectedByte(b'5'));

        let (_, result) = parse("M10 20,");
        assert_eq!(result.unwrap_err().kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn first_command_must_be_a_moveto() {
        let (cmds, result) = parse("  L10 20");
        assert!(cmds.is_empty());
        assert_eq!(
            result,
            Err(ParseError {
                position: 2,
                kind: ErrorKind::UnexpectedCommand(b'L')
            })
        );
        assert!(!result.unwrap_err().is_fatal());
    }

    #[test]
    fn unknown_command_is_fatal() {
        let (cmds, result) = parse("M10 20 X30 40");
        assert_eq!(cmds, vec![m(10.0, 20.0)]);

        let err = result.unwrap_err();
        assert_eq!(err.position, 7);
        assert_eq!(err.kind, ErrorKind::UnknownCommand(b'X'));
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "error at position 7: unknown path command 'X'");
    }

    proptest::proptest! {
        #[test]
        fn never_panics(s in "[MmLlHhVvCcSsQqTtAaZz0-9 ,.eE+-]{0,64}") {
            let mut builder = PathBuilder::default();
            let _ = builder.parse(&s);
        }

        #[test]
        fn valid_prefix_starts_with_moveto(s in "[MLCZ0-9 ,.-]{1,48}") {
            let (cmds, _) = parse(&s);
            if let Some(first) = cmds.first() {
                proptest::prop_assert!(matches!(first, PathCommand::MoveTo(..)));
            }
        }
    }
}
