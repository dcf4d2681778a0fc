//! The kinds of element that the render walker knows about.

use std::fmt;

/// Every element the walker dispatches on; anything else is [`ElementKind::Unknown`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    A,
    Circle,
    ClipPath,
    Defs,
    Ellipse,
    Filter,
    G,
    Image,
    Line,
    LinearGradient,
    Marker,
    Mask,
    Path,
    Pattern,
    Polygon,
    Polyline,
    RadialGradient,
    Rect,
    Stop,
    Style,
    Svg,
    Switch,
    Symbol,
    Text,
    TextPath,
    TRef,
    TSpan,
    Use,
    Unknown,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> ElementKind {
        use ElementKind::*;

        match tag {
            "a" => A,
            "circle" => Circle,
            "clipPath" => ClipPath,
            "defs" => Defs,
            "ellipse" => Ellipse,
            "filter" => Filter,
            "g" => G,
            "image" => Image,
            "line" => Line,
            "linearGradient" => LinearGradient,
            "marker" => Marker,
            "mask" => Mask,
            "path" => Path,
            "pattern" => Pattern,
            "polygon" => Polygon,
            "polyline" => Polyline,
            "radialGradient" => RadialGradient,
            "rect" => Rect,
            "stop" => Stop,
            "style" => Style,
            "svg" => Svg,
            "switch" => Switch,
            "symbol" => Symbol,
            "text" => Text,
            "textPath" => TextPath,
            "tref" => TRef,
            "tspan" => TSpan,
            "use" => Use,
            _ => Unknown,
        }
    }

    /// Elements whose children are only drawn when something references them.
    pub fn is_invisible(self) -> bool {
        use ElementKind::*;

        matches!(
            self,
            ClipPath | Filter | LinearGradient | Marker | Mask | Pattern | RadialGradient | Symbol
        )
    }

    pub fn is_shape(self) -> bool {
        use ElementKind::*;

        matches!(self, Circle | Ellipse | Line | Path | Polygon | Polyline | Rect)
    }

    pub fn is_text(self) -> bool {
        matches!(self, ElementKind::Text | ElementKind::TSpan | ElementKind::TextPath)
    }

    pub fn is_gradient(self) -> bool {
        matches!(self, ElementKind::LinearGradient | ElementKind::RadialGradient)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_are_unknown() {
        assert_eq!(ElementKind::from_tag("rect"), ElementKind::Rect);
        assert_eq!(ElementKind::from_tag("clipPath"), ElementKind::ClipPath);
        assert_eq!(ElementKind::from_tag("clippath"), ElementKind::Unknown);
        assert_eq!(
            ElementKind::from_tag("{http://example.com}rect"),
            ElementKind::Unknown
        );
    }

    #[test]
    fn classifies_elements() {
        assert!(ElementKind::Symbol.is_invisible());
        assert!(!ElementKind::G.is_invisible());
        assert!(ElementKind::Polygon.is_shape());
        assert!(!ElementKind::Text.is_shape());
        assert!(ElementKind::RadialGradient.is_gradient());
    }
}
