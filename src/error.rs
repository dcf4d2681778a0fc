//! Error types.

use cssparser::{BasicParseError, BasicParseErrorKind, ParseErrorKind, ToCss};

use crate::io::IoError;
use crate::limits::ImplementationLimit;

/// An error that borrows from the string being parsed.
///
/// Use [`AttributeResultExt::attribute`] to turn it into an owned [`ElementError`].
pub type ParseError<'i> = cssparser::ParseError<'i, ValueErrorKind>;

/// What went wrong with an attribute or property value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueErrorKind {
    #[error("unknown property name")]
    UnknownProperty,

    /// Syntax error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed, but out of range or otherwise unusable.
    #[error("invalid value: {0}")]
    Value(String),
}

impl ValueErrorKind {
    pub fn parse_error(s: &str) -> ValueErrorKind {
        ValueErrorKind::Parse(s.into())
    }

    pub fn value_error(s: &str) -> ValueErrorKind {
        ValueErrorKind::Value(s.into())
    }

    fn from_basic(kind: &BasicParseErrorKind<'_>) -> ValueErrorKind {
        match kind {
            BasicParseErrorKind::UnexpectedToken(tok) => {
                let mut quoted = String::from("unexpected token '");
                let _ = tok.to_css(&mut quoted);
                quoted.push('\'');
                ValueErrorKind::Parse(quoted)
            }
            BasicParseErrorKind::EndOfInput => ValueErrorKind::parse_error("unexpected end of input"),
            BasicParseErrorKind::AtRuleInvalid(_) | BasicParseErrorKind::AtRuleBodyInvalid => {
                ValueErrorKind::parse_error("invalid at-rule")
            }
            BasicParseErrorKind::QualifiedRuleInvalid => ValueErrorKind::parse_error("invalid rule"),
        }
    }
}

impl From<BasicParseError<'_>> for ValueErrorKind {
    fn from(e: BasicParseError<'_>) -> ValueErrorKind {
        ValueErrorKind::from_basic(&e.kind)
    }
}

/// An invalid value together with the name of the attribute that held it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{attr}: {err}")]
pub struct ElementError {
    pub attr: String,
    pub err: ValueErrorKind,
}

/// Annotates a parsing result with the attribute name, as `.attribute("stroke-width")`.
pub trait AttributeResultExt<O> {
    fn attribute(self, attr: &str) -> Result<O, ElementError>;
}

impl<O, E: Into<ValueErrorKind>> AttributeResultExt<O> for Result<O, E> {
    fn attribute(self, attr: &str) -> Result<O, ElementError> {
        self.map_err(|e| ElementError {
            attr: attr.into(),
            err: e.into(),
        })
    }
}

impl<'i, O> AttributeResultExt<O> for Result<O, ParseError<'i>> {
    fn attribute(self, attr: &str) -> Result<O, ElementError> {
        self.map_err(|e| {
            let err = match e.kind {
                ParseErrorKind::Custom(err) => err,
                ParseErrorKind::Basic(ref kind) => ValueErrorKind::from_basic(kind),
            };

            ElementError {
                attr: attr.into(),
                err,
            }
        })
    }
}

/// Errors that can happen while loading an SVG document or one of its references.
///
/// All of these are unrecoverable for the document (or reference) being loaded.  Note
/// that SVG is very lenient with respect to the syntax of attribute values; most
/// errors there will not lead to a `LoadingError`.  To see those errors, set the
/// `PAGESVG_LOG=1` environment variable.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadingError {
    /// XML syntax error.
    #[error("XML parse error: {0}")]
    XmlParseError(String),

    /// A malformed or disallowed URL was used.
    #[error("invalid URL")]
    BadUrl,

    /// A `data:` URL could not be decoded.
    #[error("invalid data: URL")]
    BadDataUrl,

    /// Generally an I/O error while fetching a document.
    #[error("{0}")]
    Io(String),

    /// The fragment part of a reference names an element that does not exist.
    #[error("No tag with id=\"{0}\" found.")]
    NoSuchId(String),

    /// A particular implementation-defined limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(ImplementationLimit),

    /// The document was rejected by the security policy; see `Options::unsafe_mode`.
    #[error("unsafe content rejected: {0}")]
    UnsafeContent(String),

    /// Catch-all for loading errors.
    #[error("{0}")]
    Other(String),
}

impl From<IoError> for LoadingError {
    fn from(e: IoError) -> LoadingError {
        match e {
            IoError::BadDataUrl => LoadingError::BadDataUrl,
            IoError::TooLarge(n) => {
                LoadingError::UnsafeContent(format!("document larger than {} bytes", n))
            }
            IoError::Unsupported(s) => LoadingError::Io(format!("unsupported URL: {}", s)),
            IoError::Io(s) => LoadingError::Io(s),
        }
    }
}

/// Errors that can happen while rendering a document.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderingError {
    /// An error from the rendering backend.
    #[error("rendering error: {0}")]
    Rendering(String),

    /// A particular implementation-defined limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(ImplementationLimit),

    /// An element references itself, directly or through other elements.
    #[error("circular reference to {0}")]
    CircularReference(String),

    /// Path data contains a command letter that does not exist.
    #[error("invalid path data: {0}")]
    InvalidPath(String),

    /// A mandatory reference could not be loaded.
    #[error(transparent)]
    Loading(#[from] LoadingError),
}

/// Errors from looking up an element referenced by `url(#id)` or `href`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquireError {
    /// The reference does not point to an existing element.
    #[error("link not found: {0}")]
    LinkNotFound(String),

    /// The element points to an element of the wrong kind, like `fill="url(#some_rect)"`.
    #[error("invalid link type: {0}")]
    InvalidLinkType(String),

    /// The element is already being resolved further up the stack.
    #[error("circular reference to {0}")]
    CircularReference(String),

    /// Too many elements were resolved during this render.
    #[error("maximum number of referenced elements exceeded")]
    MaxReferencesExceeded,

    /// The referenced document could not be loaded.
    #[error(transparent)]
    Loading(#[from] LoadingError),
}

/// Errors that stop one element from being drawn.
///
/// The render walker logs these and carries on with the element's siblings.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InternalRenderingError {
    /// An attribute had a value that could not be used.
    #[error(transparent)]
    Attribute(#[from] ElementError),

    /// A hard error that must abort the whole render.
    #[error(transparent)]
    Fatal(#[from] RenderingError),
}

impl From<LoadingError> for InternalRenderingError {
    fn from(e: LoadingError) -> InternalRenderingError {
        InternalRenderingError::Fatal(RenderingError::Loading(e))
    }
}

impl From<AcquireError> for RenderingError {
    fn from(e: AcquireError) -> RenderingError {
        match e {
            AcquireError::MaxReferencesExceeded => {
                RenderingError::LimitExceeded(ImplementationLimit::TooManyReferencedElements)
            }
            AcquireError::CircularReference(s) => RenderingError::CircularReference(s),
            AcquireError::Loading(e) => RenderingError::Loading(e),
            e => RenderingError::Rendering(e.to_string()),
        }
    }
}

impl From<AcquireError> for InternalRenderingError {
    fn from(e: AcquireError) -> InternalRenderingError {
        InternalRenderingError::Fatal(RenderingError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::Parse;

    #[test]
    fn parse_errors_are_annotated_with_the_attribute() {
        let res: Result<f64, _> = f64::parse_str("foo").attribute("stroke-width");
        let err = res.unwrap_err();
        assert_eq!(err.attr, "stroke-width");
        assert!(matches!(err.err, ValueErrorKind::Parse(_)));
    }

    #[test]
    fn unexpected_tokens_are_quoted() {
        let err = f64::parse_str("1 px").attribute("x").unwrap_err();
        assert_eq!(err.to_string(), "x: parse error: unexpected token 'px'");

        let err = f64::parse_str("").attribute("y").unwrap_err();
        assert_eq!(err.err, ValueErrorKind::parse_error("unexpected end of input"));
    }

    #[test]
    fn missing_id_message() {
        let e = LoadingError::NoSuchId("foo".to_string());
        assert_eq!(e.to_string(), "No tag with id=\"foo\" found.");
    }
}
