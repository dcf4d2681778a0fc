//! SVG paint servers.

use cssparser::Parser;

use crate::bbox;
use crate::color::Rgba;
use crate::document::{AcquiredNode, AcquiredNodes};
use crate::drawing_ctx::DrawingCtx;
use crate::element::ElementKind;
use crate::error::*;
use crate::gradient;
use crate::node::{Node, NodeExt};
use crate::parsers::Parse;
use crate::pattern;
use crate::rect::Rect;
use crate::session::Session;
use crate::surface::Source;
use crate::svg_log;

/// The value of the `fill` and `stroke` properties.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintServer {
    None,
    Iri {
        /// Reference to the gradient or pattern, as written in `url()`.  Only
        /// references within the document (`#id`) can be resolved.
        iri: String,
        alternate: Option<Rgba>,
    },
    SolidColor(Rgba),
}

impl Parse for PaintServer {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<PaintServer, ParseError<'i>> {
        if parser
            .try_parse(|i| i.expect_ident_matching("none"))
            .is_ok()
        {
            Ok(PaintServer::None)
        } else if let Ok(url) = parser.try_parse(|i| i.expect_url()) {
            let iri = url.to_string();

            let alternate = if !parser.is_exhausted() {
                if parser
                    .try_parse(|i| i.expect_ident_matching("none"))
                    .is_ok()
                {
                    None
                } else {
                    Some(Rgba::parse(parser)?)
                }
            } else {
                None
            };

            Ok(PaintServer::Iri { iri, alternate })
        } else {
            Ok(Rgba::parse(parser).map(PaintServer::SolidColor)?)
        }
    }
}

impl PaintServer {
    /// Resolves the paint into a source for the surface, or `None` if nothing should
    /// be painted.
    ///
    /// A reference that cannot be resolved falls back to the alternate color, or to no
    /// paint; only exceeding the limit of referenced elements is an error.  `bbox`
    /// caches the element's bounding box between fill and stroke, since it is only
    /// computed when a paint server needs it.
    pub fn resolve(
        &self,
        draw_ctx: &mut DrawingCtx<'_>,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        bbox: &mut Option<Option<Rect>>,
        opacity: f64,
    ) -> Result<Option<Source>, InternalRenderingError> {
        match *self {
            PaintServer::None => Ok(None),

            PaintServer::SolidColor(color) => Ok(Some(Source::Solid(
                draw_ctx.config().adjust_color(color).with_opacity(opacity),
            ))),

            PaintServer::Iri {
                ref iri,
                alternate,
            } => match acquire_server(acquired_nodes, iri) {
                Ok(server) => server.to_source(draw_ctx, acquired_nodes, node, bbox, opacity),

                Err(AcquireError::MaxReferencesExceeded) => {
                    svg_log!(draw_ctx.session(), "maximum number of references exceeded");
                    Err(AcquireError::MaxReferencesExceeded.into())
                }

                // This also catches circular references in the `href` of a gradient or
                // pattern, which make the paint server invalid; we fall back to the
                // alternate color.
                Err(e) => match alternate {
                    Some(color) => {
                        svg_log!(
                            draw_ctx.session(),
                            "could not resolve paint server \"{}\" ({}), using alternate color",
                            iri,
                            e
                        );

                        Ok(Some(Source::Solid(
                            draw_ctx.config().adjust_color(color).with_opacity(opacity),
                        )))
                    }

                    None => {
                        svg_log!(
                            draw_ctx.session(),
                            "could not resolve paint server \"{}\" ({}), no alternate color specified",
                            iri,
                            e
                        );

                        Ok(None)
                    }
                },
            },
        }
    }
}

/// Parses an attribute of a paint server; invalid values are logged and treated as
/// unspecified, so that they can be taken from a fallback in the `href` chain.
pub fn lenient_attr<T: Parse>(node: &Node, key: &str, session: &Session) -> Option<T> {
    node.parse_attr(key).unwrap_or_else(|e| {
        svg_log!(session, "ignoring attribute of {}: {}", node.data(), e);
        None
    })
}

enum ResolvedServer {
    Gradient(gradient::ResolvedGradient),
    Pattern(pattern::ResolvedPattern),
}

/// A paint server with its `href` chain resolved.
///
/// The element stays acquired until the source is built, so that pattern contents that
/// use the pattern itself are caught as circular references.
struct AcquiredServer {
    _acquired: AcquiredNode,
    server: ResolvedServer,
}

fn acquire_server(
    acquired_nodes: &mut AcquiredNodes<'_>,
    iri: &str,
) -> Result<AcquiredServer, AcquireError> {
    let id = iri
        .strip_prefix('#')
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AcquireError::LinkNotFound(iri.to_string()))?;

    let acquired = acquired_nodes.acquire_id(id)?;
    let node = acquired.get().clone();
    let kind = ElementKind::from_tag(&node.tag());

    let server = if kind.is_gradient() {
        ResolvedServer::Gradient(gradient::resolve(&node, acquired_nodes)?)
    } else if kind == ElementKind::Pattern {
        ResolvedServer::Pattern(pattern::resolve(&node, acquired_nodes)?)
    } else {
        return Err(AcquireError::InvalidLinkType(iri.to_string()));
    };

    Ok(AcquiredServer {
        _acquired: acquired,
        server,
    })
}

impl AcquiredServer {
    fn to_source(
        &self,
        draw_ctx: &mut DrawingCtx<'_>,
        acquired_nodes: &mut AcquiredNodes<'_>,
        node: &Node,
        bbox: &mut Option<Option<Rect>>,
        opacity: f64,
    ) -> Result<Option<Source>, InternalRenderingError> {
        let params = draw_ctx.view_params();
        let bbox = *bbox.get_or_insert_with(|| bbox::node_bbox(node, acquired_nodes, &params));

        match self.server {
            ResolvedServer::Gradient(ref g) => {
                Ok(g.to_source(&params, bbox, opacity, draw_ctx.config()))
            }

            ResolvedServer::Pattern(ref p) => p.to_source(draw_ctx, acquired_nodes, bbox),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catches_invalid_syntax() {
        assert!(PaintServer::parse_str("").is_err());
        assert!(PaintServer::parse_str("42").is_err());
        assert!(PaintServer::parse_str("invalid").is_err());
    }

    #[test]
    fn parses_none() {
        assert_eq!(PaintServer::parse_str("none").unwrap(), PaintServer::None);
    }

    #[test]
    fn parses_solid_color() {
        assert_eq!(
            PaintServer::parse_str("rgb(255, 0, 0, 0.5)").unwrap(),
            PaintServer::SolidColor(Rgba::new(1.0, 0.0, 0.0, 0.5))
        );
    }

    #[test]
    fn parses_iri() {
        assert_eq!(
            PaintServer::parse_str("url(#link)").unwrap(),
            PaintServer::Iri {
                iri: "#link".to_string(),
                alternate: None,
            }
        );

        assert_eq!(
            PaintServer::parse_str("url(#link) none").unwrap(),
            PaintServer::Iri {
                iri: "#link".to_string(),
                alternate: None,
            }
        );

        assert_eq!(
            PaintServer::parse_str("url(#link) #ff0000").unwrap(),
            PaintServer::Iri {
                iri: "#link".to_string(),
                alternate: Some(Rgba::new(1.0, 0.0, 0.0, 1.0)),
            }
        );

        assert!(PaintServer::parse_str("url(#link) invalid").is_err());
    }

    #[test]
    fn keeps_references_to_other_documents() {
        assert_eq!(
            PaintServer::parse_str("url(other.svg#link) #00ff00").unwrap(),
            PaintServer::Iri {
                iri: "other.svg#link".to_string(),
                alternate: Some(Rgba::new(0.0, 1.0, 0.0, 1.0)),
            }
        );
    }
}
