//! Resolve references to other documents and decide which ones may be loaded.

use std::fmt;
use url::Url;

/// Errors from resolving a reference into an URL that may be loaded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllowedUrlError {
    /// The reference could not be parsed as an URL.
    #[error("URL parse error: {0}")]
    UrlParseError(url::ParseError),

    /// A relative reference was used in a document that has no base URL.
    #[error("a base URL is required")]
    BaseRequired,

    /// The referenced URL does not use the same scheme as the base URL.
    #[error("cannot load from a different URI scheme")]
    DifferentUriSchemes,

    /// A `http:` document tried to load from another host.
    #[error("cannot load from a different host")]
    DifferentHost,

    /// Only `file:`, `http:`, `https:` and `data:` URLs are loadable.
    #[error("scheme is not allowed")]
    DisallowedScheme,

    /// The referenced file is not in the same directory as the base file, or below it.
    #[error("file is not a sibling or child of the base file")]
    NotSiblingOrChildOfBaseFile,

    /// Query strings could be used to smuggle requests; they are not allowed.
    #[error("no queries are allowed")]
    NoQueriesAllowed,

    /// The base file is the root of the file system.
    #[error("base is the root of the file system")]
    BaseIsRoot,

    /// A `file:` URL could not be turned into a path.
    #[error("invalid file path")]
    InvalidPath,

    /// The path could not be canonicalized, usually because it does not exist.
    #[error("could not canonicalize the file path")]
    CanonicalizationError,
}

/// Extracts the reference from a `url(...)` value; other values are returned as is.
///
/// Quotes around the reference are removed, so `url("#foo")` yields `#foo`.
pub fn strip_url_function(value: &str) -> &str {
    let value = value.trim();

    let inner = match (value.find("url("), value.rfind(')')) {
        (Some(start), Some(end)) if start + 4 <= end => &value[start + 4..end],
        _ => return value,
    };

    inner.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// The element id of a local `url(#id)` reference, as used by `clip-path`, `mask` or the
/// marker properties; `None` for anything else.
pub fn local_id(value: &str) -> Option<&str> {
    strip_url_function(value)
        .strip_prefix('#')
        .filter(|id| !id.is_empty())
}

/// A resolved reference: the document it points to, plus an optional element id.
///
/// `url` is `None` for references inside a document that was loaded from bytes with
/// no base URL, like `#foo` in a document read from stdin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedUrl {
    pub url: Option<Url>,
    pub fragment: Option<String>,
}

impl ParsedUrl {
    /// The key under which trees built from this reference are cached.
    pub fn cache_key(&self) -> (Option<String>, Option<String>) {
        (
            self.url.as_ref().map(|u| u.as_str().to_string()),
            self.fragment.clone(),
        )
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref url) = self.url {
            write!(f, "{}", url)?;
        }

        if let Some(ref fragment) = self.fragment {
            write!(f, "#{}", fragment)?;
        }

        Ok(())
    }
}

/// Decides which URLs are allowed to be loaded.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    /// Base URL; all relative references will be resolved with respect to this.
    pub base_url: Option<Url>,

    /// Whether to skip the loading policy altogether.
    pub unsafe_mode: bool,
}

impl UrlResolver {
    pub fn new(base_url: Option<Url>, unsafe_mode: bool) -> Self {
        UrlResolver {
            base_url,
            unsafe_mode,
        }
    }

    /// Resolves an `href` or `url(...)` value against the base URL.
    ///
    /// A reference with only a fragment, like `#foo`, points into the document with the
    /// base URL and is always allowed.  Anything else is checked against the loading
    /// policy, unless in unsafe mode:
    ///
    /// * `data:` URLs are always allowed.
    /// * Queries are not allowed.
    /// * The URL must use the same scheme as the base URL.
    /// * `file:` URLs must point to the base file's directory or one of its subdirectories.
    /// * `http:` and `https:` URLs must point to the same host as the base URL.
    pub fn resolve(&self, href: &str) -> Result<ParsedUrl, AllowedUrlError> {
        let href = strip_url_function(href);

        let (document, fragment) = match href.split_once('#') {
            Some((d, f)) => (d, Some(f.to_string()).filter(|f| !f.is_empty())),
            None => (href, None),
        };

        if document.is_empty() {
            return Ok(ParsedUrl {
                url: self.base_url.clone(),
                fragment,
            });
        }

        let url = self.resolve_document(document)?;
        Ok(ParsedUrl {
            url: Some(url),
            fragment,
        })
    }

    fn resolve_document(&self, href: &str) -> Result<Url, AllowedUrlError> {
        let base = match self.base_url {
            Some(ref base) => Some(base.clone()),
            None if self.unsafe_mode => std::env::current_dir()
                .ok()
                .and_then(|d| Url::from_directory_path(d).ok()),
            None => None,
        };

        let url = Url::options()
            .base_url(base.as_ref())
            .parse(href)
            .map_err(AllowedUrlError::UrlParseError)?;

        // Allow loads of data: from any location
        if url.scheme() == "data" || self.unsafe_mode {
            return Ok(url);
        }

        if url.query().is_some() {
            return Err(AllowedUrlError::NoQueriesAllowed);
        }

        let base_url = base.ok_or(AllowedUrlError::BaseRequired)?;

        if url.scheme() != base_url.scheme() {
            return Err(AllowedUrlError::DifferentUriSchemes);
        }

        match url.scheme() {
            "http" | "https" => {
                if url.host_str() == base_url.host_str() && url.port() == base_url.port() {
                    Ok(url)
                } else {
                    Err(AllowedUrlError::DifferentHost)
                }
            }

            "file" => check_sibling_or_child(url, &base_url),

            _ => Err(AllowedUrlError::DisallowedScheme),
        }
    }
}

fn check_sibling_or_child(url: Url, base_url: &Url) -> Result<Url, AllowedUrlError> {
    // A base of "file:///foo/bar.svg" and an href of "." give "file:///foo/", which
    // is a directory, not a file.
    let last_segment_empty = url
        .path_segments()
        .and_then(|mut segments| segments.next_back().map(|s| s.is_empty()))
        .unwrap_or(true);

    if last_segment_empty {
        return Err(AllowedUrlError::NotSiblingOrChildOfBaseFile);
    }

    let url_path = url
        .to_file_path()
        .map_err(|_| AllowedUrlError::InvalidPath)?;
    let base_path = base_url
        .to_file_path()
        .map_err(|_| AllowedUrlError::InvalidPath)?;

    let base_parent = base_path.parent().ok_or(AllowedUrlError::BaseIsRoot)?;

    let path_canon = url_path
        .canonicalize()
        .map_err(|_| AllowedUrlError::CanonicalizationError)?;
    let parent_canon = base_parent
        .canonicalize()
        .map_err(|_| AllowedUrlError::CanonicalizationError)?;

    if path_canon.starts_with(parent_canon) {
        Url::from_file_path(path_canon).map_err(|_| AllowedUrlError::InvalidPath)
    } else {
        Err(AllowedUrlError::NotSiblingOrChildOfBaseFile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn file_url(path: &std::path::Path) -> Url {
        Url::from_file_path(path.canonicalize().unwrap()).unwrap()
    }

    #[test]
    fn strips_url_function() {
        assert_eq!(strip_url_function("url(#foo)"), "#foo");
        assert_eq!(strip_url_function("url( '#foo' )"), "#foo");
        assert_eq!(strip_url_function("url(\"a.svg#b\") red"), "a.svg#b");
        assert_eq!(strip_url_function("#bar"), "#bar");
    }

    #[test]
    fn extracts_local_ids() {
        assert_eq!(local_id("url(#clip)"), Some("clip"));
        assert_eq!(local_id("url(other.svg#clip)"), None);
        assert_eq!(local_id("url(#)"), None);
        assert_eq!(local_id("none"), None);
    }

    #[test]
    fn fragment_only_points_to_base() {
        let base = Url::parse("file:///tmp/a.svg").unwrap();
        let resolver = UrlResolver::new(Some(base.clone()), false);

        let parsed = resolver.resolve("url(#foo)").unwrap();
        assert_eq!(parsed.url, Some(base));
        assert_eq!(parsed.fragment.as_deref(), Some("foo"));

        let resolver = UrlResolver::new(None, false);
        let parsed = resolver.resolve("#foo").unwrap();
        assert_eq!(parsed.url, None);
    }

    #[test]
    fn allows_data_url_with_no_base_file() {
        let resolver = UrlResolver::new(None, false);
        let parsed = resolver.resolve("data:image/png;base64,xxyyzz").unwrap();
        assert_eq!(
            parsed.url.unwrap().as_str(),
            "data:image/png;base64,xxyyzz"
        );
    }

    #[test]
    fn disallows_relative_file_with_no_base_file() {
        let resolver = UrlResolver::new(None, false);
        assert!(matches!(
            resolver.resolve("foo.svg"),
            Err(AllowedUrlError::UrlParseError(
                url::ParseError::RelativeUrlWithoutBase
            ))
        ));
    }

    #[test]
    fn disallows_different_schemes_and_hosts() {
        let resolver = UrlResolver::new(
            Some(Url::parse("http://example.com/malicious.svg").unwrap()),
            false,
        );
        assert!(matches!(
            resolver.resolve("file:///etc/passwd"),
            Err(AllowedUrlError::DifferentUriSchemes)
        ));
        assert!(matches!(
            resolver.resolve("http://other.example.com/a.svg"),
            Err(AllowedUrlError::DifferentHost)
        ));
        assert!(resolver.resolve("other.svg#x").is_ok());
    }

    #[test]
    fn disallows_queries() {
        let resolver = UrlResolver::new(Some(Url::parse("file:///example/bar.svg").unwrap()), false);
        assert!(matches!(
            resolver.resolve(".?../../../etc/passwd"),
            Err(AllowedUrlError::NoQueriesAllowed)
        ));
    }

    #[test]
    fn allows_siblings_and_children_only() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("base.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("sibling.svg"), "<svg/>").unwrap();
        fs::write(sub.join("child.svg"), "<svg/>").unwrap();

        let resolver = UrlResolver::new(Some(file_url(&dir.path().join("base.svg"))), false);

        let sibling = resolver.resolve("sibling.svg#a").unwrap();
        assert!(sibling.url.unwrap().as_str().ends_with("/sibling.svg"));
        assert_eq!(sibling.fragment.as_deref(), Some("a"));

        assert!(resolver.resolve("sub/child.svg").is_ok());
        assert!(matches!(
            resolver.resolve("."),
            Err(AllowedUrlError::NotSiblingOrChildOfBaseFile)
        ));
        assert!(matches!(
            resolver.resolve("missing.svg"),
            Err(AllowedUrlError::CanonicalizationError)
        ));

        let sub_resolver = UrlResolver::new(Some(file_url(&sub.join("child.svg"))), false);
        assert!(matches!(
            sub_resolver.resolve("../sibling.svg"),
            Err(AllowedUrlError::NotSiblingOrChildOfBaseFile)
        ));
    }

    #[test]
    fn unsafe_mode_skips_policy() {
        let resolver = UrlResolver::new(
            Some(Url::parse("http://example.com/a.svg").unwrap()),
            true,
        );
        assert!(resolver.resolve("file:///etc/passwd").is_ok());
    }
}
