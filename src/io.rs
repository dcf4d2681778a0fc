//! Utilities to acquire data from URLs.

use data_url::DataUrl;
use std::fmt;
use std::io::Read;
use url::Url;

use crate::limits::MAX_DOCUMENT_BYTES;

pub enum IoError {
    BadDataUrl,
    TooLarge(usize),
    Unsupported(String),
    Io(String),
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> IoError {
        IoError::Io(e.to_string())
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IoError::BadDataUrl => write!(f, "invalid data: URL"),
            IoError::TooLarge(n) => write!(f, "data larger than {} bytes", n),
            IoError::Unsupported(ref s) => write!(f, "unsupported URL scheme: {}", s),
            IoError::Io(ref s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Debug for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub struct BinaryData {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

impl BinaryData {
    /// Whether the data looks like an SVG document, possibly gzipped.
    pub fn is_svg(&self) -> bool {
        if let Some(ref mime) = self.mime_type {
            if mime.starts_with("image/svg") {
                return true;
            }
        }

        let start = &self.data[..self.data.len().min(5)];
        start == b"<svg " || start == b"<?xml" || start == b"<!DOC" || is_gzip(&self.data)
    }
}

/// Fetches the contents of URLs.
///
/// The library calls this for every external document it needs: referenced SVG files,
/// stylesheets, and images.  Implement it to plug in a different transport or caching.
pub trait UrlFetcher {
    fn fetch(&self, url: &Url) -> Result<BinaryData, IoError>;
}

/// Reads `data:` and `file:` URLs, and `http:`/`https:` ones with the `http` feature.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    /// Maximum number of bytes to read, or `None` for no limit.
    pub max_bytes: Option<usize>,
}

impl Default for DefaultFetcher {
    fn default() -> DefaultFetcher {
        DefaultFetcher {
            max_bytes: Some(MAX_DOCUMENT_BYTES),
        }
    }
}

impl DefaultFetcher {
    pub fn new(unsafe_mode: bool) -> DefaultFetcher {
        DefaultFetcher {
            max_bytes: if unsafe_mode {
                None
            } else {
                Some(MAX_DOCUMENT_BYTES)
            },
        }
    }

    fn check_size(&self, len: usize) -> Result<(), IoError> {
        match self.max_bytes {
            Some(max) if len > max => Err(IoError::TooLarge(max)),
            _ => Ok(()),
        }
    }
}

impl UrlFetcher for DefaultFetcher {
    fn fetch(&self, url: &Url) -> Result<BinaryData, IoError> {
        let data = match url.scheme() {
            "data" => decode_data_uri(url.as_str())?,

            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| IoError::Io(format!("invalid file URL: {}", url)))?;
                let data = std::fs::read(&path)?;
                let mime_type = mime_from_extension(url.path());

                BinaryData { data, mime_type }
            }

            #[cfg(feature = "http")]
            "http" | "https" => fetch_http(url, self.max_bytes)?,

            scheme => return Err(IoError::Unsupported(scheme.to_string())),
        };

        self.check_size(data.data.len())?;
        Ok(data)
    }
}

fn decode_data_uri(uri: &str) -> Result<BinaryData, IoError> {
    let data_url = DataUrl::process(uri).map_err(|_| IoError::BadDataUrl)?;

    let mime_type = data_url.mime_type().to_string();

    let (bytes, fragment_id) = data_url.decode_to_vec().map_err(|_| IoError::BadDataUrl)?;

    // data: URLs cannot have fragment identifiers; one here probably means mis-quoted
    // SVG data inside the URL.
    if fragment_id.is_some() {
        return Err(IoError::BadDataUrl);
    }

    Ok(BinaryData {
        data: bytes,
        mime_type: Some(mime_type),
    })
}

fn mime_from_extension(path: &str) -> Option<String> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();

    let mime = match ext.as_str() {
        "svg" | "svgz" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "css" => "text/css",
        _ => return None,
    };

    Some(mime.to_string())
}

#[cfg(feature = "http")]
fn fetch_http(url: &Url, max_bytes: Option<usize>) -> Result<BinaryData, IoError> {
    use std::time::Duration;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pagesvg/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| IoError::Io(e.to_string()))?;

    let response = client
        .get(url.as_str())
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| IoError::Io(e.to_string()))?;

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let mut data = Vec::new();
    match max_bytes {
        Some(max) => {
            response.take(max as u64 + 1).read_to_end(&mut data)?;
        }
        None => {
            let mut response = response;
            response.read_to_end(&mut data)?;
        }
    }

    Ok(BinaryData { data, mime_type })
}

/// Whether the data starts with the gzip magic number.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Inflates gzip-compressed data; other data is returned unchanged.
///
/// With a `max_bytes` limit, decompression stops with an error as soon as the output
/// would exceed it, so that small compressed bombs cannot exhaust memory.
pub fn decompress_if_gzip(data: Vec<u8>, max_bytes: Option<usize>) -> Result<Vec<u8>, IoError> {
    if !is_gzip(&data) {
        return Ok(data);
    }

    let decoder = flate2::read::GzDecoder::new(&data[..]);
    let mut out = Vec::new();

    match max_bytes {
        Some(max) => {
            decoder.take(max as u64 + 1).read_to_end(&mut out)?;
            if out.len() > max {
                return Err(IoError::TooLarge(max));
            }
        }

        None => {
            let mut decoder = decoder;
            decoder.read_to_end(&mut out)?;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut e = GzEncoder::new(Vec::new(), Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    #[test]
    fn decodes_data_urls() {
        let fetcher = DefaultFetcher::default();
        let url = Url::parse("data:image/svg+xml;base64,PHN2Zy8+").unwrap();
        let data = fetcher.fetch(&url).unwrap();

        assert_eq!(data.data, b"<svg/>");
        assert_eq!(data.mime_type.as_deref(), Some("image/svg+xml"));
        assert!(data.is_svg());
    }

    #[test]
    fn rejects_unknown_schemes() {
        let fetcher = DefaultFetcher::default();
        let url = Url::parse("ftp://example.com/a.svg").unwrap();
        assert!(matches!(fetcher.fetch(&url), Err(IoError::Unsupported(_))));
    }

    #[test]
    fn reads_files_and_enforces_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.svg");
        std::fs::write(&path, b"<svg/>").unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let data = DefaultFetcher::default().fetch(&url).unwrap();
        assert_eq!(data.data, b"<svg/>");
        assert_eq!(data.mime_type.as_deref(), Some("image/svg+xml"));

        let small = DefaultFetcher { max_bytes: Some(3) };
        assert!(matches!(small.fetch(&url), Err(IoError::TooLarge(3))));
    }

    #[test]
    fn inflates_gzip() {
        let compressed = gzip(b"<svg/>");
        assert!(is_gzip(&compressed));
        assert_eq!(decompress_if_gzip(compressed, None).unwrap(), b"<svg/>");

        assert_eq!(decompress_if_gzip(b"<svg/>".to_vec(), Some(1)).unwrap(), b"<svg/>");
    }

    #[test]
    fn stops_inflating_at_limit() {
        let compressed = gzip(&[b' '; 4096]);
        assert!(matches!(
            decompress_if_gzip(compressed, Some(1024)),
            Err(IoError::TooLarge(1024))
        ));
    }
}
