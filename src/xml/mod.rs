//! The XML loader.
//!
//! This reads raw bytes into a tree of [`XmlNode`], the unstyled representation of a
//! document that the CSS matcher and the tree builder work on.  The security policy is
//! applied here: without unsafe mode, documents are limited in size and number of
//! elements, and external entity declarations are rejected.

use markup5ever::{LocalName, Namespace, QualName};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::LoadingError;
use crate::io;
use crate::limits::{ImplementationLimit, MAX_DOCUMENT_BYTES, MAX_LOADED_ELEMENTS};
use crate::session::Session;
use crate::svg_log;

mod attributes;

pub use attributes::{attribute_key, Attributes, XLINK_NAMESPACE, XML_NAMESPACE};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// An XML element with its name and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: QualName,
    pub attributes: Attributes,
}

impl XmlElement {
    /// The tag name used by styled nodes.
    ///
    /// Elements in the SVG namespace (or in no namespace) are known by their local name;
    /// elements from other namespaces get a `{namespace}name` tag, so that they never
    /// collide with SVG elements.
    pub fn tag(&self) -> String {
        match &*self.name.ns {
            "" | SVG_NAMESPACE => self.name.local.to_string(),
            ns => format!("{{{}}}{}", ns, self.name.local),
        }
    }
}

/// Contents of a node in the raw XML tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlData {
    Element(XmlElement),
    Text(String),
}

impl fmt::Display for XmlData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            XmlData::Element(ref e) => write!(f, "<{}>", e.tag()),
            XmlData::Text(_) => write!(f, "text"),
        }
    }
}

/// A node in the raw XML tree.
pub type XmlNode = rctree::Node<XmlData>;

/// Helper methods for [`XmlNode`].
pub trait XmlNodeExt {
    fn is_element(&self) -> bool;

    fn is_text(&self) -> bool;

    /// Returns a copy of the element data, or `None` for text nodes.
    fn element(&self) -> Option<XmlElement>;

    /// The qualified name of an element, or `None` for text nodes.
    fn element_name(&self) -> Option<QualName>;

    /// Looks up an attribute; always `None` for text nodes.
    fn attribute(&self, key: &str) -> Option<String>;

    /// The text of a text node, or the empty string for elements.
    fn text(&self) -> String;

    /// Whether this is an element in the SVG namespace with the given local name.
    fn is_svg_element(&self, local_name: &str) -> bool;

    /// Text nodes that come before the first child element.
    fn leading_text(&self) -> Option<String>;

    /// Text nodes that come right after this node, before its next sibling element.
    fn tail_text(&self) -> Option<String>;

    /// All the descendant text, concatenated.
    fn flattened_text(&self) -> String;

    /// Child elements, skipping text.
    fn child_elements(&self) -> Box<dyn Iterator<Item = XmlNode>>;
}

impl XmlNodeExt for XmlNode {
    fn is_element(&self) -> bool {
        matches!(*self.borrow(), XmlData::Element(_))
    }

    fn is_text(&self) -> bool {
        matches!(*self.borrow(), XmlData::Text(_))
    }

    fn element(&self) -> Option<XmlElement> {
        match *self.borrow() {
            XmlData::Element(ref e) => Some(e.clone()),
            XmlData::Text(_) => None,
        }
    }

    fn element_name(&self) -> Option<QualName> {
        match *self.borrow() {
            XmlData::Element(ref e) => Some(e.name.clone()),
            XmlData::Text(_) => None,
        }
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match *self.borrow() {
            XmlData::Element(ref e) => e.attributes.get(key).map(String::from),
            XmlData::Text(_) => None,
        }
    }

    fn text(&self) -> String {
        match *self.borrow() {
            XmlData::Text(ref s) => s.clone(),
            XmlData::Element(_) => String::new(),
        }
    }

    fn is_svg_element(&self, local_name: &str) -> bool {
        match *self.borrow() {
            XmlData::Element(ref e) => {
                e.name.local.as_ref() == local_name
                    && matches!(&*e.name.ns, "" | SVG_NAMESPACE)
            }
            XmlData::Text(_) => false,
        }
    }

    fn leading_text(&self) -> Option<String> {
        collect_text(self.first_child())
    }

    fn tail_text(&self) -> Option<String> {
        collect_text(self.next_sibling())
    }

    fn flattened_text(&self) -> String {
        self.descendants()
            .filter(|n| n.is_text())
            .map(|n| n.text())
            .collect()
    }

    fn child_elements(&self) -> Box<dyn Iterator<Item = XmlNode>> {
        Box::new(self.children().filter(|c| c.is_element()))
    }
}

fn collect_text(mut node: Option<XmlNode>) -> Option<String> {
    let mut text: Option<String> = None;

    while let Some(n) = node {
        if !n.is_text() {
            break;
        }

        text.get_or_insert_with(String::new).push_str(&n.text());
        node = n.next_sibling();
    }

    text
}

/// Finds the element with the given `id` in a subtree.
pub fn find_by_id(root: &XmlNode, id: &str) -> Option<XmlNode> {
    root.descendants()
        .find(|n| n.attribute("id").as_deref() == Some(id))
}

/// A parsed XML document.
pub struct XmlDocument {
    /// The root element.
    pub root: XmlNode,

    /// Stylesheets referenced by `<?xml-stylesheet?>` processing instructions, in
    /// document order.
    pub stylesheet_hrefs: Vec<String>,
}

static EXTERNAL_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!ENTITY\s+(?:%\s+)?[^\s>]+\s+(?:SYSTEM|PUBLIC)\b").unwrap()
});

static PSEUDO_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Loads an XML document from possibly gzip-compressed bytes.
pub fn load_xml(
    session: &Session,
    data: Vec<u8>,
    unsafe_mode: bool,
) -> Result<XmlDocument, LoadingError> {
    let max_bytes = if unsafe_mode {
        None
    } else {
        Some(MAX_DOCUMENT_BYTES)
    };

    if let Some(max) = max_bytes {
        if data.len() > max {
            return Err(LoadingError::UnsafeContent(format!(
                "document larger than {} bytes",
                max
            )));
        }
    }

    let data = io::decompress_if_gzip(data, max_bytes)?;

    let text = String::from_utf8(data)
        .map_err(|_| LoadingError::XmlParseError(String::from("document is not valid UTF-8")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    if !unsafe_mode && EXTERNAL_ENTITY.is_match(text) {
        return Err(LoadingError::UnsafeContent(String::from(
            "external entity declarations are not allowed",
        )));
    }

    let mut options = roxmltree::ParsingOptions::default();
    options.allow_dtd = true;
    options.nodes_limit = if unsafe_mode {
        u32::MAX
    } else {
        MAX_LOADED_ELEMENTS
    };

    let doc = roxmltree::Document::parse_with_options(text, options).map_err(|e| match e {
        roxmltree::Error::NodesLimitReached => {
            LoadingError::LimitExceeded(ImplementationLimit::TooManyLoadedElements)
        }
        e => LoadingError::XmlParseError(e.to_string()),
    })?;

    let mut stylesheet_hrefs = Vec::new();

    for node in doc.root().children() {
        if let Some(pi) = node.pi() {
            if pi.target == "xml-stylesheet" {
                if let Some(href) = stylesheet_href(session, pi.value.unwrap_or("")) {
                    stylesheet_hrefs.push(href);
                }
            }
        }
    }

    let root = convert_element(&doc.root_element());

    Ok(XmlDocument {
        root,
        stylesheet_hrefs,
    })
}

fn convert_element(node: &roxmltree::Node<'_, '_>) -> XmlNode {
    let tag_name = node.tag_name();

    let element = XmlElement {
        name: QualName::new(
            None,
            Namespace::from(tag_name.namespace().unwrap_or("")),
            LocalName::from(tag_name.name()),
        ),
        attributes: Attributes::from_roxmltree(node),
    };

    let mut xml_node = XmlNode::new(XmlData::Element(element));

    for child in node.children() {
        if child.is_element() {
            xml_node.append(convert_element(&child));
        } else if child.is_text() {
            let text = child.text().unwrap_or("");
            xml_node.append(XmlNode::new(XmlData::Text(text.to_string())));
        }
    }

    xml_node
}

/// Parses the pseudo-attributes of an `xml-stylesheet` processing instruction.
///
/// Only non-alternate `text/css` stylesheets are used.
fn stylesheet_href(session: &Session, data: &str) -> Option<String> {
    let mut alternate = None;
    let mut type_ = None;
    let mut href = None;

    for cap in PSEUDO_ATTRIBUTE.captures_iter(data) {
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .map(|m| m.as_str().to_string());

        match &cap[1] {
            "alternate" => alternate = value,
            "type" => type_ = value,
            "href" => href = value,
            _ => (),
        }
    }

    if type_.as_deref().unwrap_or("text/css") != "text/css"
        || alternate.as_deref().is_some_and(|a| a != "no")
    {
        svg_log!(
            session,
            "ignoring xml-stylesheet processing instruction that is not for a text/css stylesheet"
        );
        return None;
    }

    if href.is_none() {
        svg_log!(
            session,
            "xml-stylesheet processing instruction does not have href; ignoring"
        );
    }

    href
}
