//! Styled tree nodes.
//!
//! Like the raw XML tree, the styled tree uses the [rctree crate][rctree]: a [`Node`] is an
//! `rctree::Node<NodeData>`.  Each [`NodeData`] holds the element's tag, its text, and its
//! attributes after the cascade: inherited values, presentation attributes and CSS
//! declarations are all merged into one map of strings, with `currentColor` and `inherit`
//! already resolved.  Attribute values are parsed lazily, when the render walker needs
//! them, with [`NodeExt::parse_attr`].
//!
//! Nodes never carry render state.  Tangents, pending markers and the text cursor live in
//! the drawing context for the duration of one render, so a cached tree can be drawn any
//! number of times.
//!
//! [rctree]: https://crates.io/crates/rctree

use std::cell::Ref;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::error::*;
use crate::parsers::{parse_value, Parse};
use crate::xml::XmlNode;

/// Strong reference to a node in the styled tree.
pub type Node = rctree::Node<NodeData>;

/// Weak reference to a node in the styled tree.
pub type WeakNode = rctree::WeakNode<NodeData>;

/// Data for a single styled node.
pub struct NodeData {
    tag: String,

    /// Text content, after whitespace handling for text elements.
    pub text: String,

    attributes: BTreeMap<String, String>,

    /// The XML element this node was built from; `None` for anonymous text spans.
    pub xml: Option<XmlNode>,

    /// URL of the document this node comes from, for resolving relative references.
    pub url: Option<Url>,
}

impl NodeData {
    pub fn new(tag: &str, xml: Option<XmlNode>, url: Option<Url>) -> NodeData {
        NodeData {
            tag: tag.to_string(),
            text: String::new(),
            attributes: BTreeMap::new(),
            xml,
            url,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_tag(&mut self, tag: &str) {
        self.tag = tag.to_string();
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.attributes.iter()
    }

    /// Copy of the attribute map.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.attributes.clone()
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get("id") {
            Some(id) => write!(f, "{} id={}", self.tag, id),
            None => write!(f, "{}", self.tag),
        }
    }
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeData")
            .field("tag", &self.tag)
            .field("text", &self.text)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Helper methods for [`Node`].
pub trait NodeExt {
    fn data(&self) -> Ref<'_, NodeData>;

    fn tag(&self) -> String;

    fn has_tag(&self, tag: &str) -> bool;

    /// Copy of an attribute value.
    fn attr(&self, key: &str) -> Option<String>;

    fn has_attr(&self, key: &str) -> bool;

    /// The `id` attribute; every node built by the tree builder has one.
    fn id(&self) -> String;

    fn text(&self) -> String;

    /// Parses an attribute, if it is present.
    fn parse_attr<T: Parse>(&self, key: &str) -> Result<Option<T>, ElementError>;

    /// Parses an attribute, or returns `default` if it is not present.
    fn parse_attr_or<T: Parse>(&self, key: &str, default: T) -> Result<T, ElementError>;
}

impl NodeExt for Node {
    fn data(&self) -> Ref<'_, NodeData> {
        self.borrow()
    }

    fn tag(&self) -> String {
        self.borrow().tag.clone()
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.borrow().tag == tag
    }

    fn attr(&self, key: &str) -> Option<String> {
        self.borrow().get(key).map(String::from)
    }

    fn has_attr(&self, key: &str) -> bool {
        self.borrow().contains(key)
    }

    fn id(&self) -> String {
        self.borrow().get("id").unwrap_or_default().to_string()
    }

    fn text(&self) -> String {
        self.borrow().text.clone()
    }

    fn parse_attr<T: Parse>(&self, key: &str) -> Result<Option<T>, ElementError> {
        let data = self.borrow();

        match data.get(key) {
            Some(value) => parse_value(key, value).map(Some),
            None => Ok(None),
        }
    }

    fn parse_attr_or<T: Parse>(&self, key: &str, default: T) -> Result<T, ElementError> {
        self.parse_attr(key).map(|v| v.unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::length::{Horizontal, Length, LengthUnit};

    #[test]
    fn parses_attributes_lazily() {
        let mut data = NodeData::new("rect", None, None);
        data.set("x", "10mm");
        data.set("y", "foo");
        let node = Node::new(data);

        assert!(node.has_tag("rect"));
        assert_eq!(
            node.parse_attr::<Length<Horizontal>>("x").unwrap(),
            Some(Length::new(10.0, LengthUnit::Mm))
        );
        assert_eq!(node.parse_attr::<Length<Horizontal>>("width").unwrap(), None);

        let err = node.parse_attr::<Length<Horizontal>>("y").unwrap_err();
        assert_eq!(err.attr, "y");

        assert_eq!(node.parse_attr_or("opacity", 1.0).unwrap(), 1.0);
    }

    #[test]
    fn displays_tag_and_id() {
        let mut data = NodeData::new("g", None, None);
        assert_eq!(data.to_string(), "g");
        data.set("id", "foo");
        assert_eq!(data.to_string(), "g id=foo");
    }
}
