//! Store XML element attributes and their values.

use std::slice;

use markup5ever::{LocalName, Namespace, Prefix, QualName};

pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The attributes of an element, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    attrs: Vec<(QualName, String)>,
}

/// Iterator from `Attributes.iter`.
pub struct AttributesIter<'a>(slice::Iter<'a, (QualName, String)>);

impl Attributes {
    pub fn new() -> Attributes {
        Attributes { attrs: Vec::new() }
    }

    /// Builds the attribute list of a parsed XML element.
    pub fn from_roxmltree(node: &roxmltree::Node<'_, '_>) -> Attributes {
        let attrs = node
            .attributes()
            .map(|a| {
                let ns = a.namespace().unwrap_or("");
                let prefix = match ns {
                    XLINK_NAMESPACE => Some(Prefix::from("xlink")),
                    XML_NAMESPACE => Some(Prefix::from("xml")),
                    _ => None,
                };

                (
                    QualName::new(prefix, Namespace::from(ns), LocalName::from(a.name())),
                    a.value().to_string(),
                )
            })
            .collect();

        Attributes { attrs }
    }

    pub fn push(&mut self, name: QualName, value: &str) {
        self.attrs.push((name, value.to_string()));
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Creates an iterator that yields `(&QualName, &str)` tuples.
    pub fn iter(&self) -> AttributesIter<'_> {
        AttributesIter(self.attrs.iter())
    }

    /// Looks up an attribute by the name used in styled nodes, like `"xlink:href"`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter()
            .find(|(name, _)| attribute_key(name) == key)
            .map(|(_, value)| value)
    }
}

impl<'a> Iterator for AttributesIter<'a> {
    type Item = (&'a QualName, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(name, value)| (name, value.as_str()))
    }
}

/// The key under which an attribute is stored in a styled node.
///
/// Attributes in no namespace use their local name; `xlink:` and `xml:` attributes keep
/// their conventional prefix; any other namespace is spelled out as `{namespace}name`.
pub fn attribute_key(name: &QualName) -> String {
    match &*name.ns {
        "" => name.local.to_string(),
        XLINK_NAMESPACE => format!("xlink:{}", name.local),
        XML_NAMESPACE => format!("xml:{}", name.local),
        ns => format!("{{{}}}{}", ns, name.local),
    }
}
