//! Main SVG document structure.
//!
//! A [`Document`] owns the styled tree of the main document, plus a [`Loader`] that
//! keeps every XML document and referenced subtree that was loaded while building or
//! drawing it.  References from `use`, `tref` and `image` elements are resolved through
//! [`Document::resolve`], which rebuilds the referenced subtree under the referencing
//! node, so that inherited attributes come from the place where it is used.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use url::Url;

use crate::cond::{self, UserLanguage};
use crate::css::{self, Matcher};
use crate::error::{AcquireError, LoadingError};
use crate::io::{BinaryData, DefaultFetcher, UrlFetcher};
use crate::limits;
use crate::node::{Node, NodeData, NodeExt};
use crate::session::Session;
use crate::svg_log;
use crate::text;
use crate::url_resolver::{ParsedUrl, UrlResolver};
use crate::xml::{self, attribute_key, XmlDocument, XmlNode, XmlNodeExt};

/// Attributes that are never copied from a parent node to its children.
pub const NOT_INHERITED: &[&str] = &[
    "transform",
    "opacity",
    "style",
    "viewBox",
    "stop-color",
    "stop-opacity",
    "width",
    "height",
    "filter",
    "mask",
    "rotate",
    "xlink:href",
    "href",
    "id",
    "x",
    "y",
    "overflow",
    "clip",
    "clip-path",
    "display",
];

/// Properties whose `currentColor` value is replaced by the `color` property.
const COLOR_PROPERTIES: &[&str] = &["fill", "stroke", "stop-color", "flood-color", "lighting-color"];

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Generates an `id` for a node that has none; unique within the process.
pub(crate) fn generate_id() -> String {
    format!("__pagesvg_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Options used to load a document and everything it references.
#[derive(Clone)]
pub struct LoadOptions {
    /// Lift the security policy: no size limits, entity declarations and any URL allowed.
    pub unsafe_mode: bool,

    /// Languages to match against `systemLanguage` attributes.
    pub user_language: UserLanguage,

    /// Fetches referenced documents, stylesheets and images.
    pub fetcher: Rc<dyn UrlFetcher>,
}

impl LoadOptions {
    pub fn new(unsafe_mode: bool) -> LoadOptions {
        LoadOptions {
            unsafe_mode,
            user_language: UserLanguage::current(),
            fetcher: Rc::new(DefaultFetcher::new(unsafe_mode)),
        }
    }

    pub fn with_user_language(self, user_language: UserLanguage) -> LoadOptions {
        LoadOptions {
            user_language,
            ..self
        }
    }

    pub fn with_fetcher(self, fetcher: Rc<dyn UrlFetcher>) -> LoadOptions {
        LoadOptions { fetcher, ..self }
    }
}

/// A parsed XML document with its compiled stylesheets.
pub struct LoadedDocument {
    pub xml: XmlDocument,
    pub matcher: Matcher,
    pub url: Option<Url>,
}

/// An element of a loaded document that was referenced by URL.
#[derive(Clone)]
pub struct CachedTree {
    pub element: XmlNode,
    pub doc: Rc<LoadedDocument>,
}

type TreeKey = (Option<String>, Option<String>);

/// Loads documents and builds styled trees out of them.
pub struct Loader {
    session: Session,
    options: LoadOptions,

    /// Loaded XML documents, by URL.  The main document is here as well.
    documents: RefCell<HashMap<Option<String>, Rc<LoadedDocument>>>,

    /// Referenced elements, by `(url, fragment)`.
    trees: RefCell<HashMap<TreeKey, CachedTree>>,
}

impl Loader {
    pub fn new(session: Session, options: LoadOptions) -> Loader {
        Loader {
            session,
            options,
            documents: RefCell::new(HashMap::new()),
            trees: RefCell::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn url_resolver(&self, base_url: Option<&Url>) -> UrlResolver {
        UrlResolver::new(base_url.cloned(), self.options.unsafe_mode)
    }

    /// Parses bytes into a document and registers it under `url`.
    pub fn parse_document(
        &self,
        data: Vec<u8>,
        url: Option<Url>,
    ) -> Result<Rc<LoadedDocument>, LoadingError> {
        let xml = xml::load_xml(&self.session, data, self.options.unsafe_mode)?;

        let resolver = self.url_resolver(url.as_ref());
        let matcher =
            Matcher::from_document(&xml, &resolver, self.options.fetcher.as_ref(), &self.session);

        let doc = Rc::new(LoadedDocument { xml, matcher, url });

        let key = doc.url.as_ref().map(|u| u.as_str().to_string());
        self.documents.borrow_mut().insert(key, doc.clone());

        Ok(doc)
    }

    fn document_for(&self, url: Option<&Url>) -> Result<Rc<LoadedDocument>, LoadingError> {
        let key = url.map(|u| u.as_str().to_string());

        if let Some(doc) = self.documents.borrow().get(&key) {
            return Ok(doc.clone());
        }

        let url = url.ok_or(LoadingError::BadUrl)?;
        let data = self.fetch(url)?;
        self.parse_document(data.data, Some(url.clone()))
    }

    /// Fetches the contents of an URL.
    pub fn fetch(&self, url: &Url) -> Result<BinaryData, LoadingError> {
        self.options.fetcher.fetch(url).map_err(LoadingError::from)
    }

    /// Resolves `href` against `base_url` and the loading policy.
    pub fn resolve_href(&self, href: &str, base_url: Option<&Url>) -> Result<ParsedUrl, LoadingError> {
        self.url_resolver(base_url).resolve(href).map_err(|e| {
            svg_log!(self.session, "could not resolve \"{}\": {}", href, e);
            LoadingError::BadUrl
        })
    }

    /// Finds the element that a reference points to, loading its document if needed.
    pub fn fetch_tree(&self, parsed: &ParsedUrl) -> Result<CachedTree, LoadingError> {
        let key = parsed.cache_key();

        if let Some(cached) = self.trees.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let doc = self.document_for(parsed.url.as_ref())?;

        let element = match parsed.fragment {
            Some(ref id) => xml::find_by_id(&doc.xml.root, id)
                .ok_or_else(|| LoadingError::NoSuchId(id.clone()))?,
            None => doc.xml.root.clone(),
        };

        let cached = CachedTree { element, doc };
        self.trees.borrow_mut().insert(key, cached.clone());

        Ok(cached)
    }

    /// Builds the styled tree for an XML element and all its descendants.
    pub fn build_node(
        &self,
        xml_node: &XmlNode,
        doc: &Rc<LoadedDocument>,
        parent: Option<&Node>,
    ) -> Result<Node, LoadingError> {
        let data = self.styled_data(xml_node, doc, parent);
        let tag = data.tag().to_string();
        let node = Node::new(data);

        if matches!(tag.as_str(), "text" | "textPath" | "a") {
            let (children, _) = text::text_children(self, &node, xml_node, doc, true, true)?;
            for child in children {
                node.append(child);
            }
        } else {
            for child in xml_node.child_elements() {
                if self.passes_conditions(&child) {
                    node.append(self.build_node(&child, doc, Some(&node))?);

                    if tag == "switch" {
                        break;
                    }
                }
            }
        }

        Ok(node)
    }

    /// Evaluates the conditional processing attributes of an element.
    pub fn passes_conditions(&self, xml_node: &XmlNode) -> bool {
        match xml_node.element() {
            Some(element) => cond::matches(
                |key| element.attributes.get(key),
                &self.options.user_language,
                &self.session,
            ),
            None => false,
        }
    }

    /// Computes the attributes of a node, without building its children.
    pub fn styled_data(
        &self,
        xml_node: &XmlNode,
        doc: &Rc<LoadedDocument>,
        parent: Option<&Node>,
    ) -> NodeData {
        let tag = xml_node
            .element()
            .map(|e| e.tag())
            .unwrap_or_default();

        let mut data = NodeData::new(&tag, Some(xml_node.clone()), doc.url.clone());

        if let Some(parent) = parent {
            inherit_attributes(&mut data, parent);
        }

        if let Some(element) = xml_node.element() {
            for (name, value) in element.attributes.iter() {
                data.set(&attribute_key(name), value);
            }
        }

        self.apply_css(&mut data, xml_node, doc);
        resolve_keywords(&mut data, parent);

        if !data.contains("id") {
            data.set("id", &generate_id());
        }

        data
    }

    /// Overlays the declarations of matching CSS rules and of the `style` attribute.
    ///
    /// Declarations are applied in cascade order; each one replaces an earlier value
    /// for the same property unless that value came from a declaration with a higher
    /// `(important, specificity)` weight.  Inline declarations weigh more than any
    /// selector.
    fn apply_css(&self, data: &mut NodeData, xml_node: &XmlNode, doc: &LoadedDocument) {
        const INLINE: u32 = u32::MAX;

        let matches = doc.matcher.matches(xml_node);

        let (inline_normal, inline_important) = match xml_node.attribute("style") {
            Some(style) => css::parse_declarations(&style, &self.session),
            None => (Vec::new(), Vec::new()),
        };

        let mut weights: HashMap<String, (bool, u32)> = HashMap::new();

        let ordered = matches
            .normal
            .iter()
            .map(|d| (&d.name, &d.value, (false, d.specificity)))
            .chain(inline_normal.iter().map(|(n, v)| (n, v, (false, INLINE))))
            .chain(
                matches
                    .important
                    .iter()
                    .map(|d| (&d.name, &d.value, (true, d.specificity))),
            )
            .chain(inline_important.iter().map(|(n, v)| (n, v, (true, INLINE))));

        for (name, value, weight) in ordered {
            match weights.entry(name.clone()) {
                Entry::Occupied(mut e) => {
                    if weight >= *e.get() {
                        e.insert(weight);
                        data.set(name, value.trim());
                    }
                }

                Entry::Vacant(e) => {
                    e.insert(weight);
                    data.set(name, value.trim());
                }
            }
        }
    }
}

/// Copies the parent's attributes, except the ones that are not inherited.
pub fn inherit_attributes(data: &mut NodeData, parent: &Node) {
    let parent = parent.data();

    for (key, value) in parent.iter() {
        if !NOT_INHERITED.contains(&key.as_str()) {
            data.set(key, value);
        }
    }
}

/// Replaces `currentColor` and `inherit` values.
fn resolve_keywords(data: &mut NodeData, parent: Option<&Node>) {
    for property in COLOR_PROPERTIES {
        if data
            .get(property)
            .is_some_and(|v| v.eq_ignore_ascii_case("currentColor"))
        {
            let color = data.get("color").unwrap_or("black").to_string();
            data.set(property, &color);
        }
    }

    let inherited: Vec<String> = data
        .iter()
        .filter(|(_, v)| v.eq_ignore_ascii_case("inherit"))
        .map(|(k, _)| k.clone())
        .collect();

    for key in inherited {
        match parent.and_then(|p| p.attr(&key)) {
            Some(value) => data.set(&key, &value),
            None => {
                data.remove(&key);
            }
        }
    }
}

/// A loaded SVG file and its derived data.
pub struct Document {
    loader: Loader,

    /// Root of the styled tree of the main document.
    root: Node,

    /// Mapping from `id` attributes to nodes.
    ids: RefCell<HashMap<String, Node>>,

    /// Trees of SVG documents used as images, by URL; each is built and indexed once.
    images: RefCell<HashMap<String, Node>>,
}

impl Document {
    /// Loads a document from bytes, which may be gzip-compressed.
    ///
    /// `base_url` is used to resolve relative references; without it, only references
    /// inside the document and `data:` URLs can be loaded, unless in unsafe mode.
    pub fn load_from_bytes(
        data: Vec<u8>,
        base_url: Option<Url>,
        options: LoadOptions,
        session: Session,
    ) -> Result<Document, LoadingError> {
        let loader = Loader::new(session, options);
        let doc = loader.parse_document(data, base_url)?;
        let root = loader.build_node(&doc.xml.root, &doc, None)?;

        let document = Document {
            loader,
            root,
            ids: RefCell::new(HashMap::new()),
            images: RefCell::new(HashMap::new()),
        };
        document.index_ids(&document.root);

        Ok(document)
    }

    /// Fetches an URL and loads the document there.
    pub fn load_from_url(
        url: &Url,
        options: LoadOptions,
        session: Session,
    ) -> Result<Document, LoadingError> {
        let data = options.fetcher.fetch(url)?;
        Document::load_from_bytes(data.data, Some(url.clone()), options, session)
    }

    pub fn root(&self) -> Node {
        self.root.clone()
    }

    pub fn session(&self) -> &Session {
        self.loader.session()
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Base URL of the main document.
    pub fn url(&self) -> Option<Url> {
        self.root.data().url.clone()
    }

    /// Looks up a node by its `id` attribute.
    pub fn lookup(&self, id: &str) -> Option<Node> {
        self.ids.borrow().get(id).cloned()
    }

    /// Registers the ids of a subtree; ids that are already known keep their node.
    fn index_ids(&self, root: &Node) {
        let mut ids = self.ids.borrow_mut();

        for node in root.descendants() {
            let id = node.id();
            if !id.is_empty() {
                ids.entry(id).or_insert_with(|| node.clone());
            }
        }
    }

    /// Resolves a reference and builds the referenced subtree under `parent`.
    ///
    /// The returned node is detached: it inherits from `parent` but is not one of its
    /// children, and its ids are not indexed.  Fetch failures and missing ids are hard
    /// errors.
    pub fn resolve(&self, href: &str, parent: &Node) -> Result<Node, LoadingError> {
        let base_url = parent.data().url.clone();
        let parsed = self.loader.resolve_href(href, base_url.as_ref())?;
        self.resolve_parsed(&parsed, parent)
    }

    pub fn resolve_parsed(&self, parsed: &ParsedUrl, parent: &Node) -> Result<Node, LoadingError> {
        let cached = self.loader.fetch_tree(parsed)?;
        let node = self
            .loader
            .build_node(&cached.element, &cached.doc, Some(parent))?;

        Ok(node)
    }

    /// Fetches the data that an `href` points to, as for `image` elements.
    pub fn fetch_href(&self, href: &str, node: &Node) -> Result<(BinaryData, Url), LoadingError> {
        let base_url = node.data().url.clone();
        let parsed = self.loader.resolve_href(href, base_url.as_ref())?;
        let url = parsed.url.ok_or(LoadingError::BadUrl)?;
        let data = self.loader.fetch(&url)?;

        Ok((data, url))
    }

    /// Loads an SVG document that is used as an image, and builds its tree.
    pub fn load_image_document(&self, data: Vec<u8>, url: Url) -> Result<Node, LoadingError> {
        if let Some(root) = self.images.borrow().get(url.as_str()) {
            return Ok(root.clone());
        }

        let key = url.to_string();
        let doc = self.loader.parse_document(data, Some(url))?;
        let root = self.loader.build_node(&doc.xml.root, &doc, None)?;

        self.index_ids(&root);
        self.images.borrow_mut().insert(key, root.clone());

        Ok(root)
    }
}

/// A node that was looked up through a reference.
///
/// While it is alive, the same element cannot be acquired again; this is how circular
/// references are detected.
pub struct AcquiredNode {
    stack: Rc<RefCell<Vec<String>>>,
    node: Node,
}

impl Drop for AcquiredNode {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl AcquiredNode {
    pub fn get(&self) -> &Node {
        &self.node
    }
}

/// Detects circular references between nodes, and enforces referencing limits.
///
/// Consider this fragment of SVG:
///
/// ```xml
/// <g id="a">
///   <use href="#a"/>
/// </g>
/// ```
///
/// Drawing the `use` instantiates the group, which contains the `use` again.  The
/// render walker acquires every referenced element through `AcquiredNodes`, which keeps
/// a stack of the references being drawn; trying to acquire one that is already in the
/// stack yields [`AcquireError::CircularReference`].
///
/// References can also be arranged to make the number of drawn elements grow
/// exponentially; `AcquiredNodes` counts every acquisition and fails with
/// [`AcquireError::MaxReferencesExceeded`] past [`limits::MAX_REFERENCED_ELEMENTS`].
pub struct AcquiredNodes<'i> {
    document: &'i Document,
    num_elements_acquired: usize,
    stack: Rc<RefCell<Vec<String>>>,
}

impl<'i> AcquiredNodes<'i> {
    pub fn new(document: &Document) -> AcquiredNodes<'_> {
        AcquiredNodes {
            document,
            num_elements_acquired: 0,
            stack: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn document(&self) -> &'i Document {
        self.document
    }

    fn push(&mut self, key: String, node: Node) -> Result<AcquiredNode, AcquireError> {
        self.num_elements_acquired += 1;

        if self.num_elements_acquired > limits::MAX_REFERENCED_ELEMENTS {
            return Err(AcquireError::MaxReferencesExceeded);
        }

        if self.stack.borrow().contains(&key) {
            return Err(AcquireError::CircularReference(key));
        }

        self.stack.borrow_mut().push(key);

        Ok(AcquiredNode {
            stack: self.stack.clone(),
            node,
        })
    }

    /// Acquires an element of the main document by its id, as for `url(#id)`.
    ///
    /// The node is the one in the document's tree, with the attributes it has there.
    pub fn acquire_id(&mut self, id: &str) -> Result<AcquiredNode, AcquireError> {
        let node = self
            .document
            .lookup(id)
            .ok_or_else(|| AcquireError::LinkNotFound(format!("#{}", id)))?;

        let key = ParsedUrl {
            url: self.document.url(),
            fragment: Some(id.to_string()),
        }
        .to_string();

        self.push(key, node)
    }

    /// Acquires the subtree that `href` points to, rebuilt under `parent`.
    pub fn acquire_href(&mut self, href: &str, parent: &Node) -> Result<AcquiredNode, AcquireError> {
        let base_url = parent.data().url.clone();
        let parsed = self
            .document
            .loader()
            .resolve_href(href, base_url.as_ref())?;

        let key = parsed.to_string();

        // Check before building, so that a circular reference does not build anything.
        if self.stack.borrow().contains(&key) {
            return Err(AcquireError::CircularReference(key));
        }

        let node = self.document.resolve_parsed(&parsed, parent)?;
        self.push(key, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(s: &str) -> Document {
        Document::load_from_bytes(
            s.as_bytes().to_vec(),
            None,
            LoadOptions::new(false).with_user_language(UserLanguage::from_locale_str("en")),
            Session::new_for_test_suite(),
        )
        .unwrap()
    }

    #[test]
    fn does_not_inherit_excluded_attributes() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <g id="g" transform="translate(10,0)" fill="red" opacity="0.5">
                   <rect id="r"/>
                 </g>
               </svg>"#,
        );

        let rect = doc.lookup("r").unwrap();
        assert!(!rect.has_attr("transform"));
        assert!(!rect.has_attr("opacity"));
        assert_eq!(rect.attr("fill").as_deref(), Some("red"));
    }

    #[test]
    fn resolves_current_color_and_inherit() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <g color="red" fill="blue">
                   <rect id="a" fill="currentColor"/>
                   <rect id="b" stroke="inherit" fill="inherit"/>
                 </g>
                 <rect id="c" fill="currentcolor"/>
               </svg>"#,
        );

        assert_eq!(doc.lookup("a").unwrap().attr("fill").as_deref(), Some("red"));
        let b = doc.lookup("b").unwrap();
        assert_eq!(b.attr("fill").as_deref(), Some("blue"));
        assert!(!b.has_attr("stroke"));
        assert_eq!(doc.lookup("c").unwrap().attr("fill").as_deref(), Some("black"));
    }

    #[test]
    fn generates_unique_ids() {
        let doc = load(r#"<svg xmlns="http://www.w3.org/2000/svg"><g/><g/></svg>"#);

        let root = doc.root();
        let ids: Vec<String> = root.descendants().map(|n| n.id()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn switch_keeps_first_match() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <switch id="s">
                   <g id="a" requiredFeatures="http://example.com/unsupported"/>
                   <g id="b"/>
                   <g id="c"/>
                 </switch>
               </svg>"#,
        );

        let switch = doc.lookup("s").unwrap();
        let children: Vec<String> = switch.children().map(|c| c.id()).collect();
        assert_eq!(children, vec!["b"]);
    }

    #[test]
    fn resolves_local_references_under_new_parent() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <defs><rect id="r" width="10"/></defs>
                 <g id="g" fill="green"/>
               </svg>"#,
        );

        let g = doc.lookup("g").unwrap();
        let rect = doc.resolve("#r", &g).unwrap();
        assert!(rect.parent().is_none());
        assert_eq!(rect.attr("fill").as_deref(), Some("green"));

        let again = doc.resolve("#r", &doc.root()).unwrap();
        assert!(!again.has_attr("fill"));

        assert!(matches!(
            doc.resolve("#nope", &g),
            Err(LoadingError::NoSuchId(ref id)) if id == "nope"
        ));
    }

    #[test]
    fn rebuilt_subtrees_do_not_grow_the_id_index() {
        let doc = load(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <defs><g id="r"><rect/><circle/></g></defs>
               </svg>"#,
        );
        let known = doc.ids.borrow().len();

        for _ in 0..3 {
            doc.resolve("#r", &doc.root()).unwrap();
        }
        assert_eq!(doc.ids.borrow().len(), known);

        let url = Url::parse("file:///tmp/image.svg").unwrap();
        let image = br#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="i"/></svg>"#;

        let first = doc.load_image_document(image.to_vec(), url.clone()).unwrap();
        let with_image = doc.ids.borrow().len();
        assert!(doc.lookup("i").is_some());

        let second = doc.load_image_document(image.to_vec(), url).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(doc.ids.borrow().len(), with_image);
    }

    #[test]
    fn detects_circular_references() {
        let doc = load(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <g id="a"><use href="#a"/></g>
               </svg>"##,
        );

        let mut acquired = AcquiredNodes::new(&doc);
        let root = doc.root();

        let first = acquired.acquire_href("#a", &root).unwrap();
        assert!(matches!(
            acquired.acquire_href("#a", first.get()),
            Err(AcquireError::CircularReference(_))
        ));

        drop(first);
        assert!(acquired.acquire_href("#a", &root).is_ok());
    }
}
