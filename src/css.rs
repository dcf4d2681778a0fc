//! Stylesheets: parsing, `@import`, and selector matching.
//!
//! CSS reaches a document from three places: `<?xml-stylesheet?>` processing
//! instructions, `<style>` elements, and `style` attributes.  The first two are
//! parsed into [`Stylesheet`]s made of qualified rules (a selector list and its
//! declarations); `@import` rules are followed through the [`UrlFetcher`] and their
//! rules are spliced in where the import appears.  `style` attributes are just
//! declaration lists and go through [`parse_declarations`].
//!
//! Tokenizing is done by `cssparser`, and selectors are parsed and matched by the
//! `selectors` crate.  Matching runs on the raw XML tree, before styled nodes exist,
//! so [`CssElement`] implements `selectors::Element` over an [`XmlNode`].
//!
//! Declarations are kept as normalized strings.  The tree builder merges them into
//! each node's attributes, and values are parsed only when something reads them.

use cssparser::{
    self, match_ignore_ascii_case, parse_important, AtRuleParser, BasicParseErrorKind, CowRcStr,
    DeclarationParser, Delimiter, Parser, ParserInput, ParserState, QualifiedRuleParser,
    RuleBodyItemParser, RuleBodyParser, SourceLocation, StyleSheetParser, ToCss,
};
use language_tags::LanguageTag;
use markup5ever::{self, Namespace};
use precomputed_hash::PrecomputedHash;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::context::SelectorCaches;
use selectors::matching::{
    ElementSelectorFlags, MatchingContext, MatchingForInvalidation, MatchingMode,
    NeedsSelectorFlags, QuirksMode,
};
use selectors::parser::ParseRelative;
use selectors::{OpaqueElement, SelectorImpl, SelectorList};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::*;
use crate::io::UrlFetcher;
use crate::limits::MAX_IMPORT_DEPTH;
use crate::session::Session;
use crate::svg_log;
use crate::url_resolver::UrlResolver;
use crate::xml::{XmlData, XmlDocument, XmlNode, XmlNodeExt};

/// One `name: value` pair; `fill: Green !important` gives `fill`, `green` and `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Properties whose values are case-sensitive as a whole.
const CASE_SENSITIVE_PROPERTIES: &[&str] = &["class", "font-family", "id"];

/// Lower-cases a property value, except where case matters.
///
/// Values of `id`, `class` and `font-family` are kept as they are.  Elsewhere,
/// quoted strings and the contents of `url(...)` keep their case, so that
/// `URL(#MyGradient) Red` becomes `url(#MyGradient) red`.
pub fn normalize_value(name: &str, value: &str) -> String {
    let value = value.trim();

    if CASE_SENSITIVE_PROPERTIES.contains(&name) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push(c);
                for (_, d) in chars.by_ref() {
                    out.push(d);
                    if d == c {
                        break;
                    }
                }
            }

            _ if value
                .get(i..i + 4)
                .is_some_and(|s| s.eq_ignore_ascii_case("url(")) =>
            {
                out.push_str("url(");
                for _ in 0..3 {
                    chars.next();
                }
                for (_, d) in chars.by_ref() {
                    out.push(d);
                    if d == ')' {
                        break;
                    }
                }
            }

            _ => out.extend(c.to_lowercase()),
        }
    }

    out
}

/// Parses the body of a rule, or a `style` attribute, as declarations only.
pub struct DeclarationListParser;

impl<'i> DeclarationParser<'i> for DeclarationListParser {
    type Declaration = Declaration;
    type Error = ValueErrorKind;

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Declaration, cssparser::ParseError<'i, Self::Error>> {
        if name.starts_with('-') {
            return Err(input.new_custom_error(ValueErrorKind::UnknownProperty));
        }

        let name = name.to_ascii_lowercase();

        let start = input.position();
        input.parse_until_before(Delimiter::Bang, |p| {
            while p.next().is_ok() {}
            Ok::<_, cssparser::ParseError<'i, ValueErrorKind>>(())
        })?;
        let raw = input.slice_from(start);

        if raw.trim().is_empty() {
            return Err(input.new_custom_error(ValueErrorKind::parse_error("empty value")));
        }

        let important = input.try_parse(parse_important).is_ok();

        Ok(Declaration {
            value: normalize_value(&name, raw),
            name,
            important,
        })
    }
}

// Nested rules are not supported; the default methods reject them.
impl<'i> AtRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ValueErrorKind;
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ValueErrorKind;
}

impl<'i> RuleBodyItemParser<'i, Declaration, ValueErrorKind> for DeclarationListParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Parses the declarations of a block, or of a `style` attribute.
///
/// Invalid declarations are logged and skipped.
fn parse_declaration_list<'i>(parser: &mut Parser<'i, '_>, session: &Session) -> Vec<Declaration> {
    RuleBodyParser::<_, _, ValueErrorKind>::new(parser, &mut DeclarationListParser)
        .filter_map(|r| match r {
            Ok(decl) => Some(decl),
            Err((e, s)) => {
                svg_log!(session, "Invalid declaration \"{}\"; ignoring: {:?}", s, e.kind);
                None
            }
        })
        .collect()
}

/// Parses a `style` attribute into its normal and `!important` declarations.
///
/// Both lists are `(name, value)` pairs in source order.
pub fn parse_declarations(
    style: &str,
    session: &Session,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);

    let mut normal = Vec::new();
    let mut important = Vec::new();

    for decl in parse_declaration_list(&mut parser, session) {
        if decl.important {
            important.push((decl.name, decl.value));
        } else {
            normal.push((decl.name, decl.value));
        }
    }

    (normal, important)
}

/// Parses the top level of a stylesheet into rules, and selector lists for them.
pub struct CssRuleParser {
    session: Session,
}

#[derive(Debug)]
pub enum SelectorError<'i> {
    Parse(selectors::parser::SelectorParseErrorKind<'i>),
}

impl<'i> From<selectors::parser::SelectorParseErrorKind<'i>> for SelectorError<'i> {
    fn from(e: selectors::parser::SelectorParseErrorKind<'_>) -> SelectorError<'_> {
        SelectorError::Parse(e)
    }
}

/// A selector list and the declarations that apply to the elements it matches.
pub struct QualifiedRule {
    selectors: SelectorList<SvgSelectors>,
    declarations: Vec<Declaration>,
}

pub enum AtRulePrelude {
    Import(String),
}

pub enum Rule {
    Import(String),
    QualifiedRule(QualifiedRule),
}

impl<'i> selectors::Parser<'i> for CssRuleParser {
    type Impl = SvgSelectors;
    type Error = SelectorError<'i>;

    // Type selectors match elements in any namespace, so that `rect` matches both
    // `<rect>` and `<svg:rect>`.
    fn default_namespace(&self) -> Option<<Self::Impl as SelectorImpl>::NamespaceUrl> {
        None
    }

    fn namespace_for_prefix(
        &self,
        _prefix: &<Self::Impl as SelectorImpl>::NamespacePrefix,
    ) -> Option<<Self::Impl as SelectorImpl>::NamespaceUrl> {
        None
    }

    fn parse_non_ts_pseudo_class(
        &self,
        location: SourceLocation,
        name: CowRcStr<'i>,
    ) -> Result<NonTSPseudoClass, cssparser::ParseError<'i, Self::Error>> {
        match &*name {
            "link" => Ok(NonTSPseudoClass::Link),
            "visited" => Ok(NonTSPseudoClass::Visited),
            _ => Err(location.new_custom_error(
                selectors::parser::SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name),
            )),
        }
    }

    fn parse_non_ts_functional_pseudo_class(
        &self,
        name: CowRcStr<'i>,
        arguments: &mut Parser<'i, '_>,
        _after_part: bool,
    ) -> Result<NonTSPseudoClass, cssparser::ParseError<'i, Self::Error>> {
        match &*name {
            "lang" => {
                let tags = arguments.parse_comma_separated(|arg| {
                    let language_tag = arg.expect_ident_or_string()?.clone();
                    LanguageTag::from_str(&language_tag).map_err(|_| {
                        arg.new_custom_error(selectors::parser::SelectorParseErrorKind::UnsupportedPseudoClassOrElement(language_tag))
                    })
                })?;
                arguments.expect_exhausted()?;
                Ok(NonTSPseudoClass::Lang(tags))
            }
            _ => Err(arguments.new_custom_error(
                selectors::parser::SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name),
            )),
        }
    }
}

impl<'i> QualifiedRuleParser<'i> for CssRuleParser {
    type Prelude = SelectorList<SvgSelectors>;
    type QualifiedRule = Rule;
    type Error = ValueErrorKind;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, cssparser::ParseError<'i, Self::Error>> {
        SelectorList::parse(self, input, ParseRelative::No).map_err(|e| ParseError {
            kind: cssparser::ParseErrorKind::Custom(ValueErrorKind::parse_error(
                "Could not parse selector",
            )),
            location: e.location,
        })
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, cssparser::ParseError<'i, Self::Error>> {
        let declarations = parse_declaration_list(input, &self.session);

        Ok(Rule::QualifiedRule(QualifiedRule {
            selectors: prelude,
            declarations,
        }))
    }
}

// Only `@import` is understood; any other at-rule is dropped with its block.
impl<'i> AtRuleParser<'i> for CssRuleParser {
    type Prelude = AtRulePrelude;
    type AtRule = Rule;
    type Error = ValueErrorKind;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, cssparser::ParseError<'i, Self::Error>> {
        match_ignore_ascii_case! {
            &name,

            "import" => {
                let url = input.expect_url_or_string()?.as_ref().to_owned();
                Ok(AtRulePrelude::Import(url))
            },

            _ => Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name))),
        }
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        let AtRulePrelude::Import(url) = prelude;
        Ok(Rule::Import(url))
    }
}

/// Dummy type required by the SelectorImpl trait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NonTSPseudoClass {
    Link,
    Visited,
    Lang(Vec<LanguageTag>),
}

impl ToCss for NonTSPseudoClass {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match self {
            NonTSPseudoClass::Link => write!(dest, "link"),
            NonTSPseudoClass::Visited => write!(dest, "visited"),
            NonTSPseudoClass::Lang(lang) => write!(
                dest,
                "lang(\"{}\")",
                lang.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\",\"")
            ),
        }
    }
}

impl selectors::parser::NonTSPseudoClass for NonTSPseudoClass {
    type Impl = SvgSelectors;

    fn is_active_or_hover(&self) -> bool {
        false
    }

    fn is_user_action_state(&self) -> bool {
        false
    }
}

/// Pseudo-elements never match; rules that use them are skipped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PseudoElement;

impl ToCss for PseudoElement {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        Ok(())
    }
}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = SvgSelectors;
}

/// The types that the `selectors` crate is instantiated with.
#[derive(Debug, Clone)]
pub struct SvgSelectors;

/// Attribute values in selectors, like the `bar` of `[foo="bar"]`.
#[derive(Clone, PartialEq, Eq)]
pub struct AttributeValue(String);

impl From<&str> for AttributeValue {
    fn from(s: &str) -> AttributeValue {
        AttributeValue(s.to_owned())
    }
}

impl AsRef<str> for AttributeValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ToCss for AttributeValue {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        use std::fmt::Write;

        write!(cssparser::CssStringWriter::new(dest), "{}", self.0)
    }
}

/// Declares a newtype over an interned `markup5ever` atom that serializes as a CSS
/// identifier, since `ToCss` cannot be implemented on the foreign atom types.
macro_rules! css_atom {
    ($name:ident, $atom:ty $(, $derive:ident)*) => {
        #[derive(Clone, PartialEq, Eq $(, $derive)*)]
        pub struct $name($atom);

        impl From<&str> for $name {
            fn from(s: &str) -> $name {
                $name(<$atom>::from(s))
            }
        }

        impl ToCss for $name {
            fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
                cssparser::serialize_identifier(&self.0, dest)
            }
        }
    };
}

css_atom!(Identifier, markup5ever::LocalName);
css_atom!(LocalName, markup5ever::LocalName);
css_atom!(NamespacePrefix, markup5ever::Prefix, Default);

impl PrecomputedHash for Identifier {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl PrecomputedHash for LocalName {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl SelectorImpl for SvgSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = AttributeValue;
    type Identifier = Identifier;
    type LocalName = LocalName;
    type NamespaceUrl = Namespace;
    type NamespacePrefix = NamespacePrefix;
    type BorrowedNamespaceUrl = Namespace;
    type BorrowedLocalName = LocalName;
    type NonTSPseudoClass = NonTSPseudoClass;
    type PseudoElement = PseudoElement;
}

/// An element of the raw XML tree, as seen by selector matching.
#[derive(Clone, PartialEq)]
pub struct CssElement(XmlNode);

impl From<XmlNode> for CssElement {
    fn from(n: XmlNode) -> CssElement {
        CssElement(n)
    }
}

impl fmt::Debug for CssElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.borrow())
    }
}

impl CssElement {
    /// The `xml:lang` of the element or of its nearest ancestor that has one.
    fn language(&self) -> Option<LanguageTag> {
        self.0
            .ancestors()
            .find_map(|n| n.attribute("xml:lang").or_else(|| n.attribute("lang")))
            .and_then(|lang| LanguageTag::from_str(&lang).ok())
    }
}

// The selectors crate uses this to examine our tree of elements.
impl selectors::Element for CssElement {
    type Impl = SvgSelectors;

    fn opaque(&self) -> OpaqueElement {
        let data: &XmlData = &self.0.borrow();
        OpaqueElement::new::<XmlData>(data)
    }

    fn parent_element(&self) -> Option<Self> {
        self.0.parent().map(CssElement)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        std::iter::successors(self.0.previous_sibling(), |n| n.previous_sibling())
            .find(|n| n.is_element())
            .map(CssElement)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        std::iter::successors(self.0.next_sibling(), |n| n.next_sibling())
            .find(|n| n.is_element())
            .map(CssElement)
    }

    fn is_html_element_in_html_document(&self) -> bool {
        false
    }

    fn has_local_name(&self, local_name: &LocalName) -> bool {
        self.0
            .element_name()
            .is_some_and(|name| name.local == local_name.0)
    }

    fn has_namespace(&self, ns: &Namespace) -> bool {
        self.0.element_name().is_some_and(|name| name.ns == *ns)
    }

    fn is_same_type(&self, other: &Self) -> bool {
        match (self.0.element_name(), other.0.element_name()) {
            (Some(a), Some(b)) => a.local == b.local && a.ns == b.ns,
            _ => false,
        }
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &LocalName,
        operation: &AttrSelectorOperation<&AttributeValue>,
    ) -> bool {
        let data = self.0.borrow();

        let XmlData::Element(ref e) = *data else {
            return false;
        };

        e.attributes
            .iter()
            .filter(|(name, _)| name.local == local_name.0)
            .filter(|(name, _)| match *ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(ns) => name.ns == *ns,
            })
            .any(|(_, value)| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &<Self::Impl as SelectorImpl>::NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match pc {
            NonTSPseudoClass::Link => self.is_link(),
            NonTSPseudoClass::Visited => false,
            NonTSPseudoClass::Lang(css_lang) => self.language().is_some_and(|e_lang| {
                css_lang
                    .iter()
                    .any(|l| l.is_language_range() && l.matches(&e_lang))
            }),
        }
    }

    fn match_pseudo_element(
        &self,
        _pe: &<Self::Impl as SelectorImpl>::PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    /// Only `<a>` elements with an `href` are links.
    fn is_link(&self) -> bool {
        self.0.is_svg_element("a")
            && (self.0.attribute("xlink:href").is_some() || self.0.attribute("href").is_some())
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &Identifier, case_sensitivity: CaseSensitivity) -> bool {
        self.0
            .attribute("id")
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &Identifier, case_sensitivity: CaseSensitivity) -> bool {
        let Some(classes) = self.0.attribute("class") else {
            return false;
        };

        let wanted = name.0.as_bytes();
        classes
            .split_ascii_whitespace()
            .any(|class| case_sensitivity.eq(class.as_bytes(), wanted))
    }

    fn has_custom_state(&self, _name: &<Self::Impl as SelectorImpl>::Identifier) -> bool {
        false
    }

    fn imported_part(&self, _name: &Identifier) -> Option<Identifier> {
        None
    }

    fn is_part(&self, _name: &Identifier) -> bool {
        false
    }

    /// `:empty` allows empty text nodes, but no elements and no characters.
    fn is_empty(&self) -> bool {
        !self
            .0
            .children()
            .any(|child| child.is_element() || !child.text().is_empty())
    }

    fn is_root(&self) -> bool {
        self.0.parent().is_none()
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }

    fn first_element_child(&self) -> Option<Self> {
        self.0
            .children()
            .find(|child| child.is_element())
            .map(CssElement)
    }

    fn apply_selector_flags(&self, _: ElementSelectorFlags) {}
}

/// State shared by a stylesheet and everything it imports.
struct ImportContext<'a> {
    fetcher: &'a dyn UrlFetcher,
    session: Session,
    visited: HashSet<String>,
    depth: usize,
}

impl<'a> ImportContext<'a> {
    fn new(fetcher: &'a dyn UrlFetcher, session: &Session) -> Self {
        ImportContext {
            fetcher,
            session: session.clone(),
            visited: HashSet::new(),
            depth: 0,
        }
    }
}

/// The qualified rules of one stylesheet, with its imports spliced in.
#[derive(Default)]
pub struct Stylesheet {
    qualified_rules: Vec<QualifiedRule>,
}

impl Stylesheet {
    /// Parses CSS text, as found in a `<style>` element.
    ///
    /// Relative `@import` URLs resolve against `url_resolver`.  Rules and imports that
    /// fail are logged and skipped.
    pub fn from_data(
        buf: &str,
        url_resolver: &UrlResolver,
        fetcher: &dyn UrlFetcher,
        session: &Session,
    ) -> Stylesheet {
        let mut stylesheet = Stylesheet::default();
        stylesheet.parse_rules(buf, url_resolver, &mut ImportContext::new(fetcher, session));
        stylesheet
    }

    /// Loads the stylesheet that an `<?xml-stylesheet?>` instruction points to.
    pub fn from_href(
        href: &str,
        url_resolver: &UrlResolver,
        fetcher: &dyn UrlFetcher,
        session: &Session,
    ) -> Result<Stylesheet, LoadingError> {
        let mut stylesheet = Stylesheet::default();
        stylesheet.import(href, url_resolver, &mut ImportContext::new(fetcher, session))?;
        Ok(stylesheet)
    }

    fn parse_rules(&mut self, buf: &str, url_resolver: &UrlResolver, ctx: &mut ImportContext<'_>) {
        let mut input = ParserInput::new(buf);
        let mut parser = Parser::new(&mut input);
        let mut rule_parser = CssRuleParser {
            session: ctx.session.clone(),
        };

        let mut rules = Vec::new();
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            match result {
                Ok(rule) => rules.push(rule),
                Err((e, source)) => {
                    svg_log!(ctx.session, "ignoring invalid rule \"{}\": {:?}", source, e.kind)
                }
            }
        }

        // Imports are fetched after parsing, since the parser borrows the input.
        for rule in rules {
            match rule {
                Rule::QualifiedRule(rule) => self.qualified_rules.push(rule),

                Rule::Import(href) => {
                    if let Err(e) = self.import(&href, url_resolver, ctx) {
                        svg_log!(ctx.session, "not importing \"{}\": {}", href, e);
                    }
                }
            }
        }
    }

    /// Appends the rules of the stylesheet at `href`; a stylesheet already seen in this
    /// import chain is skipped, so import cycles end.
    fn import(
        &mut self,
        href: &str,
        url_resolver: &UrlResolver,
        ctx: &mut ImportContext<'_>,
    ) -> Result<(), LoadingError> {
        if ctx.depth >= MAX_IMPORT_DEPTH {
            return Err(LoadingError::LimitExceeded(
                crate::limits::ImplementationLimit::ImportsTooDeep,
            ));
        }

        let resolved = url_resolver
            .resolve(href)
            .map_err(|e| LoadingError::Other(e.to_string()))?;
        let url = resolved.url.ok_or(LoadingError::BadUrl)?;

        if !ctx.visited.insert(url.to_string()) {
            svg_log!(ctx.session, "stylesheet \"{}\" was already imported", url);
            return Ok(());
        }

        let data = ctx.fetcher.fetch(&url)?;
        let text = String::from_utf8(data.data)
            .map_err(|_| LoadingError::Other(format!("stylesheet \"{}\" is not UTF-8", url)))?;

        let nested = UrlResolver::new(Some(url), url_resolver.unsafe_mode);

        ctx.depth += 1;
        self.parse_rules(&text, &nested, ctx);
        ctx.depth -= 1;

        Ok(())
    }
}

/// A declaration that matched an element, with the specificity of its selector.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedDeclaration {
    pub name: String,
    pub value: String,
    pub specificity: u32,
}

/// Declarations that apply to an element, each list in cascade order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Matches {
    pub normal: Vec<MatchedDeclaration>,
    pub important: Vec<MatchedDeclaration>,
}

/// All the stylesheets of a document, in cascade order.
#[derive(Default)]
pub struct Matcher {
    stylesheets: Vec<Stylesheet>,
}

impl Matcher {
    pub fn new(stylesheets: Vec<Stylesheet>) -> Matcher {
        Matcher { stylesheets }
    }

    /// Gathers the stylesheets of a document.
    ///
    /// `<?xml-stylesheet?>` references come first, then `<style>` elements whose `type`
    /// is empty or `text/css`, in document order.
    pub fn from_document(
        doc: &XmlDocument,
        url_resolver: &UrlResolver,
        fetcher: &dyn UrlFetcher,
        session: &Session,
    ) -> Matcher {
        let linked = doc.stylesheet_hrefs.iter().filter_map(|href| {
            Stylesheet::from_href(href, url_resolver, fetcher, session)
                .map_err(|e| svg_log!(session, "not loading stylesheet \"{}\": {}", href, e))
                .ok()
        });

        let embedded = doc
            .root
            .descendants()
            .filter(|n| n.is_svg_element("style"))
            .filter(|n| n.attribute("type").map_or(true, |t| t.is_empty() || t == "text/css"))
            .map(|n| Stylesheet::from_data(&n.flattened_text(), url_resolver, fetcher, session));

        Matcher::new(linked.chain(embedded).collect())
    }

    /// The declarations of every rule whose selector matches `node`.
    ///
    /// Each list is sorted by specificity; ties keep source order.
    pub fn matches(&self, node: &XmlNode) -> Matches {
        let mut matches = Matches::default();

        if !node.is_element() {
            return matches;
        }

        let element = CssElement(node.clone());

        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );

        let rules = self.stylesheets.iter().flat_map(|s| &s.qualified_rules);

        for rule in rules {
            let matching = rule.selectors.slice().iter().filter(|selector| {
                selector.pseudo_element().is_none()
                    && selectors::matching::matches_selector(
                        selector,
                        0,
                        None,
                        &element,
                        &mut context,
                    )
            });

            for selector in matching {
                for decl in &rule.declarations {
                    let bucket = if decl.important {
                        &mut matches.important
                    } else {
                        &mut matches.normal
                    };

                    bucket.push(MatchedDeclaration {
                        name: decl.name.clone(),
                        value: decl.value.clone(),
                        specificity: selector.specificity(),
                    });
                }
            }
        }

        // stable sorts
        matches.normal.sort_by_key(|m| m.specificity);
        matches.important.sort_by_key(|m| m.specificity);

        matches
    }
}
