//! Conditional processing attributes: `requiredExtensions`, `requiredFeatures`, `systemLanguage`.

use std::str::FromStr;

use language_tags::LanguageTag;
use locale_config::Locale;

use crate::session::Session;
use crate::svg_log;

// Keep these sorted alphabetically for binary_search.
static IMPLEMENTED_FEATURES: &[&str] = &[
    "http://www.w3.org/TR/SVG11/feature#BasicClip",
    "http://www.w3.org/TR/SVG11/feature#BasicGraphicsAttribute",
    "http://www.w3.org/TR/SVG11/feature#BasicPaintAttribute",
    "http://www.w3.org/TR/SVG11/feature#BasicStructure",
    "http://www.w3.org/TR/SVG11/feature#BasicText",
    "http://www.w3.org/TR/SVG11/feature#Clip",
    "http://www.w3.org/TR/SVG11/feature#ConditionalProcessing",
    "http://www.w3.org/TR/SVG11/feature#CoreAttribute",
    "http://www.w3.org/TR/SVG11/feature#Gradient",
    "http://www.w3.org/TR/SVG11/feature#Image",
    "http://www.w3.org/TR/SVG11/feature#Marker",
    "http://www.w3.org/TR/SVG11/feature#Mask",
    "http://www.w3.org/TR/SVG11/feature#OpacityAttribute",
    "http://www.w3.org/TR/SVG11/feature#Pattern",
    "http://www.w3.org/TR/SVG11/feature#SVG",
    "http://www.w3.org/TR/SVG11/feature#SVG-static",
    "http://www.w3.org/TR/SVG11/feature#Shape",
    "http://www.w3.org/TR/SVG11/feature#Structure",
    "http://www.w3.org/TR/SVG11/feature#Style",
    "http://www.w3.org/TR/SVG11/feature#ViewportAttribute",
];

/// Evaluates a `requiredFeatures` attribute.
///
/// Every listed feature must be implemented; an empty list is false.
pub fn required_features(s: &str) -> bool {
    let mut features = s.split_whitespace().peekable();

    features.peek().is_some()
        && features.all(|f| IMPLEMENTED_FEATURES.binary_search(&f).is_ok())
}

/// Evaluates a `requiredExtensions` attribute.
///
/// No extensions are implemented, so any value is false.
pub fn required_extensions(_s: &str) -> bool {
    false
}

/// The languages of the user, to match against `systemLanguage` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct UserLanguage(Vec<LanguageTag>);

impl UserLanguage {
    /// Takes the languages from a locale string like `"de,en-US"` or `"en_US.UTF-8"`.
    pub fn from_locale_str(s: &str) -> UserLanguage {
        UserLanguage(
            s.split(',')
                .map(|l| l.split('.').next().unwrap_or("").trim().replace('_', "-"))
                .filter_map(|l| LanguageTag::from_str(&l).ok())
                .collect(),
        )
    }

    /// The languages of the process's current locale.
    pub fn current() -> UserLanguage {
        let locale = Locale::current();

        UserLanguage(
            locale
                .tags_for("messages")
                .filter_map(|range| LanguageTag::from_str(&range.to_string()).ok())
                .collect(),
        )
    }

    /// Whether one of the user's languages is the same as, a subtag of, or a prefix of `tag`.
    fn matches(&self, tag: &LanguageTag) -> bool {
        self.0.iter().any(|user| {
            (user.is_language_range() && user.matches(tag))
                || (tag.is_language_range() && tag.matches(user))
        })
    }
}

/// Evaluates a `systemLanguage` attribute, a comma-separated list of BCP47 tags.
///
/// Invalid tags are logged and never match.
pub fn system_language(s: &str, user_language: &UserLanguage, session: &Session) -> bool {
    s.split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .any(|l| match LanguageTag::from_str(l) {
            Ok(tag) => user_language.matches(&tag),
            Err(e) => {
                svg_log!(
                    session,
                    "ignoring invalid language tag \"{}\" in systemLanguage: {}",
                    l,
                    e
                );
                false
            }
        })
}

/// Whether an element passes all of its conditional processing attributes.
///
/// `get` looks up an attribute of the element by name.
pub fn matches<'a>(
    get: impl Fn(&str) -> Option<&'a str>,
    user_language: &UserLanguage,
    session: &Session,
) -> bool {
    if let Some(s) = get("requiredExtensions") {
        if !required_extensions(s) {
            return false;
        }
    }

    if let Some(s) = get("requiredFeatures") {
        if !required_features(s) {
            return false;
        }
    }

    if let Some(s) = get("systemLanguage") {
        if !system_language(s, user_language, session) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_are_sorted() {
        let mut sorted = IMPLEMENTED_FEATURES.to_vec();
        sorted.sort();
        assert_eq!(sorted, IMPLEMENTED_FEATURES);
    }

    #[test]
    fn required_features_must_all_be_implemented() {
        assert!(!required_features(
            "http://www.w3.org/TR/SVG11/feature#NotExisting"
        ));
        assert!(required_features("http://www.w3.org/TR/SVG11/feature#Shape"));
        assert!(!required_features(
            "http://www.w3.org/TR/SVG11/feature#Shape \
             http://www.w3.org/TR/SVG11/feature#NotExisting"
        ));
        assert!(required_features(
            "http://www.w3.org/TR/SVG11/feature#Shape \
             http://www.w3.org/TR/SVG11/feature#BasicText"
        ));
        assert!(!required_features(""));
    }

    #[test]
    fn any_required_extension_fails() {
        assert!(!required_extensions("http://test.org/NotExisting/1.0"));
        assert!(!required_extensions(""));
    }

    #[test]
    fn system_language_matches_prefixes() {
        let session = Session::new_for_test_suite();
        let user = UserLanguage::from_locale_str("de,en_US.UTF-8");

        assert!(!system_language("fr", &user, &session));
        assert!(system_language("de", &user, &session));
        assert!(system_language("DE", &user, &session));
        assert!(system_language("de-LU", &user, &session));
        assert!(system_language("en", &user, &session));
        assert!(system_language("en-US", &user, &session));
        assert!(!system_language("en-GB", &user, &session));
        assert!(system_language("fr, de", &user, &session));
        assert!(!system_language("", &user, &session));
        assert!(!system_language("12345", &user, &session));
    }

    #[test]
    fn unset_attributes_match() {
        let session = Session::new_for_test_suite();
        let user = UserLanguage::from_locale_str("en");

        assert!(matches(|_| None, &user, &session));
        assert!(!matches(
            |name| (name == "requiredExtensions").then_some("foo"),
            &user,
            &session
        ));
    }
}
