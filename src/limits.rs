//! Processing limits to mitigate malicious SVGs.

use std::fmt;

/// Maximum number of times that elements can be referenced through URL fragments
/// during one render.
///
/// Deeply nested groups of `<use>` elements, where each one references the next
/// one ten times, make the number of drawn objects grow exponentially; so do
/// patterns whose content is filled with the next pattern.  We deal with both by
/// limiting how many `url(#foo)` and `href` references get resolved.
pub const MAX_REFERENCED_ELEMENTS: usize = 500_000;

/// Maximum number of nodes loadable per XML document.
pub const MAX_LOADED_ELEMENTS: u32 = 1_000_000;

/// Maximum size of a document, before and after gzip decompression, when not in
/// unsafe mode.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum depth of nested `@import` rules in stylesheets.
pub const MAX_IMPORT_DEPTH: usize = 16;

/// An implementation-defined limit that a document exceeded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImplementationLimit {
    /// Too many elements were referenced through URL fragments.
    TooManyReferencedElements,

    /// Too many XML nodes in one document.
    TooManyLoadedElements,

    /// Stylesheets import each other too deeply.
    ImportsTooDeep,
}

impl fmt::Display for ImplementationLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ImplementationLimit::TooManyReferencedElements => write!(
                f,
                "exceeded more than {} referenced elements",
                MAX_REFERENCED_ELEMENTS
            ),

            ImplementationLimit::TooManyLoadedElements => write!(
                f,
                "cannot load more than {} XML elements",
                MAX_LOADED_ELEMENTS
            ),

            ImplementationLimit::ImportsTooDeep => write!(
                f,
                "stylesheet imports nested more than {} levels",
                MAX_IMPORT_DEPTH
            ),
        }
    }
}
