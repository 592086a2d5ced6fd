//! Attribute path decomposition.
//!
//! A path is a dot-separated list of segments, where a segment may end in
//! `[<non-negative integer>]` to address a collection element:
//! `model`, `model.attr`, `collection[2]`, `collection[2].model.attr`.
//!
//! Only the first segment is decomposed here. The remainder is handed unparsed to the
//! child that owns it, which resolves it again.

use std::fmt;

/// The first segment of an attribute path, split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrPath<'a> {
    /// Attribute name of the first segment, without any index.
    pub base: &'a str,
    /// Element position, when the first segment ends in `[n]`.
    pub index: Option<usize>,
    /// Everything after the first `.`, unparsed.
    pub sub: Option<&'a str>,
}

impl AttrPath<'_> {
    /// Whether the path goes past its base attribute (an index or a sub-path is present).
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        self.index.is_some() || self.sub.is_some()
    }
}

impl fmt::Display for AttrPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base)?;
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        if let Some(sub) = self.sub {
            write!(f, ".{sub}")?;
        }
        Ok(())
    }
}

/// Decomposes `path` into `{ base, index, sub }`.
///
/// Brackets are recognised only as a trailing `[digits]` after a non-empty name.
/// Anything else (`a[x]`, `a[1`, `[1]`, an index that overflows `usize`) is kept
/// verbatim in `base`.
///
/// # Examples
/// ```rust
/// use arbor::path::resolve;
///
/// let path = resolve("collection[2].model.attr");
/// assert_eq!(path.base, "collection");
/// assert_eq!(path.index, Some(2));
/// assert_eq!(path.sub, Some("model.attr"));
///
/// assert!(!resolve("attr").is_compound());
/// assert_eq!(resolve("a[x]").base, "a[x]");
/// ```
#[must_use]
pub fn resolve(path: &str) -> AttrPath<'_> {
    let (head, sub) = match path.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    };

    match split_index(head) {
        Some((base, index)) => AttrPath { base, index: Some(index), sub },
        None => AttrPath { base: head, index: None, sub },
    }
}

fn split_index(head: &str) -> Option<(&str, usize)> {
    let (name, digits) = head.strip_suffix(']')?.rsplit_once('[')?;
    if name.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (name, index))
}
