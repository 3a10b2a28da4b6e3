//! Core data-model value types shared across the crate.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 32-bit document identifier. `0` is reserved as "undefined"; IDs are
/// strictly ascending within one posting list.
pub type DocumentId = u32;

/// Sentinel returned by iterators past the end of a list.
pub const UNDEFINED_DOCUMENT_ID: DocumentId = 0;

/// 1-origin offset into a normalized document. `0` is reserved.
pub type Position = u32;

/// A term key. The empty string is the distinguished "word boundary" key
/// used by dual (n-gram + word) indexing; keeping it a first-class variant
/// instead of `String::new()` stops code paths from silently treating it as
/// an ordinary zero-length term.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub enum Key {
    Term(String),
    WordBoundary,
}

impl Key {
    pub fn term(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Key::WordBoundary
        } else {
            Key::Term(s)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Key::Term(s) => s.as_str(),
            Key::WordBoundary => "",
        }
    }

    pub fn is_word_boundary(&self) -> bool {
        matches!(self, Key::WordBoundary)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

/// The sorted set of positions a term occupies within one document, plus its
/// term frequency. A "no-location" configuration carries only the count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationList {
    positions: Vec<Position>,
}

impl LocationList {
    pub fn new(mut positions: Vec<Position>) -> Self {
        positions.sort_unstable();
        positions.dedup();
        Self { positions }
    }

    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One posting: a document ID plus the (possibly absent) location list for
/// that (term, doc) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub document_id: DocumentId,
    pub locations: Option<LocationList>,
}

impl Posting {
    pub fn term_frequency(&self) -> u32 {
        self.locations.as_ref().map(|l| l.term_frequency()).unwrap_or(0)
    }
}

/// Per-document top-k (term, weight) pairs used for clustering and query
/// expansion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub entries: Vec<(String, f32)>,
}

impl FeatureSet {
    pub fn top_k(mut self, k: usize) -> Self {
        self.entries
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        self.entries.truncate(k);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundary_key_is_distinguished_from_empty_string() {
        let k = Key::term("");
        assert!(k.is_word_boundary());
        assert_eq!(k.as_str(), "");
        assert_eq!(Key::term(""), Key::WordBoundary);
    }

    #[test]
    fn keys_order_lexicographically() {
        assert!(Key::WordBoundary < Key::term("a"));
        assert!(Key::term("bar") < Key::term("baz"));
    }

    #[test]
    fn location_list_sorts_and_dedups() {
        let l = LocationList::new(vec![5, 1, 3, 1]);
        assert_eq!(l.positions(), &[1, 3, 5]);
        assert_eq!(l.term_frequency(), 3);
    }
}
