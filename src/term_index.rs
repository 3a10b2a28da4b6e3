//! The term → leaf-page B-tree, treated as an out-of-scope external
//! collaborator whose interface — insert, expunge, update, search — is
//! assumed, with internals left unspecified. [`TermIndex`] generalizes
//! [`crate::page::PageId`]-keyed lookup to `Key` the way a generic B-tree is
//! generic over its key type, and [`InMemoryTermIndex`] is the one reference
//! implementation this crate needs to run its own tests end to end.

use crate::error::Result;
use crate::page::PageId;
use crate::types::Key;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub trait TermIndex: Send + Sync {
    /// Exact match.
    fn search(&self, key: &Key) -> Result<Option<PageId>>;

    /// Insert or overwrite the leaf-page mapping for `key`.
    fn insert(&self, key: Key, page: PageId) -> Result<()>;

    /// Remove the mapping for `key`, if present.
    fn expunge(&self, key: &Key) -> Result<()>;

    /// Smallest key >= `key`, with its page id.
    fn lower_bound(&self, key: &Key) -> Result<Option<(Key, PageId)>>;

    /// The key immediately after `key` in sorted order, if any.
    fn next_key(&self, key: &Key) -> Result<Option<(Key, PageId)>>;

    /// First key in the tree, if non-empty.
    fn first(&self) -> Result<Option<(Key, PageId)>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTermIndex {
    map: Arc<RwLock<BTreeMap<Key, PageId>>>,
}

impl InMemoryTermIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TermIndex for InMemoryTermIndex {
    fn search(&self, key: &Key) -> Result<Option<PageId>> {
        Ok(self.map.read().get(key).copied())
    }

    fn insert(&self, key: Key, page: PageId) -> Result<()> {
        self.map.write().insert(key, page);
        Ok(())
    }

    fn expunge(&self, key: &Key) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn lower_bound(&self, key: &Key) -> Result<Option<(Key, PageId)>> {
        Ok(self
            .map
            .read()
            .range(key.clone()..)
            .next()
            .map(|(k, v)| (k.clone(), *v)))
    }

    fn next_key(&self, key: &Key) -> Result<Option<(Key, PageId)>> {
        use std::ops::Bound;
        Ok(self
            .map
            .read()
            .range((Bound::Excluded(key.clone()), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), *v)))
    }

    fn first(&self) -> Result<Option<(Key, PageId)>> {
        Ok(self.map.read().iter().next().map(|(k, v)| (k.clone(), *v)))
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_search_expunge() {
        let idx = InMemoryTermIndex::new();
        idx.insert(Key::term("bar"), 1).unwrap();
        idx.insert(Key::term("foo"), 2).unwrap();
        assert_eq!(idx.search(&Key::term("bar")).unwrap(), Some(1));
        idx.expunge(&Key::term("bar")).unwrap();
        assert_eq!(idx.search(&Key::term("bar")).unwrap(), None);
    }

    #[test]
    fn lower_bound_and_next_walk_in_order() {
        let idx = InMemoryTermIndex::new();
        idx.insert(Key::term("apple"), 1).unwrap();
        idx.insert(Key::term("banana"), 2).unwrap();
        idx.insert(Key::term("cherry"), 3).unwrap();

        let (k, _) = idx.lower_bound(&Key::term("b")).unwrap().unwrap();
        assert_eq!(k.as_str(), "banana");

        let (k2, _) = idx.next_key(&k).unwrap().unwrap();
        assert_eq!(k2.as_str(), "cherry");
    }

    #[test]
    fn word_boundary_key_sorts_first() {
        let idx = InMemoryTermIndex::new();
        idx.insert(Key::term("a"), 1).unwrap();
        idx.insert(Key::WordBoundary, 2).unwrap();
        let (k, _) = idx.first().unwrap().unwrap();
        assert!(k.is_word_boundary());
    }
}
