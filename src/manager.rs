//! List managers: the layer between a term [`Key`] and the
//! [`InvertedList`] it names. A plain [`ListManager`] owns one
//! term index plus one page manager; [`DelayListManager`] and
//! [`MultiListManager`] compose two or more of them to present a single
//! cursor over the delayed-merge small/large split and a distributed large
//! index, respectively.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::list::{
    DelayListIterator, InsertResult, InvertedList, ListIteratorImpl, MultiListIterator, ShortList,
};
use crate::page::PageManager;
use crate::page::PageId;
use crate::term_index::TermIndex;
use crate::types::{DocumentId, Key, LocationList};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// How [`ListManager::reset`] positions the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Exact match only; cursor is cleared if `key` is absent.
    Search,
    /// Exact match, minting a fresh empty list if `key` is absent.
    Create,
    /// Smallest key >= `key`.
    LowerBound,
}

/// Owns one term index's worth of lists, keyed by the [`PageId`] the term
/// index maps a [`Key`] to. Concurrent access to different lists never
/// contends; access to the same list serializes on that list's own mutex.
pub struct ListManager {
    config: EngineConfig,
    term_index: Arc<dyn TermIndex>,
    page_manager: Arc<dyn PageManager>,
    lists: DashMap<PageId, Mutex<InvertedList>>,
    current: RwLock<Option<(Key, PageId)>>,
    track_positions: bool,
}

impl ListManager {
    pub fn new(
        config: EngineConfig,
        term_index: Arc<dyn TermIndex>,
        page_manager: Arc<dyn PageManager>,
        track_positions: bool,
    ) -> Self {
        Self {
            config,
            term_index,
            page_manager,
            lists: DashMap::new(),
            current: RwLock::new(None),
            track_positions,
        }
    }

    fn block_unit_size(&self, key: &Key) -> usize {
        if key.is_word_boundary() {
            self.config.word_id_block_unit_size as usize
        } else {
            self.config.id_block_unit_size as usize
        }
    }

    fn new_short_list(&self) -> InvertedList {
        InvertedList::Short(ShortList::new(
            Arc::new(crate::codec::Golomb::for_average_gap(2)),
            self.config.batch_list_initial_unit_size,
            self.config.batch_list_regular_unit_size,
            self.config.batch_list_max_unit_size,
            self.track_positions,
        ))
    }

    pub fn reset(&self, key: &Key, mode: ResetMode) -> Result<bool> {
        let found = match mode {
            ResetMode::Search => self.term_index.search(key)?.map(|p| (key.clone(), p)),
            ResetMode::LowerBound => self.term_index.lower_bound(key)?,
            ResetMode::Create => match self.term_index.search(key)? {
                Some(p) => Some((key.clone(), p)),
                None => {
                    let pin = self.page_manager.allocate_page()?;
                    let page_id = pin.id();
                    drop(pin);
                    self.term_index.insert(key.clone(), page_id)?;
                    self.lists.insert(page_id, Mutex::new(self.new_short_list()));
                    Some((key.clone(), page_id))
                }
            },
        };
        let hit = found.is_some();
        *self.current.write() = found;
        Ok(hit)
    }

    /// Advance to the key immediately after the current one, in term-index
    /// order.
    pub fn next(&self) -> Result<bool> {
        let Some((key, _)) = self.current.read().clone() else {
            return Ok(false);
        };
        let found = self.term_index.next_key(&key)?;
        let hit = found.is_some();
        *self.current.write() = found;
        Ok(hit)
    }

    pub fn current_key(&self) -> Option<Key> {
        self.current.read().as_ref().map(|(k, _)| k.clone())
    }

    /// Run `f` against the currently positioned list, if any.
    pub fn with_current_list<R>(&self, f: impl FnOnce(&mut InvertedList) -> R) -> Option<R> {
        let page_id = self.current.read().as_ref().map(|(_, p)| *p)?;
        let entry = self.lists.get(&page_id)?;
        let mut guard = entry.lock();
        Some(f(&mut guard))
    }

    pub fn insert(&self, key: &Key, document_id: DocumentId, locations: Option<&LocationList>) -> Result<InsertResult> {
        self.reset(key, ResetMode::Create)?;
        let block_unit_size = self.block_unit_size(key);
        Ok(self
            .with_current_list(|l| l.insert(document_id, locations, block_unit_size))
            .expect("Create mode always leaves a current list"))
    }

    pub fn expunge(&self, key: &Key, document_id: DocumentId) -> Result<Option<Option<LocationList>>> {
        if !self.reset(key, ResetMode::Search)? {
            return Ok(None);
        }
        Ok(self.with_current_list(|l| l.expunge(document_id)).flatten())
    }

    pub fn undo_expunge(&self, key: &Key, document_id: DocumentId, locations: Option<LocationList>) -> Result<()> {
        self.reset(key, ResetMode::Create)?;
        self.with_current_list(|l| l.undo_expunge(document_id, locations));
        Ok(())
    }

    pub fn get_iterator(&self, key: &Key) -> Result<Option<ListIteratorImpl>> {
        if !self.reset(key, ResetMode::Search)? {
            return Ok(None);
        }
        Ok(self.with_current_list(|l| l.get_iterator()))
    }

    pub fn vacuum(&self, key: &Key) -> Result<u32> {
        if !self.reset(key, ResetMode::Search)? {
            return Ok(0);
        }
        Ok(self.with_current_list(|l| l.vacuum()).unwrap_or(0))
    }
}

/// Fan-in over a small (recently inserted) and a large (already merged)
/// `ListManager`, the delayed-merge scheme's read side.
pub struct DelayListManager {
    small: Arc<ListManager>,
    large: Arc<ListManager>,
}

impl DelayListManager {
    pub fn new(small: Arc<ListManager>, large: Arc<ListManager>) -> Self {
        Self { small, large }
    }

    pub fn get_iterator(&self, key: &Key) -> Result<Option<ListIteratorImpl>> {
        let large_hit = self.large.reset(key, ResetMode::Search)?;
        let small_hit = self.small.reset(key, ResetMode::Search)?;

        let large_iter = large_hit.then(|| self.large.with_current_list(|l| (l.get_iterator(), l.max_document_id()))).flatten();
        let small_iter = small_hit.then(|| self.small.with_current_list(|l| l.get_iterator())).flatten();

        match (large_iter, small_iter) {
            (None, None) => Ok(None),
            (Some((it, _)), None) => Ok(Some(it)),
            (None, Some(it)) => Ok(Some(it)),
            (Some((large_it, large_max)), Some(small_it)) => Ok(Some(ListIteratorImpl::Delay(Box::new(
                DelayListIterator::new(vec![large_it, small_it], vec![large_max, DocumentId::MAX]),
            )))),
        }
    }
}

/// Fan-in across the large index's distributed units, mirroring a
/// `changeUnit` rotation. Each unit is independently merged; reads route
/// through whichever units actually carry the term.
pub struct MultiListManager {
    units: Vec<Arc<ListManager>>,
}

impl MultiListManager {
    pub fn new(units: Vec<Arc<ListManager>>) -> Self {
        Self { units }
    }

    pub fn get_iterator(&self, key: &Key) -> Result<Option<ListIteratorImpl>> {
        let mut iters = Vec::new();
        for unit in &self.units {
            if unit.reset(key, ResetMode::Search)? {
                if let Some(it) = unit.with_current_list(|l| l.get_iterator()) {
                    iters.push(it);
                }
            }
        }
        match iters.len() {
            0 => Ok(None),
            1 => Ok(iters.pop()),
            _ => Ok(Some(ListIteratorImpl::Multi(Box::new(MultiListIterator::new(iters))))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::iterator::ListIterator;
    use crate::page::InMemoryPageManager;
    use crate::term_index::InMemoryTermIndex;

    fn manager() -> ListManager {
        ListManager::new(
            EngineConfig::for_testing(),
            Arc::new(InMemoryTermIndex::new()),
            Arc::new(InMemoryPageManager::new()),
            true,
        )
    }

    #[test]
    fn create_then_search_find_the_same_list() {
        let mgr = manager();
        let key = Key::term("rust");
        mgr.insert(&key, 1, None).unwrap();
        assert!(mgr.reset(&key, ResetMode::Search).unwrap());
        assert_eq!(mgr.with_current_list(|l| l.document_count()), Some(1));
    }

    #[test]
    fn search_on_missing_key_clears_cursor() {
        let mgr = manager();
        assert!(!mgr.reset(&Key::term("missing"), ResetMode::Search).unwrap());
        assert!(mgr.current_key().is_none());
    }

    #[test]
    fn next_walks_keys_in_order() {
        let mgr = manager();
        mgr.insert(&Key::term("apple"), 1, None).unwrap();
        mgr.insert(&Key::term("banana"), 1, None).unwrap();
        mgr.reset(&Key::term("apple"), ResetMode::Search).unwrap();
        assert!(mgr.next().unwrap());
        assert_eq!(mgr.current_key().unwrap().as_str(), "banana");
    }

    #[test]
    fn expunge_then_undo_round_trips_through_manager() {
        let mgr = manager();
        let key = Key::term("rust");
        mgr.insert(&key, 1, Some(&LocationList::new(vec![1]))).unwrap();
        mgr.insert(&key, 2, None).unwrap();
        let removed = mgr.expunge(&key, 1).unwrap().flatten();
        assert_eq!(mgr.get_iterator(&key).unwrap().unwrap().next(), 2);
        mgr.undo_expunge(&key, 1, removed).unwrap();
        let mut it = mgr.get_iterator(&key).unwrap().unwrap();
        assert_eq!(it.next(), 1);
    }

    #[test]
    fn delay_manager_fans_in_small_and_large() {
        let cfg = EngineConfig::for_testing();
        let term_index_large = Arc::new(InMemoryTermIndex::new());
        let term_index_small = Arc::new(InMemoryTermIndex::new());
        let page_manager = Arc::new(InMemoryPageManager::new());
        let large = Arc::new(ListManager::new(cfg.clone(), term_index_large, page_manager.clone(), false));
        let small = Arc::new(ListManager::new(cfg, term_index_small, page_manager, false));

        let key = Key::term("rust");
        large.insert(&key, 1, None).unwrap();
        large.insert(&key, 2, None).unwrap();
        small.insert(&key, 100, None).unwrap();

        let delay = DelayListManager::new(small, large);
        let mut it = delay.get_iterator(&key).unwrap().unwrap();
        assert_eq!(it.next(), 1);
        assert_eq!(it.next(), 2);
        assert_eq!(it.next(), 100);
        assert_eq!(it.next(), crate::types::UNDEFINED_DOCUMENT_ID);
    }

    #[test]
    fn multi_manager_fans_in_across_units() {
        let cfg = EngineConfig::for_testing();
        let pm = Arc::new(InMemoryPageManager::new());
        let unit_a = Arc::new(ListManager::new(cfg.clone(), Arc::new(InMemoryTermIndex::new()), pm.clone(), false));
        let unit_b = Arc::new(ListManager::new(cfg, Arc::new(InMemoryTermIndex::new()), pm, false));

        let key = Key::term("rust");
        unit_a.insert(&key, 1, None).unwrap();
        unit_a.insert(&key, 4, None).unwrap();
        unit_b.insert(&key, 2, None).unwrap();

        let multi = MultiListManager::new(vec![unit_a, unit_b]);
        let mut it = multi.get_iterator(&key).unwrap().unwrap();
        let mut out = vec![];
        loop {
            let d = it.next();
            if d == crate::types::UNDEFINED_DOCUMENT_ID {
                break;
            }
            out.push(d);
        }
        assert_eq!(out, vec![1, 2, 4]);
    }
}
