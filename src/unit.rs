//! File-level containers above a [`crate::manager::ListManager`]:
//! [`InvertedUnit`] owns one term index plus its pages and a
//! mount/unmount lifecycle; [`InvertedMultiUnit`] rotates writes across N
//! units once an insert unit's size crosses a threshold; [`InvertedBatch`]
//! holds the small, never-merged-to-disk staging lists a delayed merge reads
//! before the next large-index merge folds them in.

use crate::codec::Void;
use crate::config::EngineConfig;
use crate::error::{FullTextError, Result};
use crate::list::{BatchList, InsertResult, ListIteratorImpl};
use crate::manager::{ListManager, MultiListManager, ResetMode};
use crate::page::{InMemoryPageManager, PageManager};
use crate::term_index::{InMemoryTermIndex, TermIndex};
use crate::types::{DocumentId, Key, LocationList};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct UnitState {
    page_manager: Arc<dyn PageManager>,
    term_index: Arc<dyn TermIndex>,
    manager: Arc<ListManager>,
}

/// One leaf B-tree plus its overflow pages, as a mountable unit. `mount`
/// makes it visible to searches and updates; `unmount` flushes first so a
/// remount (or a `move` to another location) sees consistent content.
pub struct InvertedUnit {
    config: EngineConfig,
    track_positions: bool,
    state: RwLock<UnitState>,
    mounted: AtomicBool,
}

impl InvertedUnit {
    pub fn create(config: EngineConfig, track_positions: bool) -> Self {
        Self {
            state: RwLock::new(Self::fresh_state(&config, track_positions)),
            config,
            track_positions,
            mounted: AtomicBool::new(true),
        }
    }

    fn fresh_state(config: &EngineConfig, track_positions: bool) -> UnitState {
        let page_manager: Arc<dyn PageManager> = Arc::new(InMemoryPageManager::new());
        let term_index: Arc<dyn TermIndex> = Arc::new(InMemoryTermIndex::new());
        let manager = Arc::new(ListManager::new(config.clone(), term_index.clone(), page_manager.clone(), track_positions));
        UnitState { page_manager, term_index, manager }
    }

    fn require_mounted(&self) -> Result<()> {
        if self.mounted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FullTextError::BadArgument("unit is not mounted".into()))
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    pub fn unmount(&self) -> Result<()> {
        self.flush_all_pages()?;
        self.mounted.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Destroy is just dropping the unit; every page lives in its own
    /// in-memory manager with nothing external to unlink.
    pub fn destroy(self) -> Result<()> {
        Ok(())
    }

    /// Reset to the empty state of a freshly created unit, keeping identity
    /// (mount status, configuration) intact.
    pub fn clear(&self) -> Result<()> {
        *self.state.write() = Self::fresh_state(&self.config, self.track_positions);
        Ok(())
    }

    pub fn get_update_list_manager(&self) -> Arc<ListManager> {
        self.state.read().manager.clone()
    }

    pub fn insert(&self, key: &Key, document_id: DocumentId, locations: Option<&LocationList>) -> Result<InsertResult> {
        self.require_mounted()?;
        self.state.read().manager.insert(key, document_id, locations)
    }

    pub fn expunge(&self, key: &Key, document_id: DocumentId) -> Result<Option<Option<LocationList>>> {
        self.require_mounted()?;
        self.state.read().manager.expunge(key, document_id)
    }

    pub fn undo_expunge(&self, key: &Key, document_id: DocumentId, locations: Option<LocationList>) -> Result<()> {
        self.require_mounted()?;
        self.state.read().manager.undo_expunge(key, document_id, locations)
    }

    pub fn get_iterator(&self, key: &Key) -> Result<Option<ListIteratorImpl>> {
        self.require_mounted()?;
        self.state.read().manager.get_iterator(key)
    }

    /// Drain every term's deferred to-delete ID blocks. Resumable: safe to
    /// call repeatedly, and safe to stop partway through.
    pub fn expunge_id_block(&self) -> Result<u32> {
        self.require_mounted()?;
        let (manager, term_index) = {
            let state = self.state.read();
            (state.manager.clone(), state.term_index.clone())
        };
        let mut total = 0u32;
        let mut cursor = term_index.first()?;
        while let Some((key, _)) = cursor {
            total += manager.vacuum(&key)?;
            cursor = term_index.next_key(&key)?;
        }
        Ok(total)
    }

    /// Discard every term's deferred-unlink bookkeeping without draining the
    /// blocks it names. Advisory only: a block a crash interrupts here is
    /// still reachable by a later `expunge_id_block`, just no longer fast to
    /// find.
    pub fn clear_delete_id_block_undo_log(&self) -> Result<()> {
        self.require_mounted()?;
        let (manager, term_index) = {
            let state = self.state.read();
            (state.manager.clone(), state.term_index.clone())
        };
        let mut cursor = term_index.first()?;
        while let Some((key, _)) = cursor {
            manager.reset(&key, ResetMode::Search)?;
            manager.with_current_list(|l| l.clear_delete_log());
            cursor = term_index.next_key(&key)?;
        }
        Ok(())
    }

    pub fn save_all_pages(&self) -> Result<()> {
        self.state.read().page_manager.save_all_pages()
    }

    pub fn flush_all_pages(&self) -> Result<()> {
        self.state.read().page_manager.flush_all_pages()
    }

    pub fn recover_all_pages(&self) -> Result<()> {
        self.state.read().page_manager.recover_all_pages()
    }
}

/// N `InvertedUnit`s the large index is sharded across once the index
/// outgrows a single file: inserts land on whichever unit is
/// current, and `change_unit` rotates to the next one, doubling every
/// unit's size ceiling once the whole ring has cycled through.
pub struct InvertedMultiUnit {
    units: Vec<Arc<InvertedUnit>>,
    current_unit: AtomicUsize,
    current_max_file_size: RwLock<u64>,
}

impl InvertedMultiUnit {
    pub fn create(config: EngineConfig, track_positions: bool) -> Self {
        let unit_count = config.unit_count.max(1);
        let max_file_size = config.max_file_size;
        let units = (0..unit_count).map(|_| Arc::new(InvertedUnit::create(config.clone(), track_positions))).collect();
        Self {
            units,
            current_unit: AtomicUsize::new(0),
            current_max_file_size: RwLock::new(max_file_size),
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn unit(&self, index: usize) -> Arc<InvertedUnit> {
        self.units[index].clone()
    }

    pub fn current_unit_index(&self) -> usize {
        self.current_unit.load(Ordering::SeqCst)
    }

    pub fn current_unit(&self) -> Arc<InvertedUnit> {
        self.units[self.current_unit_index()].clone()
    }

    pub fn current_max_file_size(&self) -> u64 {
        *self.current_max_file_size.read()
    }

    /// Rotate to the next unit. Doubles the size ceiling once the rotation
    /// wraps back to unit 0, so a long-lived index's per-unit cap keeps pace
    /// with its overall growth instead of fragmenting into ever more units.
    pub fn change_unit(&self) -> usize {
        let len = self.units.len();
        let prev = self
            .current_unit
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some((c + 1) % len))
            .unwrap();
        let next = (prev + 1) % len;
        if next == 0 {
            *self.current_max_file_size.write() *= 2;
        }
        next
    }

    pub fn insert(&self, key: &Key, document_id: DocumentId, locations: Option<&LocationList>) -> Result<InsertResult> {
        self.current_unit().insert(key, document_id, locations)
    }

    pub fn multi_manager(&self) -> MultiListManager {
        MultiListManager::new(self.units.iter().map(|u| u.get_update_list_manager()).collect())
    }

    pub fn get_iterator(&self, key: &Key) -> Result<Option<ListIteratorImpl>> {
        self.multi_manager().get_iterator(key)
    }
}

/// Bidirectional section-local document-ID renumbering for one staging
/// batch. Real document IDs arriving at a small staging area are sparse;
/// small IDs are assigned densely in first-seen order so id-gap arithmetic
/// and block sizing behave the same regardless of how sparse the real ID
/// space is. Cleared whenever the batch that owns it drains.
#[derive(Default)]
struct SmallIdMap {
    big_to_small: HashMap<DocumentId, DocumentId>,
    small_to_big: HashMap<DocumentId, DocumentId>,
    next_small: DocumentId,
}

impl SmallIdMap {
    fn assign(&mut self, big_id: DocumentId) -> DocumentId {
        if let Some(&small_id) = self.big_to_small.get(&big_id) {
            return small_id;
        }
        self.next_small += 1;
        let small_id = self.next_small;
        self.big_to_small.insert(big_id, small_id);
        self.small_to_big.insert(small_id, big_id);
        small_id
    }

    fn to_small(&self, big_id: DocumentId) -> Option<DocumentId> {
        self.big_to_small.get(&big_id).copied()
    }

    fn to_big(&self, small_id: DocumentId) -> Option<DocumentId> {
        self.small_to_big.get(&small_id).copied()
    }

    fn clear(&mut self) {
        self.big_to_small.clear();
        self.small_to_big.clear();
        self.next_small = 0;
    }
}

/// The insert-side staging area: terms touched since the last merge, each as
/// a single unbounded [`BatchList`], ordered by key so a merge can walk it
/// in the same order it walks the large index's term index.
pub struct InvertedBatch {
    config: EngineConfig,
    track_positions: bool,
    lists: RwLock<BTreeMap<Key, BatchList>>,
    small_ids: RwLock<SmallIdMap>,
}

impl InvertedBatch {
    pub fn new(config: EngineConfig, track_positions: bool) -> Self {
        Self { config, track_positions, lists: RwLock::new(BTreeMap::new()), small_ids: RwLock::new(SmallIdMap::default()) }
    }

    /// Assign (or recall) this batch's section-local small ID for a real
    /// document ID.
    pub fn assign_document_id(&self, document_id: DocumentId) -> DocumentId {
        self.small_ids.write().assign(document_id)
    }

    /// Look up an already-assigned small ID without creating a new one.
    pub fn small_document_id(&self, document_id: DocumentId) -> Option<DocumentId> {
        self.small_ids.read().to_small(document_id)
    }

    /// Map a section-local small ID back to the real document ID.
    pub fn convert_to_big_document_id(&self, small_id: DocumentId) -> Option<DocumentId> {
        self.small_ids.read().to_big(small_id)
    }

    /// Ensure a (possibly empty) list exists for `key`.
    pub fn add_list(&self, key: Key) {
        let config = &self.config;
        self.lists.write().entry(key).or_insert_with(|| {
            BatchList::new(
                Arc::new(Void),
                config.batch_list_initial_unit_size,
                config.batch_list_regular_unit_size,
                self.track_positions,
            )
        });
    }

    pub fn insert(&self, key: &Key, document_id: DocumentId, locations: Option<&LocationList>) {
        self.add_list(key.clone());
        self.lists.write().get_mut(key).expect("just inserted").insert(document_id, locations);
    }

    pub fn byte_size(&self) -> u64 {
        self.lists.read().values().map(|l| l.byte_size()).sum()
    }

    pub fn document_count(&self) -> u32 {
        self.lists.read().values().map(|l| l.document_count()).sum()
    }

    pub fn needs_merge(&self) -> bool {
        self.byte_size() >= self.config.inverted_batch_size_max
    }

    /// Every key currently staged, in sorted order (word-boundary first,
    /// then lexicographic).
    pub fn keys_in_order(&self) -> Vec<Key> {
        self.lists.read().keys().cloned().collect()
    }

    pub fn take(&self, key: &Key) -> Option<BatchList> {
        self.lists.write().remove(key)
    }

    pub fn get_iterator(&self, key: &Key) -> Option<ListIteratorImpl> {
        self.lists.read().get(key).map(|l| {
            crate::list::ListIteratorImpl::Simple(crate::list::SimpleListIterator::new(l.postings()))
        })
    }

    /// Remove one document from a staged term's list, as an expunge
    /// rollback undoing a tombstone this batch hasn't merged away yet.
    pub fn expunge_from(&self, key: &Key, document_id: DocumentId) -> Option<Option<LocationList>> {
        self.lists.write().get_mut(key).and_then(|l| l.expunge(document_id))
    }

    /// Remove and return every staged list, in key order, resetting this
    /// batch to empty. The merge path calls this once it has successfully
    /// folded every list into the large index.
    pub fn drain(&self) -> Vec<(Key, BatchList)> {
        self.small_ids.write().clear();
        std::mem::take(&mut *self.lists.write()).into_iter().collect()
    }

    /// Remove and return every staged list's real document IDs, converted
    /// back from this batch's section-local small IDs, then reset the batch
    /// (lists and small-ID map both) to empty. For staging areas whose
    /// postings carry renumbered IDs, e.g. the tombstone batch.
    pub fn drain_big_ids(&self) -> Vec<(Key, Vec<DocumentId>)> {
        let lists = std::mem::take(&mut *self.lists.write());
        let small_ids = self.small_ids.read();
        let out: Vec<(Key, Vec<DocumentId>)> = lists
            .into_iter()
            .map(|(key, list)| {
                let ids = list
                    .postings()
                    .into_iter()
                    .map(|(small_id, _, _)| {
                        small_ids.to_big(small_id).expect("tombstone doc id was assigned by this batch")
                    })
                    .collect();
                (key, ids)
            })
            .collect();
        drop(small_ids);
        self.small_ids.write().clear();
        out
    }
}

/// Read-only cursor over an [`InvertedBatch`]'s keys, mirroring
/// [`ListManager`]'s reset/next shape so a merge can drive both the same
/// way.
pub struct BatchListManager<'a> {
    batch: &'a InvertedBatch,
    keys: Vec<Key>,
    idx: usize,
}

impl<'a> BatchListManager<'a> {
    pub fn new(batch: &'a InvertedBatch) -> Self {
        Self { batch, keys: batch.keys_in_order(), idx: 0 }
    }

    pub fn next(&mut self) -> Option<Key> {
        let key = self.keys.get(self.idx).cloned();
        if key.is_some() {
            self.idx += 1;
        }
        key
    }

    pub fn take_current(&self, key: &Key) -> Option<BatchList> {
        self.batch.take(key)
    }
}
