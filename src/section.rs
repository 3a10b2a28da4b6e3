//! Top-level orchestration: one term index's full insert/expunge/merge life
//! cycle. [`InvertedSection`] ties together the delayed-merge
//! "large index plus small staging indexes" scheme — a merged,
//! possibly-distributed [`InvertedMultiUnit`] and two never-merged-to-disk
//! [`InvertedBatch`]es (one for inserts, one for tombstones) — with the
//! [`OtherInformationFile`] flip/merge-state header and the
//! [`SearchInformation`] per-document snapshot queries read from.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::list::{DelayListIterator, ListIterator, ListIteratorImpl, ListIteratorWithExpungeList};
use crate::locker::LockTable;
use crate::other_info::{OtherInformationFile, SearchInformation};
use crate::tokenizer::{TokenizeMode, Tokenizer};
use crate::types::{DocumentId, Key, LocationList, UNDEFINED_DOCUMENT_ID as UNDEFINED};
use crate::unit::{InvertedBatch, InvertedMultiUnit};
use parking_lot::RwLock;
use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::sync::Arc;

pub struct InvertedSection {
    config: EngineConfig,
    tokenizer: Arc<dyn Tokenizer>,
    tokenize_mode: TokenizeMode,
    large: Arc<InvertedMultiUnit>,
    insert_batch: InvertedBatch,
    /// Tombstone staging area, used only when `expunge_flag_mode` is off.
    expunge_batch: InvertedBatch,
    /// Delete-flag side, used only when `expunge_flag_mode` is on.
    delete_flags: RwLock<RoaringBitmap>,
    other_info: RwLock<OtherInformationFile>,
    search_info: RwLock<SearchInformation>,
    lock_table: Arc<LockTable>,
    /// Per-term expunge count since that term's last vacuum, checked against
    /// `config.vacuum_threshold` at the end of every `sync_merge`.
    term_expunge_counts: RwLock<HashMap<Key, u32>>,
}

impl InvertedSection {
    pub fn open(config: EngineConfig, tokenizer: Arc<dyn Tokenizer>, tokenize_mode: TokenizeMode) -> Self {
        let track_positions = true;
        let unit_count = config.unit_count.max(1) as usize;
        let large = Arc::new(InvertedMultiUnit::create(config.clone(), track_positions));
        let insert_batch = InvertedBatch::new(config.clone(), track_positions);
        let expunge_batch = InvertedBatch::new(config.clone(), false);
        Self {
            other_info: RwLock::new(OtherInformationFile::new(unit_count, config.max_file_size)),
            search_info: RwLock::new(SearchInformation::new()),
            lock_table: Arc::new(LockTable::new()),
            config,
            tokenizer,
            tokenize_mode,
            large,
            insert_batch,
            expunge_batch,
            delete_flags: RwLock::new(RoaringBitmap::new()),
            term_expunge_counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn lock_table(&self) -> Arc<LockTable> {
        self.lock_table.clone()
    }

    /// Tokenize and index one document's text. Returns whether the insert
    /// staging area has crossed its merge-request threshold; under
    /// synchronous merge policy, a crossed threshold is folded in before
    /// this call returns and `false` is reported instead.
    pub fn insert(&self, document_id: DocumentId, text: &str, score: f64, section_size: u32) -> Result<bool> {
        let tokenized = self.tokenizer.tokenize(text, self.tokenize_mode);
        for (key, positions) in &tokenized.terms {
            let locations = LocationList::new(positions.clone());
            self.insert_batch.insert(key, document_id, Some(&locations));
        }
        self.search_info.write().record_document(document_id, tokenized.length, score, section_size, 0);
        if let Some(features) = tokenized.features {
            self.search_info.write().record_feature_set(document_id, features);
        }
        self.maybe_sync_merge(self.insert_batch.needs_merge())
    }

    /// Stage an expunge for `document_id`. `terms` names every term the
    /// document was indexed under; the engine keeps no forward index of its
    /// own, so the caller (holding the document's original text or a prior
    /// tokenization) supplies it. Ignored under delete-flag mode, where a
    /// single flag covers the whole document regardless of term.
    pub fn expunge(&self, document_id: DocumentId, terms: &[Key]) -> Result<bool> {
        if self.config.expunge_flag_mode {
            self.delete_flags.write().insert(document_id);
            self.search_info.write().record_expunge(document_id);
            return Ok(false);
        }
        let small_id = self.expunge_batch.assign_document_id(document_id);
        let mut counts = self.term_expunge_counts.write();
        for term in terms {
            self.expunge_batch.insert(term, small_id, None);
            *counts.entry(term.clone()).or_insert(0) += 1;
        }
        drop(counts);
        self.search_info.write().record_expunge(document_id);
        self.maybe_sync_merge(self.expunge_batch.needs_merge())
    }

    fn maybe_sync_merge(&self, need_merge: bool) -> Result<bool> {
        if need_merge && !self.config.is_async_merge {
            self.sync_merge()?;
            Ok(false)
        } else {
            Ok(need_merge)
        }
    }

    /// Undo a staged (not yet merged) expunge. Once `sync_merge` has folded
    /// a tombstone into the large index, rollback is no longer possible
    /// through this call — the caller's transaction layer must not offer it
    /// past that point.
    pub fn expunge_rollback(&self, document_id: DocumentId, terms: &[Key]) -> Result<()> {
        if self.config.expunge_flag_mode {
            self.delete_flags.write().remove(document_id);
        } else if let Some(small_id) = self.expunge_batch.small_document_id(document_id) {
            for term in terms {
                self.expunge_batch.expunge_from(term, small_id);
            }
        }
        Ok(())
    }

    /// Fold every staged insert and tombstone into the large index, flip the
    /// merge-state header around the critical section, and rotate the
    /// distributed large index to its next unit.
    pub fn sync_merge(&self) -> Result<()> {
        let boundary = self.search_info.read().max_document_id();
        self.other_info.write().flip(boundary)?;

        for (key, list) in self.insert_batch.drain() {
            for (doc_id, _, locations) in list.postings() {
                self.large.insert(&key, doc_id, locations.as_ref())?;
            }
        }

        let tombstones: Vec<(Key, DocumentId)> = self
            .expunge_batch
            .drain_big_ids()
            .into_iter()
            .flat_map(|(key, ids)| ids.into_iter().map(move |doc_id| (key.clone(), doc_id)))
            .collect();

        if !tombstones.is_empty() {
            use rayon::prelude::*;
            (0..self.large.unit_count())
                .into_par_iter()
                .map(|unit_index| {
                    let unit = self.large.unit(unit_index);
                    for (key, doc_id) in &tombstones {
                        unit.expunge(key, *doc_id)?;
                    }
                    Ok(())
                })
                .collect::<Result<Vec<()>>>()?;

            self.vacuum_terms_past_threshold(tombstones.iter().map(|(key, _)| key))?;
        }

        let next_unit = if self.large.unit_count() > 1 { self.large.change_unit() as u32 } else { 0 };
        self.other_info.write().merge_done(next_unit);
        Ok(())
    }

    /// Drain the deferred-unlink blocks of every term (among `keys`) whose
    /// expunge count has crossed `config.vacuum_threshold` since its last
    /// vacuum, resetting each one's counter once drained.
    fn vacuum_terms_past_threshold<'a>(&self, keys: impl Iterator<Item = &'a Key>) -> Result<()> {
        let mut due = std::collections::HashSet::new();
        {
            let counts = self.term_expunge_counts.read();
            for key in keys {
                if counts.get(key).copied().unwrap_or(0) >= self.config.vacuum_threshold {
                    due.insert(key.clone());
                }
            }
        }
        for key in &due {
            for i in 0..self.large.unit_count() {
                self.large.unit(i).get_update_list_manager().vacuum(key)?;
            }
        }
        let mut counts = self.term_expunge_counts.write();
        for key in &due {
            counts.remove(key);
        }
        Ok(())
    }

    pub fn merge_state(&self) -> crate::other_info::MergeState {
        self.other_info.read().merge_state()
    }

    /// Serialize the merge-state header for persistence alongside the
    /// section's pages.
    pub fn save_header(&self) -> Result<Vec<u8>> {
        self.other_info.read().to_bytes()
    }

    /// Restore the merge-state header from bytes produced by `save_header`.
    pub fn load_header(&self, bytes: &[u8]) -> Result<()> {
        *self.other_info.write() = OtherInformationFile::from_bytes(bytes)?;
        Ok(())
    }

    /// Read-side fan-in: large index, insert staging area, and a skip
    /// filter over whatever tombstones haven't made it into the large index
    /// (or, in delete-flag mode, the whole delete-flag set).
    pub fn get_iterator(&self, key: &Key) -> Result<Option<ListIteratorImpl>> {
        let large_iter = self.large.get_iterator(key)?;
        let insert_iter = self.insert_batch.get_iterator(key);

        let combined = match (large_iter, insert_iter) {
            (None, None) => None,
            (Some(l), None) => Some(l),
            (None, Some(s)) => Some(s),
            (Some(l), Some(s)) => {
                let boundary = self.other_info.read().full_max_id();
                Some(ListIteratorImpl::Delay(Box::new(DelayListIterator::new(
                    vec![l, s],
                    vec![boundary, DocumentId::MAX],
                ))))
            }
        };

        let Some(combined) = combined else {
            return Ok(None);
        };

        let tombstones: Vec<DocumentId> = if self.config.expunge_flag_mode {
            self.delete_flags.read().iter().collect()
        } else {
            match self.expunge_batch.get_iterator(key) {
                Some(mut it) => {
                    let mut ids = Vec::new();
                    loop {
                        let small_id = it.next();
                        if small_id == UNDEFINED {
                            break;
                        }
                        ids.push(
                            self.expunge_batch
                                .convert_to_big_document_id(small_id)
                                .expect("tombstone doc id was assigned by this batch"),
                        );
                    }
                    ids
                }
                None => Vec::new(),
            }
        };

        if tombstones.is_empty() {
            Ok(Some(combined))
        } else {
            Ok(Some(ListIteratorImpl::Expunge(Box::new(ListIteratorWithExpungeList::new(combined, tombstones)))))
        }
    }

    pub fn search_information(&self) -> SearchInformation {
        self.search_info.read().clone()
    }

    /// Drain every distributed unit's deferred-unlink Middle-list blocks.
    pub fn vacuum_all(&self) -> Result<u32> {
        let mut total = 0;
        for i in 0..self.large.unit_count() {
            total += self.large.unit(i).expunge_id_block()?;
        }
        Ok(total)
    }

    pub fn needs_merge(&self) -> bool {
        self.insert_batch.needs_merge() || (!self.config.expunge_flag_mode && self.expunge_batch.needs_merge())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WhitespaceTokenizer;

    fn section() -> InvertedSection {
        InvertedSection::open(EngineConfig::for_testing(), Arc::new(WhitespaceTokenizer { case_sensitive: false }), TokenizeMode::WordIndexingOnly)
    }

    #[test]
    fn insert_then_search_round_trips() {
        let s = section();
        s.insert(1, "rust is fast", 0.0, 3).unwrap();
        s.insert(2, "rust is safe", 0.0, 3).unwrap();
        let mut it = s.get_iterator(&Key::term("rust")).unwrap().unwrap();
        assert_eq!(it.next(), 1);
        assert_eq!(it.next(), 2);
        assert_eq!(it.next(), UNDEFINED);
    }

    #[test]
    fn small_to_large_merge_preserves_postings() {
        let s = section();
        for id in 1..=50u32 {
            s.insert(id, "rust", 0.0, 1).unwrap();
        }
        assert!(s.needs_merge() || s.merge_state() == crate::other_info::MergeState::Idle);
        s.sync_merge().unwrap();
        let mut it = s.get_iterator(&Key::term("rust")).unwrap().unwrap();
        let mut count = 0;
        while it.next() != UNDEFINED {
            count += 1;
        }
        assert_eq!(count, 50);
    }

    #[test]
    fn expunge_then_rollback_restores_visibility() {
        let s = section();
        s.insert(1, "rust", 0.0, 1).unwrap();
        s.insert(2, "rust", 0.0, 1).unwrap();
        s.expunge(1, &[Key::term("rust")]).unwrap();
        let mut it = s.get_iterator(&Key::term("rust")).unwrap().unwrap();
        assert_eq!(it.next(), 2);
        assert_eq!(it.next(), UNDEFINED);

        s.expunge_rollback(1, &[Key::term("rust")]).unwrap();
        let mut it = s.get_iterator(&Key::term("rust")).unwrap().unwrap();
        let mut out = vec![];
        loop {
            let d = it.next();
            if d == UNDEFINED {
                break;
            }
            out.push(d);
        }
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn expunge_survives_a_merge_as_a_tombstone() {
        let s = section();
        s.insert(1, "rust", 0.0, 1).unwrap();
        s.insert(2, "rust", 0.0, 1).unwrap();
        s.sync_merge().unwrap();
        s.expunge(1, &[Key::term("rust")]).unwrap();
        s.sync_merge().unwrap();
        let mut it = s.get_iterator(&Key::term("rust")).unwrap().unwrap();
        assert_eq!(it.next(), 2);
        assert_eq!(it.next(), UNDEFINED);
    }

    #[test]
    fn header_survives_a_save_load_round_trip() {
        let s = section();
        for id in 1..=50u32 {
            s.insert(id, "rust", 0.0, 1).unwrap();
        }
        s.sync_merge().unwrap();
        let saved = s.save_header().unwrap();

        let restored = section();
        restored.load_header(&saved).unwrap();
        assert_eq!(restored.merge_state(), s.merge_state());
    }

    #[test]
    fn expunge_count_past_threshold_auto_vacuums_on_merge() {
        use crate::list::{InvertedList, MiddleList};
        use crate::manager::ResetMode;

        let cfg = EngineConfig { vacuum_threshold: 3, ..EngineConfig::for_testing() };
        let s = InvertedSection::open(cfg, Arc::new(WhitespaceTokenizer { case_sensitive: false }), TokenizeMode::WordIndexingOnly);
        let key = Key::term("rust");
        for id in 1..=5u32 {
            s.insert(id, "rust", 0.0, 1).unwrap();
        }
        s.sync_merge().unwrap();

        // Force the large index's list for "rust" into a Middle representation
        // with one document per block, so expunging any of them immediately
        // defers an unlink rather than needing a realistic doc count to cross
        // the Short-to-Middle conversion threshold.
        let manager = s.large.unit(0).get_update_list_manager();
        manager.reset(&key, ResetMode::Search).unwrap();
        manager.with_current_list(|l| {
            let postings = l.postings().into_iter().map(|(id, _, loc)| (id, loc)).collect();
            *l = InvertedList::Middle(MiddleList::from_postings(1, postings));
        });

        for id in 1..=3u32 {
            s.expunge(id, &[key.clone()]).unwrap();
        }
        s.sync_merge().unwrap();

        assert_eq!(s.vacuum_all().unwrap(), 0);
    }

    #[test]
    fn delete_flag_mode_filters_without_a_tombstone_list() {
        let cfg = EngineConfig::for_testing().with_expunge_flag();
        let s = InvertedSection::open(cfg, Arc::new(WhitespaceTokenizer { case_sensitive: false }), TokenizeMode::WordIndexingOnly);
        s.insert(1, "rust", 0.0, 1).unwrap();
        s.insert(2, "rust", 0.0, 1).unwrap();
        s.expunge(1, &[]).unwrap();
        let mut it = s.get_iterator(&Key::term("rust")).unwrap().unwrap();
        assert_eq!(it.next(), 2);
        assert_eq!(it.next(), UNDEFINED);
    }
}
