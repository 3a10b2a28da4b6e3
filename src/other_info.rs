//! Section-wide bookkeeping that lives alongside the term index rather than
//! inside any one list: [`OtherInformationFile`] is the header a
//! merge flips through, [`SearchInformation`] is the read-only per-document
//! snapshot a query binds against (document length, score, section size,
//! feature set, owning distributed unit).

use crate::error::{FullTextError, Result};
use crate::types::{DocumentId, FeatureSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeState {
    Idle,
    Proceeding,
    /// A merge was requested to cancel; `syncMerge` should unwind to `Idle`
    /// on its next checkpoint rather than commit.
    Canceled,
}

/// Fixed-width header plus a variable-length per-unit count vector,
/// mirroring the source's header-plus-overflow layout: the scalar fields are
/// always present, `per_unit_counts` grows with the distributed unit count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherInformationFile {
    flip_index: u32,
    merge_state: MergeState,
    full_max_id: DocumentId,
    /// The insert side's boundary doc-ID as of the in-progress merge's
    /// `flip`; becomes the new `full_max_id` on `merge_done`.
    ins_min_max_id: DocumentId,
    insert_unit: u32,
    max_file_size: u64,
    per_unit_counts: Vec<u32>,
}

impl OtherInformationFile {
    pub fn new(unit_count: usize, max_file_size: u64) -> Self {
        Self {
            flip_index: 0,
            merge_state: MergeState::Idle,
            full_max_id: 0,
            ins_min_max_id: 0,
            insert_unit: 0,
            max_file_size,
            per_unit_counts: vec![0; unit_count.max(1)],
        }
    }

    pub fn flip_index(&self) -> u32 {
        self.flip_index
    }

    pub fn merge_state(&self) -> MergeState {
        self.merge_state
    }

    pub fn full_max_id(&self) -> DocumentId {
        self.full_max_id
    }

    pub fn insert_unit(&self) -> u32 {
        self.insert_unit
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn per_unit_counts(&self) -> &[u32] {
        &self.per_unit_counts
    }

    /// Begin a merge: snapshot the insert side's current boundary and
    /// advance the flip index, so a reader mid-scan can tell whether the
    /// header it already read is stale.
    pub fn flip(&mut self, ins_min_max_id: DocumentId) -> Result<()> {
        if self.merge_state == MergeState::Proceeding {
            return Err(FullTextError::BadArgument("merge already proceeding".into()));
        }
        self.ins_min_max_id = ins_min_max_id;
        self.merge_state = MergeState::Proceeding;
        self.flip_index = self.flip_index.wrapping_add(1);
        Ok(())
    }

    /// Commit a completed merge: the flipped boundary becomes the new full
    /// index's max ID, and the insert side moves on to `new_insert_unit`.
    pub fn merge_done(&mut self, new_insert_unit: u32) {
        self.full_max_id = self.full_max_id.max(self.ins_min_max_id);
        self.insert_unit = new_insert_unit;
        self.merge_state = MergeState::Idle;
    }

    pub fn merge_cancel(&mut self) {
        self.merge_state = MergeState::Canceled;
    }

    pub fn is_canceled(&self) -> bool {
        self.merge_state == MergeState::Canceled
    }

    pub fn is_proceeding(&self) -> bool {
        self.merge_state == MergeState::Proceeding
    }

    /// Record how many documents a distributed unit holds, refreshed after
    /// each merge into that unit.
    pub fn record_unit_count(&mut self, unit: usize, count: u32) {
        if let Some(c) = self.per_unit_counts.get_mut(unit) {
            *c = count;
        }
    }

    pub fn double_max_file_size(&mut self) {
        self.max_file_size *= 2;
    }

    /// Serialize the header the way a real backend would write it to its
    /// fixed metadata file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a header from bytes produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A query-time, read-only snapshot of per-document facts the scoring layer
/// needs but no single posting list owns: document length (for length
/// normalization), a precomputed score contribution, section size, the
/// clustering feature set, and which distributed unit holds the document.
#[derive(Debug, Clone, Default)]
pub struct SearchInformation {
    document_count: u32,
    expunge_count: u32,
    max_document_id: DocumentId,
    total_document_length: u64,
    document_lengths: HashMap<DocumentId, u32>,
    score_values: HashMap<DocumentId, f64>,
    section_sizes: HashMap<DocumentId, u32>,
    feature_sets: HashMap<DocumentId, FeatureSet>,
    unit_numbers: HashMap<DocumentId, u32>,
}

impl SearchInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_document(&mut self, document_id: DocumentId, length: u32, score: f64, section_size: u32, unit_number: u32) {
        self.document_count += 1;
        self.max_document_id = self.max_document_id.max(document_id);
        self.total_document_length += u64::from(length);
        self.document_lengths.insert(document_id, length);
        self.score_values.insert(document_id, score);
        self.section_sizes.insert(document_id, section_size);
        self.unit_numbers.insert(document_id, unit_number);
    }

    pub fn record_feature_set(&mut self, document_id: DocumentId, features: FeatureSet) {
        self.feature_sets.insert(document_id, features);
    }

    pub fn record_expunge(&mut self, document_id: DocumentId) {
        self.expunge_count += 1;
        self.document_lengths.remove(&document_id);
        self.score_values.remove(&document_id);
        self.section_sizes.remove(&document_id);
        self.feature_sets.remove(&document_id);
        self.unit_numbers.remove(&document_id);
    }

    pub fn document_count(&self) -> u32 {
        self.document_count
    }

    pub fn expunge_count(&self) -> u32 {
        self.expunge_count
    }

    pub fn max_document_id(&self) -> DocumentId {
        self.max_document_id
    }

    pub fn total_document_length(&self) -> u64 {
        self.total_document_length
    }

    pub fn get_document_length(&self, document_id: DocumentId) -> Option<u32> {
        self.document_lengths.get(&document_id).copied()
    }

    pub fn get_score_value(&self, document_id: DocumentId) -> Option<f64> {
        self.score_values.get(&document_id).copied()
    }

    pub fn get_section_size(&self, document_id: DocumentId) -> Option<u32> {
        self.section_sizes.get(&document_id).copied()
    }

    pub fn get_feature_set(&self, document_id: DocumentId) -> Option<&FeatureSet> {
        self.feature_sets.get(&document_id)
    }

    pub fn get_unit_number(&self, document_id: DocumentId) -> Option<u32> {
        self.unit_numbers.get(&document_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_then_merge_done_advances_full_max_id() {
        let mut header = OtherInformationFile::new(1, 1024);
        header.flip(100).unwrap();
        assert!(header.is_proceeding());
        assert_eq!(header.flip_index(), 1);
        header.merge_done(7);
        assert_eq!(header.full_max_id(), 100);
        assert_eq!(header.insert_unit(), 7);
        assert!(!header.is_proceeding());
    }

    #[test]
    fn flip_rejects_concurrent_merge() {
        let mut header = OtherInformationFile::new(1, 1024);
        header.flip(10).unwrap();
        assert!(header.flip(20).is_err());
    }

    #[test]
    fn merge_cancel_is_observable() {
        let mut header = OtherInformationFile::new(1, 1024);
        header.flip(10).unwrap();
        header.merge_cancel();
        assert!(header.is_canceled());
    }

    #[test]
    fn header_round_trips_through_bincode() {
        let mut header = OtherInformationFile::new(2, 1024);
        header.flip(10).unwrap();
        header.merge_done(1);
        header.record_unit_count(0, 7);
        let bytes = header.to_bytes().unwrap();
        let restored = OtherInformationFile::from_bytes(&bytes).unwrap();
        assert_eq!(restored.flip_index(), header.flip_index());
        assert_eq!(restored.full_max_id(), header.full_max_id());
        assert_eq!(restored.insert_unit(), header.insert_unit());
        assert_eq!(restored.per_unit_counts(), header.per_unit_counts());
    }

    #[test]
    fn search_information_round_trips_per_document_facts() {
        let mut info = SearchInformation::new();
        info.record_document(1, 120, 0.5, 3, 0);
        info.record_feature_set(1, FeatureSet { entries: vec![("rust".into(), 0.9)] });
        assert_eq!(info.document_count(), 1);
        assert_eq!(info.get_document_length(1), Some(120));
        assert_eq!(info.get_score_value(1), Some(0.5));
        assert_eq!(info.get_unit_number(1), Some(0));
        assert!(info.get_feature_set(1).is_some());

        info.record_expunge(1);
        assert_eq!(info.expunge_count(), 1);
        assert_eq!(info.get_document_length(1), None);
    }
}
