//! Batch representation: an in-memory Area with no hard cap, grown the same
//! way a Short list grows. When a single list would grow past
//! what's comfortable, [`crate::unit::Batch`]'s `BatchListMap` pushes a new
//! `BatchList` for the term instead of growing this one further.

use super::area::Area;
use super::short::{InsertOutcome, ShortList};
use crate::codec::Coder;
use crate::types::{DocumentId, LocationList};
use std::sync::Arc;

/// Per-node bookkeeping charged against the BatchListMap's byte ceiling
/// alongside the Area's own unit storage, matching the source's accounting
/// closely enough to keep operator tuning numbers meaningful.
const NODE_OVERHEAD_BYTES: u64 = 64;

#[derive(Clone)]
pub struct BatchList {
    inner: ShortList,
}

impl BatchList {
    pub fn new(coder: Arc<dyn Coder>, initial_unit_size: u32, regular_unit_size: u32, track_positions: bool) -> Self {
        Self {
            inner: ShortList::new(coder, initial_unit_size, regular_unit_size, u32::MAX, track_positions),
        }
    }

    /// Insert, growing without limit. `Ok` unless the caller's tracked
    /// aggregate size already demands a new list be started instead (that
    /// policy lives in `BatchListMap`, not here).
    pub fn insert(&mut self, document_id: DocumentId, locations: Option<&LocationList>) {
        match self.inner.insert(document_id, locations) {
            InsertOutcome::Inserted => {}
            InsertOutcome::NeedsConversion => unreachable!("BatchList has no hard cap"),
        }
    }

    pub fn postings(&self) -> Vec<(DocumentId, u32, Option<LocationList>)> {
        self.inner.postings()
    }

    pub fn area(&self) -> &Area {
        &self.inner.area
    }

    /// Bytes charged against the owning `BatchListMap`'s ceiling.
    pub fn byte_size(&self) -> u64 {
        (self.inner.area.unit_size as u64) * 4 + NODE_OVERHEAD_BYTES
    }

    pub fn document_count(&self) -> u32 {
        self.inner.area.document_count
    }

    pub fn expunge(&mut self, document_id: DocumentId) -> Option<Option<LocationList>> {
        self.inner.expunge(document_id)
    }

    pub fn expunge_list(&mut self, other: &[DocumentId]) -> u32 {
        self.inner.expunge_list(other)
    }

    pub fn undo_expunge(&mut self, document_id: DocumentId, locations: Option<LocationList>) {
        self.inner.undo_expunge(document_id, locations);
    }

    pub fn insert_list(&mut self, other: &BatchList) -> u32 {
        self.inner.insert_list(&other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Void;

    #[test]
    fn grows_without_conversion() {
        let mut l = BatchList::new(Arc::new(Void), 1, 4, false);
        for id in 1..50u32 {
            l.insert(id, None);
        }
        assert_eq!(l.document_count(), 49);
    }

    #[test]
    fn byte_size_tracks_area_growth() {
        let mut l = BatchList::new(Arc::new(Void), 1, 4, false);
        let before = l.byte_size();
        for id in 1..20u32 {
            l.insert(id, None);
        }
        assert!(l.byte_size() > before);
    }
}
