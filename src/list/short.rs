//! Short representation: a single [`Area`] living in one leaf page's slot.
//! Growth doubles the Area up to a threshold, then grows by fixed
//! increments until a hard cap forces conversion to a Middle list.

use super::area::Area;
use crate::codec::Coder;
use crate::types::{DocumentId, LocationList};
use std::sync::Arc;

pub enum InsertOutcome {
    Inserted,
    /// The Area is already at its hard cap; the unit must convert this list
    /// to a Middle representation.
    NeedsConversion,
}

#[derive(Clone)]
pub struct ShortList {
    pub area: Area,
    pub coder: Arc<dyn Coder>,
    pub regular_unit_size: u32,
    pub max_unit_size: u32,
}

impl std::fmt::Debug for ShortList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortList")
            .field("area", &self.area)
            .field("coder", &self.coder.name())
            .field("regular_unit_size", &self.regular_unit_size)
            .field("max_unit_size", &self.max_unit_size)
            .finish()
    }
}

impl ShortList {
    pub fn new(
        coder: Arc<dyn Coder>,
        initial_unit_size: u32,
        regular_unit_size: u32,
        max_unit_size: u32,
        track_positions: bool,
    ) -> Self {
        Self {
            area: Area::new(initial_unit_size as usize, track_positions),
            coder,
            regular_unit_size,
            max_unit_size,
        }
    }

    fn grow_once(&mut self) -> bool {
        let current = self.area.unit_size as u32;
        if current >= self.max_unit_size {
            return false;
        }
        let next = if current < self.regular_unit_size {
            (current * 2).min(self.regular_unit_size)
        } else {
            current + self.regular_unit_size
        }
        .min(self.max_unit_size);
        self.area.grow(next as usize);
        true
    }

    pub fn insert(&mut self, document_id: DocumentId, locations: Option<&LocationList>) -> InsertOutcome {
        loop {
            if self.area.try_insert(self.coder.as_ref(), document_id, locations) {
                return InsertOutcome::Inserted;
            }
            if !self.grow_once() {
                return InsertOutcome::NeedsConversion;
            }
        }
    }

    pub fn postings(&self) -> Vec<(DocumentId, u32, Option<LocationList>)> {
        self.area.postings(self.coder.as_ref())
    }

    /// Remove one posting, if present. Returns the removed locations so the
    /// caller can build an undo record.
    pub fn expunge(&mut self, document_id: DocumentId) -> Option<Option<LocationList>> {
        let mut postings = self.area.postings(self.coder.as_ref());
        let idx = postings.iter().position(|(id, _, _)| *id == document_id)?;
        let (_, _, removed) = postings.remove(idx);
        let rebuilt: Vec<(DocumentId, Option<LocationList>)> =
            postings.into_iter().map(|(id, _, loc)| (id, loc)).collect();
        self.area.rebuild(self.coder.as_ref(), &rebuilt);
        Some(removed)
    }

    /// Remove every posting whose doc-ID is in `other`'s postings, returning
    /// the count removed (merge-path bulk expunge).
    pub fn expunge_list(&mut self, other: &[DocumentId]) -> u32 {
        use std::collections::HashSet;
        let to_remove: HashSet<DocumentId> = other.iter().copied().collect();
        let postings = self.area.postings(self.coder.as_ref());
        let before = postings.len();
        let kept: Vec<(DocumentId, Option<LocationList>)> = postings
            .into_iter()
            .filter(|(id, _, _)| !to_remove.contains(id))
            .map(|(id, _, loc)| (id, loc))
            .collect();
        let removed = before - kept.len();
        self.area.rebuild(self.coder.as_ref(), &kept);
        removed as u32
    }

    /// Re-insert a document undone from an earlier expunge. Unlike `insert`,
    /// the document isn't necessarily the list's new max: if it falls before
    /// the current tail, splice it back into its sorted position and
    /// re-encode the whole Area, since the gap stream can only be appended to
    /// in ascending order.
    pub fn undo_expunge(&mut self, document_id: DocumentId, locations: Option<LocationList>) -> InsertOutcome {
        if self.area.is_empty() || document_id > self.area.last_document_id {
            return self.insert(document_id, locations.as_ref());
        }
        let mut postings: Vec<(DocumentId, Option<LocationList>)> = self
            .area
            .postings(self.coder.as_ref())
            .into_iter()
            .map(|(id, _, loc)| (id, loc))
            .collect();
        let idx = postings.partition_point(|(id, _)| *id < document_id);
        postings.insert(idx, (document_id, locations));
        if self.rebuild_to_fit(&postings) {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::NeedsConversion
        }
    }

    /// Grow the Area, if needed, until the given postings all fit, then
    /// re-encode into it. Used where a rebuilt stream may be larger than what
    /// `Area::rebuild` assumes (undo-expunge reinserting a doc-ID out of
    /// order).
    fn rebuild_to_fit(&mut self, postings: &[(DocumentId, Option<LocationList>)]) -> bool {
        loop {
            let mut probe = Area::new(self.area.unit_size, self.area.track_positions);
            let fits = postings
                .iter()
                .all(|(doc_id, locations)| probe.try_insert(self.coder.as_ref(), *doc_id, locations.as_ref()));
            if fits {
                self.area = probe;
                return true;
            }
            if !self.grow_once() {
                return false;
            }
        }
    }

    pub fn insert_list(&mut self, other: &ShortList) -> u32 {
        let mut n = 0;
        for (doc_id, _, locations) in other.postings() {
            if let InsertOutcome::Inserted = self.insert(doc_id, locations.as_ref()) {
                n += 1;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Void;

    fn list() -> ShortList {
        ShortList::new(Arc::new(Void), 2, 8, 32, true)
    }

    #[test]
    fn insert_grows_until_cap_then_requests_conversion() {
        let mut l = ShortList::new(Arc::new(Void), 1, 8, 4, false);
        assert!(matches!(l.insert(1, None), InsertOutcome::Inserted));
        assert!(matches!(l.insert(2, None), InsertOutcome::Inserted));
        // The Area has grown to its 4-unit (128-bit) hard cap and has no
        // room left for a third Void-coded posting (64 more bits).
        assert!(matches!(l.insert(100_000, None), InsertOutcome::NeedsConversion));
    }

    #[test]
    fn expunge_then_undo_restores_state() {
        let mut l = list();
        l.insert(1, Some(&LocationList::new(vec![1])));
        l.insert(2, Some(&LocationList::new(vec![2, 3])));
        let removed = l.expunge(1).unwrap();
        assert_eq!(l.postings().len(), 1);
        l.undo_expunge(1, removed);
        let postings = l.postings();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].0, 1);
        assert_eq!(postings[0].2.as_ref().unwrap().positions(), &[1]);
    }

    #[test]
    fn insert_then_expunge_is_a_no_op() {
        let mut l = list();
        l.insert(5, None);
        let before = l.postings();
        l.insert(9, None);
        l.expunge(9);
        let after = l.postings();
        assert_eq!(before, after);
    }
}
