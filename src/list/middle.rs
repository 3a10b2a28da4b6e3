//! Middle representation: a leaf header plus an overflow chain of
//! fixed-size ID blocks, each independently findable by its first doc-ID.
//! Expunge marks a block "to-delete" and only unlinks it later, driven by
//! `expunge_id_block`, so a burst of deletes doesn't widen the dirty-page
//! set while the merge is in progress.

use crate::types::{DocumentId, LocationList};

#[derive(Debug, Clone)]
struct IdBlock {
    first_document_id: DocumentId,
    postings: Vec<(DocumentId, Option<LocationList>)>,
    to_delete: bool,
}

impl IdBlock {
    fn last_document_id(&self) -> DocumentId {
        self.postings.last().map(|(id, _)| *id).unwrap_or(self.first_document_id)
    }
}

#[derive(Debug, Clone)]
pub struct MiddleList {
    chain: Vec<IdBlock>,
    document_count: u32,
    block_unit_size: usize,
    /// First-doc-IDs of blocks marked to-delete, draining on
    /// [`MiddleList::expunge_id_block`]. This is the deferred delete log,
    /// advisory-only across a crash.
    delete_undo_log: Vec<DocumentId>,
}

impl MiddleList {
    pub fn new(block_unit_size: usize) -> Self {
        Self {
            chain: Vec::new(),
            document_count: 0,
            block_unit_size,
            delete_undo_log: Vec::new(),
        }
    }

    pub fn from_postings(block_unit_size: usize, postings: Vec<(DocumentId, Option<LocationList>)>) -> Self {
        let mut list = Self::new(block_unit_size);
        for (doc_id, locations) in postings {
            list.insert(doc_id, locations);
        }
        list
    }

    pub fn document_count(&self) -> u32 {
        self.document_count
    }

    pub fn first_document_id(&self) -> Option<DocumentId> {
        self.chain.first().map(|b| b.first_document_id)
    }

    pub fn last_document_id(&self) -> Option<DocumentId> {
        self.chain.last().map(|b| b.last_document_id())
    }

    pub fn postings(&self) -> Vec<(DocumentId, Option<LocationList>)> {
        self.chain
            .iter()
            .filter(|b| !b.to_delete)
            .flat_map(|b| b.postings.iter().cloned())
            .collect()
    }

    /// Append one posting; caller guarantees doc-IDs ascend across calls.
    pub fn insert(&mut self, document_id: DocumentId, locations: Option<LocationList>) {
        match self.chain.last_mut() {
            Some(block) if !block.to_delete && block.postings.len() < self.block_unit_size => {
                block.postings.push((document_id, locations));
            }
            _ => {
                self.chain.push(IdBlock {
                    first_document_id: document_id,
                    postings: vec![(document_id, locations)],
                    to_delete: false,
                });
            }
        }
        self.document_count += 1;
    }

    /// Binary search for the block whose range could contain `document_id`.
    fn block_index_for(&self, document_id: DocumentId) -> Option<usize> {
        if self.chain.is_empty() {
            return None;
        }
        match self
            .chain
            .binary_search_by(|b| b.first_document_id.cmp(&document_id))
        {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    pub fn expunge(&mut self, document_id: DocumentId) -> Option<Option<LocationList>> {
        let idx = self.block_index_for(document_id)?;
        let block = &mut self.chain[idx];
        let pos = block.postings.iter().position(|(id, _)| *id == document_id)?;
        let (_, removed) = block.postings.remove(pos);
        self.document_count -= 1;
        if block.postings.is_empty() {
            block.to_delete = true;
            self.delete_undo_log.push(block.first_document_id);
        }
        Some(removed)
    }

    /// Bulk expunge of every doc-ID in `others`, used by the merge path.
    pub fn expunge_list(&mut self, others: &[DocumentId]) -> u32 {
        let mut n = 0;
        for &id in others {
            if self.expunge(id).is_some() {
                n += 1;
            }
        }
        n
    }

    pub fn undo_expunge(&mut self, document_id: DocumentId, locations: Option<LocationList>) {
        self.insert(document_id, locations);
        self.chain.sort_by_key(|b| b.first_document_id);
    }

    /// Drain the deferred delete log, unlinking every block marked
    /// to-delete. Resumable: if interrupted, the remaining blocks are still
    /// correctly marked and will be drained on the next call.
    pub fn expunge_id_block(&mut self) -> u32 {
        let before = self.chain.len();
        self.chain.retain(|b| !b.to_delete);
        self.delete_undo_log.clear();
        (before - self.chain.len()) as u32
    }

    pub fn clear_delete_id_block_undo_log(&mut self) {
        self.delete_undo_log.clear();
    }

    pub fn pending_delete_blocks(&self) -> usize {
        self.delete_undo_log.len()
    }

    /// Merge another Middle list's live postings into this one.
    pub fn insert_list(&mut self, other: &MiddleList) -> u32 {
        let postings = other.postings();
        let n = postings.len() as u32;
        for (doc_id, locations) in postings {
            self.insert(doc_id, locations);
        }
        self.chain.sort_by_key(|b| b.first_document_id);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_splits_into_fixed_size_blocks() {
        let mut l = MiddleList::new(2);
        for id in 1..=5u32 {
            l.insert(id, None);
        }
        assert_eq!(l.chain.len(), 3);
        assert_eq!(l.document_count(), 5);
        assert_eq!(l.postings().iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn expunge_marks_block_and_defers_unlink() {
        let mut l = MiddleList::new(1);
        l.insert(1, None);
        l.insert(2, None);
        l.expunge(1);
        assert_eq!(l.pending_delete_blocks(), 1);
        assert_eq!(l.postings(), vec![(2, None)]);
        let unlinked = l.expunge_id_block();
        assert_eq!(unlinked, 1);
        assert_eq!(l.pending_delete_blocks(), 0);
    }

    #[test]
    fn expunge_then_undo_restores_visibility() {
        let mut l = MiddleList::new(4);
        l.insert(1, Some(LocationList::new(vec![1])));
        l.insert(2, None);
        let removed = l.expunge(1).unwrap();
        assert!(l.postings().iter().all(|(id, _)| *id != 1));
        l.undo_expunge(1, removed);
        assert_eq!(l.postings(), vec![(1, Some(LocationList::new(vec![1]))), (2, None)]);
    }
}
