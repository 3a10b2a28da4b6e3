//! The three posting-list representations and the cursors over them.
//! [`InvertedList`] is a closed sum type rather than a trait
//! object: a Short list converts to Middle in place once it outgrows its
//! hard cap, and every other call dispatches by exhaustive match.

pub mod area;
pub mod batch;
pub mod iterator;
pub mod middle;
pub mod short;

pub use area::Area;
pub use batch::BatchList;
pub use iterator::{
    DelayListIterator, ListIterator, ListIteratorImpl, ListIteratorWithExpungeList, LocationListIterator,
    MultiListIterator, SimpleListIterator,
};
pub use middle::MiddleList;
pub use short::{InsertOutcome, ShortList};

use crate::types::{DocumentId, LocationList, UNDEFINED_DOCUMENT_ID as UNDEFINED};

/// Outcome of [`InvertedList::insert`]: whether the insert triggered a
/// Short-to-Middle conversion the caller (the owning unit) needs to record.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    ConvertedToMiddle,
}

pub enum InvertedList {
    Short(ShortList),
    Middle(MiddleList),
    Batch(BatchList),
}

impl InvertedList {
    pub fn postings(&self) -> Vec<(DocumentId, u32, Option<LocationList>)> {
        match self {
            Self::Short(l) => l.postings(),
            Self::Batch(l) => l.postings(),
            Self::Middle(l) => l
                .postings()
                .into_iter()
                .map(|(id, loc)| {
                    let tf = loc.as_ref().map(|l| l.term_frequency().max(1)).unwrap_or(1);
                    (id, tf, loc)
                })
                .collect(),
        }
    }

    pub fn document_count(&self) -> u32 {
        match self {
            Self::Short(l) => l.area.document_count,
            Self::Batch(l) => l.document_count(),
            Self::Middle(l) => l.document_count(),
        }
    }

    pub fn max_document_id(&self) -> DocumentId {
        match self {
            Self::Short(l) => l.area.last_document_id,
            Self::Batch(l) => l.area().last_document_id,
            Self::Middle(l) => l.last_document_id().unwrap_or(UNDEFINED),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.document_count() == 0
    }

    /// Insert a posting. A Short list that has hit its hard cap converts
    /// itself to a Middle representation in place and retries once.
    pub fn insert(&mut self, document_id: DocumentId, locations: Option<&LocationList>, block_unit_size: usize) -> InsertResult {
        match self {
            Self::Short(l) => match l.insert(document_id, locations) {
                InsertOutcome::Inserted => InsertResult::Inserted,
                InsertOutcome::NeedsConversion => {
                    self.convert_to_middle(block_unit_size);
                    if let Self::Middle(m) = self {
                        m.insert(document_id, locations.cloned());
                    }
                    InsertResult::ConvertedToMiddle
                }
            },
            Self::Middle(l) => {
                l.insert(document_id, locations.cloned());
                InsertResult::Inserted
            }
            Self::Batch(l) => {
                l.insert(document_id, locations);
                InsertResult::Inserted
            }
        }
    }

    fn convert_to_middle(&mut self, block_unit_size: usize) {
        let postings: Vec<(DocumentId, Option<LocationList>)> = match self {
            Self::Short(l) => l.postings().into_iter().map(|(id, _, loc)| (id, loc)).collect(),
            _ => return,
        };
        *self = Self::Middle(MiddleList::from_postings(block_unit_size, postings));
    }

    pub fn expunge(&mut self, document_id: DocumentId) -> Option<Option<LocationList>> {
        match self {
            Self::Short(l) => l.expunge(document_id),
            Self::Middle(l) => l.expunge(document_id),
            Self::Batch(l) => l.expunge(document_id),
        }
    }

    pub fn expunge_list(&mut self, others: &[DocumentId]) -> u32 {
        match self {
            Self::Short(l) => l.expunge_list(others),
            Self::Middle(l) => l.expunge_list(others),
            Self::Batch(l) => l.expunge_list(others),
        }
    }

    pub fn undo_expunge(&mut self, document_id: DocumentId, locations: Option<LocationList>) {
        match self {
            Self::Short(l) => {
                l.undo_expunge(document_id, locations);
            }
            Self::Middle(l) => l.undo_expunge(document_id, locations),
            Self::Batch(l) => l.undo_expunge(document_id, locations),
        }
    }

    /// Drain any blocks a Middle list has deferred for unlinking. A no-op on
    /// Short and Batch lists, which have no overflow chain to vacuum.
    pub fn vacuum(&mut self) -> u32 {
        match self {
            Self::Middle(l) => l.expunge_id_block(),
            _ => 0,
        }
    }

    pub fn get_iterator(&self) -> ListIteratorImpl {
        ListIteratorImpl::Simple(SimpleListIterator::new(self.postings()))
    }

    /// Discard a Middle list's deferred-unlink bookkeeping without draining
    /// the blocks it names. A no-op on Short and Batch lists.
    pub fn clear_delete_log(&mut self) {
        if let Self::Middle(l) = self {
            l.clear_delete_id_block_undo_log();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Void;
    use std::sync::Arc;

    fn short_list() -> InvertedList {
        InvertedList::Short(ShortList::new(Arc::new(Void), 1, 8, 4, false))
    }

    #[test]
    fn short_list_converts_to_middle_when_full() {
        let mut l = short_list();
        assert_eq!(l.insert(1, None, 2), InsertResult::Inserted);
        assert_eq!(l.insert(2, None, 2), InsertResult::Inserted);
        assert_eq!(l.insert(100_000, None, 2), InsertResult::ConvertedToMiddle);
        assert!(matches!(l, InvertedList::Middle(_)));
        assert_eq!(l.document_count(), 3);
        assert_eq!(l.postings().iter().map(|(id, _, _)| *id).collect::<Vec<_>>(), vec![1, 2, 100_000]);
    }

    #[test]
    fn iterator_walks_postings_in_order() {
        let mut l = short_list();
        l.insert(3, None, 2);
        l.insert(7, None, 2);
        let mut it = l.get_iterator();
        assert_eq!(it.next(), 3);
        assert_eq!(it.next(), 7);
        assert_eq!(it.next(), UNDEFINED);
    }

    #[test]
    fn expunge_then_vacuum_on_middle_list() {
        let mut l = InvertedList::Middle(MiddleList::new(1));
        l.insert(1, None, 1);
        l.insert(2, None, 1);
        l.expunge(1);
        assert_eq!(l.vacuum(), 1);
        assert_eq!(l.document_count(), 1);
    }
}
