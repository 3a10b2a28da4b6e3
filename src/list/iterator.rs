//! Cursors over an [`crate::list::InvertedList`]. All variants yield a
//! monotone non-decreasing sequence of document IDs terminated by
//! [`UNDEFINED`]; composed iterators are a closed sum type rather than a
//! v-table hierarchy, to keep the hot read path free of indirect calls.

use crate::types::{DocumentId, LocationList, Position, UNDEFINED_DOCUMENT_ID as UNDEFINED};

/// Cursor over one (term, doc) pair's positions.
#[derive(Debug, Clone, Default)]
pub struct LocationListIterator {
    positions: Vec<Position>,
    idx: usize,
}

impl LocationListIterator {
    pub fn new(locations: Option<&LocationList>) -> Self {
        Self {
            positions: locations.map(|l| l.positions().to_vec()).unwrap_or_default(),
            idx: 0,
        }
    }

    pub fn reset(&mut self) {
        self.idx = 0;
    }

    pub fn next(&mut self) -> Option<Position> {
        let p = self.positions.get(self.idx).copied();
        if p.is_some() {
            self.idx += 1;
        }
        p
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// The common cursor contract every list representation and every composed
/// iterator honors.
pub trait ListIterator {
    fn reset(&mut self);
    fn next(&mut self) -> DocumentId;
    fn find(&mut self, document_id: DocumentId) -> bool;
    fn lower_bound(&mut self, document_id: DocumentId) -> DocumentId;
    fn get_term_frequency(&self) -> u32;
    fn get_location_list_iterator(&self) -> LocationListIterator;
    fn current(&self) -> DocumentId;
}

/// Cursor over one Area/ID-block-chain's already-decoded posting vector
/// (Short, Middle and Batch representations all reduce to this after
/// `postings()`).
#[derive(Debug, Clone)]
pub struct SimpleListIterator {
    postings: Vec<(DocumentId, u32, Option<LocationList>)>,
    idx: Option<usize>,
}

impl SimpleListIterator {
    pub fn new(postings: Vec<(DocumentId, u32, Option<LocationList>)>) -> Self {
        Self { postings, idx: None }
    }

    pub fn max_document_id(&self) -> DocumentId {
        self.postings.last().map(|(id, _, _)| *id).unwrap_or(UNDEFINED)
    }
}

impl ListIterator for SimpleListIterator {
    fn reset(&mut self) {
        self.idx = None;
    }

    fn next(&mut self) -> DocumentId {
        let next_idx = self.idx.map(|i| i + 1).unwrap_or(0);
        if next_idx < self.postings.len() {
            self.idx = Some(next_idx);
            self.postings[next_idx].0
        } else {
            self.idx = Some(self.postings.len());
            UNDEFINED
        }
    }

    fn find(&mut self, document_id: DocumentId) -> bool {
        match self.postings.binary_search_by_key(&document_id, |(id, _, _)| *id) {
            Ok(i) => {
                self.idx = Some(i);
                true
            }
            Err(_) => false,
        }
    }

    fn lower_bound(&mut self, document_id: DocumentId) -> DocumentId {
        match self.postings.binary_search_by_key(&document_id, |(id, _, _)| *id) {
            Ok(i) => {
                self.idx = Some(i);
                self.postings[i].0
            }
            Err(i) if i < self.postings.len() => {
                self.idx = Some(i);
                self.postings[i].0
            }
            Err(_) => {
                self.idx = Some(self.postings.len());
                UNDEFINED
            }
        }
    }

    fn get_term_frequency(&self) -> u32 {
        self.idx
            .and_then(|i| self.postings.get(i))
            .map(|(_, tf, _)| *tf)
            .unwrap_or(0)
    }

    fn get_location_list_iterator(&self) -> LocationListIterator {
        let locations = self.idx.and_then(|i| self.postings.get(i)).and_then(|(_, _, l)| l.as_ref());
        LocationListIterator::new(locations)
    }

    fn current(&self) -> DocumentId {
        self.idx
            .and_then(|i| self.postings.get(i))
            .map(|(id, _, _)| *id)
            .unwrap_or(UNDEFINED)
    }
}

/// Sum type over every iterator shape the engine produces. Exhaustive match
/// dispatch instead of a v-table keeps the hot read path free of indirect
/// calls.
pub enum ListIteratorImpl {
    Simple(SimpleListIterator),
    Delay(Box<DelayListIterator>),
    Expunge(Box<ListIteratorWithExpungeList>),
    Multi(Box<MultiListIterator>),
}

impl ListIterator for ListIteratorImpl {
    fn reset(&mut self) {
        match self {
            Self::Simple(i) => i.reset(),
            Self::Delay(i) => i.reset(),
            Self::Expunge(i) => i.reset(),
            Self::Multi(i) => i.reset(),
        }
    }

    fn next(&mut self) -> DocumentId {
        match self {
            Self::Simple(i) => i.next(),
            Self::Delay(i) => i.next(),
            Self::Expunge(i) => i.next(),
            Self::Multi(i) => i.next(),
        }
    }

    fn find(&mut self, document_id: DocumentId) -> bool {
        match self {
            Self::Simple(i) => i.find(document_id),
            Self::Delay(i) => i.find(document_id),
            Self::Expunge(i) => i.find(document_id),
            Self::Multi(i) => i.find(document_id),
        }
    }

    fn lower_bound(&mut self, document_id: DocumentId) -> DocumentId {
        match self {
            Self::Simple(i) => i.lower_bound(document_id),
            Self::Delay(i) => i.lower_bound(document_id),
            Self::Expunge(i) => i.lower_bound(document_id),
            Self::Multi(i) => i.lower_bound(document_id),
        }
    }

    fn get_term_frequency(&self) -> u32 {
        match self {
            Self::Simple(i) => i.get_term_frequency(),
            Self::Delay(i) => i.get_term_frequency(),
            Self::Expunge(i) => i.get_term_frequency(),
            Self::Multi(i) => i.get_term_frequency(),
        }
    }

    fn get_location_list_iterator(&self) -> LocationListIterator {
        match self {
            Self::Simple(i) => i.get_location_list_iterator(),
            Self::Delay(i) => i.get_location_list_iterator(),
            Self::Expunge(i) => i.get_location_list_iterator(),
            Self::Multi(i) => i.get_location_list_iterator(),
        }
    }

    fn current(&self) -> DocumentId {
        match self {
            Self::Simple(i) => i.current(),
            Self::Delay(i) => i.current(),
            Self::Expunge(i) => i.current(),
            Self::Multi(i) => i.current(),
        }
    }
}

/// Fan-in of N inner iterators whose doc-ID ranges are disjoint and
/// ascending (the large-index-plus-small-index delay scheme): a
/// `maxDocumentID` per unit lets `lowerBound`/`find` skip whole units via
/// binary search instead of touching every one.
pub struct DelayListIterator {
    units: Vec<ListIteratorImpl>,
    max_ids: Vec<DocumentId>,
    current_unit: usize,
}

impl DelayListIterator {
    pub fn new(units: Vec<ListIteratorImpl>, max_ids: Vec<DocumentId>) -> Self {
        debug_assert_eq!(units.len(), max_ids.len());
        Self { units, max_ids, current_unit: 0 }
    }

    fn unit_for(&self, document_id: DocumentId) -> usize {
        self.max_ids.partition_point(|&max| max < document_id)
    }
}

impl ListIterator for DelayListIterator {
    fn reset(&mut self) {
        for u in &mut self.units {
            u.reset();
        }
        self.current_unit = 0;
    }

    fn next(&mut self) -> DocumentId {
        while self.current_unit < self.units.len() {
            let d = self.units[self.current_unit].next();
            if d != UNDEFINED {
                return d;
            }
            self.current_unit += 1;
        }
        UNDEFINED
    }

    fn find(&mut self, document_id: DocumentId) -> bool {
        let idx = self.unit_for(document_id);
        if idx >= self.units.len() {
            return false;
        }
        self.current_unit = idx;
        self.units[idx].find(document_id)
    }

    fn lower_bound(&mut self, document_id: DocumentId) -> DocumentId {
        let mut idx = self.unit_for(document_id);
        while idx < self.units.len() {
            let d = self.units[idx].lower_bound(document_id);
            if d != UNDEFINED {
                self.current_unit = idx;
                return d;
            }
            idx += 1;
        }
        self.current_unit = self.units.len();
        UNDEFINED
    }

    fn get_term_frequency(&self) -> u32 {
        self.units.get(self.current_unit).map(|u| u.get_term_frequency()).unwrap_or(0)
    }

    fn get_location_list_iterator(&self) -> LocationListIterator {
        self.units
            .get(self.current_unit)
            .map(|u| u.get_location_list_iterator())
            .unwrap_or_default()
    }

    fn current(&self) -> DocumentId {
        self.units.get(self.current_unit).map(|u| u.current()).unwrap_or(UNDEFINED)
    }
}

/// Wraps one iterator and skips any doc-ID present in an externally supplied
/// sorted expunge vector, via a single forward cursor. A
/// `lowerBound`/`find` that moves backward of the last probe resets the
/// cursor, since the expunge-list walk is no longer monotone otherwise.
pub struct ListIteratorWithExpungeList {
    inner: Box<ListIteratorImpl>,
    expunge_list: Vec<DocumentId>,
    expunge_cursor: usize,
    last_probe: DocumentId,
}

impl ListIteratorWithExpungeList {
    pub fn new(inner: ListIteratorImpl, mut expunge_list: Vec<DocumentId>) -> Self {
        expunge_list.sort_unstable();
        Self {
            inner: Box::new(inner),
            expunge_list,
            expunge_cursor: 0,
            last_probe: UNDEFINED,
        }
    }

    fn is_expunged(&mut self, document_id: DocumentId) -> bool {
        while self.expunge_cursor < self.expunge_list.len() && self.expunge_list[self.expunge_cursor] < document_id {
            self.expunge_cursor += 1;
        }
        self.expunge_cursor < self.expunge_list.len() && self.expunge_list[self.expunge_cursor] == document_id
    }

    fn maybe_reset_cursor(&mut self, document_id: DocumentId) {
        if document_id < self.last_probe {
            self.expunge_cursor = 0;
        }
        self.last_probe = document_id;
    }
}

impl ListIterator for ListIteratorWithExpungeList {
    fn reset(&mut self) {
        self.inner.reset();
        self.expunge_cursor = 0;
        self.last_probe = UNDEFINED;
    }

    fn next(&mut self) -> DocumentId {
        loop {
            let d = self.inner.next();
            if d == UNDEFINED {
                return UNDEFINED;
            }
            self.maybe_reset_cursor(d);
            if !self.is_expunged(d) {
                return d;
            }
        }
    }

    fn find(&mut self, document_id: DocumentId) -> bool {
        self.maybe_reset_cursor(document_id);
        if self.is_expunged(document_id) {
            return false;
        }
        self.inner.find(document_id)
    }

    fn lower_bound(&mut self, document_id: DocumentId) -> DocumentId {
        self.maybe_reset_cursor(document_id);
        let mut probe = document_id;
        loop {
            let d = self.inner.lower_bound(probe);
            if d == UNDEFINED {
                return UNDEFINED;
            }
            if !self.is_expunged(d) {
                return d;
            }
            probe = d + 1;
        }
    }

    fn get_term_frequency(&self) -> u32 {
        self.inner.get_term_frequency()
    }

    fn get_location_list_iterator(&self) -> LocationListIterator {
        self.inner.get_location_list_iterator()
    }

    fn current(&self) -> DocumentId {
        self.inner.current()
    }
}

/// Fan-in across per-unit iterators when the large index is distributed:
/// each step emits the minimum head across the non-exhausted inner
/// iterators and advances only that one.
pub struct MultiListIterator {
    units: Vec<ListIteratorImpl>,
    heads: Vec<DocumentId>,
    current_unit: Option<usize>,
}

impl MultiListIterator {
    pub fn new(mut units: Vec<ListIteratorImpl>) -> Self {
        let heads = units.iter_mut().map(|u| u.next()).collect();
        Self { units, heads, current_unit: None }
    }

    fn argmin(&self) -> Option<usize> {
        self.heads
            .iter()
            .enumerate()
            .filter(|(_, &d)| d != UNDEFINED)
            .min_by_key(|(_, &d)| d)
            .map(|(i, _)| i)
    }
}

impl ListIterator for MultiListIterator {
    fn reset(&mut self) {
        for u in &mut self.units {
            u.reset();
        }
        self.heads = self.units.iter_mut().map(|u| u.next()).collect();
        self.current_unit = None;
    }

    fn next(&mut self) -> DocumentId {
        match self.argmin() {
            Some(idx) => {
                let d = self.heads[idx];
                self.heads[idx] = self.units[idx].next();
                self.current_unit = Some(idx);
                d
            }
            None => {
                self.current_unit = None;
                UNDEFINED
            }
        }
    }

    fn find(&mut self, document_id: DocumentId) -> bool {
        self.lower_bound(document_id) == document_id && document_id != UNDEFINED
    }

    fn lower_bound(&mut self, document_id: DocumentId) -> DocumentId {
        for (i, u) in self.units.iter_mut().enumerate() {
            if self.heads[i] != UNDEFINED && self.heads[i] < document_id {
                self.heads[i] = u.lower_bound(document_id);
            }
        }
        match self.argmin() {
            Some(idx) => {
                self.current_unit = Some(idx);
                self.heads[idx]
            }
            None => {
                self.current_unit = None;
                UNDEFINED
            }
        }
    }

    fn get_term_frequency(&self) -> u32 {
        self.current_unit.map(|i| self.units[i].get_term_frequency()).unwrap_or(0)
    }

    fn get_location_list_iterator(&self) -> LocationListIterator {
        self.current_unit
            .map(|i| self.units[i].get_location_list_iterator())
            .unwrap_or_default()
    }

    fn current(&self) -> DocumentId {
        self.current_unit.map(|i| self.heads[i]).unwrap_or(UNDEFINED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(ids: &[u32]) -> ListIteratorImpl {
        ListIteratorImpl::Simple(SimpleListIterator::new(ids.iter().map(|&id| (id, 1, None)).collect()))
    }

    #[test]
    fn simple_iterator_is_monotone_and_terminates() {
        let mut it = simple(&[1, 5, 9]);
        assert_eq!(it.next(), 1);
        assert_eq!(it.next(), 5);
        assert_eq!(it.next(), 9);
        assert_eq!(it.next(), UNDEFINED);
    }

    #[test]
    fn delay_iterator_routes_by_max_id() {
        let units = vec![simple(&[1, 2, 3]), simple(&[10, 11])];
        let mut it = DelayListIterator::new(units, vec![3, 11]);
        assert_eq!(it.lower_bound(5), 10);
        assert_eq!(it.next(), 11);
        assert_eq!(it.next(), UNDEFINED);
    }

    #[test]
    fn expunge_filter_skips_deleted_ids() {
        let inner = simple(&[1, 2, 3, 4, 5]);
        let mut it = ListIteratorWithExpungeList::new(inner, vec![2, 4]);
        assert_eq!(it.next(), 1);
        assert_eq!(it.next(), 3);
        assert_eq!(it.next(), 5);
        assert_eq!(it.next(), UNDEFINED);
    }

    #[test]
    fn multi_iterator_merges_in_ascending_order() {
        let units = vec![simple(&[1, 4, 7]), simple(&[2, 3, 8])];
        let mut it = MultiListIterator::new(units);
        let mut out = vec![];
        loop {
            let d = it.next();
            if d == UNDEFINED {
                break;
            }
            out.push(d);
        }
        assert_eq!(out, vec![1, 2, 3, 4, 7, 8]);
    }
}
