//! The Short-list Area: one contiguous block written from
//! both ends — doc-ID gaps backward from the tail, location lists forward
//! from the head — growing by doubling up to a threshold and then by fixed
//! increments until a hard cap forces conversion to a Middle list.

use crate::codec::{self, Coder};
use crate::types::{DocumentId, LocationList, Position};

/// One contiguous bit-packed posting block. Mirrors an on-disk layout of
/// a fixed-width header plus `data[unitSize]` filled from both ends.
#[derive(Debug, Clone)]
pub struct Area {
    pub first_document_id: DocumentId,
    pub last_document_id: DocumentId,
    pub document_count: u32,
    /// Bits consumed from the tail by the doc-ID stream.
    pub id_offset: usize,
    /// Bits consumed from the head by the location stream.
    pub loc_offset: usize,
    pub unit_size: usize,
    pub data: Vec<u32>,
    /// Whether postings in this Area carry a location list, or just a bare
    /// term frequency.
    pub track_positions: bool,
}

impl Area {
    pub fn new(unit_size: usize, track_positions: bool) -> Self {
        Self {
            first_document_id: 0,
            last_document_id: 0,
            document_count: 0,
            id_offset: 0,
            loc_offset: 0,
            unit_size,
            data: vec![0u32; unit_size],
            track_positions,
        }
    }

    fn total_bits(&self) -> usize {
        self.unit_size * 32
    }

    fn free_bits(&self) -> usize {
        self.total_bits().saturating_sub(self.id_offset + self.loc_offset)
    }

    /// Bits a posting for `document_id`/`locations` would need, without
    /// writing anything.
    pub fn required_bits(&self, coder: &dyn Coder, document_id: DocumentId, locations: Option<&LocationList>) -> usize {
        let id_bits = if self.document_count == 0 {
            0
        } else {
            coder.bit_length(document_id - self.last_document_id)
        };
        let tf = locations.map(|l| l.term_frequency().max(1)).unwrap_or(1);
        let mut loc_bits = coder.bit_length(tf);
        if self.track_positions {
            if let Some(l) = locations {
                loc_bits += coder.gaps_bit_length(0, l.positions());
            }
        }
        id_bits + loc_bits
    }

    /// Append one posting. Returns `false` (writing nothing) if the Area has
    /// no room; the caller is then responsible for growing or converting.
    pub fn try_insert(&mut self, coder: &dyn Coder, document_id: DocumentId, locations: Option<&LocationList>) -> bool {
        let needed = self.required_bits(coder, document_id, locations);
        if needed > self.free_bits() {
            return false;
        }

        if self.document_count == 0 {
            self.first_document_id = document_id;
        } else {
            let gap = document_id - self.last_document_id;
            coder.append_back(gap, &mut self.data, &mut self.id_offset);
        }

        let tf = locations.map(|l| l.term_frequency().max(1)).unwrap_or(1);
        coder.append(tf, &mut self.data, &mut self.loc_offset);
        if self.track_positions {
            if let Some(l) = locations {
                let mut prev = 0;
                coder.append_gaps(&mut prev, l.positions(), &mut self.data, &mut self.loc_offset);
            }
        }

        self.last_document_id = document_id;
        self.document_count += 1;
        true
    }

    /// Reallocate to `new_unit_size` units (must be >= current), preserving
    /// both streams' tail/head orientation by bit-moving the doc-ID stream to
    /// the new tail and zero-filling the freed middle.
    pub fn grow(&mut self, new_unit_size: usize) {
        assert!(new_unit_size >= self.unit_size, "Area can only grow");
        if new_unit_size == self.unit_size {
            return;
        }
        let mut new_data = vec![0u32; new_unit_size];
        codec::copy_bits(&self.data, 0, &mut new_data, 0, self.loc_offset);
        let old_total = self.total_bits();
        let new_total = new_unit_size * 32;
        codec::copy_bits(
            &self.data,
            old_total - self.id_offset,
            &mut new_data,
            new_total - self.id_offset,
            self.id_offset,
        );
        self.data = new_data;
        self.unit_size = new_unit_size;
    }

    /// Decode every posting in ascending doc-ID order. Used by iterators and
    /// by expunge/undo-expunge, which otherwise would need their own partial
    /// bit-stream cursors.
    pub fn postings(&self, coder: &dyn Coder) -> Vec<(DocumentId, u32, Option<LocationList>)> {
        let mut out = Vec::with_capacity(self.document_count as usize);
        if self.document_count == 0 {
            return out;
        }
        let mut id_off = 0usize;
        let mut loc_off = 0usize;
        let mut doc_id = self.first_document_id;
        for i in 0..self.document_count {
            if i > 0 {
                let gap = coder.get_back(&self.data, self.total_bits(), &mut id_off).unwrap_or(0);
                doc_id += gap;
            }
            let tf = coder.get(&self.data, self.total_bits(), &mut loc_off).unwrap_or(1);
            let locations = if self.track_positions {
                let positions: Vec<Position> = coder
                    .get_gaps(0, tf as usize, &self.data, self.total_bits(), &mut loc_off)
                    .into_iter()
                    .collect();
                Some(LocationList::new(positions))
            } else {
                None
            };
            out.push((doc_id, tf, locations));
        }
        out
    }

    /// Rebuild this Area's bit stream from a full ascending posting list,
    /// keeping the same unit size (used by expunge and undo-expunge, which
    /// operate by decode-filter-reencode since the stream isn't
    /// random-access for removal).
    pub fn rebuild(&mut self, coder: &dyn Coder, postings: &[(DocumentId, Option<LocationList>)]) {
        let unit_size = self.unit_size;
        let track_positions = self.track_positions;
        *self = Area::new(unit_size, track_positions);
        for (doc_id, locations) in postings {
            let ok = self.try_insert(coder, *doc_id, locations.as_ref());
            debug_assert!(ok, "rebuild must not need more space than the original Area");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.document_count == 0
    }
}
