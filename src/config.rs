//! Engine-wide tuning surface.
//!
//! The original engine reads these from process-wide `Parameter*` singletons
//! at first use. Here they are bundled into one value handed to
//! [`crate::section::InvertedSection::open`] so hot-read thresholds are
//! copied into locals rather than looked up through a global.

use serde::{Deserialize, Serialize};

/// Growth thresholds and merge policy for one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executor-side insert-unit size that requests a merge (default 128 MiB).
    pub insert_merge_file_size: u64,

    /// Executor-side expunge-unit size that requests a merge.
    pub expunge_merge_file_size: u64,

    /// If false, `insert`/`expunge` always fold the merge inline before
    /// returning rather than handing `needMerge = true` back to the caller.
    pub is_async_merge: bool,

    /// Fixed unit size (in codec units) of one ID block in a Middle list's
    /// overflow chain.
    pub id_block_unit_size: u32,

    /// ID block unit size used for the empty-string "word boundary" key.
    pub word_id_block_unit_size: u32,

    /// Initial Area size (in units) for a newly created Short/Batch list.
    pub batch_list_initial_unit_size: u32,

    /// Growth increment (in units) once a Short/Batch list passes the
    /// doubling threshold.
    pub batch_list_regular_unit_size: u32,

    /// Hard cap (in units) past which a Short list must convert to Middle.
    pub batch_list_max_unit_size: u32,

    /// Aggregate byte ceiling for one BatchListMap before it is merged and
    /// reset.
    pub inverted_batch_size_max: u64,

    /// Longest term accepted by the tokenizer boundary.
    pub max_word_length: u32,

    /// Number of large-index file units when distribution is enabled.
    pub unit_count: u32,

    /// Initial `maxFileSize` per distributed unit before rotation; doubles
    /// each time all units have been cycled through.
    pub max_file_size: u64,

    /// Use a dense delete-flag vector instead of a tombstone-merge expunge
    /// side.
    pub expunge_flag_mode: bool,

    /// Per-term expunge count since the last vacuum that triggers one.
    pub vacuum_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            insert_merge_file_size: 128 * 1024 * 1024,
            expunge_merge_file_size: 128 * 1024 * 1024,
            is_async_merge: true,
            id_block_unit_size: 16,
            word_id_block_unit_size: 4,
            batch_list_initial_unit_size: 32,
            batch_list_regular_unit_size: 1024,
            batch_list_max_unit_size: 16384,
            inverted_batch_size_max: 60 * 1024 * 1024,
            max_word_length: 32,
            unit_count: 1,
            max_file_size: 1024 * 1024 * 1024,
            expunge_flag_mode: false,
            vacuum_threshold: 1000,
        }
    }
}

impl EngineConfig {
    /// Shrinks merge thresholds so tests exercise the small-to-large merge
    /// path without needing megabytes of fixture data.
    pub fn for_testing() -> Self {
        Self {
            insert_merge_file_size: 1024,
            expunge_merge_file_size: 1024,
            is_async_merge: true,
            batch_list_initial_unit_size: 4,
            batch_list_regular_unit_size: 32,
            batch_list_max_unit_size: 256,
            inverted_batch_size_max: 4096,
            max_file_size: 1024,
            vacuum_threshold: 4,
            ..Default::default()
        }
    }

    /// Distributed large index with `n` units, rotating at `max_file_size`
    /// bytes per unit.
    pub fn distributed(n: u32, max_file_size: u64) -> Self {
        Self {
            unit_count: n,
            max_file_size,
            ..Default::default()
        }
    }

    /// Delete-flag mode: EXPUNGE flips a bit instead of writing a tombstone.
    pub fn with_expunge_flag(mut self) -> Self {
        self.expunge_flag_mode = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuning_surface() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.insert_merge_file_size, 128 * 1024 * 1024);
        assert_eq!(cfg.id_block_unit_size, 16);
        assert_eq!(cfg.word_id_block_unit_size, 4);
        assert!(cfg.is_async_merge);
    }

    #[test]
    fn testing_profile_shrinks_thresholds() {
        let cfg = EngineConfig::for_testing();
        assert!(cfg.insert_merge_file_size < EngineConfig::default().insert_merge_file_size);
    }
}
