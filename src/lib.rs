//! An inverted full-text index storage and update engine: the core a
//! relational database's TEXT column type builds search on top of.
//!
//! The crate is organized bottom-up, matching the layering the rest of the
//! modules assume:
//!
//! - [`codec`] — bit-level Void/Golomb coders and the buffer primitives they
//!   share.
//! - [`page`] and [`term_index`] — the out-of-scope external buffer manager
//!   and term → leaf-page B-tree, each behind a trait with one in-memory
//!   reference implementation.
//! - [`list`] — the three posting-list representations (Short, Middle,
//!   Batch) and the cursors over them.
//! - [`manager`] — positions a cursor on a term's list and composes
//!   delayed-merge/distributed fan-in across several such cursors.
//! - [`unit`] — file-level containers: a mountable unit, N of them rotated
//!   across, and the insert/expunge staging batches.
//! - [`other_info`] — the merge-state header and the query-time
//!   per-document snapshot.
//! - [`locker`] — document-level locking for a list scan.
//! - [`section`] — ties all of the above into one term index's insert,
//!   expunge, and merge life cycle.
//! - [`tokenizer`] — text to (term, position) pairs.

pub mod codec;
pub mod config;
pub mod error;
pub mod list;
pub mod locker;
pub mod manager;
pub mod other_info;
pub mod page;
pub mod section;
pub mod term_index;
pub mod tokenizer;
pub mod types;
pub mod unit;

pub use config::EngineConfig;
pub use error::{FullTextError, Result};
pub use locker::{LockMode, Locker, LockerMode, LockTable};
pub use manager::{DelayListManager, ListManager, MultiListManager, ResetMode};
pub use other_info::{MergeState, OtherInformationFile, SearchInformation};
pub use section::InvertedSection;
pub use tokenizer::{NgramTokenizer, TokenizeMode, TokenizeResult, Tokenizer, WhitespaceTokenizer};
pub use types::{DocumentId, FeatureSet, Key, LocationList, Position, Posting, UNDEFINED_DOCUMENT_ID};
