//! Error taxonomy for the inverted full-text engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FullTextError>;

/// The error kinds named by the engine's propagation policy: top-level section
/// entry points are the only rollback boundaries, everything else either
/// bubbles an error unchanged or is absorbed locally (LockConflict inside
/// Locker, TransientIo inside a page-fix retry loop).
#[derive(Error, Debug)]
pub enum FullTextError {
    /// Illegal parameter: mismatched vector sizes, wrong list representation
    /// for the requested operation, unknown coder name. No state changed.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// A page-fix failed in a way the caller's retry loop should absorb.
    #[error("transient io: {0}")]
    TransientIo(#[from] std::io::Error),

    /// Raised inside Locker only; never crosses a section entry point.
    #[error("lock conflict on {0:?}")]
    LockConflict(u32),

    /// Raised by an integrity-check pass to abandon it; caller resumes with
    /// the next unit.
    #[error("verification aborted: {0}")]
    VerifyAborted(String),

    /// The transaction's cancel flag was observed inside a long operation.
    /// The merge loop unwinds cleanly at the current term boundary.
    #[error("operation canceled")]
    Cancel,

    /// An error occurred while recovering from a previous error. The caller
    /// must mark the file unavailable; no further operations are legal.
    #[error("fatal: {0}")]
    Fatal(String),

    /// On-disk structure failed a checksum or layout check.
    #[error("corruption: {0}")]
    Corruption(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for FullTextError {
    fn from(err: bincode::Error) -> Self {
        FullTextError::Serialization(err.to_string())
    }
}

impl FullTextError {
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        FullTextError::BadArgument(msg.into())
    }

    /// Whether the caller's top-level rollback boundary should treat this as
    /// recoverable-by-retry rather than requiring an undo pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, FullTextError::TransientIo(_) | FullTextError::LockConflict(_))
    }
}
