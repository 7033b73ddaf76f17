//! Error taxonomy for the lazy document model.
//!
//! Only two conditions are ever surfaced as errors. Everything else that can
//! go wrong during navigation (stale offsets, unmatched tags, unterminated
//! values) is an expected state of a live buffer and is reported as an
//! absent result, never as an `Err`.

use thiserror::Error;

/// Errors surfaced by the document model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// A stored offset no longer corresponds to valid buffer content.
    ///
    /// Navigation recovers from this locally (it returns `None` instead);
    /// only the mutation path reports it to the caller.
    #[error("buffer position {offset} is unavailable")]
    PositionUnavailable { offset: usize },

    /// A write operation other than attribute-value replacement.
    ///
    /// The tree is read-only by contract; this is a scope boundary, not a
    /// missing feature.
    #[error("read-only tree: {operation} is not supported")]
    ReadOnly { operation: &'static str },
}

impl DomError {
    /// Shorthand for the unsupported-mutation case.
    pub(crate) fn read_only(operation: &'static str) -> Self {
        DomError::ReadOnly { operation }
    }
}
