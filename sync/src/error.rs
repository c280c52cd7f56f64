//! error type for bitmux.
//!
//! the lock operations themselves never return this type: an out-of-range
//! index panics at the call site. the [`Error::IndexOutOfRange`] variant exists
//! so the panic text and up-front validation ([`check_index`](crate::check_index))
//! share one wording.

use thiserror::Error;

/// errors surfaced by index validation, configuration and the stress harness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// lock index outside `[0, limit)` for the named mutex type.
    #[error("{kind}: index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("Invalid stress configuration: {0}")]
    InvalidConfig(String),

    /// the shared counter lost updates, two workers were inside the
    /// critical section at once.
    #[error("Mutual exclusion violated: expected counter {expected}, observed {observed}")]
    ExclusionViolated { expected: u64, observed: u64 },

    #[error("Stress worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
