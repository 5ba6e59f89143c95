use std::collections::TryReserveError;

use thiserror::Error;

/// Errors reported by [`TernaryTree`](crate::TernaryTree) mutations.
///
/// Lookups and removals of absent keys are not errors; they report through
/// `Option`/`bool` returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TstError {
    /// The key contains a zero byte, which is reserved as the terminator.
    #[error("key contains a zero byte at position {position}")]
    InvalidKey { position: usize },

    /// Reserving space for nodes, the value table or a payload copy failed,
    /// either in the allocator or because the slot limit was reached.
    /// The tree is left unchanged.
    #[error("allocation failed while reserving {what}")]
    AllocationFailed {
        what: &'static str,
        #[source]
        source: Option<TryReserveError>,
    },
}

impl TstError {
    pub(crate) fn alloc(what: &'static str, source: TryReserveError) -> Self {
        Self::AllocationFailed {
            what,
            source: Some(source),
        }
    }

    /// Growth past the configured or addressable slot count.
    pub(crate) fn limit(what: &'static str) -> Self {
        Self::AllocationFailed { what, source: None }
    }
}

pub type Result<T, E = TstError> = std::result::Result<T, E>;

/// Position of the first zero byte in `key`, if any.
#[inline]
pub(crate) fn find_nul(key: &[u8]) -> Option<usize> {
    key.iter().position(|&b| b == 0)
}

pub(crate) fn validate_key(key: &[u8]) -> Result<()> {
    match find_nul(key) {
        Some(position) => Err(TstError::InvalidKey { position }),
        None => Ok(()),
    }
}
