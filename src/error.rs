//! Error type for fallible map operations.

use thiserror::Error;

/// Why an insertion did not happen.
///
/// Both cases leave the map valid and its length unchanged; a partially
/// constructed split is fully unwound before the error is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InsertError {
    /// The node store could not provide memory.
    #[error("node store allocation failed")]
    AllocationFailed,
    /// The new key's hash slice stream coincides with an existing key's at
    /// every level under every reseed, so no depth can separate them.
    #[error("unresolvable hash collision")]
    UnresolvableCollision,
}
