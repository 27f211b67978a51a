//! Error types for growth and configuration.

use thiserror::Error;

/// Failure to grow the slot store.
///
/// Growth builds the replacement store completely before any key is moved,
/// so when one of these is returned the set is exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReserveError {
    /// The requested size does not fit in `usize`.
    #[error("capacity overflow")]
    CapacityOverflow,
    /// The allocator refused the replacement slot array.
    #[error("memory allocation of {slots} slots failed")]
    AllocFailed { slots: usize },
}

/// Rejected tuning value passed to [`Config`](crate::Config).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max load factor must be in (0, 1], got {0}")]
    MaxLoadFactor(f64),
    #[error("cellar ratio must be finite and non-negative, got {0}")]
    CellarRatio(f64),
    #[error("minimum address size must be at least 1")]
    ZeroAddressSize,
    #[error("minimum address size {address} with cellar ratio {ratio} overflows the slot count")]
    LayoutOverflow { address: usize, ratio: f64 },
}
