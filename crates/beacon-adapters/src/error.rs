//! Adapter errors.

use thiserror::Error;

/// Errors raised while constructing an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No tokio runtime to drive delivery.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Broadcast capacity must be positive.
    #[error("Invalid broadcast capacity: {0}")]
    InvalidCapacity(usize),
}
