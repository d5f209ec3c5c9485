use std::collections::TryReserveError;

use thiserror::Error;

/// Unified error type for the storage engine.
///
/// A missing key is not an error: lookups return `Option`.
#[derive(Debug, Error)]
pub enum Error {
    /// A construction parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Storage for a flush or compaction could not be reserved.
    /// Engine state is left exactly as it was before the attempt.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(#[from] TryReserveError),
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
