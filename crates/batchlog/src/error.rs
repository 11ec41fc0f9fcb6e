//! Error types for batch operations

use batchlog_core::{CodecError, LogError};
use thiserror::Error;

/// Errors returned by [`BatchIndex`](crate::BatchIndex) and
/// [`Batch`](crate::Batch)
#[derive(Debug, Error)]
pub enum BatchError {
    /// Position is past the end of the batch
    #[error("Position {position} out of bounds for batch of length {length}")]
    OutOfBounds { position: u64, length: u64 },

    /// The batch index could not be reached from the current head
    #[error("Cannot find batch {0}")]
    NotFound(u64),

    /// The caller submitted a batch that cannot be appended
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// A record does not match the layout the index wrote
    #[error("Corrupt log: {0}")]
    Corrupt(String),

    /// A record could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The underlying log failed
    #[error(transparent)]
    Log(#[from] LogError),
}

impl BatchError {
    /// Create a new InvalidBatch error
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::InvalidBatch(message.into())
    }

    /// Create a new Corrupt error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    /// Whether this is a read failure propagated from the log
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Log(e) if e.is_read())
    }

    /// Whether this is a write failure propagated from the log
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Log(e) if e.is_write())
    }
}
