//! Error types for batchlog-core

use thiserror::Error;

/// Errors surfaced by a [`SequenceLog`](crate::SequenceLog) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// Reading a record failed
    #[error("Read error at sequence {sequence}: {reason}")]
    Read { sequence: u64, reason: String },

    /// The requested sequence number has not been written
    #[error("Sequence {sequence} out of range (log length {length})")]
    OutOfRange { sequence: u64, length: u64 },

    /// Appending records failed; none of them are visible
    #[error("Write error: {0}")]
    Write(String),

    /// The log could not be brought up to date with its source
    #[error("Log unavailable: {0}")]
    Unavailable(String),
}

impl LogError {
    /// Create a new read error
    pub fn read(sequence: u64, reason: impl Into<String>) -> Self {
        Self::Read {
            sequence,
            reason: reason.into(),
        }
    }

    /// Create a new write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Create a new unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Whether this error came from a read (including out-of-range reads)
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::OutOfRange { .. })
    }

    /// Whether this error came from an append
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}

/// Errors from encoding or decoding a [`LogEntry`](crate::LogEntry)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}
