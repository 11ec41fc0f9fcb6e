//! Log record codec
//!
//! Every block appended through the batch index becomes one [`LogEntry`].
//! Entries are serialized with postcard; the layout is whatever postcard
//! produces for the struct below, which keeps `None` and an empty pointer
//! list distinct on the wire.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// A single physical record in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Logical index of the batch this entry belongs to
    pub batch_index: u64,
    /// Position of this block within its batch
    pub block_index: u64,
    /// Cumulative byte length of every block written so far, including this one
    pub byte_length: u64,
    /// Delta-compressed skip pointers; only present on a batch's head entry
    pub skip_pointers: Option<Vec<u64>>,
    /// Block payload
    pub block: Bytes,
}

impl LogEntry {
    /// Create an entry that is not the head of its batch
    pub fn new(batch_index: u64, block_index: u64, byte_length: u64, block: Bytes) -> Self {
        Self {
            batch_index,
            block_index,
            byte_length,
            skip_pointers: None,
            block,
        }
    }

    /// Create the head entry of a batch, carrying its compressed skip pointers
    pub fn head(
        batch_index: u64,
        block_index: u64,
        byte_length: u64,
        skip_pointers: Vec<u64>,
        block: Bytes,
    ) -> Self {
        Self {
            batch_index,
            block_index,
            byte_length,
            skip_pointers: Some(skip_pointers),
            block,
        }
    }

    /// Whether this entry terminates its batch
    pub fn is_head(&self) -> bool {
        self.skip_pointers.is_some()
    }

    /// Serialize to bytes
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        postcard::to_allocvec(self)
            .map(Bytes::from)
            .map_err(|e| CodecError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        postcard::from_bytes(bytes).map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}
