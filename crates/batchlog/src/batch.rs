//! Read-only view over one batch
//!
//! A [`Batch`] is rebuilt from its head entry every time it is needed. Blocks
//! other than the head's are fetched from the log on demand, one read each.

use std::fmt;
use std::sync::Arc;

use batchlog_core::{LogEntry, SequenceLog};
use bytes::Bytes;

use crate::error::BatchError;
use crate::skip;

/// A batch materialized from its head entry
pub struct Batch<L> {
    sequence: u64,
    head: LogEntry,
    log: Arc<L>,
}

impl<L> Clone for Batch<L> {
    fn clone(&self) -> Self {
        Self {
            sequence: self.sequence,
            head: self.head.clone(),
            log: Arc::clone(&self.log),
        }
    }
}

impl<L> fmt::Debug for Batch<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("sequence", &self.sequence)
            .field("index", &self.head.batch_index)
            .field("length", &self.length())
            .finish()
    }
}

impl<L: SequenceLog> Batch<L> {
    /// Wrap the head entry read from `sequence`
    ///
    /// Fails with [`BatchError::Corrupt`] if the entry is not a head entry or
    /// its block count would reach before the start of the log.
    pub fn from_head(sequence: u64, head: LogEntry, log: Arc<L>) -> Result<Self, BatchError> {
        if !head.is_head() {
            return Err(BatchError::corrupt(format!(
                "entry at sequence {sequence} is not a batch head"
            )));
        }
        if head.block_index > sequence {
            return Err(BatchError::corrupt(format!(
                "head at sequence {sequence} claims {} blocks",
                head.block_index + 1
            )));
        }
        Ok(Self {
            sequence,
            head,
            log,
        })
    }

    /// Sequence number of the head entry
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Sequence number of the batch's first block
    pub fn first_sequence(&self) -> u64 {
        self.sequence - self.head.block_index
    }

    /// Logical batch index
    pub fn index(&self) -> u64 {
        self.head.batch_index
    }

    /// Cumulative byte length of all blocks up to and including this batch
    pub fn byte_length(&self) -> u64 {
        self.head.byte_length
    }

    /// The decoded head entry
    pub fn head_entry(&self) -> &LogEntry {
        &self.head
    }

    /// Absolute sequence numbers of the heads this batch points back at,
    /// nearest first
    ///
    /// Returns `None` if the stored pointers are malformed.
    pub fn skip_pointers(&self) -> Option<Vec<u64>> {
        let deltas = self.head.skip_pointers.as_deref()?;
        skip::decompress(self.sequence, deltas)
    }

    /// Read the block at `position`
    pub async fn get(&self, position: u64) -> Result<Bytes, BatchError> {
        let length = self.length();
        if position >= length {
            return Err(BatchError::OutOfBounds { position, length });
        }
        if position == length - 1 {
            return Ok(self.head.block.clone());
        }

        let sequence = self.first_sequence() + position;
        let entry = LogEntry::decode(&self.log.read_at(sequence).await?)?;
        if entry.batch_index != self.index() || entry.block_index != position {
            return Err(BatchError::corrupt(format!(
                "sequence {sequence} holds block {} of batch {}, expected block {position} of batch {}",
                entry.block_index,
                entry.batch_index,
                self.index()
            )));
        }
        Ok(entry.block)
    }

    /// Read every block in order
    pub async fn blocks(&self) -> Result<Vec<Bytes>, BatchError> {
        let mut blocks = Vec::with_capacity(self.length() as usize);
        for position in 0..self.length() {
            blocks.push(self.get(position).await?);
        }
        Ok(blocks)
    }
}

impl<L> Batch<L> {
    /// Number of blocks in the batch
    pub fn length(&self) -> u64 {
        self.head.block_index + 1
    }
}
