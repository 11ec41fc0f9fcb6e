//! The batch index engine
//!
//! [`BatchIndex`] owns the append path. Lookups are plain functions over the
//! log ([`read_batch`], [`locate`]) so they carry no state beyond the batch
//! they start from.

use std::sync::Arc;

use batchlog_core::{LogEntry, SequenceLog};
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace, warn};

use crate::batch::Batch;
use crate::config::BatchIndexConfig;
use crate::error::BatchError;
use crate::skip;

/// Materialize the batch whose head entry is stored at `sequence`
pub async fn read_batch<L: SequenceLog>(
    log: &Arc<L>,
    sequence: u64,
) -> Result<Batch<L>, BatchError> {
    let head = LogEntry::decode(&log.read_at(sequence).await?)?;
    Batch::from_head(sequence, head, Arc::clone(log))
}

/// Gallop from `from` back to the batch with index `target`
///
/// Each hop follows the farthest skip pointer that does not pass `target`,
/// so the number of hops is the number of set bits in the distance.
pub async fn locate<L: SequenceLog>(
    log: &Arc<L>,
    from: Batch<L>,
    target: u64,
) -> Result<Batch<L>, BatchError> {
    let mut batch = from;
    loop {
        if batch.index() == target {
            return Ok(batch);
        }
        if batch.index() < target {
            return Err(BatchError::NotFound(target));
        }
        batch = gallop(log, &batch, target)
            .await?
            .ok_or(BatchError::NotFound(target))?;
    }
}

/// Take one hop from `batch` towards `target`, or `None` if its pointers
/// cannot make progress
async fn gallop<L: SequenceLog>(
    log: &Arc<L>,
    batch: &Batch<L>,
    target: u64,
) -> Result<Option<Batch<L>>, BatchError> {
    let Some(pointers) = batch.skip_pointers() else {
        warn!(sequence = batch.sequence(), "Malformed skip pointers");
        return Ok(None);
    };

    let mut offset = 1u64;
    let chosen = 'choose: {
        for (i, &pointer) in pointers.iter().enumerate() {
            // More pointers than valid offsets
            let Some(t) = batch.index().checked_sub(offset) else {
                break 'choose None;
            };
            if t == target {
                break 'choose Some(pointer);
            }
            if t < target {
                break 'choose i.checked_sub(1).map(|prev| pointers[prev]);
            }
            offset = offset.saturating_mul(2);
        }
        pointers.last().copied()
    };

    let Some(sequence) = chosen else {
        return Ok(None);
    };
    if sequence >= batch.first_sequence() {
        warn!(
            sequence,
            from = batch.sequence(),
            "Skip pointer does not point behind its batch"
        );
        return Ok(None);
    }

    trace!(from = batch.index(), to_sequence = sequence, target, "Gallop hop");
    read_batch(log, sequence).await.map(Some)
}

/// Head sequence numbers of the batches `1, 2, 4, ...` positions behind
/// `batch_index`, nearest first
async fn skip_targets<L: SequenceLog>(
    log: &Arc<L>,
    previous: &Batch<L>,
    batch_index: u64,
) -> Result<Vec<u64>, BatchError> {
    let mut pointers = Vec::new();
    let mut cursor = previous.clone();
    let mut offset = 1u64;

    while offset <= batch_index {
        // Targets only move backwards, so each search resumes from the last hit
        cursor = locate(log, cursor, batch_index - offset).await?;
        pointers.push(cursor.sequence());
        match offset.checked_mul(2) {
            Some(next) => offset = next,
            None => break,
        }
    }
    Ok(pointers)
}

/// Logical batches over an append-only log
///
/// Appends are serialized by a lock owned by this instance. Reads take no
/// lock: entries never change once written.
pub struct BatchIndex<L> {
    log: Arc<L>,
    config: BatchIndexConfig,
    append_lock: Mutex<()>,
}

impl<L: SequenceLog> BatchIndex<L> {
    /// Create an index over `log` with the default configuration
    pub fn new(log: Arc<L>) -> Self {
        Self::with_config(log, BatchIndexConfig::default())
    }

    /// Create an index over `log`
    pub fn with_config(log: Arc<L>, config: BatchIndexConfig) -> Self {
        Self {
            log,
            config,
            append_lock: Mutex::new(()),
        }
    }

    /// The underlying log
    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// The index configuration
    pub fn config(&self) -> &BatchIndexConfig {
        &self.config
    }

    /// Append `blocks` as one new batch, returning its index
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidBatch`] for an empty or oversized batch.
    /// Any failure reading earlier batches or appending to the log aborts the
    /// call without writing anything.
    #[instrument(skip(self, blocks), fields(count = blocks.len()))]
    pub async fn append(&self, blocks: Vec<Bytes>) -> Result<u64, BatchError> {
        if blocks.is_empty() {
            return Err(BatchError::invalid_batch("a batch needs at least one block"));
        }
        if let Some(max) = self.config.max_batch_blocks
            && blocks.len() > max
        {
            return Err(BatchError::invalid_batch(format!(
                "{} blocks exceeds the limit of {max}",
                blocks.len()
            )));
        }

        let _guard = self.append_lock.lock().await;

        let previous = self.head().await?;
        let (batch_index, mut byte_length, first_sequence) = match &previous {
            Some(head) => (head.index() + 1, head.byte_length(), head.sequence() + 1),
            None => (0, 0, 0),
        };

        let pointers = match &previous {
            Some(head) => skip_targets(&self.log, head, batch_index).await?,
            None => Vec::new(),
        };
        let last = blocks.len() - 1;
        let head_sequence = first_sequence + last as u64;
        let mut compressed = Some(skip::compress(head_sequence, &pointers));

        let mut records = Vec::with_capacity(blocks.len());
        for (position, block) in blocks.into_iter().enumerate() {
            byte_length += block.len() as u64;
            let entry = if position == last {
                LogEntry::head(
                    batch_index,
                    position as u64,
                    byte_length,
                    compressed.take().unwrap_or_default(),
                    block,
                )
            } else {
                LogEntry::new(batch_index, position as u64, byte_length, block)
            };
            records.push(entry.encode()?);
        }

        let written_at = self.log.append_many(records).await?;
        if written_at != first_sequence {
            warn!(
                expected = first_sequence,
                actual = written_at,
                "Log grew outside this index; skip pointers may be wrong"
            );
        }

        debug!(
            batch_index,
            head_sequence,
            byte_length,
            pointers = pointers.len(),
            "Appended batch"
        );
        Ok(batch_index)
    }

    /// Look up the batch with logical index `batch_index`
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, batch_index: u64) -> Result<Batch<L>, BatchError> {
        let head = self
            .head()
            .await?
            .ok_or(BatchError::NotFound(batch_index))?;
        locate(&self.log, head, batch_index).await
    }

    /// Materialize the batch whose head entry is stored at `sequence`
    pub async fn batch_at(&self, sequence: u64) -> Result<Batch<L>, BatchError> {
        read_batch(&self.log, sequence).await
    }

    /// The most recently appended batch, if any
    pub async fn head(&self) -> Result<Option<Batch<L>>, BatchError> {
        self.log.synchronize(&self.config.sync).await?;
        match self.log.current_length().await? {
            0 => Ok(None),
            length => read_batch(&self.log, length - 1).await.map(Some),
        }
    }

    /// Number of batches
    pub async fn length(&self) -> Result<u64, BatchError> {
        Ok(self.head().await?.map_or(0, |head| head.index() + 1))
    }

    /// Total bytes across every block of every batch
    pub async fn byte_length(&self) -> Result<u64, BatchError> {
        Ok(self.head().await?.map_or(0, |head| head.byte_length()))
    }
}
