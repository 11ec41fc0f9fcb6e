//! In-memory log
//!
//! Records live in a `Vec` behind a tokio `RwLock`. Read and append counters
//! let callers observe how many log operations a higher-level call made.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use batchlog_core::{LogError, SequenceLog, SyncOptions};
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::trace;

/// Snapshot of the operation counters of a [`MemoryLog`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    /// Calls to `read_at`, successful or not
    pub reads: u64,
    /// Successful `append_many` calls
    pub appends: u64,
    /// Records written across all appends
    pub records_appended: u64,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    appends: AtomicU64,
    records_appended: AtomicU64,
}

/// In-memory implementation of [`SequenceLog`]
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: RwLock<Vec<Bytes>>,
    counters: Counters,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log pre-populated with `records`
    pub fn from_records(records: Vec<Bytes>) -> Self {
        Self {
            records: RwLock::new(records),
            counters: Counters::default(),
        }
    }

    /// Current operation counters
    pub fn stats(&self) -> LogStats {
        LogStats {
            reads: self.counters.reads.load(Ordering::SeqCst),
            appends: self.counters.appends.load(Ordering::SeqCst),
            records_appended: self.counters.records_appended.load(Ordering::SeqCst),
        }
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        self.counters.reads.store(0, Ordering::SeqCst);
        self.counters.appends.store(0, Ordering::SeqCst);
        self.counters.records_appended.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SequenceLog for MemoryLog {
    async fn current_length(&self) -> Result<u64, LogError> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn synchronize(&self, _options: &SyncOptions) -> Result<(), LogError> {
        Ok(())
    }

    async fn read_at(&self, sequence: u64) -> Result<Bytes, LogError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().await;
        usize::try_from(sequence)
            .ok()
            .and_then(|i| records.get(i))
            .cloned()
            .ok_or(LogError::OutOfRange {
                sequence,
                length: records.len() as u64,
            })
    }

    async fn append_many(&self, records: Vec<Bytes>) -> Result<u64, LogError> {
        let count = records.len() as u64;
        let mut log = self.records.write().await;
        let first = log.len() as u64;
        log.extend(records);

        self.counters.appends.fetch_add(1, Ordering::SeqCst);
        self.counters
            .records_appended
            .fetch_add(count, Ordering::SeqCst);
        trace!(first, count, "Appended records");
        Ok(first)
    }
}
