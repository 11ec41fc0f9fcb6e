//! Batch index configuration

use batchlog_core::SyncOptions;
use serde::{Deserialize, Serialize};

/// Configuration for a [`BatchIndex`](crate::BatchIndex)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchIndexConfig {
    /// Options passed to the log's `synchronize` before reading the head
    pub sync: SyncOptions,
    /// Reject appends with more blocks than this
    pub max_batch_blocks: Option<usize>,
}

impl BatchIndexConfig {
    /// Set the sync options
    pub fn with_sync(mut self, sync: SyncOptions) -> Self {
        self.sync = sync;
        self
    }

    /// Limit the number of blocks per batch
    pub fn with_max_batch_blocks(mut self, max: usize) -> Self {
        self.max_batch_blocks = Some(max);
        self
    }
}
