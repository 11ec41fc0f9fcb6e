//! The append-only log abstraction
//!
//! The batch index never touches storage directly. It reads and appends
//! opaque records through [`SequenceLog`], which hands out monotonically
//! increasing sequence numbers starting at zero.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Options for [`SequenceLog::synchronize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Succeed with possibly stale state when the source cannot be reached
    pub if_available: bool,
    /// Upper bound on how long synchronization may wait
    pub timeout: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            if_available: true,
            timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl SyncOptions {
    /// Require the latest state, failing if it cannot be fetched
    pub fn strict() -> Self {
        Self {
            if_available: false,
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An append-only sequence of records addressed by sequence number
///
/// Records are never modified once written. Implementations must make
/// [`append_many`](Self::append_many) atomic: either every record of the
/// call becomes visible or none does.
#[async_trait]
pub trait SequenceLog: Send + Sync {
    /// Number of records currently committed
    async fn current_length(&self) -> Result<u64, LogError>;

    /// Best-effort catch-up with a replicated or remote source
    ///
    /// Purely local logs implement this as a no-op.
    async fn synchronize(&self, options: &SyncOptions) -> Result<(), LogError>;

    /// Read the record at `sequence`
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OutOfRange`] if `sequence` has not been written, or
    /// [`LogError::Read`] on I/O failure.
    async fn read_at(&self, sequence: u64) -> Result<Bytes, LogError>;

    /// Atomically append `records`, returning the sequence number of the first
    ///
    /// Records receive consecutive sequence numbers starting at the previous
    /// length of the log.
    async fn append_many(&self, records: Vec<Bytes>) -> Result<u64, LogError>;
}

#[async_trait]
impl<L: SequenceLog + ?Sized> SequenceLog for Arc<L> {
    async fn current_length(&self) -> Result<u64, LogError> {
        (**self).current_length().await
    }

    async fn synchronize(&self, options: &SyncOptions) -> Result<(), LogError> {
        (**self).synchronize(options).await
    }

    async fn read_at(&self, sequence: u64) -> Result<Bytes, LogError> {
        (**self).read_at(sequence).await
    }

    async fn append_many(&self, records: Vec<Bytes>) -> Result<u64, LogError> {
        (**self).append_many(records).await
    }
}
