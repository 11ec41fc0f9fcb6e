//! Read replica of an upstream log
//!
//! [`MirrorLog`] serves reads from a local log and pulls new records from an
//! upstream log whenever it is synchronized. Appends against the replica are
//! refused.

use async_trait::async_trait;
use batchlog_core::{LogError, SequenceLog, SyncOptions};
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Replica that catches up with `upstream` on [`SequenceLog::synchronize`]
pub struct MirrorLog<L, U> {
    local: L,
    upstream: U,
    sync_lock: Mutex<()>,
}

impl<L: SequenceLog, U: SequenceLog> MirrorLog<L, U> {
    /// Mirror `upstream` into `local`
    pub fn new(local: L, upstream: U) -> Self {
        Self {
            local,
            upstream,
            sync_lock: Mutex::new(()),
        }
    }

    /// The local replica
    pub fn local(&self) -> &L {
        &self.local
    }

    /// The upstream source
    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Copy every upstream record past the local length, returning how many
    /// were copied
    async fn pull(&self) -> Result<u64, LogError> {
        let remote_len = self.upstream.current_length().await?;
        let local_len = self.local.current_length().await?;
        if remote_len <= local_len {
            return Ok(0);
        }

        let mut records = Vec::with_capacity((remote_len - local_len) as usize);
        for sequence in local_len..remote_len {
            records.push(self.upstream.read_at(sequence).await?);
        }
        self.local.append_many(records).await?;
        Ok(remote_len - local_len)
    }
}

#[async_trait]
impl<L: SequenceLog, U: SequenceLog> SequenceLog for MirrorLog<L, U> {
    async fn current_length(&self) -> Result<u64, LogError> {
        self.local.current_length().await
    }

    #[instrument(skip(self))]
    async fn synchronize(&self, options: &SyncOptions) -> Result<(), LogError> {
        let _guard = self.sync_lock.lock().await;

        let result = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.pull()).await {
                Ok(result) => result,
                Err(_) => Err(LogError::unavailable(format!(
                    "upstream did not respond within {limit:?}"
                ))),
            },
            None => self.pull().await,
        };

        match result {
            Ok(copied) => {
                debug!(copied, "Mirror synchronized");
                Ok(())
            }
            Err(e) if options.if_available => {
                warn!(error = %e, "Upstream unavailable, serving stale replica");
                Ok(())
            }
            Err(e @ LogError::Unavailable(_)) => Err(e),
            Err(e) => Err(LogError::unavailable(e.to_string())),
        }
    }

    async fn read_at(&self, sequence: u64) -> Result<Bytes, LogError> {
        self.local.read_at(sequence).await
    }

    async fn append_many(&self, _records: Vec<Bytes>) -> Result<u64, LogError> {
        Err(LogError::write("mirror logs are read-only"))
    }
}
