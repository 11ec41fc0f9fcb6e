//! # batchlog
//!
//! Logical batches of variable-length blocks layered on an append-only
//! [`SequenceLog`](batchlog_core::SequenceLog).
//!
//! Every call to [`BatchIndex::append`] writes one batch: one log entry per
//! block, the last of which (the batch's *head entry*) carries delta-compressed
//! skip pointers to the batches 1, 2, 4, 8, ... positions behind it. Looking
//! up a batch by logical index gallops through those pointers from the
//! current head, so reaching a batch `d` positions back costs `O(log d)` log
//! reads instead of a scan.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use batchlog::BatchIndex;
//! use batchlog_storage::MemoryLog;
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), batchlog::BatchError> {
//!     let index = BatchIndex::new(Arc::new(MemoryLog::new()));
//!
//!     let first = index.append(vec![Bytes::from("a")]).await?;
//!     let second = index.append(vec![Bytes::from("b"), Bytes::from("c")]).await?;
//!     assert_eq!((first, second), (0, 1));
//!
//!     let batch = index.get(1).await?;
//!     assert_eq!(batch.length(), 2);
//!     assert_eq!(batch.get(1).await?, Bytes::from("c"));
//!     assert_eq!(index.byte_length().await?, 3);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod index;
pub mod skip;

pub use batch::Batch;
pub use config::BatchIndexConfig;
pub use error::BatchError;
pub use index::{BatchIndex, locate, read_batch};

pub use batchlog_core::{LogEntry, LogError, SequenceLog, SyncOptions};
