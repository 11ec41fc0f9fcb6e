//! # batchlog-storage
//!
//! [`SequenceLog`](batchlog_core::SequenceLog) backends.
//!
//! - **MemoryLog**: in-memory log with read/append counters, for tests and
//!   embedding
//! - **FileLog**: single-file persistent log with crash-safe group appends
//! - **MirrorLog**: read replica that catches up with an upstream log on
//!   `synchronize`
//!
//! ## Example
//!
//! ```rust,ignore
//! use batchlog_core::SequenceLog;
//! use batchlog_storage::MemoryLog;
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = MemoryLog::new();
//!     let first = log.append_many(vec![Bytes::from("a"), Bytes::from("b")]).await.unwrap();
//!     assert_eq!(first, 0);
//!     assert_eq!(log.current_length().await.unwrap(), 2);
//!     assert_eq!(log.read_at(1).await.unwrap(), Bytes::from("b"));
//! }
//! ```

pub mod file;
pub mod memory;
pub mod mirror;

pub use file::{FileLog, FileLogConfig};
pub use memory::{LogStats, MemoryLog};
pub use mirror::MirrorLog;
