//! # batchlog-core
//!
//! Core types shared by every batchlog crate.
//!
//! - [`SequenceLog`]: the append-only log the batch index is layered on
//! - [`LogEntry`]: one physical record in that log, with its postcard codec
//! - [`LogError`] / [`CodecError`]: failures surfaced by logs and the codec

pub mod entry;
pub mod error;
pub mod log;

pub use entry::LogEntry;
pub use error::{CodecError, LogError};
pub use log::{SequenceLog, SyncOptions};
