//! File-backed log
//!
//! The whole log lives in one file. Each `append_many` call is written as a
//! single group frame so a crash can never leave half a group behind:
//!
//! ```text
//! [4 bytes: body len][4 bytes: record count][4 bytes: len][record]...[4 bytes: len][record]
//! ```
//!
//! On open the file is replayed to rebuild the in-memory record index. A
//! trailing group that is incomplete is truncated away.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use batchlog_core::{LogError, SequenceLog, SyncOptions};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

const LEN_PREFIX: u64 = 4;

/// Configuration for a [`FileLog`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// Path of the log file
    pub path: PathBuf,
    /// Whether to sync writes to disk before acknowledging an append
    pub sync_on_write: bool,
    /// Largest single record accepted by `append_many`
    pub max_record_size: usize,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/batchlog.log"),
            sync_on_write: true,
            max_record_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl FileLogConfig {
    /// Default configuration for a log at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Location of one record's payload in the file
#[derive(Debug, Clone, Copy)]
struct RecordPos {
    offset: u64,
    len: u32,
}

struct Writer {
    file: File,
    end: u64,
}

/// Persistent single-file implementation of [`SequenceLog`]
pub struct FileLog {
    config: FileLogConfig,
    writer: Mutex<Writer>,
    reader: Mutex<File>,
    index: RwLock<Vec<RecordPos>>,
}

impl FileLog {
    /// Open the log at `config.path`, creating it if missing
    #[instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn open(config: FileLogConfig) -> Result<Self, LogError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LogError::unavailable(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&config.path)
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?;

        let file_size = file
            .metadata()
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?
            .len();

        let (index, valid_end) = if file_size > 0 {
            replay(&file, file_size).await?
        } else {
            (Vec::new(), 0)
        };

        if valid_end < file_size {
            warn!(
                valid_end,
                file_size, "Truncating incomplete trailing group"
            );
            file.set_len(valid_end)
                .await
                .map_err(|e| LogError::unavailable(e.to_string()))?;
        }

        let reader = File::open(&config.path)
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?;

        info!(records = index.len(), end = valid_end, "Opened file log");

        Ok(Self {
            config,
            writer: Mutex::new(Writer {
                file,
                end: valid_end,
            }),
            reader: Mutex::new(reader),
            index: RwLock::new(index),
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Configuration the log was opened with
    pub fn config(&self) -> &FileLogConfig {
        &self.config
    }

    /// Flush and sync the file
    pub async fn close(&self) -> Result<(), LogError> {
        let mut writer = self.writer.lock().await;
        writer
            .file
            .flush()
            .await
            .map_err(|e| LogError::write(e.to_string()))?;
        writer
            .file
            .sync_all()
            .await
            .map_err(|e| LogError::write(e.to_string()))
    }
}

/// Replay group frames, returning the record index and the end of the last
/// complete group
///
/// Only a damaged final group is dropped; a malformed group with data after
/// it fails the open.
async fn replay(file: &File, file_size: u64) -> Result<(Vec<RecordPos>, u64), LogError> {
    let mut reader = BufReader::new(
        file.try_clone()
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?,
    );
    let mut index = Vec::new();
    let mut offset = 0u64;

    while offset + LEN_PREFIX <= file_size {
        let body_len = match reader.read_u32().await {
            Ok(len) => u64::from(len),
            Err(_) => break,
        };

        if offset + LEN_PREFIX + body_len > file_size {
            warn!(offset, body_len, "Truncated group, stopping replay");
            break;
        }

        let mut body = vec![0u8; body_len as usize];
        if reader.read_exact(&mut body).await.is_err() {
            warn!(offset, "Failed to read group, stopping replay");
            break;
        }

        match parse_group(&body, offset + LEN_PREFIX) {
            Some(records) => index.extend(records),
            None if offset + LEN_PREFIX + body_len < file_size => {
                // Intact groups follow, so this is corruption rather than a torn append
                return Err(LogError::read(
                    index.len() as u64,
                    format!("malformed group at offset {offset} followed by more data"),
                ));
            }
            None => {
                warn!(offset, "Malformed trailing group, stopping replay");
                break;
            }
        }

        offset += LEN_PREFIX + body_len;
    }

    debug!(records = index.len(), offset, "Replayed file log");
    Ok((index, offset))
}

/// Parse a group body located at `base` in the file
fn parse_group(body: &[u8], base: u64) -> Option<Vec<RecordPos>> {
    let count = u32::from_be_bytes(body.get(0..4)?.try_into().ok()?);
    let mut records = Vec::with_capacity((count as usize).min(body.len() / 4));
    let mut cursor = 4usize;

    for _ in 0..count {
        let len = u32::from_be_bytes(body.get(cursor..cursor + 4)?.try_into().ok()?);
        cursor += 4;
        let end = cursor.checked_add(len as usize)?;
        if end > body.len() {
            return None;
        }
        records.push(RecordPos {
            offset: base + cursor as u64,
            len,
        });
        cursor = end;
    }

    (cursor == body.len()).then_some(records)
}

/// Serialize `records` as one group frame
fn encode_group(records: &[Bytes]) -> Vec<u8> {
    let body_len: usize = 4 + records.iter().map(|r| 4 + r.len()).sum::<usize>();
    let mut buf = Vec::with_capacity(4 + body_len);
    buf.extend_from_slice(&(body_len as u32).to_be_bytes());
    buf.extend_from_slice(&(records.len() as u32).to_be_bytes());
    for record in records {
        buf.extend_from_slice(&(record.len() as u32).to_be_bytes());
        buf.extend_from_slice(record);
    }
    buf
}

async fn write_group(
    file: &mut File,
    offset: u64,
    buf: &[u8],
    sync: bool,
) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(offset)).await?;
    file.write_all(buf).await?;
    file.flush().await?;
    if sync {
        file.sync_data().await?;
    }
    Ok(())
}

#[async_trait]
impl SequenceLog for FileLog {
    async fn current_length(&self) -> Result<u64, LogError> {
        Ok(self.index.read().await.len() as u64)
    }

    async fn synchronize(&self, _options: &SyncOptions) -> Result<(), LogError> {
        Ok(())
    }

    async fn read_at(&self, sequence: u64) -> Result<Bytes, LogError> {
        let pos = {
            let index = self.index.read().await;
            usize::try_from(sequence)
                .ok()
                .and_then(|i| index.get(i))
                .copied()
                .ok_or(LogError::OutOfRange {
                    sequence,
                    length: index.len() as u64,
                })?
        };

        let mut reader = self.reader.lock().await;
        reader
            .seek(SeekFrom::Start(pos.offset))
            .await
            .map_err(|e| LogError::read(sequence, e.to_string()))?;
        let mut buf = vec![0u8; pos.len as usize];
        reader
            .read_exact(&mut buf)
            .await
            .map_err(|e| LogError::read(sequence, e.to_string()))?;

        Ok(Bytes::from(buf))
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn append_many(&self, records: Vec<Bytes>) -> Result<u64, LogError> {
        if let Some(oversized) = records
            .iter()
            .find(|r| r.len() > self.config.max_record_size)
        {
            return Err(LogError::write(format!(
                "record of {} bytes exceeds limit of {}",
                oversized.len(),
                self.config.max_record_size
            )));
        }

        let buf = encode_group(&records);
        let body_len = buf.len() as u64 - LEN_PREFIX;
        if body_len > u64::from(u32::MAX) {
            return Err(LogError::write("group too large"));
        }

        let mut writer = self.writer.lock().await;
        let start = writer.end;

        if let Err(e) = write_group(&mut writer.file, start, &buf, self.config.sync_on_write).await
        {
            warn!(error = %e, offset = start, "Append failed, rolling back");
            if let Err(rollback) = writer.file.set_len(start).await {
                warn!(error = %rollback, "Rollback truncate failed");
            }
            return Err(LogError::write(e.to_string()));
        }
        writer.end = start + buf.len() as u64;

        let positions = parse_group(&buf[LEN_PREFIX as usize..], start + LEN_PREFIX)
            .ok_or_else(|| LogError::write("encoded group failed to parse"))?;

        let mut index = self.index.write().await;
        let first = index.len() as u64;
        index.extend(positions);

        debug!(first, end = writer.end, "Appended group");
        Ok(first)
    }
}
