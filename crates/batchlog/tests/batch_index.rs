//! Integration tests for the batch index
//!
//! These exercise appends and lookups end to end over the memory, file, and
//! mirrored log backends, including failure and concurrency behavior.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use batchlog::{BatchError, BatchIndex, LogError, SequenceLog, SyncOptions};
use batchlog_storage::{FileLog, FileLogConfig, MemoryLog, MirrorLog};
use bytes::Bytes;
use rand::Rng;
use tempfile::TempDir;

fn blocks(items: &[&str]) -> Vec<Bytes> {
    items.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
}

// ============================================================================
// Append and Read
// ============================================================================

#[tokio::test]
async fn test_end_to_end_scenario() {
    let index = BatchIndex::new(Arc::new(MemoryLog::new()));

    assert_eq!(index.append(blocks(&["a"])).await.unwrap(), 0);
    assert_eq!(index.length().await.unwrap(), 1);
    assert_eq!(index.byte_length().await.unwrap(), 1);

    assert_eq!(index.append(blocks(&["b", "c"])).await.unwrap(), 1);
    assert_eq!(index.length().await.unwrap(), 2);
    assert_eq!(index.byte_length().await.unwrap(), 3);

    let head = index.head().await.unwrap().unwrap();
    assert_eq!(head.index(), 1);
    assert_eq!(head.length(), 2);

    let first = index.get(0).await.unwrap();
    assert_eq!(first.get(0).await.unwrap(), Bytes::from("a"));

    let second = index.get(1).await.unwrap();
    assert_eq!(second.get(0).await.unwrap(), Bytes::from("b"));
    assert_eq!(second.get(1).await.unwrap(), Bytes::from("c"));
}

#[tokio::test]
async fn test_append_then_read_random_batches() {
    let index = BatchIndex::new(Arc::new(MemoryLog::new()));
    let mut rng = rand::rng();
    let mut written: Vec<Vec<Bytes>> = Vec::new();
    let mut total_bytes = 0u64;

    for expected_index in 0..40u64 {
        let count = rng.random_range(1..6);
        let batch: Vec<Bytes> = (0..count)
            .map(|_| {
                let len = rng.random_range(0..64);
                Bytes::from((0..len).map(|_| rng.random::<u8>()).collect::<Vec<u8>>())
            })
            .collect();
        total_bytes += batch.iter().map(|b| b.len() as u64).sum::<u64>();

        let assigned = index.append(batch.clone()).await.unwrap();
        assert_eq!(assigned, expected_index);
        written.push(batch);
    }

    assert_eq!(index.length().await.unwrap(), 40);
    assert_eq!(index.byte_length().await.unwrap(), total_bytes);

    for (i, expected) in written.iter().enumerate() {
        let batch = index.get(i as u64).await.unwrap();
        assert_eq!(batch.index(), i as u64);
        assert_eq!(batch.length(), expected.len() as u64);
        for (position, block) in expected.iter().enumerate() {
            assert_eq!(&batch.get(position as u64).await.unwrap(), block);
        }
        assert_eq!(&batch.blocks().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_cumulative_byte_length_per_batch() {
    let index = BatchIndex::new(Arc::new(MemoryLog::new()));
    index.append(blocks(&["abc"])).await.unwrap();
    index.append(blocks(&["", "de"])).await.unwrap();
    index.append(blocks(&["fghij"])).await.unwrap();

    assert_eq!(index.get(0).await.unwrap().byte_length(), 3);
    assert_eq!(index.get(1).await.unwrap().byte_length(), 5);
    assert_eq!(index.get(2).await.unwrap().byte_length(), 10);
}

#[tokio::test]
async fn test_out_of_bounds_on_every_batch() {
    let index = BatchIndex::new(Arc::new(MemoryLog::new()));
    index.append(blocks(&["a"])).await.unwrap();
    index.append(blocks(&["b", "c", "d"])).await.unwrap();

    for i in 0..2 {
        let batch = index.get(i).await.unwrap();
        let length = batch.length();
        assert!(matches!(
            batch.get(length).await,
            Err(BatchError::OutOfBounds { position, length: l }) if position == length && l == length
        ));
    }
}

// ============================================================================
// Gallop Complexity
// ============================================================================

#[tokio::test]
async fn test_gallop_reads_are_logarithmic() {
    const BATCHES: u64 = 200;

    let log = Arc::new(MemoryLog::new());
    let index = BatchIndex::new(Arc::clone(&log));
    for i in 0..BATCHES {
        index.append(vec![Bytes::from(i.to_string())]).await.unwrap();
    }

    for target in 0..BATCHES {
        log.reset_stats();
        let batch = index.get(target).await.unwrap();
        assert_eq!(batch.index(), target);
        assert_eq!(batch.get(0).await.unwrap(), Bytes::from(target.to_string()));

        // One read for the head and one per hop; a single-block batch serves
        // its block from the head entry
        let reads = log.stats().reads;
        let distance = BATCHES - 1 - target;
        assert_eq!(reads, 1 + u64::from(distance.count_ones()));
        if distance >= 16 {
            assert!(reads < distance, "{reads} reads for distance {distance}");
        }
    }
}

#[tokio::test]
async fn test_append_cost_stays_logarithmic() {
    let log = Arc::new(MemoryLog::new());
    let index = BatchIndex::new(Arc::clone(&log));
    for i in 0..1024u64 {
        index.append(vec![Bytes::from(i.to_string())]).await.unwrap();
    }

    log.reset_stats();
    index.append(blocks(&["next"])).await.unwrap();
    // 1024 = 2^10: one read for the head plus at most two hops per pointer
    assert!(log.stats().reads <= 1 + 2 * 11, "{:?}", log.stats());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_serialize() {
    let index = Arc::new(BatchIndex::new(Arc::new(MemoryLog::new())));

    let mut handles = Vec::new();
    for task in 0..8u8 {
        let index = Arc::clone(&index);
        handles.push(tokio::spawn(async move {
            let mut assigned = Vec::new();
            for round in 0..10u8 {
                let batch = vec![Bytes::from(vec![task, round]), Bytes::from(vec![task])];
                assigned.push(index.append(batch).await.unwrap());
            }
            assigned
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort_unstable();
    assert_eq!(all, (0..80).collect::<Vec<u64>>());

    // Every batch's pointers still land on the right heads
    for i in 0..80u64 {
        let batch = index.get(i).await.unwrap();
        assert_eq!(batch.length(), 2);
        let mut expected = Vec::new();
        let mut distance = 1;
        while distance <= i {
            expected.push(index.get(i - distance).await.unwrap().sequence());
            distance *= 2;
        }
        assert_eq!(batch.skip_pointers().unwrap(), expected);
    }
    assert_eq!(index.byte_length().await.unwrap(), 80 * 3);
}

// ============================================================================
// Failure Handling
// ============================================================================

/// Memory log whose appends and reads can be made to fail
#[derive(Default)]
struct FlakyLog {
    inner: MemoryLog,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
}

#[async_trait]
impl SequenceLog for FlakyLog {
    async fn current_length(&self) -> Result<u64, LogError> {
        self.inner.current_length().await
    }

    async fn synchronize(&self, options: &SyncOptions) -> Result<(), LogError> {
        self.inner.synchronize(options).await
    }

    async fn read_at(&self, sequence: u64) -> Result<Bytes, LogError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LogError::read(sequence, "injected read failure"));
        }
        self.inner.read_at(sequence).await
    }

    async fn append_many(&self, records: Vec<Bytes>) -> Result<u64, LogError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(LogError::write("injected write failure"));
        }
        self.inner.append_many(records).await
    }
}

#[tokio::test]
async fn test_failed_append_releases_lock() {
    let log = Arc::new(FlakyLog::default());
    let index = BatchIndex::new(Arc::clone(&log));
    index.append(blocks(&["a"])).await.unwrap();

    log.fail_appends.store(true, Ordering::SeqCst);
    let err = index.append(blocks(&["b", "c"])).await.unwrap_err();
    assert!(err.is_write());
    assert_eq!(log.current_length().await.unwrap(), 1);

    log.fail_appends.store(false, Ordering::SeqCst);
    assert_eq!(index.append(blocks(&["d"])).await.unwrap(), 1);
    assert_eq!(index.byte_length().await.unwrap(), 2);
}

#[tokio::test]
async fn test_read_failure_propagates() {
    let log = Arc::new(FlakyLog::default());
    let index = BatchIndex::new(Arc::clone(&log));
    index.append(blocks(&["a"])).await.unwrap();
    index.append(blocks(&["b"])).await.unwrap();

    log.fail_reads.store(true, Ordering::SeqCst);
    assert!(index.get(0).await.unwrap_err().is_read());
    let err = index.append(blocks(&["c"])).await.unwrap_err();
    assert!(err.is_read());

    log.fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(log.current_length().await.unwrap(), 2);
    assert_eq!(index.append(blocks(&["c"])).await.unwrap(), 2);
}

// ============================================================================
// Backends
// ============================================================================

#[tokio::test]
async fn test_file_backed_index_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = FileLogConfig {
        sync_on_write: false,
        ..FileLogConfig::at(temp_dir.path().join("batches.log"))
    };

    {
        let log = Arc::new(FileLog::open(config.clone()).await.unwrap());
        let index = BatchIndex::new(Arc::clone(&log));
        for i in 0..20u64 {
            let batch = (0..=i % 4).map(|b| Bytes::from(format!("{i}:{b}"))).collect();
            index.append(batch).await.unwrap();
        }
        log.close().await.unwrap();
    }

    let index = BatchIndex::new(Arc::new(FileLog::open(config).await.unwrap()));
    assert_eq!(index.length().await.unwrap(), 20);

    let batch = index.get(7).await.unwrap();
    assert_eq!(batch.length(), 4);
    assert_eq!(batch.get(2).await.unwrap(), Bytes::from("7:2"));

    assert_eq!(index.append(blocks(&["more"])).await.unwrap(), 20);
    assert_eq!(
        index.get(20).await.unwrap().get(0).await.unwrap(),
        Bytes::from("more")
    );
}

#[tokio::test]
async fn test_reader_on_mirror_sees_new_batches() {
    let upstream = Arc::new(MemoryLog::new());
    let writer = BatchIndex::new(Arc::clone(&upstream));
    let reader = BatchIndex::new(Arc::new(MirrorLog::new(
        MemoryLog::new(),
        Arc::clone(&upstream),
    )));

    assert_eq!(reader.length().await.unwrap(), 0);

    writer.append(blocks(&["a"])).await.unwrap();
    writer.append(blocks(&["b", "c"])).await.unwrap();

    assert_eq!(reader.length().await.unwrap(), 2);
    assert_eq!(reader.byte_length().await.unwrap(), 3);
    let batch = reader.get(1).await.unwrap();
    assert_eq!(batch.get(0).await.unwrap(), Bytes::from("b"));

    let err = reader.append(blocks(&["x"])).await.unwrap_err();
    assert!(err.is_write());
}
