//! Tests for Store
//!
//! These tests verify:
//! - Basic put/get semantics and last-write-wins
//! - NotFound for keys never written
//! - Segment rotation against the size threshold
//! - Command execution
//! - Concurrent access from many threads
//! - Store lifecycle (open/close)

use std::fs;
use std::sync::Arc;
use std::thread;

use logkv::config::{SyncStrategy, ENV_MAX_SEGMENT_BYTES};
use logkv::protocol::Command;
use logkv::segment::ACTIVE_FILE_NAME;
use logkv::{Config, LogKvError, Store, WriterState};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const TEST_MAX_SEGMENT_BYTES: u64 = 256;
const TEST_VALUE: &str = "xxxxxxxxxxxxxxxxxxxx"; // 20 bytes

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_segment_size(1024 * 1024)
        .build();
    let store = Store::open_with_config(config).unwrap();
    (temp_dir, store)
}

fn setup_temp_store_with_small_segments() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_segment_size(TEST_MAX_SEGMENT_BYTES)
        .build();
    let store = Store::open_with_config(config).unwrap();
    (temp_dir, store)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_directory_and_active_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("db");

    let config = Config::builder().data_dir(&data_dir).build();
    let store = Store::open_with_config(config).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join(ACTIVE_FILE_NAME).exists());
    assert_eq!(store.size(), 0);
    assert_eq!(store.key_count(), 0);
}

#[test]
fn test_put_get() {
    let (_temp, store) = setup_temp_store();

    store.put(b"hello", b"world").unwrap();

    assert_eq!(store.get(b"hello").unwrap(), b"world".to_vec());
}

#[test]
fn test_put_overwrite() {
    let (_temp, store) = setup_temp_store();

    store.put(b"a", b"1").unwrap();
    store.put(b"a", b"2").unwrap();

    assert_eq!(store.get(b"a").unwrap(), b"2".to_vec());
    assert_eq!(store.key_count(), 1);
}

#[test]
fn test_get_missing_key() {
    let (_temp, store) = setup_temp_store();
    store.put(b"present", b"v").unwrap();

    let err = store.get(b"missing").unwrap_err();
    assert!(matches!(err, LogKvError::KeyNotFound));
    assert!(err.is_not_found());
}

#[test]
fn test_empty_key_and_value() {
    let (_temp, store) = setup_temp_store();

    store.put(b"", b"empty key").unwrap();
    store.put(b"empty value", b"").unwrap();

    assert_eq!(store.get(b"").unwrap(), b"empty key".to_vec());
    assert_eq!(store.get(b"empty value").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_size_tracks_active_file() {
    let (temp, store) = setup_temp_store();

    store.put(b"key", b"value").unwrap();
    store.put(b"key2", b"value2").unwrap();

    let on_disk = fs::metadata(temp.path().join(ACTIVE_FILE_NAME)).unwrap().len();
    assert_eq!(store.size(), 20 + 22);
    assert_eq!(store.size(), on_disk);
}

#[test]
fn test_last_write_wins_over_many_keys() {
    let (_temp, store) = setup_temp_store_with_small_segments();

    for round in 0..5 {
        for k in 0..20 {
            store
                .put(format!("key{}", k).as_bytes(), format!("v{}-{}", k, round).as_bytes())
                .unwrap();
        }
    }

    for k in 0..20 {
        let expected = format!("v{}-4", k).into_bytes();
        assert_eq!(store.get(format!("key{}", k).as_bytes()).unwrap(), expected);
    }
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_segment_rotation() {
    let (_temp, store) = setup_temp_store_with_small_segments();

    for i in 0..15 {
        store
            .put(format!("key-{}", i).as_bytes(), TEST_VALUE.as_bytes())
            .unwrap();
    }

    assert!(store.size() <= TEST_MAX_SEGMENT_BYTES);
    assert!(!store.closed_segments().unwrap().is_empty());

    for i in 0..15 {
        let value = store.get(format!("key-{}", i).as_bytes()).unwrap();
        assert_eq!(value, TEST_VALUE.as_bytes());
    }
}

#[test]
fn test_rotation_happens_at_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_segment_size(40)
        .build();
    let store = Store::open_with_config(config).unwrap();

    // Each record is 20 bytes: the second one reaches the threshold
    store.put(b"key", b"val01").unwrap();
    assert_eq!(store.size(), 20);
    assert!(store.closed_segments().unwrap().is_empty());

    store.put(b"key", b"val02").unwrap();
    assert_eq!(store.size(), 0);
    assert_eq!(store.closed_segments().unwrap().len(), 1);

    assert_eq!(store.get(b"key").unwrap(), b"val02".to_vec());
}

#[test]
fn test_size_never_exceeds_threshold_after_put() {
    let (_temp, store) = setup_temp_store_with_small_segments();

    for i in 0..200 {
        store.put(format!("k{}", i % 13).as_bytes(), TEST_VALUE.as_bytes()).unwrap();
        assert!(store.size() < TEST_MAX_SEGMENT_BYTES);
    }
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_commands() {
    let (_temp, store) = setup_temp_store();

    let put = store
        .execute(Command::Put {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        })
        .unwrap();
    assert_eq!(put, None);

    let get = store.execute(Command::Get { key: b"k".to_vec() }).unwrap();
    assert_eq!(get, Some(b"v".to_vec()));

    let size = store.execute(Command::Size).unwrap().unwrap();
    assert_eq!(u64::from_be_bytes(size.try_into().unwrap()), 14);

    assert_eq!(store.execute(Command::Ping).unwrap(), Some(b"PONG".to_vec()));
    assert_eq!(store.execute(Command::Compact).unwrap(), None);

    let missing = store.execute(Command::Get { key: b"nope".to_vec() });
    assert!(matches!(missing, Err(LogKvError::KeyNotFound)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_puts_and_gets() {
    let (_temp, store) = setup_temp_store_with_small_segments();
    let store = Arc::new(store);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("t{}-k{}", t, i);
                    let value = format!("value-{}-{}", t, i);
                    store.put(key.as_bytes(), value.as_bytes()).unwrap();
                    // Read-your-writes from the same thread
                    assert_eq!(store.get(key.as_bytes()).unwrap(), value.into_bytes());
                }
            })
        })
        .collect();

    for handle in writers {
        handle.join().unwrap();
    }

    assert_eq!(store.key_count(), 200);
    for t in 0..4 {
        for i in 0..50 {
            let key = format!("t{}-k{}", t, i);
            let expected = format!("value-{}-{}", t, i).into_bytes();
            assert_eq!(store.get(key.as_bytes()).unwrap(), expected);
        }
    }
}

#[test]
fn test_readers_during_rotation_see_values() {
    let (_temp, store) = setup_temp_store_with_small_segments();
    let store = Arc::new(store);
    store.put(b"stable", b"value").unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..300 {
                store.put(format!("churn{}", i).as_bytes(), TEST_VALUE.as_bytes()).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..300 {
                    assert_eq!(store.get(b"stable").unwrap(), b"value".to_vec());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_writer_state_lifecycle() {
    let (_temp, store) = setup_temp_store();
    store.put(b"k", b"v").unwrap();
    assert_eq!(store.writer_state(), WriterState::Running);

    store.close().unwrap();
    assert_eq!(store.writer_state(), WriterState::Stopped);
}

#[test]
fn test_operations_after_close_fail() {
    let (_temp, store) = setup_temp_store();
    store.put(b"k", b"v").unwrap();
    store.close().unwrap();

    assert!(matches!(store.put(b"k", b"v2"), Err(LogKvError::Closed)));
    assert!(matches!(store.get(b"k"), Err(LogKvError::Closed)));
    assert!(matches!(store.compact(), Err(LogKvError::Closed)));
}

#[test]
fn test_close_is_idempotent() {
    let (_temp, store) = setup_temp_store();
    store.close().unwrap();
    store.close().unwrap();
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .read_workers(0)
        .build();
    assert!(matches!(
        Store::open_with_config(config),
        Err(LogKvError::Config(_))
    ));

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_segment_size(0)
        .build();
    assert!(matches!(
        Store::open_with_config(config),
        Err(LogKvError::Config(_))
    ));
}

#[test]
fn test_batched_sync_strategy() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryNEntries { count: 10 })
        .build();

    {
        let store = Store::open_with_config(config.clone()).unwrap();
        for i in 0..25 {
            store.put(format!("k{}", i).as_bytes(), b"v").unwrap();
        }
        store.close().unwrap();
    }

    let store = Store::open_with_config(config).unwrap();
    assert_eq!(store.key_count(), 25);
}

#[test]
fn test_open_reads_segment_size_from_env() {
    let temp_dir = TempDir::new().unwrap();
    std::env::set_var(ENV_MAX_SEGMENT_BYTES, TEST_MAX_SEGMENT_BYTES.to_string());

    let store = Store::open(temp_dir.path()).unwrap();
    std::env::remove_var(ENV_MAX_SEGMENT_BYTES);

    assert_eq!(store.config().max_segment_size, TEST_MAX_SEGMENT_BYTES);
}
