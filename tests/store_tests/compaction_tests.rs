//! Tests for Compaction
//!
//! These tests verify:
//! - Superseded versions are dropped and the directory shrinks
//! - Every key keeps its value through compaction and reopen
//! - Keys living in the active segment are left alone
//! - A failed compaction leaves segments and index intact
//! - Reads keep working while compaction runs
//! - Periodic background compaction

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use logkv::segment::{self, ACTIVE_FILE_NAME};
use logkv::{Config, LogKvError, Store, WriterState};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const TEST_MAX_SEGMENT_BYTES: u64 = 256;

fn open_small(dir: &Path) -> Store {
    let config = Config::builder()
        .data_dir(dir)
        .max_segment_size(TEST_MAX_SEGMENT_BYTES)
        .build();
    Store::open_with_config(config).unwrap()
}

fn directory_size(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

// =============================================================================
// Basic Compaction Tests
// =============================================================================

#[test]
fn test_compaction_without_closed_segments_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = open_small(temp.path());
    store.put(b"k", b"v").unwrap();

    let stats = store.compact().unwrap();

    assert_eq!(stats.segments_merged, 0);
    assert_eq!(stats.merged_segment, None);
    assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());

    // The writer was resumed
    store.put(b"k2", b"v2").unwrap();
    assert_eq!(store.writer_state(), WriterState::Running);
}

#[test]
fn test_compaction_shrinks_directory() {
    let temp = TempDir::new().unwrap();
    let store = open_small(temp.path());

    const N: usize = 10;
    for i in 0..N {
        let key = format!("dup-{}", i);
        store.put(key.as_bytes(), format!("old-{}", key).as_bytes()).unwrap();
    }
    for i in 0..N {
        let key = format!("dup-{}", i);
        store.put(key.as_bytes(), format!("new-{}", i).as_bytes()).unwrap();
    }

    let before = directory_size(temp.path());
    store.compact().unwrap();
    let after = directory_size(temp.path());

    assert!(after < before, "expected shrink: {} -> {}", before, after);
    for i in 0..N {
        let got = store.get(format!("dup-{}", i).as_bytes()).unwrap();
        assert_eq!(got, format!("new-{}", i).into_bytes());
    }
}

#[test]
fn test_compaction_merges_closed_segments() {
    let temp = TempDir::new().unwrap();
    let store = open_small(temp.path());

    // Several rounds of overwrites spread over many closed segments
    for round in 0..6 {
        for k in 0..8 {
            store
                .put(format!("key{}", k).as_bytes(), format!("round{}", round).as_bytes())
                .unwrap();
        }
    }
    // Keys only ever written once, so they stay in closed segments
    for k in 0..8 {
        store.put(format!("solo{}", k).as_bytes(), b"solo-value").unwrap();
    }
    for k in 0..4 {
        store.put(format!("tail{}", k).as_bytes(), b"t").unwrap();
    }

    let closed_before = store.closed_segments().unwrap();
    assert!(closed_before.len() >= 2);

    let mut expected = Vec::new();
    for k in 0..8 {
        expected.push((format!("key{}", k), store.get(format!("key{}", k).as_bytes()).unwrap()));
        expected.push((format!("solo{}", k), b"solo-value".to_vec()));
    }

    let stats = store.compact().unwrap();

    assert_eq!(stats.segments_merged, closed_before.len());
    assert!(stats.bytes_after < stats.bytes_before);
    assert!(stats.bytes_saved() > 0);

    let closed_after = store.closed_segments().unwrap();
    assert_eq!(closed_after.len(), 1);
    let merged_name = stats.merged_segment.clone().unwrap();
    assert!(merged_name.ends_with("-merged.seg"));
    assert_eq!(closed_after[0].file_name().unwrap().to_str().unwrap(), merged_name);
    for old in &closed_before {
        assert!(!old.exists());
    }

    for (key, value) in &expected {
        assert_eq!(&store.get(key.as_bytes()).unwrap(), value);
    }
}

#[test]
fn test_compaction_leaves_active_segment_alone() {
    let temp = TempDir::new().unwrap();
    let store = open_small(temp.path());

    for i in 0..20 {
        store.put(format!("k{}", i).as_bytes(), b"0123456789").unwrap();
    }
    store.put(b"fresh", b"in-active").unwrap();

    let active_path = temp.path().join(ACTIVE_FILE_NAME);
    let active_before = fs::read(&active_path).unwrap();

    store.compact().unwrap();

    assert_eq!(fs::read(&active_path).unwrap(), active_before);
    assert_eq!(store.size(), active_before.len() as u64);
    assert_eq!(store.get(b"fresh").unwrap(), b"in-active".to_vec());
}

#[test]
fn test_compaction_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = open_small(temp.path());
        for round in 0..3 {
            for k in 0..12 {
                store
                    .put(format!("key{}", k).as_bytes(), format!("v{}", round).as_bytes())
                    .unwrap();
            }
        }
        for k in 0..6 {
            store.put(format!("once{}", k).as_bytes(), b"x").unwrap();
        }
        store.compact().unwrap();
        store.put(b"after", b"compaction").unwrap();
        store.close().unwrap();
    }

    let store = open_small(temp.path());
    for k in 0..12 {
        assert_eq!(store.get(format!("key{}", k).as_bytes()).unwrap(), b"v2".to_vec());
    }
    for k in 0..6 {
        assert_eq!(store.get(format!("once{}", k).as_bytes()).unwrap(), b"x".to_vec());
    }
    assert_eq!(store.get(b"after").unwrap(), b"compaction".to_vec());
}

#[test]
fn test_repeated_compaction_is_stable() {
    let temp = TempDir::new().unwrap();
    let store = open_small(temp.path());

    for i in 0..40 {
        store.put(format!("k{}", i % 15).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
    }
    store.compact().unwrap();
    let second = store.compact().unwrap();

    assert!(second.segments_merged <= 1);
    for i in 25..40 {
        assert_eq!(
            store.get(format!("k{}", i % 15).as_bytes()).unwrap(),
            format!("v{}", i).into_bytes()
        );
    }
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_compaction_leaves_state_intact() {
    let temp = TempDir::new().unwrap();
    let store = open_small(temp.path());

    for k in 0..20 {
        store.put(format!("key{:02}", k).as_bytes(), b"value-value").unwrap();
    }
    let closed = segment::list_closed(temp.path()).unwrap();
    assert!(!closed.is_empty());

    // Damage the first key of the oldest closed segment in place
    let victim = &closed[0].path;
    let mut bytes = fs::read(victim).unwrap();
    bytes[8] ^= 0xff;
    fs::write(victim, &bytes).unwrap();

    let err = store.compact().unwrap_err();
    assert!(matches!(err, LogKvError::Corruption(_)));

    // Old segments stay, no merged output or scratch files appear
    let closed_after = segment::list_closed(temp.path()).unwrap();
    assert_eq!(closed_after.len(), closed.len());
    let leftovers = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("compact-"))
        .count();
    assert_eq!(leftovers, 0);

    // Undamaged keys still resolve and the writer is back
    assert_eq!(store.get(b"key19").unwrap(), b"value-value".to_vec());
    store.put(b"after", b"failure").unwrap();
    assert_eq!(store.get(b"after").unwrap(), b"failure".to_vec());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_reads_and_writes_during_compaction() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(open_small(temp.path()));

    for k in 0..50 {
        store.put(format!("key{}", k).as_bytes(), format!("v{}", k).as_bytes()).unwrap();
    }

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..20 {
                    let k = round % 50;
                    let value = store.get(format!("key{}", k).as_bytes()).unwrap();
                    assert_eq!(value, format!("v{}", k).into_bytes());
                }
            })
        })
        .collect();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for k in 0..30 {
                store.put(format!("extra{}", k).as_bytes(), b"e").unwrap();
            }
        })
    };

    for _ in 0..3 {
        store.compact().unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();

    for k in 0..50 {
        assert_eq!(
            store.get(format!("key{}", k).as_bytes()).unwrap(),
            format!("v{}", k).into_bytes()
        );
    }
    for k in 0..30 {
        assert_eq!(store.get(format!("extra{}", k).as_bytes()).unwrap(), b"e".to_vec());
    }
}

#[test]
fn test_background_compaction() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .max_segment_size(TEST_MAX_SEGMENT_BYTES)
        .compaction_interval(Duration::from_millis(20))
        .compaction_min_segments(2)
        .build();
    let store = Store::open_with_config(config).unwrap();

    for i in 0..100 {
        store.put(format!("k{}", i % 5).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while store.closed_segments().unwrap().len() >= 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }

    assert!(store.closed_segments().unwrap().len() < 2);
    for i in 95..100 {
        assert_eq!(
            store.get(format!("k{}", i % 5).as_bytes()).unwrap(),
            format!("v{}", i).into_bytes()
        );
    }
    store.close().unwrap();
}
