//! Index implementation
//!
//! HashMap-based index with RwLock for concurrency.

use std::collections::HashMap;
use std::io;

use parking_lot::RwLock;

use crate::segment::SegmentId;
use super::Location;

/// Key → latest location map
///
/// Values are always copied out of the lock scope; no reference into the
/// map ever escapes.
#[derive(Debug, Default)]
pub struct Index {
    map: RwLock<HashMap<Vec<u8>, Location>>,
}

impl Index {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the latest location of a key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Location> {
        self.map.read().get(key).cloned()
    }

    /// Point a key at a new location (write lock)
    pub fn insert(&self, key: Vec<u8>, location: Location) {
        self.map.write().insert(key, location);
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Snapshot every key whose latest record lives in a closed segment
    pub fn closed_entries(&self) -> Vec<(Vec<u8>, Location)> {
        self.map
            .read()
            .iter()
            .filter(|(_, location)| !location.is_active())
            .map(|(key, location)| (key.clone(), location.clone()))
            .collect()
    }

    /// Rename the active segment and retarget its locations in one step
    ///
    /// This is the one place the lock is held across I/O: `rename` runs
    /// under the write lock, so an active location is never handed out for
    /// a file that no longer carries the active name. On failure nothing
    /// changes.
    /// Returns the number of retargeted keys.
    pub fn rotate_active<F>(&self, closed: SegmentId, rename: F) -> io::Result<usize>
    where
        F: FnOnce() -> io::Result<()>,
    {
        let mut map = self.map.write();
        rename()?;

        let mut moved = 0;
        for location in map.values_mut().filter(|l| l.is_active()) {
            location.segment = closed.clone();
            moved += 1;
        }
        Ok(moved)
    }

    /// Move keys to new locations, skipping any key that changed meanwhile
    ///
    /// Each update is `(key, expected current location, new location)`.
    /// Returns the number of keys redirected.
    pub fn redirect(&self, updates: Vec<(Vec<u8>, Location, Location)>) -> usize {
        let mut map = self.map.write();
        let mut redirected = 0;
        for (key, expected, new_location) in updates {
            if let Some(current) = map.get_mut(&key) {
                if *current == expected {
                    *current = new_location;
                    redirected += 1;
                }
            }
        }
        redirected
    }
}
