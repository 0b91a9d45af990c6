//! Per-track mutual exclusion.
//!
//! A registry maps track identifiers to a lock state with a waiter count.
//! Entries are created lazily on first acquisition and removed once the
//! waiter count returns to zero after a release, so memory is bounded by
//! currently contended tracks rather than all tracks ever touched.
//!
//! Locks are untimed and per-process; a caller that never releases will
//! starve all future operations on that identifier.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    locked: bool,
    waiters: usize,
}

/// Explicitly constructed, injectable lock registry. One instance is owned
/// by the service composition root; there is no global singleton.
#[derive(Debug, Default)]
pub struct TrackLocks {
    state: Mutex<HashMap<String, LockState>>,
    released: Condvar,
}

impl TrackLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no other thread holds the lock for `track_id`, then
    /// return holding it.
    pub fn acquire(&self, track_id: &str) {
        let mut map = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let entry = map.entry(track_id.to_string()).or_default();
            if !entry.locked {
                entry.locked = true;
                return;
            }
            entry.waiters += 1;
            map = self.released.wait(map).unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = map.get_mut(track_id) {
                entry.waiters -= 1;
            }
        }
    }

    /// Release the lock for `track_id`. The registry entry is dropped when
    /// nobody is waiting on it.
    pub fn release(&self, track_id: &str) {
        let mut map = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = map.get_mut(track_id) {
            entry.locked = false;
            if entry.waiters == 0 {
                map.remove(track_id);
            }
        }
        drop(map);
        self.released.notify_all();
    }

    /// Acquire and wrap the release in an RAII guard.
    pub fn lock<'a>(&'a self, track_id: &str) -> TrackLockGuard<'a> {
        self.acquire(track_id);
        TrackLockGuard {
            locks: self,
            track_id: track_id.to_string(),
        }
    }

    /// Number of registry entries, i.e. currently held or contended ids.
    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Releases the track lock on drop.
pub struct TrackLockGuard<'a> {
    locks: &'a TrackLocks,
    track_id: String,
}

impl Drop for TrackLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.track_id);
    }
}
