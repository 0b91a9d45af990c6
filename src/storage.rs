//! Binary at-rest codec and the byte store seam.
//!
//! The bincode serialization of `GpsContainer` is the authoritative
//! persisted form; every other format is a derived view. Optional fields
//! are encoded with explicit presence flags, never sentinel values.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, TrackError};
use crate::model::GpsContainer;

/// Serialize a container to its compact binary form.
pub fn encode(container: &GpsContainer) -> Result<Vec<u8>> {
    bincode::serialize(container)
        .map_err(|e| TrackError::malformed("binary", format!("encode failed: {e}")))
}

/// Deserialize a container from its binary form.
pub fn decode(bytes: &[u8]) -> Result<GpsContainer> {
    bincode::deserialize(bytes).map_err(|e| TrackError::malformed("binary", e))
}

/// Collaborator-provided byte sink/source keyed by an opaque storage
/// location string.
pub trait ByteStore: Send + Sync {
    /// Fetch the bytes stored under `key`, or `NotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Remove the value stored under `key`, or `NotFound`.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store used by tests and as a default composition.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| TrackError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), bytes);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| TrackError::NotFound(key.to_string()))
    }
}
