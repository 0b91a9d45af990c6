//! Track mutation service.
//!
//! Every mutating operation holds the track's lock for the full
//! read-decode-transform-encode-store sequence, making it atomic with
//! respect to other mutations of the same track. Pure reads do not take
//! the lock and may observe old-or-new, never torn, provided the byte
//! store writes atomically.

use uuid::Uuid;

use crate::error::Result;
use crate::lock::TrackLocks;
use crate::merge::merge_by_id;
use crate::model::{GpsContainer, WayPoint};
use crate::optimize::optimize;
use crate::storage::{self, ByteStore};
use crate::{Format, encode};

pub struct TrackService<S: ByteStore> {
    store: S,
    locks: TrackLocks,
}

impl<S: ByteStore> TrackService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: TrackLocks::new(),
        }
    }

    /// Load a stored container without taking the lock.
    pub fn load(&self, track_id: &str) -> Result<GpsContainer> {
        let bytes = self.store.get(track_id)?;
        storage::decode(&bytes)
    }

    /// Export a stored container in the given format, without taking the
    /// lock.
    pub fn export(&self, track_id: &str, format: Format) -> Result<Vec<u8>> {
        let container = self.load(track_id)?;
        encode(format, &container)
    }

    /// Store a container, replacing any previous value.
    pub fn store_container(&self, track_id: &str, container: &GpsContainer) -> Result<()> {
        let _guard = self.locks.lock(track_id);
        self.store.put(track_id, storage::encode(container)?)
    }

    /// Replace the full set of points of interest.
    pub fn replace_waypoints(&self, track_id: &str, way_points: Vec<WayPoint>) -> Result<()> {
        self.mutate(track_id, move |container| {
            container.way_points = way_points;
        })
    }

    /// Add or update points of interest, matched by identifier.
    pub fn add_waypoints(&self, track_id: &str, incoming: Vec<WayPoint>) -> Result<()> {
        self.mutate(track_id, move |container| {
            container.way_points = merge_by_id(&container.way_points, incoming);
        })
    }

    /// Delete the point of interest with the given identifier. Unknown
    /// identifiers are a no-op; the track itself must exist.
    pub fn delete_waypoint(&self, track_id: &str, point_id: Uuid) -> Result<()> {
        self.mutate(track_id, move |container| {
            container.way_points.retain(|pt| pt.id != Some(point_id));
        })
    }

    /// Rename a stored container.
    pub fn rename(&self, track_id: &str, name: Option<String>) -> Result<()> {
        self.mutate(track_id, move |container| {
            container.name = name;
        })
    }

    /// Snap points of interest onto the track and reorder them by time.
    pub fn optimize(&self, track_id: &str, tolerance_m: f64) -> Result<()> {
        let _guard = self.locks.lock(track_id);
        let bytes = self.store.get(track_id)?;
        let container = storage::decode(&bytes)?;
        let optimized = optimize(&container, tolerance_m)?;
        self.store.put(track_id, storage::encode(&optimized)?)
    }

    /// Remove a stored container entirely.
    pub fn delete(&self, track_id: &str) -> Result<()> {
        let _guard = self.locks.lock(track_id);
        self.store.remove(track_id)
    }

    fn mutate(&self, track_id: &str, transform: impl FnOnce(&mut GpsContainer)) -> Result<()> {
        let _guard = self.locks.lock(track_id);
        let bytes = self.store.get(track_id)?;
        let mut container = storage::decode(&bytes)?;
        transform(&mut container);
        self.store.put(track_id, storage::encode(&container)?)
    }
}
