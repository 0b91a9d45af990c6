//! Waypoint-to-track optimization: snap free-floating points of interest
//! onto the nearest track point within a distance tolerance, then order
//! them by time.

use crate::distance::distance_m;
use crate::error::{Result, TrackError};
use crate::model::{GpsContainer, WayPoint};

/// Tolerance applied when the caller does not override it, in meters.
pub const DEFAULT_TOLERANCE_M: f64 = 500.0;

/// Snap each point of interest onto the nearest track point when that
/// point lies within `tolerance_m`, then sort the points of interest by
/// timestamp ascending (missing timestamps sort last, original order
/// preserved among equals). The track itself is never mutated.
///
/// A snapped point takes the track point's latitude, longitude and
/// timestamp; its elevation, name, category, sensor values and identifier
/// are preserved. A point exactly at the tolerance distance is not
/// snapped.
///
/// Fails with `MissingRequiredData` when the container has no track. An
/// empty track matches nothing and the container is returned unchanged.
pub fn optimize(container: &GpsContainer, tolerance_m: f64) -> Result<GpsContainer> {
    let track = container
        .track
        .as_ref()
        .ok_or(TrackError::MissingRequiredData(
            "optimization requires a track",
        ))?;

    if track.points.is_empty() {
        return Ok(container.clone());
    }

    let mut way_points: Vec<WayPoint> = container
        .way_points
        .iter()
        .map(|poi| snap_to_track(poi, &track.points, tolerance_m))
        .collect();

    way_points.sort_by(|a, b| match (a.time, b.time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    Ok(GpsContainer {
        name: container.name.clone(),
        way_points,
        track: Some(track.clone()),
    })
}

/// Nearest-point scan with first-encountered-minimum tie breaking.
fn snap_to_track(poi: &WayPoint, track_points: &[WayPoint], tolerance_m: f64) -> WayPoint {
    let mut nearest = &track_points[0];
    let mut nearest_dist = distance_m(poi, nearest);
    for candidate in &track_points[1..] {
        let d = distance_m(poi, candidate);
        if d < nearest_dist {
            nearest_dist = d;
            nearest = candidate;
        }
    }

    // A point exactly at the tolerance distance is not snapped.
    if nearest_dist >= tolerance_m {
        return poi.clone();
    }

    let mut snapped = poi.clone();
    snapped.latitude = nearest.latitude;
    snapped.longitude = nearest.longitude;
    snapped.time = nearest.time;
    snapped
}
