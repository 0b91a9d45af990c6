//! Merge engine: container concatenation and point-level set union by
//! identifier.

use crate::model::{GpsContainer, Track, WayPoint};

/// Concatenate containers in input order into one. Points of interest and
/// track points are appended in order; the result's name is the first
/// non-blank name among the inputs; the result carries a track iff any
/// input did.
pub fn merge_all(containers: &[GpsContainer]) -> GpsContainer {
    let mut name: Option<String> = None;
    let mut way_points = Vec::new();
    let mut track_points = Vec::new();
    let mut saw_track = false;

    for container in containers {
        if name.is_none() {
            name = container
                .name
                .as_ref()
                .filter(|n| !n.trim().is_empty())
                .cloned();
        }
        way_points.extend(container.way_points.iter().cloned());
        if let Some(track) = &container.track {
            saw_track = true;
            track_points.extend(track.points.iter().cloned());
        }
    }

    GpsContainer {
        name,
        way_points,
        track: saw_track.then_some(Track::new(track_points)),
    }
}

/// Set union by identifier: each incoming point overwrites the existing
/// point sharing its identifier, in place; unmatched or identifier-less
/// incoming points are appended; untouched existing points survive.
/// Last write wins per identifier.
pub fn merge_by_id(existing: &[WayPoint], incoming: Vec<WayPoint>) -> Vec<WayPoint> {
    let mut merged = existing.to_vec();

    for point in incoming {
        let slot = point.id.and_then(|id| {
            merged
                .iter()
                .position(|existing| existing.id == Some(id))
        });
        match slot {
            Some(i) => merged[i] = point,
            None => merged.push(point),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn named(name: &str, id: Option<Uuid>) -> WayPoint {
        let mut pt = WayPoint::new(1.0, 1.0);
        pt.name = Some(name.to_string());
        pt.id = id;
        pt
    }

    #[test]
    fn test_merge_all_concatenates_in_order() {
        let a = GpsContainer::new(
            None,
            vec![named("p1", None)],
            Some(Track::new(vec![WayPoint::new(1.0, 1.0)])),
        );
        let b = GpsContainer::new(
            Some("Ride".to_string()),
            vec![named("p2", None)],
            Some(Track::new(vec![WayPoint::new(2.0, 2.0)])),
        );

        let merged = merge_all(&[a, b]);
        assert_eq!(merged.way_points.len(), 2);
        assert_eq!(merged.way_points[0].name.as_deref(), Some("p1"));
        assert_eq!(merged.track.as_ref().unwrap().points.len(), 2);
        assert_eq!(merged.track.unwrap().points[1].latitude, 2.0);
    }

    #[test]
    fn test_merge_all_first_non_blank_name() {
        let a = GpsContainer::new(Some("   ".to_string()), vec![], None);
        let b = GpsContainer::new(Some("Evening ride".to_string()), vec![], None);
        let merged = merge_all(&[a, b]);
        assert_eq!(merged.name.as_deref(), Some("Evening ride"));
    }

    #[test]
    fn test_merge_all_no_track() {
        let merged = merge_all(&[GpsContainer::default(), GpsContainer::default()]);
        assert!(merged.track.is_none());
    }

    #[test]
    fn test_merge_by_id_overwrites() {
        let id = Uuid::new_v4();
        let merged = merge_by_id(&[named("a", Some(id))], vec![named("b", Some(id))]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_merge_by_id_distinct_ids_append() {
        let merged = merge_by_id(
            &[named("a", Some(Uuid::new_v4()))],
            vec![named("b", Some(Uuid::new_v4()))],
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_by_id_keeps_position_of_replaced_point() {
        let id = Uuid::new_v4();
        let existing = [
            named("first", Some(id)),
            named("second", Some(Uuid::new_v4())),
        ];
        let merged = merge_by_id(&existing, vec![named("replacement", Some(id))]);
        assert_eq!(merged[0].name.as_deref(), Some("replacement"));
        assert_eq!(merged[1].name.as_deref(), Some("second"));
    }

    #[test]
    fn test_merge_by_id_without_id_appends() {
        let merged = merge_by_id(&[named("a", None)], vec![named("b", None)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_by_id_last_write_wins_within_incoming() {
        let id = Uuid::new_v4();
        let merged = merge_by_id(
            &[],
            vec![named("first", Some(id)), named("last", Some(id))],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name.as_deref(), Some("last"));
    }
}
