use chrono::{TimeZone, Utc};
use trackio::model::{GpsContainer, PoiType, Track, WayPoint};
use trackio::optimize::{DEFAULT_TOLERANCE_M, optimize};
use trackio::storage::MemoryStore;
use trackio::{Format, TrackError, TrackService, decode, encode, merge};

fn load_fixture(path: &str) -> Vec<u8> {
    let _ = env_logger::builder().is_test(true).try_init();
    std::fs::read(format!("tests/fixtures/{path}")).unwrap()
}

// ---- GPX ----

#[test]
fn test_gpx_fixture_decodes_to_canonical_model() {
    let container = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();

    // Track name wins over document metadata name.
    assert_eq!(container.name.as_deref(), Some("Alp loop"));
    assert_eq!(container.way_points.len(), 2);
    assert_eq!(container.way_points[0].poi_type, Some(PoiType::Water));
    assert_eq!(container.way_points[1].poi_type, Some(PoiType::Summit));

    let track = container.track.as_ref().unwrap();
    assert_eq!(track.points.len(), 5); // both segments concatenated
    assert_eq!(track.points[0].heart_rate, Some(120));
    assert_eq!(track.points[0].temperature, Some(18));
    assert_eq!(track.points[0].cadence, Some(80));
    assert_eq!(
        track.points[0].time,
        Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap())
    );
}

#[test]
fn test_gpx_roundtrip_preserves_model() {
    let original = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let bytes = encode(Format::Gpx, &original).unwrap();
    let reparsed = decode(Format::Gpx, &bytes).unwrap();

    assert_eq!(reparsed.name, original.name);
    assert_eq!(reparsed.way_points.len(), original.way_points.len());
    assert_eq!(
        reparsed.track.as_ref().unwrap().points,
        original.track.as_ref().unwrap().points
    );
}

// ---- TCX ----

#[test]
fn test_tcx_fixture_decodes() {
    let container = decode(Format::Tcx, &load_fixture("course.tcx")).unwrap();
    assert_eq!(container.name.as_deref(), Some("Alp loop"));
    assert_eq!(container.way_points.len(), 1);
    assert_eq!(container.way_points[0].poi_type, Some(PoiType::Food));
    assert_eq!(container.track.as_ref().unwrap().points.len(), 3);
}

#[test]
fn test_gpx_to_tcx_export() {
    let container = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let tcx = encode(Format::Tcx, &container).unwrap();
    let reparsed = decode(Format::Tcx, &tcx).unwrap();

    assert_eq!(reparsed.name.as_deref(), Some("Alp loop"));
    assert_eq!(reparsed.track.as_ref().unwrap().points.len(), 5);
    assert_eq!(reparsed.way_points.len(), 2);

    let xml = String::from_utf8(tcx).unwrap();
    assert!(xml.contains("<TotalTimeSeconds>1200</TotalTimeSeconds>"));
}

#[test]
fn test_tcx_export_requires_time_and_elevation() {
    let container = GpsContainer::new(
        Some("bare".to_string()),
        vec![],
        Some(Track::new(vec![WayPoint::new(1.0, 1.0)])),
    );
    assert!(matches!(
        encode(Format::Tcx, &container),
        Err(TrackError::MissingRequiredData(_))
    ));
}

// ---- GeoJSON ----

#[test]
fn test_geojson_export_is_minimal() {
    let container = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let bytes = encode(Format::GeoJson, &container).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 3); // LineString + 2 Points
    assert_eq!(features[0]["geometry"]["type"], "LineString");
    // Longitude first.
    assert_eq!(features[0]["geometry"]["coordinates"][0][0], 11.0);
    assert_eq!(features[1]["properties"]["type"], "WATER");
    // Sensor data never leaks into the visualization payload.
    assert!(features[1]["properties"].get("hr").is_none());
}

// ---- binary storage ----

#[test]
fn test_binary_storage_is_authoritative_roundtrip() {
    let container = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let bytes = trackio::storage::encode(&container).unwrap();
    assert_eq!(trackio::storage::decode(&bytes).unwrap(), container);
}

// ---- optimization ----

#[test]
fn test_optimize_snaps_and_orders() {
    let container = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let optimized = optimize(&container, DEFAULT_TOLERANCE_M).unwrap();

    // "Spring" sits ~55 m from the 08:05 track point and snaps onto it.
    let spring = &optimized.way_points[0];
    assert_eq!(spring.name.as_deref(), Some("Spring"));
    assert_eq!(spring.latitude, 47.01);
    assert_eq!(spring.longitude, 11.00);
    assert_eq!(
        spring.time,
        Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 5, 0).unwrap())
    );
    // The snap keeps the point's own elevation.
    assert_eq!(spring.elevation, Some(652.0));

    // Summit snaps to the 08:20 point and sorts after the spring.
    let summit = &optimized.way_points[1];
    assert_eq!(summit.name.as_deref(), Some("Summit cross"));
    assert_eq!(summit.latitude, 47.04);

    // Applying again changes nothing.
    assert_eq!(optimize(&optimized, DEFAULT_TOLERANCE_M).unwrap(), optimized);
}

// ---- merge ----

#[test]
fn test_merge_two_rides() {
    let a = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let mut b = decode(Format::Tcx, &load_fixture("course.tcx")).unwrap();
    b.name = Some("".to_string()); // blank names are skipped

    let merged = merge::merge_all(&[b, a.clone()]);
    assert_eq!(merged.name.as_deref(), Some("Alp loop"));
    assert_eq!(merged.way_points.len(), 3);
    assert_eq!(
        merged.track.unwrap().points.len(),
        3 + a.track.unwrap().points.len()
    );
}

// ---- service ----

#[test]
fn test_service_end_to_end() {
    let container = decode(Format::Gpx, &load_fixture("course.gpx")).unwrap();
    let service = TrackService::new(MemoryStore::new());
    service.store_container("ride-1", &container).unwrap();

    service.optimize("ride-1", DEFAULT_TOLERANCE_M).unwrap();
    let stored = service.load("ride-1").unwrap();
    assert_eq!(stored.way_points[0].latitude, 47.01);

    let gpx = service.export("ride-1", Format::Gpx).unwrap();
    assert!(String::from_utf8(gpx).unwrap().contains("Alp loop"));

    service.delete("ride-1").unwrap();
    assert!(matches!(
        service.load("ride-1"),
        Err(TrackError::NotFound(_))
    ));
}

#[test]
fn test_concurrent_mutations_serialize_per_track() {
    use std::sync::Arc;
    use std::thread;

    let service = Arc::new(TrackService::new(MemoryStore::new()));
    service
        .store_container("ride-1", &GpsContainer::default())
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        handles.push(thread::spawn(move || {
            for j in 0..10 {
                let mut pt = WayPoint::new(f64::from(i), f64::from(j));
                pt.id = Some(uuid::Uuid::new_v4());
                service.add_waypoints("ride-1", vec![pt]).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // No read-modify-write was lost.
    assert_eq!(service.load("ride-1").unwrap().way_points.len(), 80);
}
