//! GeoJSON codec for visualization.
//!
//! The track becomes a single `LineString` feature and each point of
//! interest a `Point` feature, with longitude-first coordinate ordering
//! per GeoJSON convention. Only `name` and `type` are copied into feature
//! properties; the payload is deliberately minimal. Decode accepts `Point`
//! features only.

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, TrackError};
use crate::model::{GpsContainer, PoiType, WayPoint};

const FORMAT: &str = "GeoJSON";

/// Encode a canonical container as a GeoJSON `FeatureCollection`.
pub fn encode(container: &GpsContainer) -> Result<Vec<u8>> {
    let mut features = Vec::new();

    if let Some(track) = &container.track {
        let coords: Vec<Vec<f64>> = track.points.iter().map(point_coords).collect();
        let mut props = Map::new();
        if let Some(name) = &container.name {
            props.insert("name".to_string(), JsonValue::String(name.clone()));
        }
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(coords))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        });
    }

    for pt in &container.way_points {
        features.push(waypoint_to_feature(pt));
    }

    let fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    serde_json::to_string(&fc)
        .map(String::into_bytes)
        .map_err(|e| TrackError::malformed(FORMAT, e))
}

fn waypoint_to_feature(pt: &WayPoint) -> Feature {
    let mut props = Map::new();
    if let Some(name) = &pt.name {
        props.insert("name".to_string(), JsonValue::String(name.clone()));
    }
    if let Some(t) = pt.poi_type {
        props.insert(
            "type".to_string(),
            JsonValue::String(t.wire_name().to_string()),
        );
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(point_coords(pt)))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Build a [lon, lat] coordinate pair. Note the transposition relative to
/// the canonical latitude-first order.
fn point_coords(pt: &WayPoint) -> Vec<f64> {
    vec![pt.longitude, pt.latitude]
}

/// Decode GeoJSON bytes. Only `Point` features are supported; any other
/// geometry type fails with `UnsupportedFormat`.
pub fn decode(bytes: &[u8]) -> Result<GpsContainer> {
    let text = std::str::from_utf8(bytes).map_err(|e| TrackError::malformed(FORMAT, e))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| TrackError::malformed(FORMAT, e))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(TrackError::UnsupportedFormat(
                "GeoJSON decode expects a feature collection".to_string(),
            ));
        }
    };

    let mut way_points = Vec::new();
    for feature in features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        match geometry.value {
            Value::Point(coords) => {
                if coords.len() < 2 {
                    return Err(TrackError::malformed(FORMAT, "point with fewer than 2 coordinates"));
                }
                let mut pt = WayPoint::new(coords[1], coords[0]);
                if let Some(props) = &feature.properties {
                    if let Some(JsonValue::String(name)) = props.get("name") {
                        pt.name = Some(name.clone());
                    }
                    if let Some(JsonValue::String(t)) = props.get("type") {
                        pt.poi_type = Some(PoiType::from_wire_name(t));
                    }
                }
                way_points.push(pt);
            }
            other => {
                return Err(TrackError::UnsupportedFormat(format!(
                    "GeoJSON decode does not support {} geometry",
                    geometry_name(&other)
                )));
            }
        }
    }

    Ok(GpsContainer {
        name: None,
        way_points,
        track: None,
    })
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
