//! FIT decoder adapter (decode-only).
//!
//! Reads record messages from a FIT activity file. Only records carrying
//! both a latitude and a longitude become track points. FIT course points,
//! if any, are handled by a higher-level merge with course waypoints.

use chrono::{DateTime, Utc};
use fitparser::Value;
use fitparser::profile::MesgNum;

use crate::error::{Result, TrackError};
use crate::model::{GpsContainer, Track, WayPoint};

const FORMAT: &str = "FIT";

/// FIT encodes angles as signed 32-bit semicircles; one semicircle is
/// 180 / 2^31 degrees, which is exactly representable as an f64.
const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / 2_147_483_648.0;

/// Convert FIT semicircles to degrees. `1 << 31` semicircles is exactly
/// 180 degrees.
pub fn semicircles_to_degrees(semicircles: i64) -> f64 {
    semicircles as f64 * DEGREES_PER_SEMICIRCLE
}

/// Parse FIT bytes into a canonical container named "Activity" with no
/// points of interest.
pub fn decode(bytes: &[u8]) -> Result<GpsContainer> {
    let records =
        fitparser::from_bytes(bytes).map_err(|e| TrackError::malformed(FORMAT, e))?;

    let mut points = Vec::new();
    for record in records {
        if record.kind() != MesgNum::Record {
            continue;
        }

        let mut lat: Option<f64> = None;
        let mut lon: Option<f64> = None;
        let mut point = WayPoint::new(0.0, 0.0);

        for field in record.fields() {
            match field.name() {
                "position_lat" => lat = as_i64(field.value()).map(semicircles_to_degrees),
                "position_long" => lon = as_i64(field.value()).map(semicircles_to_degrees),
                "altitude" | "enhanced_altitude" => point.elevation = as_f64(field.value()),
                "timestamp" => point.time = as_timestamp(field.value()),
                "heart_rate" => point.heart_rate = as_i64(field.value()).map(|v| v as i32),
                "cadence" => point.cadence = as_i64(field.value()).map(|v| v as i32),
                "power" => point.power = as_i64(field.value()).map(|v| v as i32),
                "temperature" => point.temperature = as_i64(field.value()).map(|v| v as i32),
                "speed" | "enhanced_speed" => point.speed = as_f64(field.value()),
                _ => {}
            }
        }

        if let (Some(lat), Some(lon)) = (lat, lon) {
            point.latitude = lat;
            point.longitude = lon;
            points.push(point);
        }
    }

    log::debug!("decoded {} FIT track points", points.len());
    Ok(GpsContainer {
        name: Some("Activity".to_string()),
        way_points: Vec::new(),
        track: Some(Track::new(points)),
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::SInt8(v) => Some(i64::from(*v)),
        Value::UInt8(v) => Some(i64::from(*v)),
        Value::SInt16(v) => Some(i64::from(*v)),
        Value::UInt16(v) => Some(i64::from(*v)),
        Value::SInt32(v) => Some(i64::from(*v)),
        Value::UInt32(v) => Some(i64::from(*v)),
        Value::SInt64(v) => Some(*v),
        Value::Float32(v) => Some(*v as i64),
        Value::Float64(v) => Some(*v as i64),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(f64::from(*v)),
        Value::Float64(v) => Some(*v),
        _ => as_i64(value).map(|v| v as f64),
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(t) => Some((*t).into()),
        _ => None,
    }
}
