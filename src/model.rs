use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::distance::path_length_m;

/// A single georeferenced sample, used both for standalone points of
/// interest and for samples along a recorded track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WayPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters above the WGS-84 ellipsoid.
    pub elevation: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub poi_type: Option<PoiType>,
    /// Speed in m/s.
    pub speed: Option<f64>,
    /// Power in watts.
    pub power: Option<i32>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<i32>,
    /// Heart rate in beats per minute.
    pub heart_rate: Option<i32>,
    /// Cadence in revolutions per minute.
    pub cadence: Option<i32>,
    /// Stable identifier used for merge/update matching.
    pub id: Option<Uuid>,
}

impl WayPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
            name: None,
            poi_type: None,
            speed: None,
            power: None,
            temperature: None,
            heart_rate: None,
            cadence: None,
            id: None,
        }
    }

    /// Whether any sensor value (power, temperature, heart rate, cadence,
    /// speed) is present.
    pub fn has_sensor_data(&self) -> bool {
        self.power.is_some()
            || self.temperature.is_some()
            || self.heart_rate.is_some()
            || self.cadence.is_some()
            || self.speed.is_some()
    }
}

/// An ordered sequence of track samples. Insertion order is preserved and
/// assumed to be temporal order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub points: Vec<WayPoint>,
}

impl Track {
    pub fn new(points: Vec<WayPoint>) -> Self {
        Self { points }
    }

    /// Total path length in meters: the sum of geodesic distances between
    /// consecutive points.
    pub fn length_m(&self) -> f64 {
        path_length_m(&self.points)
    }
}

/// The canonical unit persisted and exchanged between subsystems. Every
/// external format decodes into this and encodes out of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsContainer {
    pub name: Option<String>,
    pub way_points: Vec<WayPoint>,
    pub track: Option<Track>,
}

impl GpsContainer {
    pub fn new(name: Option<String>, way_points: Vec<WayPoint>, track: Option<Track>) -> Self {
        Self {
            name,
            way_points,
            track,
        }
    }
}

/// Closed point-of-interest category enumeration.
///
/// Each category has three string projections: its wire name (also the
/// serde form), its GPX `sym` value, and its TCX `PointType` display
/// string. Unknown incoming strings resolve to `Generic` at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoiType {
    Generic,
    Summit,
    Valley,
    Water,
    Food,
    Danger,
    Left,
    Right,
    Straight,
    FirstAid,
    FourthCategory,
    ThirdCategory,
    SecondCategory,
    FirstCategory,
    HorsCategory,
    Residence,
    Sprint,
}

impl Default for PoiType {
    fn default() -> Self {
        Self::Generic
    }
}

impl PoiType {
    pub const ALL: [PoiType; 17] = [
        PoiType::Generic,
        PoiType::Summit,
        PoiType::Valley,
        PoiType::Water,
        PoiType::Food,
        PoiType::Danger,
        PoiType::Left,
        PoiType::Right,
        PoiType::Straight,
        PoiType::FirstAid,
        PoiType::FourthCategory,
        PoiType::ThirdCategory,
        PoiType::SecondCategory,
        PoiType::FirstCategory,
        PoiType::HorsCategory,
        PoiType::Residence,
        PoiType::Sprint,
    ];

    /// Wire name, matching the serde representation.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PoiType::Generic => "GENERIC",
            PoiType::Summit => "SUMMIT",
            PoiType::Valley => "VALLEY",
            PoiType::Water => "WATER",
            PoiType::Food => "FOOD",
            PoiType::Danger => "DANGER",
            PoiType::Left => "LEFT",
            PoiType::Right => "RIGHT",
            PoiType::Straight => "STRAIGHT",
            PoiType::FirstAid => "FIRST_AID",
            PoiType::FourthCategory => "FOURTH_CATEGORY",
            PoiType::ThirdCategory => "THIRD_CATEGORY",
            PoiType::SecondCategory => "SECOND_CATEGORY",
            PoiType::FirstCategory => "FIRST_CATEGORY",
            PoiType::HorsCategory => "HORS_CATEGORY",
            PoiType::Residence => "RESIDENCE",
            PoiType::Sprint => "SPRINT",
        }
    }

    /// GPX `<sym>` value.
    pub fn gpx_sym(&self) -> &'static str {
        match self {
            PoiType::Generic => "Waypoint",
            PoiType::Summit => "Summit",
            PoiType::Valley => "Valley",
            PoiType::Water => "Water Source",
            PoiType::Food => "Restaurant",
            PoiType::Danger => "Danger Area",
            PoiType::Left => "Turn Left",
            PoiType::Right => "Turn Right",
            PoiType::Straight => "Straight Ahead",
            PoiType::FirstAid => "First Aid",
            PoiType::FourthCategory => "4th Category",
            PoiType::ThirdCategory => "3rd Category",
            PoiType::SecondCategory => "2nd Category",
            PoiType::FirstCategory => "1st Category",
            PoiType::HorsCategory => "Hors Category",
            PoiType::Residence => "Residence",
            PoiType::Sprint => "Sprint",
        }
    }

    /// TCX `CoursePoint/PointType` display string.
    ///
    /// The TCX schema has no Residence point type, so Residence degrades
    /// to the "Generic" display string.
    pub fn tcx_point_type(&self) -> &'static str {
        match self {
            PoiType::Generic | PoiType::Residence => "Generic",
            PoiType::Summit => "Summit",
            PoiType::Valley => "Valley",
            PoiType::Water => "Water",
            PoiType::Food => "Food",
            PoiType::Danger => "Danger",
            PoiType::Left => "Left",
            PoiType::Right => "Right",
            PoiType::Straight => "Straight",
            PoiType::FirstAid => "First Aid",
            PoiType::FourthCategory => "4th Category",
            PoiType::ThirdCategory => "3rd Category",
            PoiType::SecondCategory => "2nd Category",
            PoiType::FirstCategory => "1st Category",
            PoiType::HorsCategory => "Hors Category",
            PoiType::Sprint => "Sprint",
        }
    }

    /// Resolve a wire name. Unknown strings resolve to `Generic`.
    pub fn from_wire_name(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.wire_name() == s)
            .unwrap_or_else(|| {
                log::debug!("unknown point type '{s}', using GENERIC");
                PoiType::Generic
            })
    }

    /// Resolve a GPX `sym` value. Unknown strings resolve to `Generic`.
    pub fn from_gpx_sym(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.gpx_sym() == s)
            .unwrap_or(PoiType::Generic)
    }

    /// Resolve a TCX `PointType` display string. Unknown strings resolve
    /// to `Generic`.
    pub fn from_tcx_point_type(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.tcx_point_type() == s)
            .unwrap_or(PoiType::Generic)
    }
}
