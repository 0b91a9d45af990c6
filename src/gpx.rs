//! GPX 1.1 codec.
//!
//! Decode maps top-level waypoints to points of interest and every track
//! point of every segment, in document order, to the canonical track. The
//! container name is taken from the first track's name element, falling
//! back to the document metadata name. Encode emits one track with one
//! segment.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Result, TrackError};
use crate::model::{GpsContainer, PoiType, Track, WayPoint};

const FORMAT: &str = "GPX";
const GPX_NS: &str = "http://www.topografix.com/GPX/1/1";
const TPX_NS: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";

/// Sensor values collected from a GPX extension subtree.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SensorValues {
    pub power: Option<i32>,
    pub temperature: Option<i32>,
    pub heart_rate: Option<i32>,
    pub cadence: Option<i32>,
    pub speed: Option<f64>,
}

impl SensorValues {
    /// Overwrite our values with any present in `other`.
    fn overridden_by(&mut self, other: SensorValues) {
        self.power = other.power.or(self.power);
        self.temperature = other.temperature.or(self.temperature);
        self.heart_rate = other.heart_rate.or(self.heart_rate);
        self.cadence = other.cadence.or(self.cadence);
        self.speed = other.speed.or(self.speed);
    }

    fn apply_to(&self, point: &mut WayPoint) {
        point.power = self.power;
        point.temperature = self.temperature;
        point.heart_rate = self.heart_rate;
        point.cadence = self.cadence;
        point.speed = self.speed;
    }
}

/// Parse GPX bytes into a canonical container.
pub fn decode(bytes: &[u8]) -> Result<GpsContainer> {
    let xml = std::str::from_utf8(bytes).map_err(|e| TrackError::malformed(FORMAT, e))?;
    let mut reader = Reader::from_str(xml);

    let mut metadata_name: Option<String> = None;
    let mut track_name: Option<String> = None;
    let mut way_points: Vec<WayPoint> = Vec::new();
    let mut track_points: Vec<WayPoint> = Vec::new();
    let mut saw_track = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"wpt" => {
                    if let Some(pt) = parse_point(&e, &mut reader)? {
                        way_points.push(pt);
                    }
                }
                b"metadata" => {
                    metadata_name = parse_metadata_name(&mut reader)?;
                }
                b"trk" => {
                    let (name, mut points) = parse_track(&mut reader)?;
                    // Only the first track's name is considered.
                    if !saw_track {
                        track_name = name;
                    }
                    saw_track = true;
                    track_points.append(&mut points);
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"wpt" {
                    if let Ok((lat, lon)) = parse_lat_lon(&e) {
                        way_points.push(WayPoint::new(lat, lon));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok(GpsContainer {
        name: track_name.or(metadata_name),
        way_points,
        track: saw_track.then_some(Track::new(track_points)),
    })
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| TrackError::malformed(FORMAT, e))?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match attr.key.local_name().as_ref() {
            b"lat" => lat = val.parse::<f64>().ok(),
            b"lon" => lon = val.parse::<f64>().ok(),
            _ => {}
        }
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(TrackError::malformed(FORMAT, "point without lat/lon")),
    }
}

/// Parse a point element (wpt or trkpt) and its children. Called after
/// receiving `Event::Start` for the point element. Points with missing or
/// unparsable coordinates are skipped.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<WayPoint>> {
    let (lat, lon) = match parse_lat_lon(start) {
        Ok(coords) => coords,
        Err(_) => {
            log::warn!("skipping GPX point without valid lat/lon");
            reader
                .read_to_end(start.name())
                .map_err(|e| TrackError::malformed(FORMAT, e))?;
            return Ok(None);
        }
    };

    let mut point = WayPoint::new(lat, lon);
    let mut sym_type: Option<PoiType> = None;
    let mut wire_type: Option<PoiType> = None;
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    point.elevation = read_text_owned(reader, &e)?.parse::<f64>().ok();
                }
                b"time" => {
                    point.time = parse_time(&read_text_owned(reader, &e)?);
                }
                b"name" => {
                    point.name = Some(read_text_owned(reader, &e)?);
                }
                b"sym" => {
                    sym_type = Some(PoiType::from_gpx_sym(&read_text_owned(reader, &e)?));
                }
                b"type" => {
                    wire_type = Some(PoiType::from_wire_name(&read_text_owned(reader, &e)?));
                }
                b"extensions" => {
                    collect_sensors(reader, &e)?.apply_to(&mut point);
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    // An explicit <type> wins over the symbol mapping.
    point.poi_type = wire_type.or(sym_type);
    Ok(Some(point))
}

/// Post-order scan of an extension subtree for known sensor tags. Unknown
/// tags are descended into; values found deeper in the tree override
/// shallower ones.
fn collect_sensors<'a>(
    reader: &mut Reader<&'a [u8]>,
    parent: &BytesStart<'a>,
) -> Result<SensorValues> {
    let mut own = SensorValues::default();
    let mut from_children = SensorValues::default();
    let end_name = parent.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"power" => own.power = read_text_owned(reader, &e)?.trim().parse().ok(),
                b"atemp" => own.temperature = read_text_owned(reader, &e)?.trim().parse().ok(),
                b"hr" => own.heart_rate = read_text_owned(reader, &e)?.trim().parse().ok(),
                b"cad" => own.cadence = read_text_owned(reader, &e)?.trim().parse().ok(),
                b"speed" => own.speed = read_text_owned(reader, &e)?.trim().parse().ok(),
                _ => {
                    let nested = collect_sensors(reader, &e)?;
                    from_children.overridden_by(nested);
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    own.overridden_by(from_children);
    Ok(own)
}

/// Parse a `<metadata>` element, returning its name if present.
fn parse_metadata_name(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let mut name = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"metadata" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok(name)
}

/// Parse a `<trk>` element into its name and the points of all segments.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Result<(Option<String>, Vec<WayPoint>)> {
    let mut name = None;
    let mut points = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                b"trkseg" => parse_segment(reader, &mut points)?,
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok((name, points))
}

/// Parse a `<trkseg>` element, appending its points.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>, points: &mut Vec<WayPoint>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_point(&e, reader)? {
                        points.push(pt);
                    }
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    if let Ok((lat, lon)) = parse_lat_lon(&e) {
                        points.push(WayPoint::new(lat, lon));
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok(())
}

/// Read text content of an element as an owned String. Handles regular
/// text, CDATA sections, and entity references.
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::CData(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok(text)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Encode a canonical container as GPX 1.1 bytes.
pub fn encode(container: &GpsContainer) -> Result<Vec<u8>> {
    let mut writer = quick_xml::Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("version", "1.1"));
    gpx.push_attribute(("creator", "trackio"));
    gpx.push_attribute(("xmlns", GPX_NS));
    gpx.push_attribute(("xmlns:gpxtpx", TPX_NS));
    writer.write_event(Event::Start(gpx))?;

    if let Some(name) = &container.name {
        writer.write_event(Event::Start(BytesStart::new("metadata")))?;
        write_text_element(&mut writer, "name", name)?;
        writer.write_event(Event::End(BytesEnd::new("metadata")))?;
    }

    for pt in &container.way_points {
        write_point(&mut writer, "wpt", pt)?;
    }

    if let Some(track) = &container.track {
        writer.write_event(Event::Start(BytesStart::new("trk")))?;
        if let Some(name) = &container.name {
            write_text_element(&mut writer, "name", name)?;
        }
        writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
        for pt in &track.points {
            write_point(&mut writer, "trkpt", pt)?;
        }
        writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
        writer.write_event(Event::End(BytesEnd::new("trk")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("gpx")))?;
    Ok(writer.into_inner())
}

fn write_point<W: Write>(
    writer: &mut quick_xml::Writer<W>,
    tag: &str,
    pt: &WayPoint,
) -> Result<()> {
    let mut start = BytesStart::new(tag);
    start.push_attribute(("lat", format_coord(pt.latitude).as_str()));
    start.push_attribute(("lon", format_coord(pt.longitude).as_str()));
    writer.write_event(Event::Start(start))?;

    if let Some(ele) = pt.elevation {
        write_text_element(writer, "ele", &ele.to_string())?;
    }
    if let Some(time) = pt.time {
        write_text_element(
            writer,
            "time",
            &time.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
    }
    if let Some(name) = &pt.name {
        write_text_element(writer, "name", name)?;
    }
    if let Some(t) = pt.poi_type {
        write_text_element(writer, "sym", t.gpx_sym())?;
        write_text_element(writer, "type", t.wire_name())?;
    }

    // The extension block is entirely absent when no sensor value is set.
    if pt.has_sensor_data() {
        writer.write_event(Event::Start(BytesStart::new("extensions")))?;
        writer.write_event(Event::Start(BytesStart::new("gpxtpx:TrackPointExtension")))?;
        if let Some(v) = pt.temperature {
            write_text_element(writer, "gpxtpx:atemp", &v.to_string())?;
        }
        if let Some(v) = pt.heart_rate {
            write_text_element(writer, "gpxtpx:hr", &v.to_string())?;
        }
        if let Some(v) = pt.cadence {
            write_text_element(writer, "gpxtpx:cad", &v.to_string())?;
        }
        if let Some(v) = pt.speed {
            write_text_element(writer, "gpxtpx:speed", &v.to_string())?;
        }
        if let Some(v) = pt.power {
            write_text_element(writer, "gpxtpx:power", &v.to_string())?;
        }
        writer.write_event(Event::End(BytesEnd::new("gpxtpx:TrackPointExtension")))?;
        writer.write_event(Event::End(BytesEnd::new("extensions")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut quick_xml::Writer<W>,
    tag: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn format_coord(v: f64) -> String {
    // Enough digits to round-trip f64 coordinates.
    format!("{v:.9}")
}
