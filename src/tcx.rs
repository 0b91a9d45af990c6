//! TCX course codec.
//!
//! Encode emits a `Course` with exactly one `Lap` (elapsed seconds, total
//! path length, begin/end positions), a `Track` of timestamped,
//! cumulative-distance-annotated points, and one `CoursePoint` per point
//! of interest. Lap and track point fields require every track point to
//! carry both a timestamp and an elevation; export fails otherwise.
//! Decode is the inverse projection.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::distance::distance_m;
use crate::error::{Result, TrackError};
use crate::model::{GpsContainer, PoiType, Track, WayPoint};

const FORMAT: &str = "TCX";
const TCX_NS: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";

/// Parse TCX bytes into a canonical container.
pub fn decode(bytes: &[u8]) -> Result<GpsContainer> {
    let xml = std::str::from_utf8(bytes).map_err(|e| TrackError::malformed(FORMAT, e))?;
    let mut reader = Reader::from_str(xml);

    let mut name: Option<String> = None;
    let mut way_points: Vec<WayPoint> = Vec::new();
    let mut track_points: Vec<WayPoint> = Vec::new();
    let mut saw_track = false;
    let mut in_course = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Course" => in_course = true,
                b"Name" if in_course && name.is_none() => {
                    name = Some(read_text_owned(&mut reader, &e)?);
                }
                b"Track" => {
                    saw_track = true;
                    parse_tcx_track(&mut reader, &mut track_points)?;
                }
                b"CoursePoint" => {
                    if let Some(pt) = parse_course_point(&mut reader)? {
                        way_points.push(pt);
                    }
                }
                b"Lap" => {
                    // Lap summaries are derived data; skip them on decode.
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok(GpsContainer {
        name,
        way_points,
        track: saw_track.then_some(Track::new(track_points)),
    })
}

/// Parse a `<Track>` element, appending its `Trackpoint`s.
fn parse_tcx_track<'a>(reader: &mut Reader<&'a [u8]>, points: &mut Vec<WayPoint>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Trackpoint" => {
                    if let Some(pt) = parse_trackpoint(reader)? {
                        points.push(pt);
                    }
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Track" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    Ok(())
}

/// Parse a `<Trackpoint>` element. Points without a position are skipped
/// (TCX allows position-less trackpoints for paused recordings).
fn parse_trackpoint(reader: &mut Reader<&[u8]>) -> Result<Option<WayPoint>> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut elevation: Option<f64> = None;
    let mut time: Option<DateTime<Utc>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Time" => time = parse_time(&read_text_owned(reader, &e)?),
                b"LatitudeDegrees" => {
                    lat = read_text_owned(reader, &e)?.trim().parse().ok();
                }
                b"LongitudeDegrees" => {
                    lon = read_text_owned(reader, &e)?.trim().parse().ok();
                }
                b"AltitudeMeters" => {
                    elevation = read_text_owned(reader, &e)?.trim().parse().ok();
                }
                b"Position" => {} // descend, coordinates are its children
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Trackpoint" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    let (Some(lat), Some(lon)) = (lat, lon) else {
        log::warn!("skipping TCX trackpoint without position");
        return Ok(None);
    };

    let mut pt = WayPoint::new(lat, lon);
    pt.elevation = elevation;
    pt.time = time;
    Ok(Some(pt))
}

/// Parse a `<CoursePoint>` element.
fn parse_course_point(reader: &mut Reader<&[u8]>) -> Result<Option<WayPoint>> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut time: Option<DateTime<Utc>> = None;
    let mut name: Option<String> = None;
    let mut poi_type: Option<PoiType> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Name" => name = Some(read_text_owned(reader, &e)?),
                b"Time" => time = parse_time(&read_text_owned(reader, &e)?),
                b"LatitudeDegrees" => {
                    lat = read_text_owned(reader, &e)?.trim().parse().ok();
                }
                b"LongitudeDegrees" => {
                    lon = read_text_owned(reader, &e)?.trim().parse().ok();
                }
                b"PointType" => {
                    poi_type = Some(PoiType::from_tcx_point_type(&read_text_owned(reader, &e)?));
                }
                b"Position" => {}
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|e| TrackError::malformed(FORMAT, e))?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"CoursePoint" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrackError::malformed(FORMAT, e)),
            _ => {}
        }
    }

    let (Some(lat), Some(lon)) = (lat, lon) else {
        log::warn!("skipping TCX course point without position");
        return Ok(None);
    };

    let mut pt = WayPoint::new(lat, lon);
    pt.time = time;
    pt.name = name;
    pt.poi_type = poi_type;
    Ok(Some(pt))
}

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

/// Encode a canonical container as a TCX course.
///
/// Fails with `MissingRequiredData` when the container has no track, the
/// track is empty, or any track point lacks a timestamp or elevation.
pub fn encode(container: &GpsContainer) -> Result<Vec<u8>> {
    let track = container
        .track
        .as_ref()
        .ok_or(TrackError::MissingRequiredData("TCX export requires a track"))?;
    if track.points.is_empty() {
        return Err(TrackError::MissingRequiredData(
            "TCX export requires a non-empty track",
        ));
    }

    let mut times = Vec::with_capacity(track.points.len());
    for pt in &track.points {
        let time = pt.time.ok_or(TrackError::MissingRequiredData(
            "TCX export requires a timestamp on every track point",
        ))?;
        if pt.elevation.is_none() {
            return Err(TrackError::MissingRequiredData(
                "TCX export requires an elevation on every track point",
            ));
        }
        times.push(time);
    }

    let first = &track.points[0];
    let last = &track.points[track.points.len() - 1];
    let total_seconds = (times[times.len() - 1] - times[0]).num_seconds();

    let mut writer = quick_xml::Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("TrainingCenterDatabase");
    root.push_attribute(("xmlns", TCX_NS));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("Courses")))?;
    writer.write_event(Event::Start(BytesStart::new("Course")))?;

    write_text_element(
        &mut writer,
        "Name",
        container.name.as_deref().unwrap_or("Course"),
    )?;

    writer.write_event(Event::Start(BytesStart::new("Lap")))?;
    write_text_element(&mut writer, "TotalTimeSeconds", &total_seconds.to_string())?;
    write_text_element(&mut writer, "DistanceMeters", &track.length_m().to_string())?;
    write_position(&mut writer, "BeginPosition", first)?;
    write_position(&mut writer, "EndPosition", last)?;
    write_text_element(&mut writer, "Intensity", "Active")?;
    writer.write_event(Event::End(BytesEnd::new("Lap")))?;

    writer.write_event(Event::Start(BytesStart::new("Track")))?;
    let mut cumulative = 0.0;
    for (i, pt) in track.points.iter().enumerate() {
        if i > 0 {
            cumulative += distance_m(&track.points[i - 1], pt);
        }
        writer.write_event(Event::Start(BytesStart::new("Trackpoint")))?;
        write_text_element(&mut writer, "Time", &format_time(times[i]))?;
        write_position(&mut writer, "Position", pt)?;
        if let Some(ele) = pt.elevation {
            write_text_element(&mut writer, "AltitudeMeters", &ele.to_string())?;
        }
        write_text_element(&mut writer, "DistanceMeters", &cumulative.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("Trackpoint")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Track")))?;

    for poi in &container.way_points {
        let time = poi.time.unwrap_or_else(|| nearest_track_time(poi, track, &times));
        writer.write_event(Event::Start(BytesStart::new("CoursePoint")))?;
        write_text_element(&mut writer, "Name", poi.name.as_deref().unwrap_or(""))?;
        write_text_element(&mut writer, "Time", &format_time(time))?;
        write_position(&mut writer, "Position", poi)?;
        write_text_element(
            &mut writer,
            "PointType",
            poi.poi_type.unwrap_or_default().tcx_point_type(),
        )?;
        writer.write_event(Event::End(BytesEnd::new("CoursePoint")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Course")))?;
    writer.write_event(Event::End(BytesEnd::new("Courses")))?;
    writer.write_event(Event::End(BytesEnd::new("TrainingCenterDatabase")))?;
    Ok(writer.into_inner())
}

/// Time of the track point nearest to `poi`; first minimum wins.
fn nearest_track_time(poi: &WayPoint, track: &Track, times: &[DateTime<Utc>]) -> DateTime<Utc> {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, pt) in track.points.iter().enumerate() {
        let d = distance_m(poi, pt);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    times[best]
}

fn write_position<W: Write>(
    writer: &mut quick_xml::Writer<W>,
    tag: &str,
    pt: &WayPoint,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    write_text_element(writer, "LatitudeDegrees", &pt.latitude.to_string())?;
    write_text_element(writer, "LongitudeDegrees", &pt.longitude.to_string())?;
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

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn course_container() -> GpsContainer {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let points: Vec<WayPoint> = (0..3)
            .map(|i| {
                let mut pt = WayPoint::new(47.0 + f64::from(i) * 0.01, 11.0);
                pt.elevation = Some(600.0 + f64::from(i) * 10.0);
                pt.time = Some(t0 + chrono::Duration::seconds(i64::from(i) * 60));
                pt
            })
            .collect();

        let mut poi = WayPoint::new(47.01, 11.0);
        poi.name = Some("Feed zone".to_string());
        poi.poi_type = Some(PoiType::Food);
        poi.time = Some(t0 + chrono::Duration::seconds(60));

        GpsContainer::new(
            Some("Alp loop".to_string()),
            vec![poi],
            Some(Track::new(points)),
        )
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let container = course_container();
        let bytes = encode(&container).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.name.as_deref(), Some("Alp loop"));
        let track = decoded.track.as_ref().unwrap();
        assert_eq!(track.points.len(), 3);
        assert_eq!(track.points[0].elevation, Some(600.0));
        assert_eq!(
            track.points[2].time,
            container.track.as_ref().unwrap().points[2].time
        );
        assert_eq!(decoded.way_points.len(), 1);
        assert_eq!(decoded.way_points[0].poi_type, Some(PoiType::Food));
        assert_eq!(decoded.way_points[0].name.as_deref(), Some("Feed zone"));
    }

    #[test]
    fn test_encode_lap_summary() {
        let bytes = encode(&course_container()).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("<TotalTimeSeconds>120</TotalTimeSeconds>"));
        assert!(xml.contains("<BeginPosition>"));
        assert!(xml.contains("<EndPosition>"));
        assert!(xml.contains("<Intensity>Active</Intensity>"));
    }

    #[test]
    fn test_encode_without_track_fails() {
        let container = GpsContainer::new(Some("x".into()), vec![], None);
        assert!(matches!(
            encode(&container),
            Err(TrackError::MissingRequiredData(_))
        ));
    }

    #[test]
    fn test_encode_without_time_fails() {
        let mut container = course_container();
        container.track.as_mut().unwrap().points[1].time = None;
        assert!(matches!(
            encode(&container),
            Err(TrackError::MissingRequiredData(_))
        ));
    }

    #[test]
    fn test_encode_without_elevation_fails() {
        let mut container = course_container();
        container.track.as_mut().unwrap().points[0].elevation = None;
        assert!(matches!(
            encode(&container),
            Err(TrackError::MissingRequiredData(_))
        ));
    }

    #[test]
    fn test_unknown_point_type_is_generic() {
        let xml = br#"<?xml version="1.0"?>
<TrainingCenterDatabase>
  <Courses><Course>
    <Name>c</Name>
    <Track>
      <Trackpoint>
        <Time>2025-06-01T08:00:00Z</Time>
        <Position><LatitudeDegrees>47.0</LatitudeDegrees><LongitudeDegrees>11.0</LongitudeDegrees></Position>
        <AltitudeMeters>600</AltitudeMeters>
      </Trackpoint>
    </Track>
    <CoursePoint>
      <Name>p</Name>
      <Time>2025-06-01T08:00:00Z</Time>
      <Position><LatitudeDegrees>47.0</LatitudeDegrees><LongitudeDegrees>11.0</LongitudeDegrees></Position>
      <PointType>Wormhole</PointType>
    </CoursePoint>
  </Course></Courses>
</TrainingCenterDatabase>"#;
        let container = decode(xml).unwrap();
        assert_eq!(container.way_points[0].poi_type, Some(PoiType::Generic));
    }

    #[test]
    fn test_trackpoint_without_position_skipped() {
        let xml = br#"<?xml version="1.0"?>
<TrainingCenterDatabase>
  <Courses><Course><Name>c</Name>
    <Track>
      <Trackpoint><Time>2025-06-01T08:00:00Z</Time></Trackpoint>
      <Trackpoint>
        <Time>2025-06-01T08:01:00Z</Time>
        <Position><LatitudeDegrees>47.0</LatitudeDegrees><LongitudeDegrees>11.0</LongitudeDegrees></Position>
      </Trackpoint>
    </Track>
  </Course></Courses>
</TrainingCenterDatabase>"#;
        let container = decode(xml).unwrap();
        assert_eq!(container.track.unwrap().points.len(), 1);
    }
}
