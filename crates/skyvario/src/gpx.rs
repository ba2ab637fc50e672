//! GPX export of recorded flights.
//!
//! Emits a GPX 1.1 document with a single track and track segment, one
//! point per recorded sample. The layout is fixed: third-party mapping
//! tools consume these files, so elevation is always two decimals and
//! timestamps are ISO-8601 UTC with milliseconds.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::track::Flight;

/// Creator attribute stamped into exported documents.
const CREATOR: &str = "skyvario";

/// Format a timestamp as ISO-8601 UTC with milliseconds.
fn iso_millis(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a flight as a GPX 1.1 document.
#[must_use]
pub fn to_gpx(flight: &Flight) -> String {
    let track_points: String = flight
        .track
        .iter()
        .map(|p| {
            format!(
                "\n    <trkpt lat=\"{}\" lon=\"{}\">\n      <ele>{:.2}</ele>\n      <time>{}</time>\n    </trkpt>",
                p.lat,
                p.lon,
                p.altitude_msl,
                iso_millis(p.time)
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="{CREATOR}"
  xmlns="http://www.topografix.com/GPX/1/1"
  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
  xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd">
  <metadata>
    <name>{CREATOR} Flight on {date}</name>
    <time>{start}</time>
  </metadata>
  <trk>
    <name>Flight Track</name>
    <trkseg>{track_points}
    </trkseg>
  </trk>
</gpx>"#,
        date = flight.start_time.format("%Y-%m-%d"),
        start = iso_millis(flight.start_time),
    )
}

/// Default export file name for a flight, derived from its start date.
#[must_use]
pub fn default_file_name(flight: &Flight) -> String {
    format!("{CREATOR}_Flight_{}.gpx", flight.start_time.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackPoint;
    use chrono::TimeZone;

    fn sample_flight() -> Flight {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        let track = vec![
            TrackPoint {
                lat: 46.5,
                lon: 7.9,
                altitude_msl: 1523.456,
                time: start,
                vertical_speed: 1.2,
            },
            TrackPoint {
                lat: 46.501,
                lon: 7.901,
                altitude_msl: 1525.0,
                time: start + chrono::Duration::seconds(1),
                vertical_speed: 1.5,
            },
        ];
        Flight::new(start, start + chrono::Duration::seconds(1), track)
    }

    #[test]
    fn test_document_structure() {
        let gpx = to_gpx(&sample_flight());

        assert!(gpx.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(gpx.contains("<gpx version=\"1.1\" creator=\"skyvario\""));
        assert!(gpx.contains("xmlns=\"http://www.topografix.com/GPX/1/1\""));
        assert!(gpx.ends_with("</gpx>"));

        // Exactly one track and one segment.
        assert_eq!(gpx.matches("<trk>").count(), 1);
        assert_eq!(gpx.matches("<trkseg>").count(), 1);
        assert_eq!(gpx.matches("<trkpt ").count(), 2);
    }

    #[test]
    fn test_point_formatting() {
        let gpx = to_gpx(&sample_flight());

        // Elevation rounded to two decimals.
        assert!(gpx.contains("<ele>1523.46</ele>"));
        assert!(gpx.contains("<ele>1525.00</ele>"));
        assert!(gpx.contains("<trkpt lat=\"46.5\" lon=\"7.9\">"));
        // ISO-8601 with milliseconds and Z suffix.
        assert!(gpx.contains("<time>2024-06-15T10:30:00.000Z</time>"));
        assert!(gpx.contains("<time>2024-06-15T10:30:01.000Z</time>"));
    }

    #[test]
    fn test_metadata() {
        let gpx = to_gpx(&sample_flight());
        assert!(gpx.contains("<name>skyvario Flight on 2024-06-15</name>"));
        assert!(gpx.contains("<name>Flight Track</name>"));
    }

    #[test]
    fn test_exact_layout() {
        // The whole document for a single-point flight, byte for byte.
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        let flight = Flight::new(
            start,
            start,
            vec![TrackPoint {
                lat: 46.5,
                lon: 7.9,
                altitude_msl: 1500.0,
                time: start,
                vertical_speed: 0.0,
            }],
        );

        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<gpx version=\"1.1\" creator=\"skyvario\"\n\
\x20 xmlns=\"http://www.topografix.com/GPX/1/1\"\n\
\x20 xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n\
\x20 xsi:schemaLocation=\"http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd\">\n\
\x20 <metadata>\n\
\x20   <name>skyvario Flight on 2024-06-15</name>\n\
\x20   <time>2024-06-15T10:30:00.000Z</time>\n\
\x20 </metadata>\n\
\x20 <trk>\n\
\x20   <name>Flight Track</name>\n\
\x20   <trkseg>\n\
\x20   <trkpt lat=\"46.5\" lon=\"7.9\">\n\
\x20     <ele>1500.00</ele>\n\
\x20     <time>2024-06-15T10:30:00.000Z</time>\n\
\x20   </trkpt>\n\
\x20   </trkseg>\n\
\x20 </trk>\n\
</gpx>";
        assert_eq!(to_gpx(&flight), expected);
    }

    #[test]
    fn test_empty_track() {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        let flight = Flight::new(start, start, Vec::new());
        let gpx = to_gpx(&flight);

        assert!(gpx.contains("<trkseg>\n    </trkseg>"));
        assert_eq!(gpx.matches("<trkpt ").count(), 0);
    }

    #[test]
    fn test_default_file_name() {
        let flight = sample_flight();
        assert_eq!(default_file_name(&flight), "skyvario_Flight_2024-06-15.gpx");
    }
}
