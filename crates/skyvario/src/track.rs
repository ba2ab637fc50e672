//! Flight track recording.
//!
//! The track recorder samples the published snapshot on its own timer,
//! independent of the estimator's cadence, and accumulates a
//! time-ordered sequence of track points for later export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flight_data::FlightDataRx;
use crate::source::StopSignal;

/// One recorded point of a flight track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude above mean sea level in meters.
    pub altitude_msl: f64,
    /// When this point was recorded.
    pub time: DateTime<Utc>,
    /// Fused vertical speed at this point, in m/s.
    pub vertical_speed: f64,
}

/// A completed flight: its time bounds and recorded track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Storage-assigned identifier, if persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Session start time.
    pub start_time: DateTime<Utc>,
    /// Session end time.
    pub end_time: DateTime<Utc>,
    /// Time-ordered track points.
    pub track: Vec<TrackPoint>,
}

impl Flight {
    /// Create an unpersisted flight.
    #[must_use]
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, track: Vec<TrackPoint>) -> Self {
        Self {
            id: None,
            start_time,
            end_time,
            track,
        }
    }

    /// Flight duration.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Strongest recorded climb in m/s, if any point was recorded.
    #[must_use]
    pub fn max_climb(&self) -> Option<f64> {
        self.track
            .iter()
            .map(|p| p.vertical_speed)
            .fold(None, |best, v| match best {
                Some(b) if b >= v => Some(b),
                _ => Some(v),
            })
    }

    /// Highest recorded MSL altitude, if any point was recorded.
    #[must_use]
    pub fn max_altitude(&self) -> Option<f64> {
        self.track
            .iter()
            .map(|p| p.altitude_msl)
            .fold(None, |best, a| match best {
                Some(b) if b >= a => Some(b),
                _ => Some(a),
            })
    }
}

/// Records track points from the published snapshot on a fixed
/// interval.
///
/// Points are only recorded while a GPS fix exists; without one there
/// is nothing worth exporting.
#[derive(Debug)]
pub struct TrackRecorder {
    data: FlightDataRx,
    interval: std::time::Duration,
}

impl TrackRecorder {
    /// Create a recorder reading from the given snapshot channel.
    #[must_use]
    pub fn new(data: FlightDataRx, interval: std::time::Duration) -> Self {
        Self { data, interval }
    }

    /// Take one sample of the current snapshot, if it has a fix.
    #[must_use]
    pub fn sample(&self, now: DateTime<Utc>) -> Option<TrackPoint> {
        let data = self.data.latest();
        let (lat, lon) = (data.lat?, data.lon?);
        Some(TrackPoint {
            lat,
            lon,
            altitude_msl: data.altitude_msl,
            time: now,
            vertical_speed: data.vertical_speed,
        })
    }

    /// Run until `stop` is signaled, returning the recorded track.
    pub async fn run(self, stop: StopSignal) -> Vec<TrackPoint> {
        let mut track = Vec::new();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if stop.should_stop() {
                break;
            }
            if let Some(point) = self.sample(Utc::now()) {
                track.push(point);
            }
        }

        debug!(points = track.len(), "track recording stopped");
        track
    }
}
