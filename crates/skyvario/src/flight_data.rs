//! The published flight data snapshot.
//!
//! `FlightData` is the single record every consumer reads: the audio
//! engine, the display layer, and the track recorder. It is published
//! whole through a watch channel so readers always see a
//! self-consistent snapshot, never a half-updated one.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Ground speed below which glide ratio is undefined, in m/s.
pub const GLIDE_MIN_GROUND_SPEED: f64 = 1.0;

/// Vertical speed above which glide ratio is undefined, in m/s.
pub const GLIDE_MAX_VERTICAL_SPEED: f64 = -0.2;

/// One self-consistent snapshot of the fused flight state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightData {
    /// Fused vertical speed in m/s (positive = climbing).
    pub vertical_speed: f64,
    /// Altitude above ground level in meters (calibratable zero).
    pub altitude_agl: f64,
    /// Altitude above mean sea level in meters.
    pub altitude_msl: f64,
    /// Ground speed in m/s.
    pub ground_speed: f64,
    /// Glide ratio; 0 means undefined.
    pub glide_ratio: f64,
    /// Compass heading in degrees, [0, 360), if a magnetometer reading
    /// is available.
    pub heading: Option<f64>,
    /// Instantaneous load factor in multiples of 9.81 m/s².
    pub g_force: f64,
    /// Peak load factor this session; never decreases within a session.
    pub max_g_force: f64,
    /// Latitude in degrees, if a GPS fix is available.
    pub lat: Option<f64>,
    /// Longitude in degrees, if a GPS fix is available.
    pub lon: Option<f64>,
}

impl Default for FlightData {
    /// The session-start snapshot: everything at zero, 1 g at rest.
    fn default() -> Self {
        Self {
            vertical_speed: 0.0,
            altitude_agl: 0.0,
            altitude_msl: 0.0,
            ground_speed: 0.0,
            glide_ratio: 0.0,
            heading: None,
            g_force: 1.0,
            max_g_force: 1.0,
            lat: None,
            lon: None,
        }
    }
}

impl FlightData {
    /// Glide ratio for the given speeds.
    ///
    /// Defined only while actually gliding: moving faster than 1 m/s
    /// over ground and descending faster than 0.2 m/s. Anything else
    /// (climbing, parked, thermalling drift) reports 0, meaning
    /// undefined.
    #[must_use]
    pub fn glide_ratio(ground_speed: f64, vertical_speed: f64) -> f64 {
        if ground_speed > GLIDE_MIN_GROUND_SPEED && vertical_speed < GLIDE_MAX_VERTICAL_SPEED {
            (ground_speed / vertical_speed).abs()
        } else {
            0.0
        }
    }

    /// Check if this snapshot has a position fix.
    #[must_use]
    pub fn has_fix(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// Create a flight data channel: one writer, many readers.
///
/// The estimator owns the [`FlightDataTx`]; the audio engine, track
/// recorder, and display layer each hold a [`FlightDataRx`] and sample
/// it on their own cadence.
#[must_use]
pub fn channel() -> (FlightDataTx, FlightDataRx) {
    let (tx, rx) = watch::channel(FlightData::default());
    (FlightDataTx { tx }, FlightDataRx { rx })
}

/// The writing side of the flight data channel.
#[derive(Debug)]
pub struct FlightDataTx {
    tx: watch::Sender<FlightData>,
}

impl FlightDataTx {
    /// Publish a new snapshot atomically.
    pub fn publish(&self, data: FlightData) {
        // send() only fails when every reader is gone, which is fine:
        // the session may outlive its consumers briefly during stop.
        let _ = self.tx.send(data);
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn latest(&self) -> FlightData {
        *self.tx.borrow()
    }

    /// Create an additional reader.
    #[must_use]
    pub fn subscribe(&self) -> FlightDataRx {
        FlightDataRx {
            rx: self.tx.subscribe(),
        }
    }
}

/// The reading side of the flight data channel.
///
/// Reads never block and tolerate staleness: if the estimator has not
/// published since the last read, the same snapshot is returned again.
#[derive(Debug, Clone)]
pub struct FlightDataRx {
    rx: watch::Receiver<FlightData>,
}

impl FlightDataRx {
    /// The latest published snapshot.
    #[must_use]
    pub fn latest(&self) -> FlightData {
        *self.rx.borrow()
    }
}
