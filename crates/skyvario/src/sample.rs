//! Raw sensor sample types for skyvario.
//!
//! This module defines the fundamental data structures for readings
//! delivered by the injected sensor capabilities, and the capability
//! trait every sensor source implements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of sensor that produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Barometric pressure sensor.
    Barometer,
    /// Three-axis accelerometer.
    Accelerometer,
    /// Satellite positioning receiver.
    Gps,
    /// Magnetic field sensor (compass).
    Magnetometer,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Barometer => write!(f, "barometer"),
            Self::Accelerometer => write!(f, "accelerometer"),
            Self::Gps => write!(f, "gps"),
            Self::Magnetometer => write!(f, "magnetometer"),
        }
    }
}

/// A barometric pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaroSample {
    /// Station pressure in hectopascals.
    pub pressure_hpa: f64,
    /// When this reading was taken.
    pub timestamp: DateTime<Utc>,
}

/// A three-axis accelerometer reading, in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InertialSample {
    /// Acceleration along the x axis.
    pub ax: f64,
    /// Acceleration along the y axis.
    pub ay: f64,
    /// Acceleration along the z (vertical) axis.
    pub az: f64,
    /// When this reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl InertialSample {
    /// Magnitude of the acceleration vector in m/s².
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }
}

/// A positioning fix.
///
/// Altitude and ground speed are optional: not every receiver reports
/// them on every fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude above mean sea level in meters, if reported.
    pub altitude_msl: Option<f64>,
    /// Ground speed in m/s, if reported.
    pub ground_speed: Option<f64>,
    /// When this fix was taken.
    pub timestamp: DateTime<Utc>,
}

/// A magnetic field reading in the horizontal plane.
///
/// Units are arbitrary but must be consistent between axes; only the
/// ratio matters for heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticSample {
    /// Field strength along the x axis.
    pub x: f64,
    /// Field strength along the y axis.
    pub y: f64,
    /// When this reading was taken.
    pub timestamp: DateTime<Utc>,
}

/// One sample from any sensor source.
///
/// Samples arrive asynchronously and at independent, device-dependent
/// rates; no source is guaranteed to deliver at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sample {
    /// A barometric pressure reading.
    Baro(BaroSample),
    /// An accelerometer reading.
    Inertial(InertialSample),
    /// A positioning fix.
    Position(PositionSample),
    /// A magnetic field reading.
    Magnetic(MagneticSample),
}

impl Sample {
    /// The kind of sensor this sample came from.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::Baro(_) => SensorKind::Barometer,
            Self::Inertial(_) => SensorKind::Accelerometer,
            Self::Position(_) => SensorKind::Gps,
            Self::Magnetic(_) => SensorKind::Magnetometer,
        }
    }

    /// When this sample was taken.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Baro(s) => s.timestamp,
            Self::Inertial(s) => s.timestamp,
            Self::Position(s) => s.timestamp,
            Self::Magnetic(s) => s.timestamp,
        }
    }
}

/// One notification from a running sensor source.
///
/// Sources deliver readings until they stop or fail; a failure is an
/// explicit event so consumers can distinguish a revoked sensor from a
/// mere gap between readings.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A fresh reading.
    Reading(Sample),
    /// The source failed mid-session and will deliver nothing more.
    Failed {
        /// The source that failed.
        kind: SensorKind,
        /// Description of the failure.
        message: String,
    },
}

/// Trait for injected sensor sources.
///
/// Implementors wrap a platform sensor driver (or a simulation) and
/// deliver typed samples through a channel. Every source must be
/// treated as optionally absent or revocable at any time.
#[async_trait::async_trait]
pub trait SampleSource: Send + Sync {
    /// The name of this source (for logging/debugging).
    fn name(&self) -> &'static str;

    /// The kind of samples this source produces.
    fn kind(&self) -> SensorKind;

    /// Start the source.
    ///
    /// Begins delivering readings through the provided channel until
    /// [`SampleSource::stop`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to start, such as when the
    /// user denied access or the hardware is absent.
    async fn start(
        &mut self,
        sender: tokio::sync::mpsc::Sender<SourceEvent>,
    ) -> Result<(), crate::source::SourceError>;

    /// Stop the source.
    ///
    /// Must be synchronous and final: the source initiates no further
    /// readings once this returns. Readings already queued in the
    /// channel may still be drained by the consumer.
    fn stop(&mut self);

    /// Check if the source is currently running.
    fn is_running(&self) -> bool;
}
