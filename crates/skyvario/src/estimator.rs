//! The sensor fusion state estimator.
//!
//! A complementary filter blends barometric altitude (noisy
//! sample-to-sample, drift-free long term) with accelerometer-integrated
//! altitude change (smooth short term, drifts). The blend coefficient
//! `alpha` weights the inertial prediction; the barometric term
//! continuously re-anchors the estimate against drift.
//!
//! One `Estimator` instance owns all fusion state for exactly one
//! flight session. Integrators are reinitialized by constructing a new
//! instance at session start.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::flight_data::{FlightData, FlightDataTx};
use crate::sample::{BaroSample, InertialSample, MagneticSample, PositionSample};

/// Scale constant of the ISA barometric altitude formula, in meters.
pub const ISA_ALTITUDE_SCALE: f64 = 44330.0;

/// Pressure-ratio exponent of the ISA barometric altitude formula.
pub const ISA_PRESSURE_EXPONENT: f64 = 0.1903;

/// Altitude-ratio exponent used to invert the formula.
pub const ISA_INVERSE_EXPONENT: f64 = 5.255;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Barometric altitude for a pressure reading against a reference sea
/// level pressure, both in hPa.
///
/// The standard ISA formula with a fixed reference temperature model:
/// deliberately simple, no temperature compensation. Evaluates to 0
/// when `pressure == sea_level_pressure`.
#[must_use]
pub fn pressure_to_altitude(pressure: f64, sea_level_pressure: f64) -> f64 {
    ISA_ALTITUDE_SCALE * (1.0 - (pressure / sea_level_pressure).powf(ISA_PRESSURE_EXPONENT))
}

/// The sea level pressure that makes `pressure` map to `altitude_msl`.
///
/// Inverse of [`pressure_to_altitude`], used by MSL calibration.
#[must_use]
pub fn sea_level_pressure_for(pressure: f64, altitude_msl: f64) -> f64 {
    pressure * (1.0 - altitude_msl / ISA_ALTITUDE_SCALE).powf(-ISA_INVERSE_EXPONENT)
}

/// Calibration state for the altitude reference.
///
/// Mutated only by the explicit calibration operations; lives for the
/// duration of a flight session and may be re-zeroed at any time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationState {
    /// Reference sea level pressure in hPa.
    pub reference_sea_level_pressure: f64,
    /// Offset subtracted from the fused altitude to produce AGL.
    pub agl_zero_offset: f64,
}

impl CalibrationState {
    /// Calibration state with the given reference pressure and no AGL
    /// offset.
    #[must_use]
    pub fn new(reference_sea_level_pressure: f64) -> Self {
        Self {
            reference_sea_level_pressure,
            agl_zero_offset: 0.0,
        }
    }
}

/// The complementary filter estimator.
///
/// Owns the calibration state and every running integrator (fused
/// altitude, vertical speed, peak g) for one flight session, and is the
/// only writer of the published [`FlightData`] snapshot.
#[derive(Debug)]
pub struct Estimator {
    calibration: CalibrationState,
    alpha: f64,
    /// Fused altitude integrator, in the reference pressure frame.
    altitude: f64,
    /// Vertical speed integrator in m/s.
    vertical_speed: f64,
    /// Running peak load factor; starts at 1 g.
    max_g_force: f64,
    /// Timestamp of the last accepted baro/inertial pair.
    last_fusion: Option<DateTime<Utc>>,
    /// Most recent raw pressure reading, for MSL calibration.
    last_pressure: Option<f64>,
    /// Most recent GPS-reported MSL altitude.
    gps_altitude_msl: Option<f64>,
    publisher: FlightDataTx,
}

impl Estimator {
    /// Create an estimator for a new flight session.
    ///
    /// All integrator state starts fresh: altitude 0, vertical speed 0,
    /// peak g 1.0.
    #[must_use]
    pub fn new(filter: &FilterConfig, publisher: FlightDataTx) -> Self {
        Self {
            calibration: CalibrationState::new(filter.sea_level_pressure_hpa),
            alpha: filter.alpha,
            altitude: 0.0,
            vertical_speed: 0.0,
            max_g_force: 1.0,
            last_fusion: None,
            last_pressure: None,
            gps_altitude_msl: None,
            publisher,
        }
    }

    /// The current calibration state.
    #[must_use]
    pub fn calibration(&self) -> CalibrationState {
        self.calibration
    }

    /// Barometric altitude for a pressure reading under the current
    /// calibration.
    #[must_use]
    pub fn baro_altitude(&self, pressure_hpa: f64) -> f64 {
        pressure_to_altitude(pressure_hpa, self.calibration.reference_sea_level_pressure)
    }

    /// Process one paired barometric + inertial sample.
    ///
    /// Runs the complementary filter and publishes an updated snapshot.
    /// The first pair of a session only seeds the timestamp; a pair
    /// whose elapsed time against the previous accepted pair is <= 0
    /// (duplicate or out-of-order, seen when sensors restart) is
    /// dropped with no state change.
    pub fn ingest_baro_inertial(&mut self, baro: BaroSample, inertial: InertialSample) {
        let Some(prev_ts) = self.last_fusion else {
            self.last_fusion = Some(baro.timestamp);
            self.last_pressure = Some(baro.pressure_hpa);
            return;
        };

        let dt = (baro.timestamp - prev_ts).num_milliseconds() as f64 / 1000.0;
        if dt <= 0.0 {
            debug!(dt, "dropping stale baro/inertial pair");
            return;
        }
        self.last_fusion = Some(baro.timestamp);
        self.last_pressure = Some(baro.pressure_hpa);

        let baro_alt = self.baro_altitude(baro.pressure_hpa);

        // Second-order integration of vertical acceleration predicts
        // the altitude change since the last pair.
        let accel_alt_change = self.vertical_speed * dt + 0.5 * inertial.az * dt * dt;
        self.altitude =
            self.alpha * (self.altitude + accel_alt_change) + (1.0 - self.alpha) * baro_alt;

        let prev = self.publisher.latest();
        let altitude_agl = self.altitude - self.calibration.agl_zero_offset;

        // The rate is taken against the previously *published* AGL
        // value, not the filter's own previous altitude: the vertical
        // speed is tied to the AGL calibration frame.
        self.vertical_speed = (altitude_agl - prev.altitude_agl) / dt;

        let g_force = inertial.magnitude() / STANDARD_GRAVITY;
        if g_force > self.max_g_force {
            self.max_g_force = g_force;
        }

        self.publisher.publish(FlightData {
            altitude_agl,
            vertical_speed: self.vertical_speed,
            g_force,
            max_g_force: self.max_g_force,
            glide_ratio: FlightData::glide_ratio(prev.ground_speed, self.vertical_speed),
            ..prev
        });
    }

    /// Process a positioning fix.
    ///
    /// Position fields overwrite the snapshot directly, no fusion. The
    /// GPS altitude is kept as a display fallback and as the input
    /// guard for MSL calibration; it never feeds the filter.
    pub fn ingest_position(&mut self, sample: PositionSample) {
        if let Some(msl) = sample.altitude_msl {
            self.gps_altitude_msl = Some(msl);
        }

        let prev = self.publisher.latest();
        let ground_speed = sample.ground_speed.unwrap_or(0.0);
        self.publisher.publish(FlightData {
            lat: Some(sample.lat),
            lon: Some(sample.lon),
            ground_speed,
            altitude_msl: sample.altitude_msl.unwrap_or(prev.altitude_msl),
            glide_ratio: FlightData::glide_ratio(ground_speed, prev.vertical_speed),
            ..prev
        });
    }

    /// Process a magnetic field reading into a compass heading.
    pub fn ingest_magnetic(&mut self, sample: MagneticSample) {
        let mut heading = sample.y.atan2(sample.x).to_degrees();
        if heading < 0.0 {
            heading += 360.0;
        }
        // atan2 yields at most 180 exactly; anything at 360 wraps to 0.
        if heading >= 360.0 {
            heading -= 360.0;
        }

        let prev = self.publisher.latest();
        self.publisher.publish(FlightData {
            heading: Some(heading),
            ..prev
        });
    }

    /// Clear the published heading.
    ///
    /// Called when the magnetometer explicitly fails: a dead source
    /// must show "no heading" rather than stale data. Sample gaps
    /// alone do not clear it.
    pub fn clear_heading(&mut self) {
        let prev = self.publisher.latest();
        self.publisher.publish(FlightData {
            heading: None,
            ..prev
        });
    }

    /// Calibrate the AGL zero so the next altitude reading reports
    /// `value` (normally 0).
    ///
    /// Immediately republishes the snapshot with the new AGL; MSL and
    /// the underlying pressure model are untouched.
    pub fn calibrate_agl(&mut self, value: f64) {
        self.calibration.agl_zero_offset = self.altitude - value;

        let prev = self.publisher.latest();
        self.publisher.publish(FlightData {
            altitude_agl: value,
            ..prev
        });
    }

    /// Calibrate the pressure model against a known MSL altitude.
    ///
    /// Recomputes the reference sea level pressure so the current
    /// pressure reading maps to `known_msl`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CalibrationUnavailable`] when no GPS altitude
    /// (or no pressure reading) has arrived yet; the calibration is a
    /// no-op in that case.
    pub fn calibrate_msl(&mut self, known_msl: f64) -> Result<()> {
        if self.gps_altitude_msl.is_none() {
            return Err(Error::CalibrationUnavailable);
        }
        let Some(pressure) = self.last_pressure else {
            return Err(Error::CalibrationUnavailable);
        };

        self.calibration.reference_sea_level_pressure =
            sea_level_pressure_for(pressure, known_msl);

        let prev = self.publisher.latest();
        self.publisher.publish(FlightData {
            altitude_msl: known_msl,
            ..prev
        });
        Ok(())
    }
}
