//! Deterministic flight profiles for skyvario.
//!
//! This crate generates the physical state of a simulated flight as a
//! pure function of elapsed time: altitude, vertical speed, pressure,
//! position, heading. It knows nothing about sensors or channels; the
//! main crate wraps a profile in simulated sensor sources.
//!
//! Profiles are deterministic so the same elapsed time always yields
//! the same state, which makes simulated runs reproducible.

use tracing::debug;

/// Standard sea level pressure in hPa.
const SEA_LEVEL_PRESSURE_HPA: f64 = 1013.25;

/// Scale constant of the barometric altitude formula, in meters.
const ALTITUDE_SCALE: f64 = 44330.0;

/// Altitude-ratio exponent of the barometric formula.
const PRESSURE_EXPONENT: f64 = 5.255;

/// Standard gravity in m/s².
const STANDARD_GRAVITY: f64 = 9.81;

/// The physical state of the simulated aircraft at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileState {
    /// Altitude above mean sea level in meters.
    pub altitude_msl: f64,
    /// Vertical speed in m/s (positive = climbing).
    pub vertical_speed: f64,
    /// Vertical acceleration in m/s², gravity included as a sensor
    /// would read it.
    pub az: f64,
    /// Station pressure in hPa at the current altitude.
    pub pressure_hpa: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Ground speed in m/s.
    pub ground_speed: f64,
    /// Heading in degrees, [0, 360).
    pub heading: f64,
}

/// One phase of a flight profile: a constant vertical speed held for a
/// duration.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Phase {
    /// How long this phase lasts, in seconds.
    duration: f64,
    /// Vertical speed during the phase, in m/s.
    vertical_speed: f64,
    /// Ground speed during the phase, in m/s.
    ground_speed: f64,
}

/// A deterministic flight profile.
///
/// The profile is a repeating cycle of constant-rate phases starting
/// from a launch altitude. Altitude is the running integral of the
/// phase rates; pressure follows the standard atmosphere.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightProfile {
    launch_altitude_msl: f64,
    launch_lat: f64,
    launch_lon: f64,
    phases: Vec<Phase>,
    cycle_duration: f64,
    /// Net altitude change over one full cycle.
    cycle_climb: f64,
}

impl FlightProfile {
    /// A thermal soaring cycle: climb in lift, glide between thermals,
    /// fall through sink, recover.
    ///
    /// Launches at 1200 m MSL near Interlaken. The cycle nets out to
    /// zero altitude change so long simulations stay in a realistic
    /// band.
    #[must_use]
    pub fn thermal_cycle() -> Self {
        Self::new(
            1200.0,
            46.62,
            7.86,
            vec![
                // Strong thermal.
                Phase {
                    duration: 30.0,
                    vertical_speed: 2.5,
                    ground_speed: 4.0,
                },
                // Glide to the next thermal.
                Phase {
                    duration: 40.0,
                    vertical_speed: -1.2,
                    ground_speed: 11.0,
                },
                // Weak lift.
                Phase {
                    duration: 25.0,
                    vertical_speed: 0.6,
                    ground_speed: 5.0,
                },
                // Sink line.
                Phase {
                    duration: 14.0,
                    vertical_speed: -3.0,
                    ground_speed: 12.0,
                },
            ],
        )
    }

    /// A calm sled ride: steady gentle descent, no lift.
    #[must_use]
    pub fn sled_ride() -> Self {
        Self::new(
            800.0,
            46.62,
            7.86,
            vec![Phase {
                duration: 60.0,
                vertical_speed: -1.0,
                ground_speed: 9.0,
            }],
        )
    }

    fn new(launch_altitude_msl: f64, launch_lat: f64, launch_lon: f64, phases: Vec<Phase>) -> Self {
        let cycle_duration: f64 = phases.iter().map(|p| p.duration).sum();
        let cycle_climb: f64 = phases.iter().map(|p| p.duration * p.vertical_speed).sum();
        debug!(cycle_duration, cycle_climb, "flight profile built");
        Self {
            launch_altitude_msl,
            launch_lat,
            launch_lon,
            phases,
            cycle_duration,
            cycle_climb,
        }
    }

    /// The launch altitude in meters MSL.
    #[must_use]
    pub fn launch_altitude_msl(&self) -> f64 {
        self.launch_altitude_msl
    }

    /// The state of the simulated flight at `elapsed` seconds.
    #[must_use]
    pub fn sample(&self, elapsed: f64) -> ProfileState {
        let elapsed = elapsed.max(0.0);
        let cycles = (elapsed / self.cycle_duration).floor();
        let mut remaining = elapsed - cycles * self.cycle_duration;
        let mut altitude = self.launch_altitude_msl + cycles * self.cycle_climb;

        let mut current = self.phases[self.phases.len() - 1];
        for phase in &self.phases {
            if remaining < phase.duration {
                altitude += remaining * phase.vertical_speed;
                current = *phase;
                break;
            }
            remaining -= phase.duration;
            altitude += phase.duration * phase.vertical_speed;
        }

        // Drift along a fixed course; ~1e-5 degrees per meter keeps the
        // track visibly moving at paraglider speeds.
        let distance = elapsed * current.ground_speed;
        let heading = 135.0;
        ProfileState {
            altitude_msl: altitude,
            vertical_speed: current.vertical_speed,
            // Constant-rate phases have no net vertical acceleration;
            // the accelerometer reads gravity.
            az: STANDARD_GRAVITY,
            pressure_hpa: pressure_at(altitude),
            lat: self.launch_lat - distance * 0.7e-5,
            lon: self.launch_lon + distance * 0.7e-5,
            ground_speed: current.ground_speed,
            heading,
        }
    }
}

/// Standard-atmosphere pressure at an MSL altitude, in hPa.
#[must_use]
pub fn pressure_at(altitude_msl: f64) -> f64 {
    SEA_LEVEL_PRESSURE_HPA * (1.0 - altitude_msl / ALTITUDE_SCALE).powf(PRESSURE_EXPONENT)
}
