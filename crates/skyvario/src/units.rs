//! Unit conversions for display.
//!
//! All internal values are SI (meters, m/s). Conversion happens only at
//! the display edge, keyed on the configured [`UnitSystem`].

use crate::config::UnitSystem;

/// Meters to feet.
pub const METERS_TO_FEET: f64 = 3.28084;
/// Meters per second to kilometers per hour.
pub const MS_TO_KPH: f64 = 3.6;
/// Meters per second to miles per hour.
pub const MS_TO_MPH: f64 = 2.23694;
/// Meters per second to feet per minute.
pub const MS_TO_FPM: f64 = 196.85;

/// Convert an altitude in meters to the display unit.
#[must_use]
pub fn display_altitude(meters: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => meters,
        UnitSystem::Imperial => meters * METERS_TO_FEET,
    }
}

/// Unit label for altitudes.
#[must_use]
pub fn altitude_unit(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Metric => "m",
        UnitSystem::Imperial => "ft",
    }
}

/// Convert a vertical speed in m/s to the display unit.
///
/// Metric shows m/s directly; imperial shows feet per minute.
#[must_use]
pub fn display_vertical_speed(ms: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => ms,
        UnitSystem::Imperial => ms * MS_TO_FPM,
    }
}

/// Unit label for vertical speeds.
#[must_use]
pub fn vertical_speed_unit(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Metric => "m/s",
        UnitSystem::Imperial => "fpm",
    }
}

/// Convert a ground speed in m/s to the display unit.
#[must_use]
pub fn display_ground_speed(ms: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => ms * MS_TO_KPH,
        UnitSystem::Imperial => ms * MS_TO_MPH,
    }
}

/// Unit label for ground speeds.
#[must_use]
pub fn ground_speed_unit(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Metric => "km/h",
        UnitSystem::Imperial => "mph",
    }
}
