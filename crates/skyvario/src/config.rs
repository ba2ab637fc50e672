//! Configuration management for skyvario.
//!
//! This module provides configuration loading and validation using
//! figment, supporting TOML config files, environment variables, and
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "skyvario";

/// Default flight log database file name.
const DATABASE_FILE_NAME: &str = "flights.db";

/// Standard sea level pressure in hPa (ISA).
pub const STANDARD_SEA_LEVEL_PRESSURE: f64 = 1013.25;

/// Unit system for display conversions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    /// Meters, m/s, km/h.
    #[default]
    Metric,
    /// Feet, fpm, mph.
    Imperial,
}

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SKYVARIO_`)
/// 2. TOML config file at `~/.config/skyvario/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audio feedback configuration.
    pub audio: AudioConfig,
    /// Sensor fusion filter configuration.
    pub filter: FilterConfig,
    /// Flight log configuration.
    pub log: LogConfig,
    /// Display unit system.
    pub units: UnitSystem,
}

/// Audio feedback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Vertical speed above which the lift beeper engages, in m/s.
    pub lift_threshold: f64,
    /// Vertical speed below which the sink tone engages, in m/s.
    pub sink_threshold: f64,
    /// Beep frequency at the lift threshold, in Hz.
    pub base_frequency: f64,
    /// Beep frequency at maximum lift (5 m/s and above), in Hz.
    pub max_frequency: f64,
    /// Continuous sink tone frequency, in Hz.
    pub sink_frequency: f64,
    /// Audio engine re-evaluation interval in milliseconds.
    pub tick_ms: u64,
    /// Start muted.
    pub muted: bool,
}

/// Sensor fusion filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Complementary filter blend coefficient. High values favor the
    /// accelerometer-integrated term.
    pub alpha: f64,
    /// Reference sea level pressure in hPa, used until the pilot
    /// calibrates against a known MSL altitude.
    pub sea_level_pressure_hpa: f64,
}

/// Flight log configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Path to the flight log database.
    /// Defaults to `~/.local/share/skyvario/flights.db`
    pub database_path: Option<PathBuf>,
    /// Interval between recorded track points in milliseconds.
    pub track_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            lift_threshold: 0.2,
            sink_threshold: -2.0,
            base_frequency: 440.0,
            max_frequency: 1200.0,
            sink_frequency: 220.0,
            tick_ms: 50,
            muted: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: 0.98,
            sea_level_pressure_hpa: STANDARD_SEA_LEVEL_PRESSURE,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            track_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SKYVARIO_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.audio.lift_threshold <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "lift_threshold must be positive, got {}",
                    self.audio.lift_threshold
                ),
            });
        }

        if self.audio.sink_threshold >= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "sink_threshold must be negative, got {}",
                    self.audio.sink_threshold
                ),
            });
        }

        if self.audio.base_frequency <= 0.0 || self.audio.max_frequency <= self.audio.base_frequency
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "frequencies must satisfy 0 < base ({}) < max ({})",
                    self.audio.base_frequency, self.audio.max_frequency
                ),
            });
        }

        if self.audio.tick_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "tick_ms must be greater than 0".to_string(),
            });
        }

        if !(self.filter.alpha > 0.0 && self.filter.alpha < 1.0) {
            return Err(Error::ConfigValidation {
                message: format!("filter alpha must be in (0, 1), got {}", self.filter.alpha),
            });
        }

        if self.filter.sea_level_pressure_hpa <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "sea_level_pressure_hpa must be positive, got {}",
                    self.filter.sea_level_pressure_hpa
                ),
            });
        }

        if self.log.track_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "track_interval_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the flight log database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.log
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the audio engine tick interval as a Duration.
    #[must_use]
    pub fn audio_tick(&self) -> Duration {
        Duration::from_millis(self.audio.tick_ms)
    }

    /// Get the track recording interval as a Duration.
    #[must_use]
    pub fn track_interval(&self) -> Duration {
        Duration::from_millis(self.log.track_interval_ms)
    }
}
