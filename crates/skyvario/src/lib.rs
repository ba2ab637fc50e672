//! `skyvario` - An audio variometer for free flight
//!
//! This library fuses barometric, inertial, positioning, and magnetic
//! sensor readings into a live flight state estimate, renders vertical
//! speed as vario audio, and records flight tracks for GPX export.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod estimator;
pub mod flight_data;
pub mod gpx;
pub mod logging;
pub mod sample;
pub mod session;
pub mod sim;
pub mod source;
pub mod storage;
pub mod track;
pub mod units;

pub use config::Config;
pub use error::{Error, Result};
pub use estimator::Estimator;
pub use flight_data::FlightData;
pub use logging::init_logging;
pub use sample::{Sample, SampleSource, SensorKind};
pub use session::FlightSession;
pub use storage::FlightLog;
pub use track::{Flight, TrackPoint};
