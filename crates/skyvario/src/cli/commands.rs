//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Fly command arguments.
#[derive(Debug, Args)]
pub struct FlyCommand {
    /// Flight duration in seconds; runs until Ctrl-C when omitted
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Simulated flight profile to fly
    #[arg(short, long, value_enum, default_value = "thermal")]
    pub profile: ProfileArg,

    /// Start with audio muted
    #[arg(short, long)]
    pub mute: bool,

    /// Don't save the flight to the log
    #[arg(long)]
    pub no_save: bool,
}

/// Flight log commands.
#[derive(Debug, Subcommand)]
pub enum FlightsCommand {
    /// List recorded flights
    List {
        /// Maximum number of flights to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one flight in detail
    Show {
        /// The flight id
        id: i64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Export a flight as GPX
    Export {
        /// The flight id
        id: i64,

        /// Output file; defaults to a name derived from the flight date
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a flight from the log
    Delete {
        /// The flight id
        id: i64,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Simulated flight profile argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfileArg {
    /// Thermal soaring cycle: climb, glide, sink, repeat
    #[default]
    Thermal,
    /// Steady sled ride down
    Sled,
}

impl ProfileArg {
    /// Build the flight profile this argument names.
    #[must_use]
    pub fn profile(self) -> skyvario_sim::FlightProfile {
        match self {
            Self::Thermal => skyvario_sim::FlightProfile::thermal_cycle(),
            Self::Sled => skyvario_sim::FlightProfile::sled_ride(),
        }
    }
}
