//! Command-line interface for skyvario.
//!
//! This module provides the CLI structure and command definitions for
//! the `skyvario` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, FlightsCommand, FlyCommand, ProfileArg};

/// skyvario - An audio variometer for free flight
///
/// Fuses barometric and inertial sensor data into a live vertical speed
/// estimate, beeps lift and drones sink, and records flight tracks for
/// GPX export.
#[derive(Debug, Parser)]
#[command(name = "skyvario")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fly a simulated flight with live vario audio
    Fly(FlyCommand),

    /// Browse and export recorded flights
    #[command(subcommand)]
    Flights(FlightsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "skyvario");
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        let base = |verbose, quiet| Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Config(ConfigCommand::Path),
        };

        assert_eq!(base(0, true).verbosity(), crate::logging::Verbosity::Quiet);
        assert_eq!(base(0, false).verbosity(), crate::logging::Verbosity::Normal);
        assert_eq!(
            base(1, false).verbosity(),
            crate::logging::Verbosity::Verbose
        );
        assert_eq!(base(3, false).verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_parse_fly() {
        let cli = Cli::try_parse_from(["skyvario", "fly", "--duration", "120"]).unwrap();
        let Command::Fly(fly) = cli.command else {
            panic!("expected fly command");
        };
        assert_eq!(fly.duration, Some(120));
        assert_eq!(fly.profile, ProfileArg::Thermal);
        assert!(!fly.mute);
    }

    #[test]
    fn test_parse_fly_sled_muted() {
        let cli = Cli::try_parse_from(["skyvario", "fly", "-p", "sled", "-m"]).unwrap();
        let Command::Fly(fly) = cli.command else {
            panic!("expected fly command");
        };
        assert_eq!(fly.profile, ProfileArg::Sled);
        assert!(fly.mute);
    }

    #[test]
    fn test_parse_flights_list() {
        let cli = Cli::try_parse_from(["skyvario", "flights", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Flights(FlightsCommand::List { limit: 20 })
        ));
    }

    #[test]
    fn test_parse_flights_export() {
        let cli =
            Cli::try_parse_from(["skyvario", "flights", "export", "7", "-o", "out.gpx"]).unwrap();
        let Command::Flights(FlightsCommand::Export { id, output }) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(id, 7);
        assert_eq!(output, Some(PathBuf::from("out.gpx")));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["skyvario", "-c", "/custom/config.toml", "config", "show"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
