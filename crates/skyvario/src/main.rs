//! `skyvario` - audio variometer CLI
//!
//! This binary flies simulated flights with live vario audio, and
//! manages the recorded flight log.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::time::Duration;

use clap::Parser;

use skyvario::audio::VarioAudio;
use skyvario::cli::{Cli, Command, ConfigCommand, FlightsCommand, FlyCommand};
use skyvario::config::UnitSystem;
use skyvario::error::Error;
use skyvario::flight_data::FlightData;
use skyvario::session::FlightSession;
use skyvario::sim::{simulated_sources, LogTone};
use skyvario::source::StopSignal;
use skyvario::storage::FlightLog;
use skyvario::track::{Flight, TrackRecorder};
use skyvario::{gpx, units};
use skyvario::{init_logging, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Fly(fly_cmd) => handle_fly(&config, fly_cmd).await,
        Command::Flights(flights_cmd) => handle_flights(&config, flights_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_fly(config: &Config, cmd: FlyCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut audio_config = config.audio.clone();
    if cmd.mute {
        audio_config.muted = true;
    }

    let sources = simulated_sources(cmd.profile.profile());
    let mut session = FlightSession::new(&config.filter, sources);
    let data = session.data();
    session.start().await?;

    let mut vario = VarioAudio::new(LogTone::default(), data.clone(), audio_config);
    vario.resume()?;

    let stop = StopSignal::new();
    let audio_task = tokio::spawn(vario.run(config.audio_tick(), stop.clone()));
    let recorder = TrackRecorder::new(data.clone(), config.track_interval());
    let recorder_task = tokio::spawn(recorder.run(stop.clone()));

    match cmd.duration {
        Some(secs) => println!("Flying for {secs} s (Ctrl-C to land early)..."),
        None => println!("Flying until Ctrl-C..."),
    }

    fly_until_done(cmd.duration, &data, config.units).await;

    stop.stop();
    let track = recorder_task.await?;
    audio_task.await?;
    let mut flight = session.stop().await?;
    flight.track = track;

    println!();
    print_flight_summary(&flight, config.units);

    if cmd.no_save {
        println!("Flight not saved (--no-save).");
    } else if flight.track.is_empty() {
        println!("No track points recorded; nothing to save.");
    } else {
        let log = FlightLog::open(config.database_path())?;
        let id = log.insert(&flight)?;
        println!("Saved as flight {id}.");
    }

    Ok(())
}

/// Print live status until the duration elapses or Ctrl-C arrives.
async fn fly_until_done(duration: Option<u64>, data: &skyvario::flight_data::FlightDataRx, units: UnitSystem) {
    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut status_tick = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = &mut ctrl_c => {
                println!();
                break;
            }
            _ = status_tick.tick() => print_status(&data.latest(), units),
        }
    }
}

fn print_status(data: &FlightData, unit_system: UnitSystem) {
    let vs = units::display_vertical_speed(data.vertical_speed, unit_system);
    let agl = units::display_altitude(data.altitude_agl, unit_system);
    let msl = units::display_altitude(data.altitude_msl, unit_system);
    let heading = data
        .heading
        .map_or_else(|| "---".to_string(), |h| format!("{h:3.0}"));

    println!(
        "vs {vs:+6.1} {vs_unit}  agl {agl:7.1} {alt_unit}  msl {msl:7.1} {alt_unit}  hdg {heading}  g {g:.2}",
        vs_unit = units::vertical_speed_unit(unit_system),
        alt_unit = units::altitude_unit(unit_system),
        g = data.g_force,
    );
}

fn print_flight_summary(flight: &Flight, unit_system: UnitSystem) {
    println!("Flight summary");
    println!("--------------");
    println!("Start:        {}", flight.start_time.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Duration:     {} s", flight.duration().num_seconds());
    println!("Track points: {}", flight.track.len());
    if let Some(climb) = flight.max_climb() {
        println!(
            "Max climb:    {:+.1} {}",
            units::display_vertical_speed(climb, unit_system),
            units::vertical_speed_unit(unit_system)
        );
    }
    if let Some(altitude) = flight.max_altitude() {
        println!(
            "Max altitude: {:.0} {} MSL",
            units::display_altitude(altitude, unit_system),
            units::altitude_unit(unit_system)
        );
    }
}

fn handle_flights(
    config: &Config,
    cmd: FlightsCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let log = FlightLog::open(config.database_path())?;

    match cmd {
        FlightsCommand::List { limit } => {
            let flights = log.list_recent(limit)?;
            if flights.is_empty() {
                println!("No flights recorded yet.");
                return Ok(());
            }
            println!("{:>5}  {:<20}  {:>8}  {:>7}", "id", "start", "duration", "points");
            for flight in flights {
                println!(
                    "{:>5}  {:<20}  {:>7}s  {:>7}",
                    flight.id.unwrap_or(0),
                    flight.start_time.format("%Y-%m-%d %H:%M:%S"),
                    flight.duration().num_seconds(),
                    flight.track.len(),
                );
            }
        }
        FlightsCommand::Show { id, json } => {
            let flight = log.get(id)?.ok_or(Error::FlightNotFound { id })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&flight)?);
            } else {
                print_flight_summary(&flight, config.units);
            }
        }
        FlightsCommand::Export { id, output } => {
            let flight = log.get(id)?.ok_or(Error::FlightNotFound { id })?;
            let path = output.unwrap_or_else(|| gpx::default_file_name(&flight).into());
            std::fs::write(&path, gpx::to_gpx(&flight))?;
            println!("Exported flight {id} to {}", path.display());
        }
        FlightsCommand::Delete { id } => {
            if log.delete(id)? {
                println!("Deleted flight {id}.");
            } else {
                return Err(Error::FlightNotFound { id }.into());
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Audio]");
                println!("  Lift threshold:  {} m/s", config.audio.lift_threshold);
                println!("  Sink threshold:  {} m/s", config.audio.sink_threshold);
                println!("  Base frequency:  {} Hz", config.audio.base_frequency);
                println!("  Max frequency:   {} Hz", config.audio.max_frequency);
                println!("  Sink frequency:  {} Hz", config.audio.sink_frequency);
                println!("  Tick:            {} ms", config.audio.tick_ms);
                println!("  Muted:           {}", config.audio.muted);
                println!();
                println!("[Filter]");
                println!("  Alpha:           {}", config.filter.alpha);
                println!(
                    "  Sea level:       {} hPa",
                    config.filter.sea_level_pressure_hpa
                );
                println!();
                println!("[Log]");
                println!("  Database path:   {}", config.database_path().display());
                println!("  Track interval:  {} ms", config.log.track_interval_ms);
                println!();
                println!("  Units:           {:?}", config.units);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
