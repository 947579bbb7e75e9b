//! CLI binary for Drive Journal
//!
//! Without a log file argument, runs a live capture session until the GPS
//! source closes. With a log file, prints a report of that trip log.

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use drive_journal::{
    analyze_trip_log, CaptureConfig, CaptureSession, JournalError, LineBus, ReportMode,
};
use log::{error, info};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ")"
);

fn cli() -> Command {
    Command::new("drive-journal")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(LONG_VERSION)
        .about("Log vehicle trips from GPS and vehicle bus signals, or report on a recorded trip log.")
        .arg(
            Arg::new("logfile")
                .help("Trip log to analyze; omit to start a live capture session")
                .value_name("LOGFILE")
                .value_parser(clap::value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("mode")
                .help("Report to print for LOGFILE [default: summary]")
                .value_name("MODE")
                .value_parser(PossibleValuesParser::new(ReportMode::NAMES))
                .index(2),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output for every fix and bus signal")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("gps-device")
                .long("gps-device")
                .help("Serial device delivering NMEA sentences")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("bus-socket")
                .long("bus-socket")
                .help("Socket of the vehicle service bus")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("storage-root")
                .long("storage-root")
                .help("Mount point below which trip files are written")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn capture_config(matches: &ArgMatches) -> CaptureConfig {
    let mut config = CaptureConfig::default();
    if let Some(path) = matches.get_one::<PathBuf>("gps-device") {
        config.gps_device = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("bus-socket") {
        config.bus_socket = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("storage-root") {
        config.storage_root = path.clone();
    }
    config
}

#[cfg(unix)]
fn run_capture(config: &CaptureConfig) -> Result<()> {
    let gps = File::open(&config.gps_device).map_err(|e| {
        JournalError::Configuration(format!(
            "failed to open gps device {}: {}",
            config.gps_device.display(),
            e
        ))
    })?;
    let bus = LineBus::connect(&config.bus_socket, config.bus_poll_interval)?;

    info!(
        "capturing from {} and {}, writing to {}",
        config.gps_device.display(),
        config.bus_socket.display(),
        config.trips_path().display()
    );

    let session = CaptureSession::start(config, BufReader::new(gps), bus)
        .context("failed to start capture session")?;
    let stats = session.wait()?;
    info!("{} fixes captured", stats.fixes);
    Ok(())
}

#[cfg(not(unix))]
fn run_capture(_config: &CaptureConfig) -> Result<()> {
    Err(JournalError::Configuration("live capture requires a unix bus socket".to_string()).into())
}

fn run_report(path: &Path, mode: ReportMode) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    analyze_trip_log(path, mode, &mut out)
        .with_context(|| format!("failed to analyze {}", path.display()))?;
    Ok(())
}

/// Message of a trip log decode failure carried by `err`, if that is what it is
fn decode_failure(err: &anyhow::Error) -> Option<&str> {
    match err.downcast_ref::<JournalError>() {
        Some(JournalError::Decode(msg)) => Some(msg),
        _ => None,
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("debug"));

    let Some(path) = matches.get_one::<PathBuf>("logfile") else {
        return run_capture(&capture_config(&matches));
    };

    let mode = matches
        .get_one::<String>("mode")
        .map(|m| m.parse::<ReportMode>())
        .transpose()?
        .unwrap_or_default();

    if let Err(e) = run_report(path, mode) {
        if let Some(msg) = decode_failure(&e) {
            error!("{}: {}", path.display(), msg);
            eprintln!("failed to parse input file {}", path.display());
            std::process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}
