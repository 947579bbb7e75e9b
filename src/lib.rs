//! Drive Journal Library
//!
//! A Rust library for logging vehicle trips on a head unit and analyzing the
//! resulting trip logs offline. GPS fixes are fused from NMEA `$GPRMC`/`$GPGGA`
//! sentence pairs, joined with odometer and ignition signals from the vehicle
//! bus, and appended to per-trip files as length-prefixed protobuf records.
//!
//! # Features
//!
//! - **`cli`** (default): Build the `drive-journal` command-line binary
//! - **`serde`**: Enable serialization/deserialization of the domain types
//!
//! # Quick Start
//!
//! Summarize a trip log:
//! ```rust,no_run
//! use drive_journal::{analyze_trip_log, ReportMode};
//! use std::path::Path;
//!
//! let mut stdout = std::io::stdout();
//! let records = analyze_trip_log(
//!     Path::new("trips/2016-1-1T1-2-3"),
//!     ReportMode::Summary,
//!     &mut stdout,
//! )
//! .unwrap();
//! println!("{} records", records);
//! ```
//!
//! Run a capture session over recorded inputs:
//! ```rust,no_run
//! use drive_journal::{CaptureConfig, CaptureSession, LineBus};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let config = CaptureConfig::default();
//! let gps = BufReader::new(File::open("gps.nmea").unwrap());
//! let bus = LineBus::new(BufReader::new(File::open("bus.log").unwrap()));
//! let stats = CaptureSession::start(&config, gps, bus).unwrap().wait().unwrap();
//! println!("{} fixes", stats.fixes);
//! ```
//!
//! # Public API
//!
//! ## Capture
//! - [`CaptureSession`] - Spawns and joins the GPS and bus threads
//! - [`FixDispatcher`] - Fuses fixes and notifies [`FixObserver`]s
//! - [`BusDispatcher`] - Offers bus signals to the registered filters
//! - [`SharedSignals`] - Tick, odometer and ignition state shared by both threads
//! - [`JournalWriter`] - Appends a record per fix while recording
//!
//! ## Decoding
//! - [`SentenceFuser`] - Turns an NMEA line stream into [`GpsFix`]es
//! - [`RecordStream`] - Iterates the records of a trip log
//! - [`analyze_trip_log`] - Summary, expand and nmea reports
//!
//! ## Data Types
//! - [`GpsFix`], [`FixTime`] - One fused positional sample
//! - [`TripRecord`] - One persisted record of a trip
//! - [`TripSummary`] - Aggregate statistics of a trip

// Module declarations
pub mod capture;
pub mod config;
pub mod conversion;
pub mod error;
pub mod journal;
pub mod parser;
pub mod report;
pub mod summary;
pub mod types;

pub use capture::{
    BusDispatcher, BusEvent, CaptureSession, DispatchStats, FixDispatcher, FixObserver,
    HandlerResult, LineBus, MatchRule, SharedSignals, SignalBus, SignalCapture, SignalValue,
};
pub use config::CaptureConfig;
pub use conversion::*;
pub use error::{JournalError, Result};
pub use journal::{decode_trip_log, encode_record, JournalWriter, RecordStream, TripStorage};
pub use parser::{checksum_line, SentenceFuser};
pub use report::{analyze_bytes, analyze_trip_log, regenerate_rmc, ReportMode};
pub use summary::TripSummary;
pub use types::*;
