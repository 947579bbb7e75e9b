//! Offline trip log analysis

use crate::conversion::degrees_minutes;
use crate::error::{JournalError, Result};
use crate::journal::{read_trip_log, RecordStream};
use crate::parser::nmea::{with_checksum, RMC_TAG};
use crate::summary::TripSummary;
use crate::types::{GpsFix, TripRecord};
use chrono::{Datelike, Timelike};
use log::debug;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// What to print for a trip log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Aggregate statistics of the whole trip
    #[default]
    Summary,
    /// Every record as structured text
    Expand,
    /// Every record as a regenerated RMC sentence
    Nmea,
}

impl ReportMode {
    pub const NAMES: [&'static str; 3] = ["summary", "expand", "nmea"];

    pub fn name(&self) -> &'static str {
        match self {
            ReportMode::Summary => "summary",
            ReportMode::Expand => "expand",
            ReportMode::Nmea => "nmea",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportMode {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "summary" => Ok(ReportMode::Summary),
            "expand" => Ok(ReportMode::Expand),
            "nmea" => Ok(ReportMode::Nmea),
            other => Err(JournalError::Configuration(format!(
                "unknown action: {}",
                other
            ))),
        }
    }
}

/// Rebuild an RMC sentence, checksum included, from a stored fix
pub fn regenerate_rmc(fix: &GpsFix) -> String {
    let (lat_deg, lat_min, lat_hemi) = degrees_minutes(fix.latitude, 'N', 'S');
    let (lon_deg, lon_min, lon_hemi) = degrees_minutes(fix.longitude, 'E', 'W');

    let (time, date) = match fix.time.to_datetime() {
        Some(dt) => (
            format!("{:02}{:02}{:02}", dt.hour(), dt.minute(), dt.second()),
            format!(
                "{:02}{:02}{:02}",
                dt.day(),
                dt.month(),
                dt.year().rem_euclid(100)
            ),
        ),
        None => (String::new(), String::new()),
    };

    let line = format!(
        "{}{},A,{:02}{:09.6},{},{:03}{:09.6},{},{:.6},{:.6},{},,",
        RMC_TAG,
        time,
        lat_deg,
        lat_min,
        lat_hemi,
        lon_deg,
        lon_min,
        lon_hemi,
        fix.speed_or_zero(),
        fix.bearing_or_zero(),
        date
    );
    with_checksum(&line)
}

/// Text rendering of a record, one field per line, nested messages in braces
pub fn write_expanded<W: Write + ?Sized>(out: &mut W, record: &TripRecord) -> Result<()> {
    let fix = &record.location;
    writeln!(out, "location {{")?;
    writeln!(out, "  time {{")?;
    writeln!(out, "    seconds: {}", fix.time.seconds)?;
    if let Some(us) = fix.time.microseconds {
        writeln!(out, "    microseconds: {}", us)?;
    }
    writeln!(out, "  }}")?;
    writeln!(out, "  latitude: {}", fix.latitude)?;
    writeln!(out, "  longitude: {}", fix.longitude)?;
    if let Some(speed) = fix.speed {
        writeln!(out, "  speed: {}", speed)?;
    }
    if let Some(bearing) = fix.bearing {
        writeln!(out, "  bearing: {}", bearing)?;
    }
    writeln!(out, "  altitude: {}", fix.altitude)?;
    writeln!(out, "  satellites: {}", fix.satellites)?;
    writeln!(out, "}}")?;
    writeln!(out, "ticks: {}", record.ticks_since_last_record)?;
    writeln!(out, "odometer: {}", record.odometer_at_record)?;
    writeln!(out)?;
    Ok(())
}

/// Decode `data` and print it in `mode`; returns the number of records read
///
/// Expand and nmea output is written per record, so a decode error leaves the
/// output of every earlier record in place. The summary is only printed when the
/// whole log decodes.
pub fn analyze_bytes<W: Write + ?Sized>(data: &[u8], mode: ReportMode, out: &mut W) -> Result<u64> {
    let mut stream = RecordStream::new(data);
    let mut summary = TripSummary::new();

    for record in stream.by_ref() {
        let record = record?;
        match mode {
            ReportMode::Expand => write_expanded(out, &record)?,
            ReportMode::Nmea => writeln!(out, "{}", regenerate_rmc(&record.location))?,
            ReportMode::Summary => summary.add(&record),
        }
    }

    if mode == ReportMode::Summary {
        write!(out, "{}", summary)?;
    }
    out.flush()?;

    debug!("{} records decoded ({} bytes)", stream.records_read, stream.pos);
    Ok(stream.records_read as u64)
}

/// Read the trip log at `path` and print it in `mode`
pub fn analyze_trip_log<W: Write + ?Sized>(path: &Path, mode: ReportMode, out: &mut W) -> Result<u64> {
    let data = read_trip_log(path)?;
    debug!("analyzing {} ({} bytes) as {}", path.display(), data.len(), mode);
    analyze_bytes(&data, mode, out)
}
