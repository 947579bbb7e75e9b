//! Unit conversion and formatting helpers for trip reports
//!
//! Distance is measured in odometer ticks on the bus; speed comes from the GPS
//! receiver in knots.

use chrono::{DateTime, SecondsFormat, Utc};

/// Kilometers travelled per odometer tick
pub const KM_PER_TICK: f64 = 0.0002;
/// Statute miles travelled per odometer tick
pub const MILES_PER_TICK: f64 = 0.000124274;
/// Miles per hour in one knot
pub const MPH_PER_KNOT: f64 = 1.15078;

pub fn ticks_to_km(ticks: u64) -> f64 {
    ticks as f64 * KM_PER_TICK
}

pub fn ticks_to_miles(ticks: u64) -> f64 {
    ticks as f64 * MILES_PER_TICK
}

pub fn knots_to_mph(knots: f64) -> f64 {
    knots * MPH_PER_KNOT
}

/// Split signed decimal degrees into whole degrees, minutes and hemisphere letter
///
/// Non-negative values take `positive` (N or E), negative ones `negative`.
pub fn degrees_minutes(value: f64, positive: char, negative: char) -> (u32, f64, char) {
    let hemisphere = if value >= 0.0 { positive } else { negative };
    let magnitude = value.abs();
    let degrees = magnitude.trunc();
    let mut minutes = (magnitude - degrees) * 60.0;
    let mut degrees = degrees as u32;

    // Rounding at print precision could otherwise produce "60.000000" minutes
    if minutes >= 59.999_999_5 {
        minutes = 0.0;
        degrees += 1;
    }

    (degrees, minutes, hemisphere)
}

/// Format a span of seconds as `H:MM:SS`
pub fn format_duration(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// RFC 3339 rendering of an epoch second, or the raw number when out of range
pub fn format_timestamp(seconds: i64) -> String {
    match DateTime::<Utc>::from_timestamp(seconds, 0) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => seconds.to_string(),
    }
}

/// Share of `part` in `whole` as a percentage, 0 for an empty whole
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
