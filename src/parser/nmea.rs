//! NMEA sentence parsing
//!
//! Contains the field-level parsers for the two sentences a fix is fused from:
//! `$GPRMC` (time, date, position, speed, track angle) and `$GPGGA` (satellite
//! count, altitude). Both parsers work on a single already-read line.

use crate::error::{JournalError, Result};
use crate::parser::helpers::{decimal, digit_pairs, integer, leading_digits, nonzero_decimal};
use crate::types::{FixTime, GpsFix};
use chrono::NaiveDate;

pub const RMC_TAG: &str = "$GPRMC,";
pub const GGA_TAG: &str = "$GPGGA,";

/// Fields contributed by an RMC sentence
#[derive(Debug, Clone, PartialEq)]
pub struct RmcSentence {
    pub time: FixTime,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
}

/// Fields contributed by a GGA sentence
#[derive(Debug, Clone, PartialEq)]
pub struct GgaSentence {
    pub satellites: i32,
    pub altitude: f64,
}

impl RmcSentence {
    /// Fuse with the GGA sentence of the same cycle
    pub fn fuse(self, gga: GgaSentence) -> GpsFix {
        GpsFix {
            time: self.time,
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
            bearing: self.bearing,
            altitude: gga.altitude,
            satellites: gga.satellites,
        }
    }
}

/// XOR of every byte after the first one, stopping at a NUL byte
///
/// Neither the leading `$` is excluded nor does the scan stop at `*`, so this is
/// not the NMEA 0183 checksum of a received sentence. It is what the `nmea` replay
/// mode appends to the sentences it regenerates.
pub fn checksum_line(line: &[u8]) -> u8 {
    line.iter()
        .skip(1)
        .take_while(|&&b| b != 0)
        .fold(0u8, |acc, &b| acc ^ b)
}

/// Append `*hh` computed by [`checksum_line`] to a regenerated sentence
pub fn with_checksum(sentence: &str) -> String {
    format!("{}*{:02x}", sentence, checksum_line(sentence.as_bytes()))
}

/// Split a sentence into positional fields, dropping the line ending and `*hh`
pub fn sentence_fields(line: &str) -> Vec<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = match line.find('*') {
        Some(star) => &line[..star],
        None => line,
    };
    body.split(',').collect()
}

fn field<'a>(fields: &[&'a str], index: usize, sentence: &str) -> Result<&'a str> {
    fields.get(index).copied().ok_or_else(|| {
        JournalError::MalformedFix(format!("{} sentence has no field {}", sentence, index))
    })
}

/// Parse `hhmmss[.sss]` and `ddmmyy` into a UTC timestamp
pub fn parse_timestamp(time: &str, date: &str) -> Result<FixTime> {
    let (hours, minutes, seconds) = digit_pairs(time)?;
    let (day, month, year) = digit_pairs(date)?;

    let fraction = &time[6..];
    let microseconds = if fraction.is_empty() {
        0
    } else if fraction.starts_with('.') {
        let value = decimal(&format!("0{}", fraction), "time fraction")?;
        (value * 1e6).round() as i64
    } else {
        return Err(JournalError::MalformedFix(format!(
            "invalid time field: {:?}",
            time
        )));
    };

    let timestamp = NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
        .ok_or_else(|| {
            JournalError::MalformedFix(format!("invalid date/time: {} {}", date, time))
        })?;

    // A fraction rounding up to a whole second carries into the seconds
    let carry = microseconds / 1_000_000;
    let microseconds = microseconds % 1_000_000;

    Ok(FixTime::new(
        timestamp.and_utc().timestamp() + carry,
        if microseconds != 0 {
            Some(microseconds)
        } else {
            None
        },
    ))
}

/// Parse a `D...DMM.mmmm` coordinate with `degree_digits` leading degree digits
pub fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    degree_digits: usize,
    negative: char,
    positive: char,
) -> Result<f64> {
    let degrees = leading_digits(value, degree_digits)? as f64;
    let minutes = decimal(&value[degree_digits..], "coordinate minutes")?;

    if !(0.0..60.0).contains(&minutes) {
        return Err(JournalError::MalformedFix(format!(
            "coordinate minutes out of range: {:?}",
            value
        )));
    }

    let magnitude = degrees + minutes / 60.0;
    match hemisphere.chars().next() {
        Some(c) if c == negative => Ok(-magnitude),
        Some(c) if c == positive => Ok(magnitude),
        _ => Err(JournalError::MalformedFix(format!(
            "invalid hemisphere: {:?}",
            hemisphere
        ))),
    }
}

/// Parse an RMC line (with or without its tag check already done)
pub fn parse_rmc(line: &str) -> Result<RmcSentence> {
    let fields = sentence_fields(line);

    let time = field(&fields, 1, "RMC")?;
    let latitude = field(&fields, 3, "RMC")?;
    let latitude_dir = field(&fields, 4, "RMC")?;
    let longitude = field(&fields, 5, "RMC")?;
    let longitude_dir = field(&fields, 6, "RMC")?;
    let speed = field(&fields, 7, "RMC")?;
    let angle = field(&fields, 8, "RMC")?;
    let date = field(&fields, 9, "RMC")?;

    let latitude = parse_coordinate(latitude, latitude_dir, 2, 'S', 'N')?;
    let longitude = parse_coordinate(longitude, longitude_dir, 3, 'W', 'E')?;

    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return Err(JournalError::MalformedFix(format!(
            "position out of range: {}, {}",
            latitude, longitude
        )));
    }

    Ok(RmcSentence {
        time: parse_timestamp(time, date)?,
        latitude,
        longitude,
        speed: nonzero_decimal(speed, "speed")?,
        bearing: nonzero_decimal(angle, "bearing")?,
    })
}

/// Parse a GGA line; only satellite count and altitude are kept
pub fn parse_gga(line: &str) -> Result<GgaSentence> {
    let fields = sentence_fields(line);

    let satellites = field(&fields, 7, "GGA")?;
    let altitude = field(&fields, 9, "GGA")?;

    Ok(GgaSentence {
        satellites: integer(satellites, "satellite count")?,
        altitude: decimal(altitude, "altitude")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

    #[test]
    fn test_parse_rmc() {
        let rmc = parse_rmc(RMC).unwrap();
        // 2094-03-23 12:35:19 UTC
        assert_eq!(rmc.time.seconds, 3920186119);
        assert_eq!(rmc.time.microseconds, None);
        assert_relative_eq!(rmc.latitude, 48.0 + 7.038 / 60.0, epsilon = 1e-9);
        assert_relative_eq!(rmc.longitude, 11.0 + 31.0 / 60.0, epsilon = 1e-9);
        assert_eq!(rmc.speed, Some(22.4));
        assert_eq!(rmc.bearing, Some(84.4));
    }

    #[test]
    fn test_parse_gga() {
        let gga = parse_gga(GGA).unwrap();
        assert_eq!(gga.satellites, 8);
        assert_relative_eq!(gga.altitude, 545.4);
    }

    #[test]
    fn test_hemisphere_signs() {
        let south_west =
            "$GPRMC,000000,A,3351.500,S,15112.750,W,0.0,0.0,010116,,*00";
        let rmc = parse_rmc(south_west).unwrap();
        assert_relative_eq!(rmc.latitude, -(33.0 + 51.5 / 60.0), epsilon = 1e-9);
        assert_relative_eq!(rmc.longitude, -(151.0 + 12.75 / 60.0), epsilon = 1e-9);
        assert!((-90.0..=90.0).contains(&rmc.latitude));
        assert!((-180.0..=180.0).contains(&rmc.longitude));
    }

    #[test]
    fn test_zero_speed_and_bearing_are_absent() {
        let rmc = parse_rmc("$GPRMC,000000,A,3351.500,N,15112.750,E,0.00,000.0,010116,,").unwrap();
        assert_eq!(rmc.speed, None);
        assert_eq!(rmc.bearing, None);
    }

    #[test]
    fn test_fractional_seconds() {
        let time = parse_timestamp("010203.25", "010116").unwrap();
        assert_eq!(time.seconds, 1451610123);
        assert_eq!(time.microseconds, Some(250_000));

        let whole = parse_timestamp("010203.00", "010116").unwrap();
        assert_eq!(whole.microseconds, None);
    }

    #[test]
    fn test_fraction_rounding_up_carries_into_seconds() {
        let time = parse_timestamp("123519.9999999", "230394").unwrap();
        assert_eq!(time.seconds, 3920186120);
        assert_eq!(time.microseconds, None);

        // 2015-12-31 23:59:59.9999996 becomes midnight of the next day
        let midnight = parse_timestamp("235959.9999996", "311215").unwrap();
        assert_eq!(midnight.seconds, 1451606400);
        assert_eq!(midnight.microseconds, None);

        let below = parse_timestamp("123519.9999994", "230394").unwrap();
        assert_eq!(below.seconds, 3920186119);
        assert_eq!(below.microseconds, Some(999_999));
    }

    #[test]
    fn test_rejects_malformed_fields() {
        // No fix yet: empty fields
        assert!(parse_rmc("$GPRMC,,V,,,,,,,,,,N*53").is_err());
        // Bad digit in time
        assert!(parse_rmc("$GPRMC,12a519,A,4807.038,N,01131.000,E,,,230394,,").is_err());
        // Month 13
        assert!(parse_rmc("$GPRMC,123519,A,4807.038,N,01131.000,E,,,231394,,").is_err());
        // Latitude beyond the pole
        assert!(parse_rmc("$GPRMC,123519,A,9507.038,N,01131.000,E,,,230394,,").is_err());
        // Truncated sentence
        assert!(parse_rmc("$GPRMC,123519,A,4807.038").is_err());
        assert!(parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,,0.9,545.4,M").is_err());
    }

    #[test]
    fn test_checksum_line() {
        assert_eq!(checksum_line(b""), 0);
        assert_eq!(checksum_line(b"$"), 0);
        assert_eq!(checksum_line(b"$A"), b'A');
        assert_eq!(checksum_line(b"$AB"), b'A' ^ b'B');
        // Stops at NUL, not at '*'
        assert_eq!(checksum_line(b"$AB\0CD"), b'A' ^ b'B');
        assert_eq!(checksum_line(b"$A*"), b'A' ^ b'*');
        // The first byte is skipped whatever it is
        assert_eq!(checksum_line(b"XA"), b'A');
    }

    #[test]
    fn test_with_checksum() {
        let sentence = with_checksum("$GPRMC,,");
        assert_eq!(sentence, format!("$GPRMC,,*{:02x}", checksum_line(b"$GPRMC,,")));
    }
}
