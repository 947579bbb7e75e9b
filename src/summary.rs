//! Single-pass trip statistics

use crate::conversion::{
    format_duration, format_timestamp, knots_to_mph, percentage, ticks_to_km, ticks_to_miles,
};
use crate::types::TripRecord;
use std::fmt;

/// Fixes reporting this speed or more are receiver glitches
pub const SPEED_GLITCH_KNOTS: f64 = 500.0;

/// Aggregate of a trip log, built one record at a time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripSummary {
    pub records: u64,
    pub first_time: Option<i64>,
    pub last_time: Option<i64>,

    pub max_speed: f64,
    pub total_speed: f64,
    pub speed_samples: u64,
    pub moving_speed: f64,
    pub moving_samples: u64,

    pub min_altitude: Option<f64>,
    pub max_altitude: Option<f64>,
    pub total_altitude: f64,

    pub total_ticks: u64,
    pub first_odometer: Option<u32>,
    pub last_odometer: u32,

    pub driving_samples: u64,
    pub idling_samples: u64,
}

impl TripSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TripRecord>,
    {
        let mut summary = Self::new();
        for record in records {
            summary.add(record);
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn add(&mut self, record: &TripRecord) {
        let fix = &record.location;
        let ticks = record.ticks_since_last_record;
        self.records += 1;

        self.first_time.get_or_insert(fix.time.seconds);
        self.last_time = Some(fix.time.seconds);

        let speed = fix.speed_or_zero();
        if speed < SPEED_GLITCH_KNOTS {
            self.max_speed = self.max_speed.max(speed);
            self.total_speed += speed;
            self.speed_samples += 1;
            if ticks > 0 {
                self.moving_speed += speed;
                self.moving_samples += 1;
            }
        }

        self.total_altitude += fix.altitude;
        self.min_altitude = Some(self.min_altitude.map_or(fix.altitude, |a| a.min(fix.altitude)));
        self.max_altitude = Some(self.max_altitude.map_or(fix.altitude, |a| a.max(fix.altitude)));

        self.total_ticks += ticks as u64;

        if self.first_odometer.is_none() && record.odometer_at_record != 0 {
            self.first_odometer = Some(record.odometer_at_record);
        }
        self.last_odometer = record.odometer_at_record;

        if record.is_idle() {
            self.idling_samples += 1;
        } else {
            self.driving_samples += 1;
        }
    }

    /// Seconds between the first and last fix
    pub fn duration(&self) -> i64 {
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }

    pub fn mean_speed(&self) -> f64 {
        mean(self.total_speed, self.speed_samples)
    }

    /// Mean speed over fixes taken while the odometer was advancing
    pub fn moving_mean_speed(&self) -> f64 {
        mean(self.moving_speed, self.moving_samples)
    }

    pub fn mean_altitude(&self) -> f64 {
        mean(self.total_altitude, self.records)
    }

    pub fn driving_percentage(&self) -> f64 {
        percentage(self.driving_samples, self.records)
    }

    pub fn idling_percentage(&self) -> f64 {
        percentage(self.idling_samples, self.records)
    }

    pub fn odometer_span(&self) -> Option<u32> {
        self.first_odometer
            .map(|first| self.last_odometer.wrapping_sub(first))
    }
}

fn mean(total: f64, samples: u64) -> f64 {
    if samples == 0 {
        0.0
    } else {
        total / samples as f64
    }
}

impl fmt::Display for TripSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No records found");
        }

        let start = self.first_time.unwrap_or_default();
        let end = self.last_time.unwrap_or_default();

        writeln!(f, "Trip Summary:")?;
        writeln!(f, "    Trip Start:  {} ({})", start, format_timestamp(start))?;
        writeln!(f, "    Trip End:    {} ({})", end, format_timestamp(end))?;
        writeln!(f, "    Trip Length: {}", format_duration(self.duration()))?;
        writeln!(f)?;

        writeln!(
            f,
            "    Driving Time: {} samples ({:.2}%)",
            self.driving_samples,
            self.driving_percentage()
        )?;
        writeln!(
            f,
            "    Idling Time:  {} samples ({:.2}%)",
            self.idling_samples,
            self.idling_percentage()
        )?;
        writeln!(f)?;

        writeln!(f, "    Total Ticks:    {}", self.total_ticks)?;
        writeln!(
            f,
            "    Total Distance: {:.2} km ({:.2} miles)",
            ticks_to_km(self.total_ticks),
            ticks_to_miles(self.total_ticks)
        )?;
        match (self.first_odometer, self.odometer_span()) {
            (Some(first), Some(span)) => writeln!(
                f,
                "    Odometer:       {} -> {} ({})",
                first, self.last_odometer, span
            )?,
            _ => writeln!(f, "    Odometer:       not reported")?,
        }
        writeln!(f)?;

        for (label, knots) in [
            ("Max Speed:       ", self.max_speed),
            ("Avg Total Speed: ", self.mean_speed()),
            ("Avg Moving Speed:", self.moving_mean_speed()),
        ] {
            writeln!(
                f,
                "    {} {:.2} knots ({:.2} mph)",
                label,
                knots,
                knots_to_mph(knots)
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "    Min Altitude: {:.2} meters",
            self.min_altitude.unwrap_or_default()
        )?;
        writeln!(
            f,
            "    Max Altitude: {:.2} meters",
            self.max_altitude.unwrap_or_default()
        )?;
        writeln!(f, "    Avg Altitude: {:.2} meters", self.mean_altitude())
    }
}
