use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// UTC instant of a fix, as carried by the RMC time and date fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixTime {
    pub seconds: i64,
    /// Only present when the sentence carried a nonzero fraction of a second
    pub microseconds: Option<i64>,
}

impl FixTime {
    pub fn new(seconds: i64, microseconds: Option<i64>) -> Self {
        Self {
            seconds,
            microseconds,
        }
    }

    /// Whole-second UTC datetime, or `None` if the seconds are out of chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, 0)
    }
}

/// One fused positional sample built from an RMC and a GGA sentence
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsFix {
    pub time: FixTime,
    /// Signed decimal degrees, negative in the southern hemisphere
    pub latitude: f64,
    /// Signed decimal degrees, negative west of Greenwich
    pub longitude: f64,
    /// Ground speed in knots; a zero reading is stored as `None`
    pub speed: Option<f64>,
    /// Track angle in degrees; a zero reading is stored as `None`
    pub bearing: Option<f64>,
    /// Meters above mean sea level
    pub altitude: f64,
    pub satellites: i32,
}

impl GpsFix {
    /// Speed with the "absent means zero" reading applied
    pub fn speed_or_zero(&self) -> f64 {
        self.speed.unwrap_or(0.0)
    }

    pub fn bearing_or_zero(&self) -> f64 {
        self.bearing.unwrap_or(0.0)
    }
}
