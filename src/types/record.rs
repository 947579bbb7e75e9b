use crate::types::GpsFix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One persisted unit of a trip log
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripRecord {
    pub location: GpsFix,
    /// Odometer pulses accumulated since the previous record
    pub ticks_since_last_record: u32,
    /// Last absolute distance reading seen on the bus
    pub odometer_at_record: u32,
}

impl TripRecord {
    pub fn new(location: GpsFix, ticks_since_last_record: u32, odometer_at_record: u32) -> Self {
        Self {
            location,
            ticks_since_last_record,
            odometer_at_record,
        }
    }

    /// A record with no odometer pulses is an idling sample
    pub fn is_idle(&self) -> bool {
        self.ticks_since_last_record == 0
    }
}
