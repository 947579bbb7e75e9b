//! On-disk message schema of a trip log
//!
//! Each record is a `TravelRecord` protobuf message preceded by its byte length
//! as a varint. Field numbers are part of the file format and must not change.

use crate::error::{JournalError, Result};
use crate::types::{FixTime, GpsFix, TripRecord};
use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct TimeMessage {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int64, optional, tag = "2")]
    pub microseconds: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct LocationMessage {
    #[prost(message, optional, tag = "1")]
    pub time: Option<TimeMessage>,
    #[prost(double, tag = "2")]
    pub latitude: f64,
    #[prost(double, tag = "3")]
    pub longitude: f64,
    #[prost(double, optional, tag = "4")]
    pub speed: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub bearing: Option<f64>,
    #[prost(double, tag = "6")]
    pub altitude: f64,
    #[prost(int32, tag = "7")]
    pub satellites: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct TravelRecord {
    #[prost(message, optional, tag = "1")]
    pub location: Option<LocationMessage>,
    #[prost(uint32, tag = "2")]
    pub ticks: u32,
    #[prost(uint32, tag = "3")]
    pub odometer: u32,
}

impl From<&GpsFix> for LocationMessage {
    fn from(fix: &GpsFix) -> Self {
        Self {
            time: Some(TimeMessage {
                seconds: fix.time.seconds,
                microseconds: fix.time.microseconds,
            }),
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed: fix.speed,
            bearing: fix.bearing,
            altitude: fix.altitude,
            satellites: fix.satellites,
        }
    }
}

impl TryFrom<LocationMessage> for GpsFix {
    type Error = JournalError;

    fn try_from(message: LocationMessage) -> Result<Self> {
        let time = message
            .time
            .ok_or_else(|| JournalError::Decode("location without time".to_string()))?;

        Ok(GpsFix {
            time: FixTime::new(time.seconds, time.microseconds),
            latitude: message.latitude,
            longitude: message.longitude,
            speed: message.speed,
            bearing: message.bearing,
            altitude: message.altitude,
            satellites: message.satellites,
        })
    }
}

impl From<&TripRecord> for TravelRecord {
    fn from(record: &TripRecord) -> Self {
        Self {
            location: Some(LocationMessage::from(&record.location)),
            ticks: record.ticks_since_last_record,
            odometer: record.odometer_at_record,
        }
    }
}

impl TryFrom<TravelRecord> for TripRecord {
    type Error = JournalError;

    fn try_from(message: TravelRecord) -> Result<Self> {
        let location = message
            .location
            .ok_or_else(|| JournalError::Decode("record without location".to_string()))?;

        Ok(TripRecord {
            location: GpsFix::try_from(location)?,
            ticks_since_last_record: message.ticks,
            odometer_at_record: message.odometer,
        })
    }
}

/// Varint length prefix followed by the encoded record
pub fn encode_record(record: &TripRecord) -> Vec<u8> {
    TravelRecord::from(record).encode_length_delimited_to_vec()
}

/// Decode one record body (without its length prefix)
pub fn decode_record_body(body: &[u8]) -> Result<TripRecord> {
    TripRecord::try_from(TravelRecord::decode(body)?)
}
