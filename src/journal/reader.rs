use crate::error::{JournalError, Result};
use crate::journal::schema::decode_record_body;
use crate::types::TripRecord;
use std::path::Path;

/// Reads length-prefixed trip records from an in-memory log
pub struct RecordStream<'a> {
    data: &'a [u8],
    pub pos: usize,
    end: usize,
    pub records_read: usize,
    failed: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            records_read: 0,
            failed: false,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.pos < self.end {
            let byte = self.data[self.pos];
            self.pos += 1;
            Some(byte)
        } else {
            None
        }
    }

    /// Read the unsigned varint length prefix of the next record
    pub fn read_length(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut result = 0u32;
        let mut shift = 0;

        // 5 bytes is enough to encode 32-bit unsigned quantities
        for _ in 0..5 {
            let b = self.read_byte().ok_or_else(|| {
                JournalError::Decode(format!("truncated length prefix at offset {}", start))
            })?;

            result |= ((b & 0x7f) as u32) << shift;

            if b < 0x80 {
                return Ok(result);
            }

            shift += 7;
        }

        Err(JournalError::Decode(format!(
            "length prefix at offset {} is too long",
            start
        )))
    }

    /// Decode the next record, `None` once the data is exhausted
    pub fn next_record(&mut self) -> Option<Result<TripRecord>> {
        if self.failed || self.is_at_end() {
            return None;
        }

        let result = self.read_record();
        match result {
            Ok(_) => self.records_read += 1,
            Err(_) => self.failed = true,
        }
        Some(result)
    }

    fn read_record(&mut self) -> Result<TripRecord> {
        let start = self.pos;
        let length = self.read_length()? as usize;

        if length > self.end - self.pos {
            return Err(JournalError::Decode(format!(
                "record at offset {} needs {} bytes, {} left",
                start,
                length,
                self.end - self.pos
            )));
        }

        let body = &self.data[self.pos..self.pos + length];
        self.pos += length;

        decode_record_body(body).map_err(|e| match e {
            JournalError::Decode(msg) => {
                JournalError::Decode(format!("record at offset {}: {}", start, msg))
            }
            other => other,
        })
    }
}

impl<'a> Iterator for RecordStream<'a> {
    type Item = Result<TripRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

/// Load a trip log file into memory
pub fn read_trip_log(path: &Path) -> Result<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

/// Decode every record of a trip log, failing on the first bad one
pub fn decode_trip_log(data: &[u8]) -> Result<Vec<TripRecord>> {
    RecordStream::new(data).collect()
}
