//! Fusing RMC and GGA sentences from a line stream into fixes

use crate::error::{JournalError, Result};
use crate::parser::nmea::{parse_gga, parse_rmc, GGA_TAG, RMC_TAG};
use crate::types::GpsFix;
use std::io::BufRead;

/// Reads NMEA lines and produces one [`GpsFix`] per RMC + GGA pair
pub struct SentenceFuser<R> {
    reader: R,
    line: Vec<u8>,
    pub lines_read: u64,
}

impl<R: BufRead> SentenceFuser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(128),
            lines_read: 0,
        }
    }

    /// Discard lines until one starts with `tag`
    fn next_tagged_line(&mut self, tag: &str) -> Result<String> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Err(JournalError::StreamEnded);
            }
            self.lines_read += 1;

            let text = String::from_utf8_lossy(&self.line);
            if text.starts_with(tag) {
                return Ok(text.into_owned());
            }
        }
    }

    /// Produce the next fix
    ///
    /// Returns `StreamEnded` when the source runs out before both sentences were
    /// read, and `MalformedFix` when either sentence fails to parse. Neither case
    /// yields a partial fix.
    pub fn next_fix(&mut self) -> Result<GpsFix> {
        let rmc_line = self.next_tagged_line(RMC_TAG)?;
        let rmc = parse_rmc(&rmc_line)?;

        let gga_line = self.next_tagged_line(GGA_TAG)?;
        let gga = parse_gga(&gga_line)?;

        Ok(rmc.fuse(gga))
    }
}
