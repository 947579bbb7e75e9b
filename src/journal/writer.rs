//! Trip file writer driven by the fix dispatcher

use crate::capture::dispatcher::FixObserver;
use crate::capture::shutdown::ShutdownSignal;
use crate::capture::signals::SharedSignals;
use crate::config::CaptureConfig;
use crate::error::{JournalError, Result};
use crate::journal::schema::encode_record;
use crate::types::{FixTime, GpsFix, TripRecord};
use chrono::{Datelike, Timelike};
use log::{debug, error, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the trip file started by a fix at `time`, e.g. `2016-1-1T1-2-3`
pub fn trip_file_name(time: &FixTime) -> String {
    match time.to_datetime() {
        Some(dt) => format!(
            "{}-{}-{}T{}-{}-{}",
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        None => format!("trip-{}", time.seconds),
    }
}

/// Location of the trip files and how to wait for it
#[derive(Debug, Clone)]
pub struct TripStorage {
    pub root: PathBuf,
    pub trips_dir: String,
    pub poll_initial: Duration,
    pub poll_max: Duration,
}

impl TripStorage {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            root: config.storage_root.clone(),
            trips_dir: config.trips_dir.clone(),
            poll_initial: config.mount_poll_initial,
            poll_max: config.mount_poll_max,
        }
    }

    pub fn trips_path(&self) -> PathBuf {
        self.root.join(&self.trips_dir)
    }

    pub fn trip_path(&self, time: &FixTime) -> PathBuf {
        self.trips_path().join(trip_file_name(time))
    }

    /// Block until the storage root exists
    ///
    /// Polls with a delay growing by half each attempt up to `poll_max`. Returns
    /// `ResourceUnavailable` if `shutdown` fires first.
    pub fn wait_until_available(&self, shutdown: &ShutdownSignal) -> Result<()> {
        let mut delay = self.poll_initial;
        let mut attempts = 0u32;

        while !self.root.exists() {
            if attempts == 0 {
                info!("waiting for storage at {}", self.root.display());
            }
            attempts += 1;

            if shutdown.wait_timeout(delay) {
                return Err(JournalError::ResourceUnavailable(self.root.clone()));
            }
            delay = delay.mul_f64(1.5).min(self.poll_max);
        }

        if attempts > 0 {
            debug!("storage available after {} checks", attempts);
        }
        Ok(())
    }

    /// Wait for the storage, then open the trip file for `time` in append mode
    pub fn open_trip(&self, time: &FixTime, shutdown: &ShutdownSignal) -> Result<TripFile> {
        self.wait_until_available(shutdown)?;
        fs::create_dir_all(self.trips_path())?;
        TripFile::open(&self.trip_path(time))
    }
}

/// An open trip file; buffered bytes are flushed on drop
#[derive(Debug)]
pub struct TripFile {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl TripFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("opened trip file {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Write one framed record and flush it
    pub fn append(&mut self, record: &TripRecord) -> Result<()> {
        self.writer.write_all(&encode_record(record))?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        info!(
            "closed trip file {} ({} records)",
            self.path.display(),
            self.records
        );
        Ok(())
    }
}

impl Drop for TripFile {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            error!("failed to flush {}: {}", self.path.display(), e);
        }
    }
}

/// Appends a [`TripRecord`] for every fix while the vehicle is recording
pub struct JournalWriter {
    signals: SharedSignals,
    storage: TripStorage,
    shutdown: ShutdownSignal,
    trip: Option<TripFile>,
}

impl JournalWriter {
    pub fn new(signals: SharedSignals, storage: TripStorage, shutdown: ShutdownSignal) -> Self {
        Self {
            signals,
            storage,
            shutdown,
            trip: None,
        }
    }

    pub fn current_trip(&self) -> Option<&Path> {
        self.trip.as_ref().map(TripFile::path)
    }

    pub fn close_trip(&mut self) -> Result<()> {
        match self.trip.take() {
            Some(trip) => trip.close(),
            None => Ok(()),
        }
    }

    pub fn record_fix(&mut self, fix: &GpsFix) -> Result<()> {
        let snapshot = self.signals.take_snapshot();

        if !snapshot.recording {
            return self.close_trip();
        }

        let trip = match self.trip.take() {
            Some(trip) => trip,
            None => self.storage.open_trip(&fix.time, &self.shutdown)?,
        };
        let trip = self.trip.insert(trip);

        let record = TripRecord::new(fix.clone(), snapshot.ticks, snapshot.odometer);
        debug!(
            "record {} at {}: ticks {} odometer {}",
            trip.records(),
            fix.time.seconds,
            record.ticks_since_last_record,
            record.odometer_at_record
        );

        if let Err(e) = trip.append(&record) {
            warn!("dropping trip file {} after write failure", trip.path().display());
            self.trip = None;
            return Err(e);
        }
        Ok(())
    }
}

impl FixObserver for JournalWriter {
    fn on_fix(&mut self, fix: &GpsFix) -> Result<()> {
        self.record_fix(fix)
    }
}
