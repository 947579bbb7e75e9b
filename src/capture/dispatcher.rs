//! GPS read loop: fuse fixes and hand them to the registered observers

use crate::capture::shutdown::ShutdownSignal;
use crate::error::{JournalError, Result};
use crate::parser::SentenceFuser;
use crate::types::GpsFix;
use log::{debug, error, info};
use std::io::BufRead;

/// Receives every fix the dispatcher produces
pub trait FixObserver: Send {
    fn on_fix(&mut self, fix: &GpsFix) -> Result<()>;
}

impl<F> FixObserver for F
where
    F: FnMut(&GpsFix) -> Result<()> + Send,
{
    fn on_fix(&mut self, fix: &GpsFix) -> Result<()> {
        self(fix)
    }
}

/// Counters for one dispatch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub fixes: u64,
    pub malformed: u64,
    pub observer_errors: u64,
}

/// Drives a [`SentenceFuser`] and notifies observers in registration order
pub struct FixDispatcher<R> {
    fuser: SentenceFuser<R>,
    observers: Vec<Box<dyn FixObserver>>,
    stats: DispatchStats,
}

impl<R: BufRead> FixDispatcher<R> {
    pub fn new(reader: R) -> Self {
        Self {
            fuser: SentenceFuser::new(reader),
            observers: Vec::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn add_observer<O: FixObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    fn notify(&mut self, fix: &GpsFix) {
        self.stats.fixes += 1;
        for observer in self.observers.iter_mut() {
            if let Err(e) = observer.on_fix(fix) {
                self.stats.observer_errors += 1;
                error!("failed to handle fix at {}: {}", fix.time.seconds, e);
            }
        }
    }

    /// Read fixes until the source ends or `shutdown` fires
    ///
    /// Malformed cycles are skipped. I/O errors other than end-of-stream end the
    /// run with an error.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<DispatchStats> {
        while !shutdown.is_triggered() {
            match self.fuser.next_fix() {
                Ok(fix) => self.notify(&fix),
                Err(JournalError::MalformedFix(msg)) => {
                    self.stats.malformed += 1;
                    debug!("skipping fix: {}", msg);
                }
                Err(JournalError::StreamEnded) => {
                    info!("gps connection closed");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.stats)
    }
}
