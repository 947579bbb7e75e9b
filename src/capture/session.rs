//! Live capture session: one GPS thread and one bus thread around shared signal state

use crate::capture::bus::{BusDispatcher, SignalBus};
use crate::capture::dispatcher::{DispatchStats, FixDispatcher};
use crate::capture::feed::LineFeed;
use crate::capture::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
use crate::capture::signals::{SharedSignals, SignalCapture};
use crate::config::CaptureConfig;
use crate::error::{JournalError, Result};
use crate::journal::{JournalWriter, TripStorage};
use log::{error, info};
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

/// Owns the worker threads of a running capture
pub struct CaptureSession {
    signals: SharedSignals,
    trigger: ShutdownTrigger,
    gps_thread: Option<JoinHandle<Result<DispatchStats>>>,
    bus_thread: Option<JoinHandle<Result<()>>>,
}

fn join_worker<T>(handle: Option<JoinHandle<Result<T>>>, name: &str) -> Result<Option<T>> {
    let Some(handle) = handle else {
        return Ok(None);
    };

    match handle.join() {
        Ok(result) => result.map(Some),
        Err(_) => Err(JournalError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("{} thread panicked", name),
        ))),
    }
}

impl CaptureSession {
    /// Spawn the bus and GPS threads
    ///
    /// The journal writer is registered as the first fix observer; the signal
    /// handlers are registered on the bus before its thread starts. `gps_source`
    /// is read on its own thread so a silent device cannot block shutdown.
    pub fn start<R, B>(config: &CaptureConfig, gps_source: R, bus: B) -> Result<Self>
    where
        R: BufRead + Send + 'static,
        B: SignalBus + 'static,
    {
        let signals = SharedSignals::new(config.record_on_start);
        let (trigger, shutdown) = shutdown_channel();

        let mut bus_dispatcher = BusDispatcher::new(bus);
        SignalCapture::new(signals.clone(), config).register(&mut bus_dispatcher)?;

        let mut fix_dispatcher = FixDispatcher::new(LineFeed::spawn(gps_source, shutdown.clone())?);
        fix_dispatcher.add_observer(JournalWriter::new(
            signals.clone(),
            TripStorage::from_config(config),
            shutdown.clone(),
        ));

        let bus_shutdown = shutdown.clone();
        let bus_thread = thread::Builder::new()
            .name("bus-dispatch".to_string())
            .spawn(move || run_bus(bus_dispatcher, &bus_shutdown))?;

        let gps_thread = thread::Builder::new()
            .name("gps-reader".to_string())
            .spawn(move || run_gps(fix_dispatcher, &shutdown))?;

        info!(
            "capture started (recording on start: {})",
            config.record_on_start
        );

        Ok(Self {
            signals,
            trigger,
            gps_thread: Some(gps_thread),
            bus_thread: Some(bus_thread),
        })
    }

    pub fn signals(&self) -> &SharedSignals {
        &self.signals
    }

    /// Run until the GPS source closes, then stop the bus thread
    pub fn wait(mut self) -> Result<DispatchStats> {
        let gps = join_worker(self.gps_thread.take(), "gps-reader");
        self.trigger.fire();
        let bus = join_worker(self.bus_thread.take(), "bus-dispatch");
        finish(gps, bus)
    }

    /// Stop both threads
    ///
    /// A GPS read still blocked on the device is abandoned along with its
    /// reader thread.
    pub fn shutdown(mut self) -> Result<DispatchStats> {
        self.trigger.fire();
        let gps = join_worker(self.gps_thread.take(), "gps-reader");
        let bus = join_worker(self.bus_thread.take(), "bus-dispatch");
        finish(gps, bus)
    }
}

fn finish(gps: Result<Option<DispatchStats>>, bus: Result<Option<()>>) -> Result<DispatchStats> {
    if let Err(e) = bus {
        error!("bus thread failed: {}", e);
    }
    let stats = gps?.unwrap_or_default();
    info!(
        "capture stopped: {} fixes, {} malformed, {} write errors",
        stats.fixes, stats.malformed, stats.observer_errors
    );
    Ok(stats)
}

fn run_bus<B: SignalBus>(mut dispatcher: BusDispatcher<B>, shutdown: &ShutdownSignal) -> Result<()> {
    info!("bus thread started");
    let result = dispatcher.run(shutdown);
    if let Err(ref e) = result {
        error!("bus dispatch failed: {}", e);
    }
    info!("bus thread stopped after {} events", dispatcher.events_dispatched);
    result
}

fn run_gps<R: BufRead>(
    mut dispatcher: FixDispatcher<R>,
    shutdown: &ShutdownSignal,
) -> Result<DispatchStats> {
    info!("gps thread started");
    let result = dispatcher.run(shutdown);
    if let Err(ref e) = result {
        error!("gps read failed: {}", e);
    }
    // Dropping the dispatcher drops the writer, which closes any open trip file
    drop(dispatcher);
    info!("gps thread stopped");
    result
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.gps_thread.is_none() && self.bus_thread.is_none() {
            return;
        }
        self.trigger.fire();
        let gps = join_worker(self.gps_thread.take(), "gps-reader");
        let bus = join_worker(self.bus_thread.take(), "bus-dispatch");
        if let Err(e) = gps.and(bus) {
            error!("capture session ended with error: {}", e);
        }
    }
}
