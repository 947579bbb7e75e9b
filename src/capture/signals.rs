//! Vehicle signal state shared between the bus thread and the GPS thread
//!
//! Every access goes through [`SharedSignals`], whose methods are the only
//! critical sections: each takes the lock, touches a few scalars and releases it.

use crate::capture::bus::{BusDispatcher, BusEvent, HandlerResult, MatchRule, SignalBus};
use crate::config::CaptureConfig;
use crate::error::Result;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const VDT_INTERFACE: &str = "com.jci.vbs.vdt";
pub const VWM_INTERFACE: &str = "com.jci.vbs.vwm";
pub const ODO_COUNT: &str = "OdoCount";
pub const TOTAL_DISTANCE: &str = "Total_Distance";
pub const IGNITION_STATUS: &str = "Ignition_Status";

/// Counters maintained from bus signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalState {
    /// Vehicle is in a loggable drive state
    pub recording: bool,
    /// Last raw value of the wrapping tick counter
    pub last_tick_byte: u8,
    /// Tick delta accumulated since the journal last consumed it
    pub ticks_since_reset: u32,
    /// Last absolute distance reading
    pub odometer: u32,
}

/// What the journal takes from the signal state for one fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub recording: bool,
    pub ticks: u32,
    pub odometer: u32,
}

/// Handle to the mutex-guarded [`SignalState`] of one capture session
#[derive(Debug, Clone, Default)]
pub struct SharedSignals {
    inner: Arc<Mutex<SignalState>>,
}

impl SharedSignals {
    pub fn new(recording: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalState {
                recording,
                ..SignalState::default()
            })),
        }
    }

    // Critical sections only assign scalars, a poisoned state is still consistent
    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accumulate the wrapping 8-bit distance from the last tick reading
    pub fn record_tick(&self, value: u8) -> u8 {
        let mut state = self.lock();
        let diff = value.wrapping_sub(state.last_tick_byte);
        state.last_tick_byte = value;
        state.ticks_since_reset = state.ticks_since_reset.wrapping_add(diff as u32);
        diff
    }

    pub fn set_odometer(&self, value: u32) {
        self.lock().odometer = value;
    }

    pub fn ignition_running(&self) {
        self.lock().recording = true;
    }

    /// Stop recording; the tick baseline restarts so the next trip has no spurious delta
    pub fn ignition_off(&self) {
        let mut state = self.lock();
        state.recording = false;
        state.last_tick_byte = 0;
    }

    /// Read the state for one fix and zero the accumulated ticks
    pub fn take_snapshot(&self) -> SignalSnapshot {
        let mut state = self.lock();
        let snapshot = SignalSnapshot {
            recording: state.recording,
            ticks: state.ticks_since_reset,
            odometer: state.odometer,
        };
        state.ticks_since_reset = 0;
        snapshot
    }

    /// Copy of the current state
    pub fn state(&self) -> SignalState {
        *self.lock()
    }
}

/// Bus signal handlers feeding a [`SharedSignals`]
#[derive(Debug, Clone)]
pub struct SignalCapture {
    signals: SharedSignals,
    ignition_running: i16,
    ignition_off: i16,
}

impl SignalCapture {
    pub fn new(signals: SharedSignals, config: &CaptureConfig) -> Self {
        Self {
            signals,
            ignition_running: config.ignition_running,
            ignition_off: config.ignition_off,
        }
    }

    pub fn handle_odo_count(&self, event: &BusEvent) -> HandlerResult {
        if !event.is(VDT_INTERFACE, ODO_COUNT) {
            return HandlerResult::NotYetHandled;
        }

        match event.as_byte() {
            Ok(value) => {
                let diff = self.signals.record_tick(value);
                debug!("OdoCount = {} (+{})", value, diff);
                HandlerResult::Handled
            }
            Err(e) => {
                warn!("{}", e);
                HandlerResult::NotYetHandled
            }
        }
    }

    pub fn handle_total_distance(&self, event: &BusEvent) -> HandlerResult {
        if !event.is(VDT_INTERFACE, TOTAL_DISTANCE) {
            return HandlerResult::NotYetHandled;
        }

        match event.as_uint32() {
            Ok(value) => {
                debug!("Total_Distance = {}", value);
                self.signals.set_odometer(value);
                HandlerResult::Handled
            }
            Err(e) => {
                warn!("{}", e);
                HandlerResult::NotYetHandled
            }
        }
    }

    pub fn handle_ignition(&self, event: &BusEvent) -> HandlerResult {
        if !event.is(VWM_INTERFACE, IGNITION_STATUS) {
            return HandlerResult::NotYetHandled;
        }

        match event.as_int16() {
            Ok(value) => {
                debug!("Ignition_Status = {}", value);
                if value == self.ignition_running {
                    self.signals.ignition_running();
                } else if value == self.ignition_off {
                    self.signals.ignition_off();
                }
                HandlerResult::Handled
            }
            Err(e) => {
                warn!("{}", e);
                HandlerResult::NotYetHandled
            }
        }
    }

    /// Install the three handlers and subscribe to their signals
    pub fn register<B: SignalBus>(&self, dispatcher: &mut BusDispatcher<B>) -> Result<()> {
        let odo = self.clone();
        dispatcher.add_filter(move |event: &BusEvent| odo.handle_odo_count(event));

        let distance = self.clone();
        dispatcher.add_filter(move |event: &BusEvent| distance.handle_total_distance(event));

        let ignition = self.clone();
        dispatcher.add_filter(move |event: &BusEvent| ignition.handle_ignition(event));

        dispatcher.add_match(MatchRule::signal(VDT_INTERFACE, ODO_COUNT))?;
        dispatcher.add_match(MatchRule::signal(VDT_INTERFACE, TOTAL_DISTANCE))?;
        dispatcher.add_match(MatchRule::signal(VWM_INTERFACE, IGNITION_STATUS))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::bus::{LineBus, SignalValue};
    use crate::capture::shutdown::ShutdownSignal;
    use std::io::Cursor;

    fn capture() -> (SharedSignals, SignalCapture) {
        let signals = SharedSignals::new(false);
        let capture = SignalCapture::new(signals.clone(), &CaptureConfig::default());
        (signals, capture)
    }

    fn tick(value: u8) -> BusEvent {
        BusEvent::new(VDT_INTERFACE, ODO_COUNT, SignalValue::Byte(value))
    }

    fn ignition(value: i16) -> BusEvent {
        BusEvent::new(VWM_INTERFACE, IGNITION_STATUS, SignalValue::Int16(value))
    }

    #[test]
    fn test_tick_wraparound() {
        let (signals, capture) = capture();
        capture.handle_odo_count(&tick(250));
        signals.take_snapshot();

        assert_eq!(capture.handle_odo_count(&tick(3)), HandlerResult::Handled);
        let state = signals.state();
        assert_eq!(state.ticks_since_reset, 9);
        assert_eq!(state.last_tick_byte, 3);
    }

    #[test]
    fn test_rollover_by_one() {
        let (signals, _) = capture();
        signals.record_tick(255);
        assert_eq!(signals.record_tick(0), 1);
    }

    #[test]
    fn test_ignition_off_resets_tick_baseline() {
        let (signals, capture) = capture();
        capture.handle_ignition(&ignition(5));
        capture.handle_odo_count(&tick(200));
        signals.take_snapshot();

        capture.handle_ignition(&ignition(1));
        assert!(!signals.state().recording);
        assert_eq!(signals.state().last_tick_byte, 0);

        capture.handle_odo_count(&tick(17));
        assert_eq!(signals.take_snapshot().ticks, 17);
    }

    #[test]
    fn test_unknown_ignition_value_is_ignored() {
        let (signals, capture) = capture();
        capture.handle_ignition(&ignition(5));
        capture.handle_odo_count(&tick(40));

        assert_eq!(capture.handle_ignition(&ignition(3)), HandlerResult::Handled);
        let state = signals.state();
        assert!(state.recording);
        assert_eq!(state.last_tick_byte, 40);
    }

    #[test]
    fn test_type_mismatch_is_ignored() {
        let (signals, capture) = capture();
        let wrong = BusEvent::new(VDT_INTERFACE, ODO_COUNT, SignalValue::UInt32(12));
        assert_eq!(capture.handle_odo_count(&wrong), HandlerResult::NotYetHandled);

        let wrong = BusEvent::new(VDT_INTERFACE, TOTAL_DISTANCE, SignalValue::Byte(12));
        assert_eq!(
            capture.handle_total_distance(&wrong),
            HandlerResult::NotYetHandled
        );
        assert_eq!(signals.state(), SignalState::default());
    }

    #[test]
    fn test_handlers_ignore_other_signals() {
        let (_, capture) = capture();
        assert_eq!(capture.handle_ignition(&tick(1)), HandlerResult::NotYetHandled);
        assert_eq!(
            capture.handle_total_distance(&ignition(5)),
            HandlerResult::NotYetHandled
        );
    }

    #[test]
    fn test_snapshot_resets_ticks_only() {
        let signals = SharedSignals::new(true);
        signals.record_tick(10);
        signals.set_odometer(123_456);

        let snapshot = signals.take_snapshot();
        assert_eq!(
            snapshot,
            SignalSnapshot {
                recording: true,
                ticks: 10,
                odometer: 123_456
            }
        );

        let again = signals.take_snapshot();
        assert_eq!(again.ticks, 0);
        assert_eq!(again.odometer, 123_456);
    }

    #[test]
    fn test_registered_handlers_through_bus() {
        let feed = "\
com.jci.vbs.vwm Ignition_Status n 5
com.jci.vbs.vdt OdoCount y 4
com.jci.vbs.vdt Total_Distance u 98765
com.jci.vbs.vdt OdoCount y 6
";
        let (signals, capture) = capture();
        let mut dispatcher = BusDispatcher::new(LineBus::new(Cursor::new(feed)));
        capture.register(&mut dispatcher).unwrap();
        dispatcher.run(&ShutdownSignal::never()).unwrap();

        let state = signals.state();
        assert!(state.recording);
        assert_eq!(state.ticks_since_reset, 6);
        assert_eq!(state.odometer, 98765);
    }
}
