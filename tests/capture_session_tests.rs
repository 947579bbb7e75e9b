//! Integration tests for threaded capture sessions
//!
//! - `wait` returns once the GPS source closes, even if the bus never does
//! - `shutdown` stops a session whose storage never becomes available
//! - `shutdown` returns while the GPS device read is still blocked
//! - Bus signals delivered on their own thread reach the shared state

use drive_journal::capture::MatchRule;
use drive_journal::{
    decode_trip_log, BusEvent, CaptureConfig, CaptureSession, LineBus, SignalBus, SignalValue,
};
use std::io::{self, BufRead, Cursor, Read};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FEED: &str = "\
$GPRMC,010203,A,5130.000,N,00007.500,W,5.0,180.0,010116,,*00
$GPGGA,010203,5130.000,N,00007.500,W,1,06,1.2,35.0,M,,,,*00
$GPRMC,010204,A,5130.001,N,00007.500,W,5.5,180.0,010116,,*00
$GPGGA,010204,5130.001,N,00007.500,W,1,06,1.2,35.5,M,,,,*00
";

/// Bus that stays connected until told otherwise, delivering queued events
struct ChannelBus {
    events: mpsc::Receiver<BusEvent>,
    rules: Vec<MatchRule>,
}

impl ChannelBus {
    fn new() -> (mpsc::Sender<BusEvent>, Self) {
        let (sender, events) = mpsc::channel();
        (
            sender,
            Self {
                events,
                rules: Vec::new(),
            },
        )
    }
}

impl SignalBus for ChannelBus {
    fn add_match(&mut self, rule: MatchRule) -> drive_journal::Result<()> {
        self.rules.push(rule);
        Ok(())
    }

    fn next_event(&mut self) -> drive_journal::Result<Option<BusEvent>> {
        match self.events.recv_timeout(Duration::from_millis(5)) {
            Ok(event) if self.rules.iter().any(|r| r.matches(&event)) => Ok(Some(event)),
            Ok(_) | Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(drive_journal::JournalError::StreamEnded)
            }
        }
    }
}

fn config(root: &std::path::Path) -> CaptureConfig {
    CaptureConfig {
        storage_root: root.to_path_buf(),
        mount_poll_initial: Duration::from_millis(1),
        mount_poll_max: Duration::from_millis(10),
        ..CaptureConfig::default()
    }
}

#[test]
fn test_wait_returns_when_gps_closes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (_sender, bus) = ChannelBus::new();

    let session = CaptureSession::start(&config(temp_dir.path()), Cursor::new(FEED), bus)
        .expect("Session should start");
    let stats = session.wait().expect("Session should end cleanly");
    assert_eq!(stats.fixes, 2);

    let trip = temp_dir.path().join("trips").join("2016-1-1T1-2-3");
    let records = decode_trip_log(&std::fs::read(trip).expect("Trip file should exist")).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].location.altitude, 35.5);
}

#[test]
fn test_shutdown_cancels_storage_wait() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir.path().join("not-mounted"));
    let (_sender, bus) = ChannelBus::new();

    let started = Instant::now();
    let session = CaptureSession::start(&config, Cursor::new(FEED), bus).unwrap();
    thread::sleep(Duration::from_millis(30));
    let stats = session.shutdown().expect("Shutdown should succeed");

    assert!(started.elapsed() < Duration::from_secs(5));
    // The first fix was waiting for storage when shutdown fired
    assert_eq!(stats.observer_errors, stats.fixes);
    assert!(!temp_dir.path().join("not-mounted").exists());
}

#[test]
fn test_bus_thread_updates_shared_state() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(temp_dir.path());
    config.record_on_start = false;
    let (sender, bus) = ChannelBus::new();

    // GPS source that closes immediately so only the bus thread does work
    let session = CaptureSession::start(&config, Cursor::new(""), bus).unwrap();
    sender
        .send(BusEvent::new(
            "com.jci.vbs.vwm",
            "Ignition_Status",
            SignalValue::Int16(5),
        ))
        .unwrap();
    sender
        .send(BusEvent::new(
            "com.jci.vbs.vdt",
            "Total_Distance",
            SignalValue::UInt32(4242),
        ))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while session.signals().state().odometer != 4242 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    let state = session.signals().state();
    assert!(state.recording);
    assert_eq!(state.odometer, 4242);
    session.shutdown().unwrap();
}

#[test]
fn test_line_bus_session_ends_with_gps() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bus = LineBus::new(Cursor::new("com.jci.vbs.vdt OdoCount y 3\n"));

    let session = CaptureSession::start(&config(temp_dir.path()), Cursor::new(FEED), bus).unwrap();
    assert_eq!(session.wait().unwrap().fixes, 2);
}

/// GPS device that delivers one fix and then never returns from its next read
struct SilentDevice {
    data: Vec<u8>,
    pos: usize,
    hold: mpsc::Receiver<()>,
}

impl Read for SilentDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for SilentDevice {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.data.len() {
            // Blocks until the test drops its sender
            let _ = self.hold.recv();
            return Ok(&[]);
        }
        Ok(&self.data[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos += amt;
    }
}

#[test]
fn test_shutdown_returns_while_gps_read_blocks() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (hold, held) = mpsc::channel::<()>();
    let device = SilentDevice {
        data: FEED.lines().take(2).map(|l| format!("{l}\n")).collect::<String>().into_bytes(),
        pos: 0,
        hold: held,
    };
    let (_sender, bus) = ChannelBus::new();

    let session = CaptureSession::start(&config(temp_dir.path()), device, bus).unwrap();

    // Wait for the first fix to be written, after which the device stalls
    let trip = temp_dir.path().join("trips").join("2016-1-1T1-2-3");
    let deadline = Instant::now() + Duration::from_secs(5);
    while !trip.exists() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    thread::sleep(Duration::from_millis(20));

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = done_tx.send(session.shutdown());
    });

    let stats = done_rx
        .recv_timeout(Duration::from_secs(3))
        .expect("Shutdown should not wait for the blocked device read")
        .expect("Shutdown should succeed");
    assert_eq!(stats.fixes, 1);

    let records = decode_trip_log(&std::fs::read(trip).unwrap()).unwrap();
    assert_eq!(records.len(), 1);
    drop(hold);
}
