//! Capture session configuration
//!
//! Defaults describe the head unit the logger was built for: the GPS receiver on
//! the third UART, the service bus socket in `/tmp`, and trip files on the
//! navigation SD card.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GPS_DEVICE: &str = "/dev/ttymxc2";
pub const DEFAULT_BUS_SOCKET: &str = "/tmp/dbus_service_socket";
pub const DEFAULT_STORAGE_ROOT: &str = "/mnt/sd_nav/mods";
pub const DEFAULT_TRIPS_DIR: &str = "trips";

/// `Ignition_Status` value reported while the engine is running
pub const IGNITION_RUNNING: i16 = 5;
/// `Ignition_Status` value reported when the ignition is switched off
pub const IGNITION_OFF: i16 = 1;

/// Settings for a live capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub gps_device: PathBuf,
    pub bus_socket: PathBuf,
    /// Mount point that must exist before a trip file is created
    pub storage_root: PathBuf,
    /// Directory below `storage_root` holding the trip files
    pub trips_dir: String,
    /// First delay between storage root checks
    pub mount_poll_initial: Duration,
    /// Upper bound for the storage root check delay
    pub mount_poll_max: Duration,
    /// Read timeout of the bus transport, bounds shutdown latency of the bus thread
    pub bus_poll_interval: Duration,
    /// Whether fixes are recorded before the first ignition event arrives
    pub record_on_start: bool,
    pub ignition_running: i16,
    pub ignition_off: i16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            gps_device: PathBuf::from(DEFAULT_GPS_DEVICE),
            bus_socket: PathBuf::from(DEFAULT_BUS_SOCKET),
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            trips_dir: DEFAULT_TRIPS_DIR.to_string(),
            mount_poll_initial: Duration::from_millis(50),
            mount_poll_max: Duration::from_secs(2),
            bus_poll_interval: Duration::from_millis(250),
            record_on_start: true,
            ignition_running: IGNITION_RUNNING,
            ignition_off: IGNITION_OFF,
        }
    }
}

impl CaptureConfig {
    /// Directory the trip files are written to
    pub fn trips_path(&self) -> PathBuf {
        self.storage_root.join(&self.trips_dir)
    }
}
