//! Live capture: GPS fix dispatch, bus signal handling and their shared state

pub mod bus;
pub mod dispatcher;
pub mod feed;
pub mod session;
pub mod shutdown;
pub mod signals;

pub use bus::{BusDispatcher, BusEvent, HandlerResult, LineBus, MatchRule, SignalBus, SignalValue};
pub use dispatcher::{DispatchStats, FixDispatcher, FixObserver};
pub use feed::LineFeed;
pub use session::CaptureSession;
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use signals::{SharedSignals, SignalCapture, SignalSnapshot, SignalState};
