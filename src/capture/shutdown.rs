//! Shutdown handshake shared by the capture threads
//!
//! The trigger owns the sending half of a channel that never carries a message;
//! dropping it disconnects every receiver at once, which is what the worker
//! threads poll for.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Fires the shutdown signal when [`fire`](Self::fire) is called or on drop
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: Option<Sender<()>>,
}

/// Cloneable view of the shutdown state held by each worker
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: Receiver<()>,
}

/// Create a connected trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = channel::bounded(0);
    (
        ShutdownTrigger {
            sender: Some(sender),
        },
        ShutdownSignal { receiver },
    )
}

impl ShutdownTrigger {
    pub fn fire(&mut self) {
        self.sender.take();
    }

    pub fn has_fired(&self) -> bool {
        self.sender.is_none()
    }
}

impl ShutdownSignal {
    /// A signal that never fires, for offline use of the writer
    pub fn never() -> Self {
        Self {
            receiver: channel::never(),
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(
            self.receiver.try_recv(),
            Ok(()) | Err(TryRecvError::Disconnected)
        )
    }

    /// Receiver that becomes ready (disconnected) once shutdown fires, for `select!`
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Block for at most `timeout`; returns true if shutdown fired meanwhile
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(
            self.receiver.recv_timeout(timeout),
            Err(RecvTimeoutError::Timeout)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fire_reaches_all_clones() {
        let (mut trigger, signal) = shutdown_channel();
        let other = signal.clone();
        assert!(!signal.is_triggered());
        assert!(!other.wait_timeout(Duration::from_millis(1)));

        trigger.fire();
        assert!(trigger.has_fired());
        assert!(signal.is_triggered());
        assert!(other.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_drop_fires() {
        let (trigger, signal) = shutdown_channel();
        let waiter = thread::spawn(move || signal.wait_timeout(Duration::from_secs(30)));
        drop(trigger);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_never_times_out() {
        let signal = ShutdownSignal::never();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert!(!signal.is_triggered());
    }
}
