//! Vehicle bus transport seam
//!
//! The live logger receives odometer and ignition signals from the head unit's
//! service bus. This module defines what the capture code needs from such a
//! transport ([`SignalBus`]), the dispatch loop that feeds registered filters
//! ([`BusDispatcher`]), and a line-oriented transport ([`LineBus`]) that carries
//! one signal per text line:
//!
//! ```text
//! com.jci.vbs.vdt OdoCount y 42
//! com.jci.vbs.vwm Ignition_Status n 5
//! ```
//!
//! The third column is the payload's type signature (`y` byte, `n` int16,
//! `q` uint16, `i` int32, `u` uint32, `s` string).

use crate::capture::shutdown::ShutdownSignal;
use crate::error::{JournalError, Result};
use log::{debug, info, warn};
use std::fmt;
use std::io::{BufRead, ErrorKind};

/// Typed payload of a bus signal
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Str(String),
}

impl SignalValue {
    /// Type signature character of the payload
    pub fn signature(&self) -> char {
        match self {
            SignalValue::Byte(_) => 'y',
            SignalValue::Int16(_) => 'n',
            SignalValue::UInt16(_) => 'q',
            SignalValue::Int32(_) => 'i',
            SignalValue::UInt32(_) => 'u',
            SignalValue::Str(_) => 's',
        }
    }

    /// Decode `text` according to the `signature` character
    pub fn parse(signature: char, text: &str) -> Option<Self> {
        let text = text.trim();
        match signature {
            'y' => text.parse().ok().map(SignalValue::Byte),
            'n' => text.parse().ok().map(SignalValue::Int16),
            'q' => text.parse().ok().map(SignalValue::UInt16),
            'i' => text.parse().ok().map(SignalValue::Int32),
            'u' => text.parse().ok().map(SignalValue::UInt32),
            's' => Some(SignalValue::Str(text.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Byte(v) => write!(f, "{}", v),
            SignalValue::Int16(v) => write!(f, "{}", v),
            SignalValue::UInt16(v) => write!(f, "{}", v),
            SignalValue::Int32(v) => write!(f, "{}", v),
            SignalValue::UInt32(v) => write!(f, "{}", v),
            SignalValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}

/// A named signal delivered by the bus
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub interface: String,
    pub member: String,
    pub value: SignalValue,
}

impl BusEvent {
    pub fn new(interface: &str, member: &str, value: SignalValue) -> Self {
        Self {
            interface: interface.to_string(),
            member: member.to_string(),
            value,
        }
    }

    pub fn is(&self, interface: &str, member: &str) -> bool {
        self.interface == interface && self.member == member
    }

    fn mismatch(&self, expected: char) -> JournalError {
        JournalError::TypeMismatch {
            signal: self.member.clone(),
            expected,
            actual: self.value.signature(),
        }
    }

    pub fn as_byte(&self) -> Result<u8> {
        match self.value {
            SignalValue::Byte(v) => Ok(v),
            _ => Err(self.mismatch('y')),
        }
    }

    pub fn as_int16(&self) -> Result<i16> {
        match self.value {
            SignalValue::Int16(v) => Ok(v),
            _ => Err(self.mismatch('n')),
        }
    }

    pub fn as_uint32(&self) -> Result<u32> {
        match self.value {
            SignalValue::UInt32(v) => Ok(v),
            _ => Err(self.mismatch('u')),
        }
    }

    /// Parse one `<interface> <member> <signature> <value>` line
    pub fn parse_line(line: &str) -> Option<Result<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut parts = line.splitn(4, char::is_whitespace);
        let (interface, member, signature, value) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(i), Some(m), Some(s), Some(v)) => (i, m, s, v),
                _ => {
                    return Some(Err(JournalError::Decode(format!(
                        "incomplete signal line: {:?}",
                        line
                    ))))
                }
            };

        let mut signature_chars = signature.chars();
        let value = match (signature_chars.next(), signature_chars.next()) {
            (Some(sig), None) => SignalValue::parse(sig, value),
            _ => None,
        };

        Some(value.map(|v| BusEvent::new(interface, member, v)).ok_or_else(|| {
            JournalError::Decode(format!("invalid signal payload: {:?}", line))
        }))
    }
}

/// Subscription to one signal, in bus match-rule form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub interface: String,
    pub member: String,
}

impl MatchRule {
    pub fn signal(interface: &str, member: &str) -> Self {
        Self {
            interface: interface.to_string(),
            member: member.to_string(),
        }
    }

    pub fn matches(&self, event: &BusEvent) -> bool {
        event.is(&self.interface, &self.member)
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type='signal',interface='{}',member='{}'",
            self.interface, self.member
        )
    }
}

/// Outcome of offering an event to one filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    Handled,
    NotYetHandled,
}

/// What the capture code requires from a bus transport
pub trait SignalBus: Send {
    /// Ask the transport to deliver signals matching `rule`
    fn add_match(&mut self, rule: MatchRule) -> Result<()>;

    /// Wait for the next subscribed signal
    ///
    /// `Ok(None)` means the transport's poll interval elapsed without a signal;
    /// `Err(StreamEnded)` means the transport disconnected.
    fn next_event(&mut self) -> Result<Option<BusEvent>>;
}

pub type SignalFilter = Box<dyn FnMut(&BusEvent) -> HandlerResult + Send>;

/// Runs the receive loop of a bus and offers each signal to the filters
pub struct BusDispatcher<B> {
    bus: B,
    filters: Vec<SignalFilter>,
    pub events_dispatched: u64,
}

impl<B: SignalBus> BusDispatcher<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            filters: Vec::new(),
            events_dispatched: 0,
        }
    }

    pub fn add_filter<F>(&mut self, filter: F)
    where
        F: FnMut(&BusEvent) -> HandlerResult + Send + 'static,
    {
        self.filters.push(Box::new(filter));
    }

    pub fn add_match(&mut self, rule: MatchRule) -> Result<()> {
        debug!("adding bus match {}", rule);
        self.bus.add_match(rule)
    }

    /// Offer `event` to the filters in registration order until one handles it
    pub fn dispatch(&mut self, event: &BusEvent) -> HandlerResult {
        self.events_dispatched += 1;
        for filter in self.filters.iter_mut() {
            if filter(event) == HandlerResult::Handled {
                return HandlerResult::Handled;
            }
        }
        HandlerResult::NotYetHandled
    }

    /// Dispatch until the bus disconnects or `shutdown` fires
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<()> {
        while !shutdown.is_triggered() {
            match self.bus.next_event() {
                Ok(Some(event)) => {
                    if self.dispatch(&event) == HandlerResult::NotYetHandled {
                        debug!("unhandled signal {}.{}", event.interface, event.member);
                    }
                }
                Ok(None) => {}
                Err(JournalError::StreamEnded) => {
                    info!("bus connection closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        info!("bus dispatch stopped");
        Ok(())
    }
}

/// Line-oriented bus transport over any buffered reader
pub struct LineBus<R> {
    reader: R,
    pending: Vec<u8>,
    rules: Vec<MatchRule>,
}

impl<R: BufRead> LineBus<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::with_capacity(64),
            rules: Vec::new(),
        }
    }

    fn is_subscribed(&self, event: &BusEvent) -> bool {
        self.rules.iter().any(|rule| rule.matches(event))
    }
}

#[cfg(unix)]
impl LineBus<std::io::BufReader<std::os::unix::net::UnixStream>> {
    /// Connect to a bus socket; reads time out after `poll_interval`
    pub fn connect(
        path: &std::path::Path,
        poll_interval: std::time::Duration,
    ) -> Result<Self> {
        let stream = std::os::unix::net::UnixStream::connect(path).map_err(|e| {
            JournalError::Configuration(format!(
                "failed to connect to service bus {}: {}",
                path.display(),
                e
            ))
        })?;
        stream.set_read_timeout(Some(poll_interval))?;
        Ok(Self::new(std::io::BufReader::new(stream)))
    }
}

impl<R: BufRead + Send> SignalBus for LineBus<R> {
    fn add_match(&mut self, rule: MatchRule) -> Result<()> {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
        Ok(())
    }

    fn next_event(&mut self) -> Result<Option<BusEvent>> {
        loop {
            // A timed out read keeps its partial line in `pending`
            let read = match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None)
                }
                Err(e) => return Err(e.into()),
            };

            if read == 0 && self.pending.is_empty() {
                return Err(JournalError::StreamEnded);
            }

            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();

            match BusEvent::parse_line(&line) {
                Some(Ok(event)) if self.is_subscribed(&event) => return Ok(Some(event)),
                Some(Ok(_)) | None => {}
                Some(Err(e)) => warn!("skipping bus line: {}", e),
            }
        }
    }
}
