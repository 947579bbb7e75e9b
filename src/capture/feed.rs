//! Interruptible line source for the GPS thread
//!
//! A blocking serial read cannot be cancelled, so the device is read on a
//! detached helper thread that forwards whole lines over a channel. The GPS loop
//! reads from [`LineFeed`], which waits on both that channel and the shutdown
//! signal and reports end-of-stream when either closes.

use crate::capture::shutdown::ShutdownSignal;
use crossbeam::channel::{self, Receiver};
use crossbeam::select;
use log::debug;
use std::io::{self, BufRead, Read};
use std::thread;

/// Lines buffered between the reader thread and the GPS loop
const FEED_CAPACITY: usize = 64;

type LineResult = io::Result<Vec<u8>>;

/// Start a thread reading `source` line by line
///
/// The thread ends at end-of-stream, after a read error, or on its next line once
/// the returned receiver has been dropped. It is never joined.
pub fn spawn_line_reader<R>(mut source: R) -> io::Result<Receiver<LineResult>>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = channel::bounded(FEED_CAPACITY);

    thread::Builder::new()
        .name("gps-lines".to_string())
        .spawn(move || loop {
            let mut line = Vec::with_capacity(128);
            let message = match source.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => Ok(line),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = message.is_err();
            if sender.send(message).is_err() {
                debug!("gps line consumer gone");
                break;
            }
            if failed {
                break;
            }
        })?;

    Ok(receiver)
}

/// `BufRead` over the lines of a [`spawn_line_reader`] thread, cut short by shutdown
pub struct LineFeed {
    lines: Receiver<LineResult>,
    shutdown: ShutdownSignal,
    current: Vec<u8>,
    pos: usize,
}

impl LineFeed {
    pub fn new(lines: Receiver<LineResult>, shutdown: ShutdownSignal) -> Self {
        Self {
            lines,
            shutdown,
            current: Vec::new(),
            pos: 0,
        }
    }

    /// Spawn the reader thread for `source` and wrap its output
    pub fn spawn<R>(source: R, shutdown: ShutdownSignal) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Ok(Self::new(spawn_line_reader(source)?, shutdown))
    }
}

impl Read for LineFeed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for LineFeed {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.current.len() {
            select! {
                recv(self.lines) -> message => match message {
                    Ok(Ok(line)) => {
                        self.current = line;
                        self.pos = 0;
                    }
                    Ok(Err(e)) => return Err(e),
                    Err(_) => return Ok(&[]),
                },
                recv(self.shutdown.receiver()) -> _ => {
                    debug!("gps read interrupted by shutdown");
                    return Ok(&[]);
                }
            }
        }
        Ok(&self.current[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.current.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::shutdown::shutdown_channel;
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    /// Source whose reads block until the test releases them
    struct StalledSource {
        release: mpsc::Receiver<Vec<u8>>,
        current: Vec<u8>,
    }

    impl Read for StalledSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let available = self.fill_buf()?;
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            self.consume(n);
            Ok(n)
        }
    }

    impl BufRead for StalledSource {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            if self.current.is_empty() {
                self.current = self.release.recv().unwrap_or_default();
            }
            Ok(&self.current)
        }

        fn consume(&mut self, amt: usize) {
            self.current.drain(..amt);
        }
    }

    #[test]
    fn test_passes_lines_through() {
        let mut feed = LineFeed::spawn(Cursor::new("first\nsecond"), ShutdownSignal::never()).unwrap();

        let mut text = String::new();
        feed.read_to_string(&mut text).unwrap();
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn test_shutdown_ends_a_stalled_read() {
        let (release, stalled) = mpsc::channel();
        let source = StalledSource {
            release: stalled,
            current: Vec::new(),
        };
        let (mut trigger, shutdown) = shutdown_channel();
        let mut feed = LineFeed::spawn(source, shutdown).unwrap();

        release.send(b"$GPRMC,1\n".to_vec()).unwrap();
        let mut line = Vec::new();
        feed.read_until(b'\n', &mut line).unwrap();
        assert_eq!(line, b"$GPRMC,1\n");

        let started = Instant::now();
        let reader = std::thread::spawn(move || {
            let mut line = Vec::new();
            feed.read_until(b'\n', &mut line).map(|n| (n, line))
        });
        std::thread::sleep(Duration::from_millis(20));
        trigger.fire();

        let (n, line) = reader.join().unwrap().unwrap();
        assert_eq!(n, 0);
        assert!(line.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(release);
    }

    #[test]
    fn test_read_errors_are_forwarded() {
        struct Failing;

        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"))
            }
        }

        let mut feed =
            LineFeed::spawn(io::BufReader::new(Failing), ShutdownSignal::never()).unwrap();
        let err = feed.fill_buf().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
