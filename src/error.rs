use std::fmt;
use std::path::PathBuf;

/// Error conditions raised while capturing or replaying trip journals
#[derive(Debug)]
pub enum JournalError {
    /// I/O errors
    Io(std::io::Error),
    /// The line source (serial device or bus transport) has been exhausted
    StreamEnded,
    /// One RMC/GGA cycle could not be turned into a fix
    MalformedFix(String),
    /// A bus event carried a payload of an unexpected type
    TypeMismatch {
        signal: String,
        expected: char,
        actual: char,
    },
    /// A persisted trip record could not be decoded
    Decode(String),
    /// The storage root never became available
    ResourceUnavailable(PathBuf),
    /// A collaborator (GPS device, bus transport) could not be set up
    Configuration(String),
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalError::Io(err) => write!(f, "I/O error: {}", err),
            JournalError::StreamEnded => write!(f, "Stream ended"),
            JournalError::MalformedFix(msg) => write!(f, "Malformed fix: {}", msg),
            JournalError::TypeMismatch {
                signal,
                expected,
                actual,
            } => write!(
                f,
                "Received unexpected type for {}: expected '{}', got '{}'",
                signal, expected, actual
            ),
            JournalError::Decode(msg) => write!(f, "Failed to decode trip log: {}", msg),
            JournalError::ResourceUnavailable(path) => {
                write!(f, "Storage root unavailable: {}", path.display())
            }
            JournalError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JournalError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JournalError {
    fn from(err: std::io::Error) -> Self {
        JournalError::Io(err)
    }
}

impl From<prost::DecodeError> for JournalError {
    fn from(err: prost::DecodeError) -> Self {
        JournalError::Decode(err.to_string())
    }
}

impl JournalError {
    /// True for the end-of-source condition that terminates a loop normally
    pub fn is_stream_end(&self) -> bool {
        matches!(self, JournalError::StreamEnded)
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
