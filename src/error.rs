use std::fmt;
use std::io;

/// Errors raised while driving the LED register
#[derive(Debug)]
pub enum Error {
    /// Serial device could not be opened
    DeviceOpen {
        port: String,
        source: serialport::Error,
    },
    /// A frame could not be written or flushed
    Write(io::Error),
    /// Brightness level outside 0..=8
    InvalidLevel(u8),
    /// Malformed configuration value
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DeviceOpen { port, source } => {
                write!(f, "failed to open serial port {}: {}", port, source)
            }
            Error::Write(e) => write!(f, "failed to write frame: {}", e),
            Error::InvalidLevel(level) => {
                write!(f, "invalid brightness level {} (expected 0..=8)", level)
            }
            Error::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DeviceOpen { source, .. } => Some(source),
            Error::Write(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Write(e)
    }
}
