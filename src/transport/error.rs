use std::fmt;
use std::io;

/// Errors surfaced by the UDP/TCP transport wrappers.
#[derive(Debug)]
pub enum TransportError {
    Io(io::Error),
    HandshakeTimedOut,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "transport I/O error: {e}"),
            Self::HandshakeTimedOut => write!(f, "TCP handshake timed out"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::HandshakeTimedOut => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
