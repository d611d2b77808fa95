use std::fmt;

use crate::rtp::RtpError;

/// Errors surfaced by packetizers and depacketizers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Malformed RTP datagram (bad header, truncated prefix).
    Rtp(RtpError),
    /// A frame handed to the packetizer was empty.
    EmptyFrame,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rtp(e) => write!(f, "{e}"),
            Self::EmptyFrame => write!(f, "frame has no payload bytes"),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<RtpError> for MediaError {
    fn from(e: RtpError) -> Self {
        Self::Rtp(e)
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
