use std::fmt;

/// Errors that can occur while decoding an RTP packet or its fixed payload prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtpError {
    /// Buffer shorter than the 12-byte fixed RTP header.
    TooShort,
    /// Version field was not 2.
    BadVersion(u8),
    /// Buffer shorter than the 9-byte pose/frame-id/flags prefix that follows the header.
    PrefixTooShort,
}

impl fmt::Display for RtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "buffer too short for an RTP header"),
            Self::BadVersion(v) => write!(f, "bad RTP version: {v}"),
            Self::PrefixTooShort => write!(f, "buffer too short for the pose/frame-id prefix"),
        }
    }
}

impl std::error::Error for RtpError {}

pub type Result<T> = std::result::Result<T, RtpError>;
