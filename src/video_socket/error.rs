use std::fmt;

use crate::transport::TransportError;

/// Errors surfaced by [`super::ServerVideoSocket`]/[`super::ClientVideoSocket`].
#[derive(Debug)]
pub enum VideoSocketError {
    Transport(TransportError),
    /// The codec_id exchanged during the handshake exceeded the 1-byte length prefix.
    CodecIdTooLong(usize),
    /// The peer's codec_id bytes were not valid ASCII/UTF-8.
    CodecIdNotUtf8,
    /// `send_packet`/`update` was called before a packetizer/depacketizer was installed.
    NoCodecInstalled,
    /// The installed packetizer rejected the frame passed to `send_packet`.
    Packetize(crate::media::error::MediaError),
}

impl fmt::Display for VideoSocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::CodecIdTooLong(len) => {
                write!(f, "codec_id is {len} bytes, longer than the 255-byte handshake limit")
            }
            Self::CodecIdNotUtf8 => write!(f, "peer sent a non-UTF-8 codec_id"),
            Self::NoCodecInstalled => write!(f, "no packetizer/depacketizer installed"),
            Self::Packetize(e) => write!(f, "packetizer rejected frame: {e}"),
        }
    }
}

impl std::error::Error for VideoSocketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Packetize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for VideoSocketError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

pub type Result<T> = std::result::Result<T, VideoSocketError>;
