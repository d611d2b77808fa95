/// RTP clock: monotonic/wall/NTP triple-epoch tracking and peer reconstruction.
pub mod clock;
/// Error type shared by header and payload-prefix decoding.
pub mod error;
/// The fixed 12-byte RTP header.
pub mod header;
/// A full RTP datagram (header + payload).
pub mod packet;
/// The 9-byte pose-timestamp/frame-id/flags prefix carried in every payload.
pub mod payload_prefix;

pub use clock::RtpClock;
pub use error::RtpError;
pub use header::RtpHeader;
pub use packet::RtpPacket;
pub use payload_prefix::PayloadPrefix;
