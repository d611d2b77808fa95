/// Error type shared by the UDP and TCP wrappers.
pub mod error;
/// The `{Ready, WouldBlock, Closed}` outcome shared by non-blocking reads.
pub mod result;
/// Blocking TCP wrapper, used only for the video socket handshake.
pub mod tcp;
/// Non-blocking UDP wrapper, used for the steady-state RTP flow.
pub mod udp;

pub use error::TransportError;
pub use result::RecvOutcome;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;
