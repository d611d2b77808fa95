/// The sender side: owns the packetizer and the outbound UDP socket.
pub mod server;
/// The receiver side: owns the depacketizer and the inbound UDP socket.
pub mod client;
/// Error type for handshake and socket setup failures.
pub mod error;
/// The TCP NTP-epoch/codec_id handshake shared by both sides.
pub mod handshake;

use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

pub use client::ClientVideoSocket;
pub use error::VideoSocketError;
pub use server::ServerVideoSocket;

/// Server-side default UDP data port.
pub const DEFAULT_SERVER_UDP_PORT: u16 = 5590;
/// Client-side default UDP data port.
pub const DEFAULT_CLIENT_UDP_PORT: u16 = 5591;
/// Default TCP control port (server-bound).
pub const DEFAULT_TCP_PORT: u16 = 5591;
/// Default handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = crate::transport::tcp::DEFAULT_HANDSHAKE_TIMEOUT;
/// Default link MTU budget handed to packetizers (already net of the 28
/// bytes of IP/UDP headers the wire-level 1500-byte MTU spends).
pub const DEFAULT_MTU: usize = 1472;

/// Resolves the `[video_socket] server_udp_port` key, falling back to
/// [`DEFAULT_SERVER_UDP_PORT`].
#[must_use]
pub fn server_udp_port(cfg: &Config) -> u16 {
    cfg.get_parsed("video_socket", "server_udp_port", DEFAULT_SERVER_UDP_PORT)
}

/// Resolves the `[video_socket] client_udp_port` key, falling back to
/// [`DEFAULT_CLIENT_UDP_PORT`].
#[must_use]
pub fn client_udp_port(cfg: &Config) -> u16 {
    cfg.get_parsed("video_socket", "client_udp_port", DEFAULT_CLIENT_UDP_PORT)
}

/// Resolves the `[video_socket] tcp_port` key, falling back to [`DEFAULT_TCP_PORT`].
#[must_use]
pub fn tcp_port(cfg: &Config) -> u16 {
    cfg.get_parsed("video_socket", "tcp_port", DEFAULT_TCP_PORT)
}

/// Resolves the `[video_socket] handshake_timeout_secs` key, falling back to
/// [`DEFAULT_HANDSHAKE_TIMEOUT`].
#[must_use]
pub fn handshake_timeout(cfg: &Config) -> Duration {
    Duration::from_secs(cfg.get_parsed(
        "video_socket",
        "handshake_timeout_secs",
        DEFAULT_HANDSHAKE_TIMEOUT.as_secs(),
    ))
}

/// Resolves the `[video_socket] mtu` key, falling back to [`DEFAULT_MTU`].
#[must_use]
pub fn mtu(cfg: &Config) -> usize {
    cfg.get_parsed("video_socket", "mtu", DEFAULT_MTU)
}

/// Resolves the `[video_socket] plugin_dir` key, if set.
#[must_use]
pub fn plugin_dir(cfg: &Config) -> Option<PathBuf> {
    cfg.get_non_empty("video_socket", "plugin_dir").map(PathBuf::from)
}
