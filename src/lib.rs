//! A wireless VR bridge's media transport core: RTP packetization and
//! depacketization, the jitter buffer that reassembles frames out of a lossy
//! UDP stream, a clock synchronized across steady/wall/NTP time bases, and
//! the paired UDP/TCP video socket that composes all of the above with a
//! pluggable codec module registry.

/// Interface-only cross-process event/mutex primitives, plus an in-process stand-in.
pub mod ipc;
/// Logging utilities for the application.
pub mod log;
/// Codec-agnostic RTP packetization, depacketization and the jitter buffer.
pub mod media;
/// The codec module registry (built-in H.264 plus dynamically-loaded plugins).
pub mod registry;
/// RTP wire codec (header, payload prefix, packet) and the multi-base clock.
pub mod rtp;
/// Non-blocking UDP / TCP transport wrappers used by the video socket.
pub mod transport;
/// `ServerVideoSocket`/`ClientVideoSocket`: the paired sender/receiver built
/// on the transport and media layers.
pub mod video_socket;

/// Handles configuration loading and management.
pub mod config;
