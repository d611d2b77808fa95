use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::log::log_sink::LogSink;
use crate::media::Packetizer;
use crate::rtp::RtpClock;
use crate::sink_info;
use crate::transport::{TcpTransport, UdpTransport};

use super::error::{Result, VideoSocketError};
use super::handshake;
use super::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MTU};
use crate::config::Config;

/// The sender side of a video session: owns the data-plane UDP socket and
/// drives a codec [`Packetizer`] into it. One packetizer is installed per
/// session via [`Self::set_packetizer`]; `send_packet` both feeds it and
/// drains whatever packets are ready onto the wire.
pub struct ServerVideoSocket {
    udp: UdpTransport,
    logger: Arc<dyn LogSink>,
    clock: Option<RtpClock>,
    peer_udp_addr: Option<SocketAddr>,
    packetizer: Option<Box<dyn Packetizer>>,
    stop: Arc<AtomicBool>,
    codec_id: &'static str,
}

impl ServerVideoSocket {
    /// Binds the data-plane UDP socket. The TCP control channel is opened
    /// lazily by [`Self::listen`].
    pub fn new(udp_port: u16, logger: Arc<dyn LogSink>) -> Result<Self> {
        let udp = UdpTransport::bind(udp_port, logger.clone())?;
        Ok(Self {
            udp,
            logger,
            clock: None,
            peer_udp_addr: None,
            packetizer: None,
            stop: Arc::new(AtomicBool::new(false)),
            codec_id: "h264",
        })
    }

    /// Like [`Self::new`], binding the port read from `cfg`'s
    /// `[video_socket] server_udp_port` key (falling back to
    /// [`super::DEFAULT_SERVER_UDP_PORT`]).
    pub fn new_from_config(cfg: &Config, logger: Arc<dyn LogSink>) -> Result<Self> {
        Self::new(super::server_udp_port(cfg), logger)
    }

    #[must_use]
    pub fn local_udp_addr(&self) -> Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    /// Lets the caller share its stop flag with the `CrossProcessEvent`
    /// mechanism, so an external kill signal stops `send_packet` too.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn set_packetizer(&mut self, packetizer: Box<dyn Packetizer>) {
        self.codec_id = packetizer.codec_id();
        self.packetizer = Some(packetizer);
    }

    /// Opens the TCP control channel on `tcp_port`, waits (with `timeout`)
    /// for the client to connect, and runs the handshake: exchanges NTP
    /// epochs (this side is the time authority) and codec_ids. `peer_addr`
    /// is the client's data-plane UDP address, supplied by the caller the
    /// same way the client's TCP source address is — this crate's sockets
    /// don't learn the peer's data port from the TCP connection itself.
    pub fn listen(&mut self, tcp_port: u16, peer_addr: SocketAddr, timeout: Duration) -> Result<()> {
        let mut conn = TcpTransport::listen(tcp_port, timeout, self.logger.clone())?;
        let (clock, peer_codec_id) = handshake::server_handshake(&mut conn, self.codec_id, timeout)?;
        sink_info!(
            &self.logger,
            "video socket: handshake complete, peer codec_id = {peer_codec_id}"
        );
        self.clock = Some(clock);
        self.peer_udp_addr = Some(peer_addr);
        Ok(())
    }

    /// Like [`Self::listen`], reading `tcp_port` and the handshake timeout
    /// from `cfg` instead of requiring the caller to supply them.
    pub fn listen_from_config(&mut self, peer_addr: SocketAddr, cfg: &Config) -> Result<()> {
        self.listen(super::tcp_port(cfg), peer_addr, super::handshake_timeout(cfg))
    }

    #[must_use]
    pub fn clock(&self) -> Option<&RtpClock> {
        self.clock.as_ref()
    }

    /// Feeds `frame_bytes` (a full frame, or the next slice of one already in
    /// progress when `last` is false) to the installed packetizer and drains
    /// every ready datagram onto the UDP socket. Never blocks; returns as
    /// soon as the stop flag is observed or the packetizer's queue is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn send_packet(
        &mut self,
        frame_bytes: &[u8],
        frame_id: u32,
        end_of_stream: bool,
        sampling_ts: u32,
        pose_ts: u32,
        last: bool,
        save_frame: bool,
    ) -> Result<()> {
        let peer = self
            .peer_udp_addr
            .ok_or(VideoSocketError::NoCodecInstalled)?;
        let packetizer = self
            .packetizer
            .as_mut()
            .ok_or(VideoSocketError::NoCodecInstalled)?;

        packetizer
            .add_frame(frame_bytes, frame_id, end_of_stream, sampling_ts, pose_ts, save_frame, last)
            .map_err(VideoSocketError::Packetize)?;

        while let Some(datagram) = packetizer.create_next_packet() {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            self.udp.send_to(&datagram, peer)?;
        }
        Ok(())
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// UDP payload budget under this crate's default MTU, after the RTP header
/// and pose/frame-id prefix.
#[must_use]
pub fn max_payload_bytes() -> usize {
    payload_budget(DEFAULT_MTU)
}

/// Like [`max_payload_bytes`], but under the MTU configured in `cfg`'s
/// `[video_socket] mtu` key.
#[must_use]
pub fn max_payload_bytes_from_config(cfg: &Config) -> usize {
    payload_budget(super::mtu(cfg))
}

fn payload_budget(mtu: usize) -> usize {
    mtu.saturating_sub(crate::rtp::header::HEADER_LEN)
        .saturating_sub(crate::rtp::payload_prefix::PREFIX_LEN)
}

#[allow(dead_code)]
const _KEEP_TIMEOUT_CONST_REACHABLE: Duration = DEFAULT_HANDSHAKE_TIMEOUT;
