use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::log::log_sink::LogSink;
use crate::media::{Depacketizer, Frame};
use crate::rtp::RtpClock;
use crate::sink_info;
use crate::transport::{RecvOutcome, TcpTransport, UdpTransport};

use super::error::Result;
use super::handshake;
use crate::config::Config;

/// The receiver side of a video session: owns the data-plane UDP socket and
/// drains it into an installed codec [`Depacketizer`] on every [`Self::update`].
pub struct ClientVideoSocket {
    udp: UdpTransport,
    logger: Arc<dyn LogSink>,
    clock: Option<RtpClock>,
    depacketizer: Option<Arc<dyn Depacketizer>>,
    stop: Arc<AtomicBool>,
    codec_id: &'static str,
}

impl ClientVideoSocket {
    pub fn new(udp_port: u16, logger: Arc<dyn LogSink>) -> Result<Self> {
        let udp = UdpTransport::bind(udp_port, logger.clone())?;
        Ok(Self {
            udp,
            logger,
            clock: None,
            depacketizer: None,
            stop: Arc::new(AtomicBool::new(false)),
            codec_id: "h264",
        })
    }

    /// Like [`Self::new`], binding the port read from `cfg`'s
    /// `[video_socket] client_udp_port` key (falling back to
    /// [`super::DEFAULT_CLIENT_UDP_PORT`]).
    pub fn new_from_config(cfg: &Config, logger: Arc<dyn LogSink>) -> Result<Self> {
        Self::new(super::client_udp_port(cfg), logger)
    }

    #[must_use]
    pub fn local_udp_addr(&self) -> Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn set_depacketizer(&mut self, depacketizer: Arc<dyn Depacketizer>) {
        self.codec_id = depacketizer.codec_id();
        self.depacketizer = Some(depacketizer);
    }

    /// Connects the TCP control channel to `server_tcp_addr` and mirrors the
    /// handshake: reads the server's NTP epoch/codec_id, reconstructs a clock
    /// aligned to it, and replies with its own codec_id.
    pub fn connect(&mut self, server_tcp_addr: SocketAddr, timeout: Duration) -> Result<()> {
        let mut conn = TcpTransport::connect(server_tcp_addr, timeout, self.logger.clone())?;
        let (clock, peer_codec_id) = handshake::client_handshake(&mut conn, self.codec_id, timeout)?;
        sink_info!(
            &self.logger,
            "video socket: handshake complete, peer codec_id = {peer_codec_id}"
        );
        self.clock = Some(clock);
        Ok(())
    }

    /// Like [`Self::connect`], reading the handshake timeout from `cfg`
    /// instead of requiring the caller to supply it.
    pub fn connect_from_config(&mut self, server_tcp_addr: SocketAddr, cfg: &Config) -> Result<()> {
        self.connect(server_tcp_addr, super::handshake_timeout(cfg))
    }

    #[must_use]
    pub fn clock(&self) -> Option<&RtpClock> {
        self.clock.as_ref()
    }

    /// Non-blockingly drains every datagram currently queued on the UDP
    /// socket into the installed depacketizer. Returns the number of
    /// datagrams consumed this call.
    pub fn update(&self) -> Result<usize> {
        let Some(depacketizer) = self.depacketizer.as_ref() else {
            return Ok(0);
        };
        let mut buf = [0u8; crate::media::depacketizer::JITTER_SLOT_MTU];
        let mut count = 0;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            match self.udp.receive_from(&mut buf)? {
                RecvOutcome::Ready((n, _from)) => {
                    depacketizer.add_packet(&buf[..n]);
                    count += 1;
                }
                RecvOutcome::WouldBlock | RecvOutcome::Closed => break,
            }
        }
        Ok(count)
    }

    /// Thin delegate to the depacketizer's mailbox.
    #[must_use]
    pub fn receive_packet(&self) -> Option<Frame> {
        self.depacketizer.as_ref()?.receive_frame_data()
    }

    pub fn release_frame_data(&self) {
        if let Some(d) = self.depacketizer.as_ref() {
            d.release_frame_data();
        }
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
