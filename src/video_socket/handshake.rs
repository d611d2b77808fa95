use std::time::Duration;

use crate::rtp::RtpClock;
use crate::transport::TcpTransport;

use super::error::{Result, VideoSocketError};

/// 8-byte NTP epoch + 1-byte codec_id length + codec_id ASCII bytes.
struct HandshakeMessage<'a> {
    ntp_epoch: u64,
    codec_id: &'a str,
}

impl<'a> HandshakeMessage<'a> {
    fn encode(&self) -> Result<Vec<u8>> {
        let codec_bytes = self.codec_id.as_bytes();
        if codec_bytes.len() > u8::MAX as usize {
            return Err(VideoSocketError::CodecIdTooLong(codec_bytes.len()));
        }
        let mut buf = Vec::with_capacity(8 + 1 + codec_bytes.len());
        buf.extend_from_slice(&self.ntp_epoch.to_be_bytes());
        buf.push(codec_bytes.len() as u8);
        buf.extend_from_slice(codec_bytes);
        Ok(buf)
    }
}

struct DecodedHandshake {
    ntp_epoch: u64,
    codec_id: String,
}

fn read_handshake(conn: &mut TcpTransport) -> Result<DecodedHandshake> {
    let mut header = [0u8; 9];
    conn.receive_exact(&mut header)?;
    let ntp_epoch = u64::from_be_bytes(header[0..8].try_into().expect("8 bytes"));
    let codec_len = header[8] as usize;

    let mut codec_buf = vec![0u8; codec_len];
    conn.receive_exact(&mut codec_buf)?;
    let codec_id = String::from_utf8(codec_buf).map_err(|_| VideoSocketError::CodecIdNotUtf8)?;

    Ok(DecodedHandshake { ntp_epoch, codec_id })
}

fn write_handshake(conn: &mut TcpTransport, ntp_epoch: u64, codec_id: &str) -> Result<()> {
    let msg = HandshakeMessage { ntp_epoch, codec_id }.encode()?;
    conn.send(&msg)?;
    Ok(())
}

/// Server side of the handshake: send our epoch/codec_id first, then read
/// the client's mirror, and build the shared clock from our own epoch (the
/// server is the time authority the client aligns to).
pub fn server_handshake(
    conn: &mut TcpTransport,
    local_codec_id: &str,
    _timeout: Duration,
) -> Result<(RtpClock, String)> {
    let clock = RtpClock::new();
    write_handshake(conn, clock.ntp_epoch(), local_codec_id)?;
    let peer = read_handshake(conn)?;
    let _ = peer.ntp_epoch;
    Ok((clock, peer.codec_id))
}

/// Client side: read the server's epoch/codec_id, reconstruct a clock aligned
/// to it, then mirror back our own (fixed) codec_id.
pub fn client_handshake(
    conn: &mut TcpTransport,
    local_codec_id: &str,
    _timeout: Duration,
) -> Result<(RtpClock, String)> {
    let peer = read_handshake(conn)?;
    let clock = RtpClock::from_peer_ntp_epoch(peer.ntp_epoch);
    write_handshake(conn, clock.ntp_epoch(), local_codec_id)?;
    Ok((clock, peer.codec_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoopLogSink;
    use std::net::TcpListener;
    use std::sync::Arc;

    #[test]
    fn handshake_exchanges_codec_id_and_aligns_clocks() {
        let logger: Arc<dyn crate::log::log_sink::LogSink> = Arc::new(NoopLogSink);
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let server_logger = logger.clone();
        let server = std::thread::spawn(move || {
            let mut conn =
                TcpTransport::listen(addr.port(), Duration::from_secs(2), server_logger).unwrap();
            server_handshake(&mut conn, "h264", Duration::from_secs(2)).unwrap()
        });

        std::thread::sleep(Duration::from_millis(50));
        let mut client_conn = TcpTransport::connect(addr, Duration::from_secs(2), logger).unwrap();
        let (client_clock, server_codec_id) =
            client_handshake(&mut client_conn, "h264", Duration::from_secs(2)).unwrap();

        let (server_clock, client_codec_id) = server.join().unwrap();

        assert_eq!(server_codec_id, "h264");
        assert_eq!(client_codec_id, "h264");
        let a = server_clock.now();
        let b = client_clock.now();
        assert!((a - b).abs() <= 5, "a={a} b={b}");
    }

    #[test]
    fn overlong_codec_id_is_rejected() {
        let long_id = "x".repeat(300);
        let msg = HandshakeMessage { ntp_epoch: 0, codec_id: &long_id };
        assert!(matches!(msg.encode(), Err(VideoSocketError::CodecIdTooLong(300))));
    }
}
