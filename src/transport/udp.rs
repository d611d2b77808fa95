use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use crate::log::log_sink::LogSink;
use crate::sink_trace;

use super::error::Result;
use super::result::RecvOutcome;

/// A non-blocking UDP socket. `send_to`/`receive_from` never block; callers
/// poll on whatever cadence suits them (the video socket's update loop).
pub struct UdpTransport {
    sock: UdpSocket,
    logger: Arc<dyn LogSink>,
}

impl UdpTransport {
    /// Binds on `INADDR_ANY` at `port`, or an ephemeral port if `port == 0`.
    pub fn bind(port: u16, logger: Arc<dyn LogSink>) -> Result<Self> {
        let sock = UdpSocket::bind(("0.0.0.0", port))?;
        sock.set_nonblocking(true)?;
        Ok(Self { sock, logger })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.sock.local_addr()?)
    }

    pub fn send_to(&self, buf: &[u8], to: SocketAddr) -> Result<usize> {
        sink_trace!(&self.logger, "udp: sending {} bytes to {}", buf.len(), to);
        Ok(self.sock.send_to(buf, to)?)
    }

    /// Attempts to read a single datagram into `buf` without blocking.
    pub fn receive_from(&self, buf: &mut [u8]) -> Result<RecvOutcome<(usize, SocketAddr)>> {
        match self.sock.recv_from(buf) {
            Ok((n, from)) => {
                sink_trace!(&self.logger, "udp: received {} bytes from {}", n, from);
                Ok(RecvOutcome::Ready((n, from)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(RecvOutcome::WouldBlock),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoopLogSink;
    use std::time::Duration;

    #[test]
    fn loopback_roundtrip() {
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let a = UdpTransport::bind(0, logger.clone()).unwrap();
        let b = UdpTransport::bind(0, logger).unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send_to(b"hello", b_addr).unwrap();

        let mut buf = [0u8; 64];
        let mut received = None;
        for _ in 0..200 {
            match b.receive_from(&mut buf).unwrap() {
                RecvOutcome::Ready((n, _from)) => {
                    received = Some(buf[..n].to_vec());
                    break;
                }
                RecvOutcome::WouldBlock => std::thread::sleep(Duration::from_millis(5)),
                RecvOutcome::Closed => unreachable!("UDP sockets never report Closed"),
            }
        }
        assert_eq!(received.as_deref(), Some(b"hello".as_slice()));
    }

    #[test]
    fn receive_without_data_would_block() {
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let sock = UdpTransport::bind(0, logger).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(sock.receive_from(&mut buf).unwrap(), RecvOutcome::WouldBlock);
    }
}
