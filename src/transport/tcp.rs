use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::log::log_sink::LogSink;
use crate::sink_debug;

use super::error::{Result, TransportError};
use super::result::RecvOutcome;

/// Default timeout for the handshake's blocking `listen`/`connect`, per the
/// video socket's handshake contract.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A TCP connection used only for the short handshake exchange at the start
/// of a video session; `send`/`receive` are blocking (the handshake is the
/// one place this crate accepts blocking I/O), with a 5-second default
/// timeout on connection setup.
pub struct TcpTransport {
    stream: TcpStream,
    logger: Arc<dyn LogSink>,
}

impl TcpTransport {
    /// Server side: bind, wait for one incoming connection, then stop
    /// listening — this crate pairs exactly one TCP peer per video socket.
    pub fn listen(port: u16, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        let deadline = Instant::now() + timeout;
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    sink_debug!(&logger, "tcp: accepted handshake connection from {}", peer);
                    stream.set_nodelay(true).ok();
                    return Ok(Self { stream, logger });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(TransportError::HandshakeTimedOut);
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Client side: connect with a bounded timeout.
    pub fn connect(addr: SocketAddr, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true).ok();
        sink_debug!(&logger, "tcp: connected handshake socket to {}", addr);
        Ok(Self { stream, logger })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.local_addr()?)
    }

    /// Blocking write of the full buffer.
    pub fn send(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf)?;
        Ok(())
    }

    /// Blocking read, filling as much of `buf` as the stream currently has
    /// available. A zero-length read means the peer closed the connection.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<RecvOutcome<usize>> {
        match self.stream.read(buf) {
            Ok(0) => Ok(RecvOutcome::Closed),
            Ok(n) => Ok(RecvOutcome::Ready(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(RecvOutcome::WouldBlock),
            Err(e) => Err(e.into()),
        }
    }

    /// Blocking read of exactly `buf.len()` bytes, looping over short reads
    /// (the handshake has no message framing, per the original streaming
    /// socket contract).
    pub fn receive_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.receive(&mut buf[filled..])? {
                RecvOutcome::Ready(n) => filled += n,
                RecvOutcome::Closed => {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                }
                RecvOutcome::WouldBlock => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoopLogSink;

    #[test]
    fn handshake_roundtrip() {
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let server_logger = logger.clone();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let server = std::thread::spawn(move || {
            let mut conn =
                TcpTransport::listen(addr.port(), Duration::from_secs(2), server_logger).unwrap();
            let mut buf = [0u8; 5];
            conn.receive_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hello");
            conn.send(b"world").unwrap();
        });

        std::thread::sleep(Duration::from_millis(50));
        let mut client = TcpTransport::connect(addr, Duration::from_secs(2), logger).unwrap();
        client.send(b"hello").unwrap();
        let mut buf = [0u8; 5];
        client.receive_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");

        server.join().unwrap();
    }

    #[test]
    fn connect_times_out_when_nothing_listens() {
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        // A reserved, (almost certainly) unroutable test address.
        let addr: SocketAddr = "10.255.255.1:9".parse().unwrap();
        let result = TcpTransport::connect(addr, Duration::from_millis(50), logger);
        assert!(result.is_err());
    }
}
