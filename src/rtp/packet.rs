use super::error::Result;
use super::header::RtpHeader;

/// A full RTP datagram: fixed header plus raw payload bytes (the payload
/// begins with the 9-byte pose/frame-id prefix, followed by codec data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Vec<u8>,
}

impl RtpPacket {
    #[must_use]
    pub fn new(header: RtpHeader, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(super::header::HEADER_LEN + self.payload.len());
        self.header.encode(&mut out);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (header, consumed) = RtpHeader::decode(buf)?;
        Ok(Self {
            header,
            payload: buf[consumed..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let header = RtpHeader::new(96, 7, 90_000, 0xc0ff_ee00).with_marker(true);
        let packet = RtpPacket::new(header, vec![1, 2, 3, 4]);
        let encoded = packet.encode();
        assert_eq!(encoded.len(), 12 + 4);
        let decoded = RtpPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn empty_payload_roundtrips() {
        let header = RtpHeader::new(96, 0, 0, 0);
        let packet = RtpPacket::new(header, Vec::new());
        let decoded = RtpPacket::decode(&packet.encode()).unwrap();
        assert_eq!(decoded, packet);
    }
}
