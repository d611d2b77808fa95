use super::error::{Result, RtpError};

pub const PREFIX_LEN: usize = 9;

const FLAG_END_OF_STREAM: u8 = 0x01;
const FLAG_SAVE_FRAME: u8 = 0x02;

/// The 9-byte prefix carried at the front of every RTP payload: the headset
/// pose timestamp and frame id the payload belongs to, plus per-frame flags.
///
/// This sits between the RTP header and the codec-specific payload bytes; it
/// is parsed by the reassembly core directly rather than delegated to a
/// `PayloadParser`, since every codec carries it identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadPrefix {
    pub pose_ts: u32,
    pub frame_id: u32,
    pub end_of_stream: bool,
    pub save_frame: bool,
}

impl PayloadPrefix {
    #[must_use]
    pub fn new(pose_ts: u32, frame_id: u32, end_of_stream: bool, save_frame: bool) -> Self {
        Self {
            pose_ts,
            frame_id,
            end_of_stream,
            save_frame,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.pose_ts.to_be_bytes());
        out.extend_from_slice(&self.frame_id.to_be_bytes());
        let mut flags = 0u8;
        if self.end_of_stream {
            flags |= FLAG_END_OF_STREAM;
        }
        if self.save_frame {
            flags |= FLAG_SAVE_FRAME;
        }
        out.push(flags);
    }

    pub fn decode(buf: &[u8]) -> Result<(Self, &[u8])> {
        if buf.len() < PREFIX_LEN {
            return Err(RtpError::PrefixTooShort);
        }
        let pose_ts = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let frame_id = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let flags = buf[8];
        Ok((
            Self {
                pose_ts,
                frame_id,
                end_of_stream: flags & FLAG_END_OF_STREAM != 0,
                save_frame: flags & FLAG_SAVE_FRAME != 0,
            },
            &buf[PREFIX_LEN..],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_flags() {
        let p = PayloadPrefix::new(456_789, 1, true, true);
        let mut buf = Vec::new();
        p.encode(&mut buf);
        buf.extend_from_slice(b"payload");
        let (decoded, rest) = PayloadPrefix::decode(&buf).unwrap();
        assert_eq!(decoded, p);
        assert_eq!(rest, b"payload");
    }

    #[test]
    fn no_flags() {
        let p = PayloadPrefix::new(1, 2, false, false);
        let mut buf = Vec::new();
        p.encode(&mut buf);
        assert_eq!(buf[8], 0);
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = [0u8; 8];
        assert_eq!(PayloadPrefix::decode(&buf), Err(RtpError::PrefixTooShort));
    }
}
