//! RFC 6184 H.264 packetizer/depacketizer: Single-NALU, FU-A and (on
//! receive) STAP-A support. Packetization never emits STAP-A; this crate's
//! own sender only produces Single-NALU and FU-A packets, but tolerates
//! STAP-A from other senders when receiving.

use std::collections::VecDeque;

use crate::media::error::{MediaError, Result};
use crate::media::packetizer::Packetizer;
use crate::media::depacketizer::PayloadParser;
use crate::rtp::header::HEADER_LEN;
use crate::rtp::{PayloadPrefix, RtpHeader};

pub const CODEC_ID: &str = "h264";

const NALU_TYPE_FU_A: u8 = 28;
const NALU_TYPE_STAP_A: u8 = 24;
const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Splits one Annex-B access unit into RTP payload chunks (no start codes),
/// using Single-NALU packets when a NAL fits and FU-A fragmentation otherwise.
fn split_annexb_nalus(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut i = 0usize;
    while i + 3 <= data.len() {
        if let Some(len) = start_code_len_at(data, i) {
            starts.push(i + len);
            i += len;
            continue;
        }
        i += 1;
    }
    if starts.is_empty() {
        return if data.is_empty() { Vec::new() } else { vec![data] };
    }

    let mut nalus = Vec::with_capacity(starts.len());
    for (k, &start) in starts.iter().enumerate() {
        let end = if k + 1 < starts.len() {
            let mut j = starts[k + 1] - 1;
            while j > start && data[j] == 0 {
                j -= 1;
            }
            (j + 1).max(start)
        } else {
            let mut j = data.len();
            while j > start && data[j - 1] == 0 {
                j -= 1;
            }
            j
        };
        if end > start {
            nalus.push(&data[start..end]);
        }
    }
    nalus
}

fn start_code_len_at(data: &[u8], i: usize) -> Option<usize> {
    if i + 4 <= data.len() && data[i..i + 4] == [0, 0, 0, 1] {
        return Some(4);
    }
    if i + 3 <= data.len() && data[i..i + 3] == [0, 0, 1] {
        return Some(3);
    }
    None
}

fn split_into_chunks(nalu: &[u8], max_payload: usize) -> Vec<Vec<u8>> {
    if nalu.len() <= max_payload {
        return vec![nalu.to_vec()];
    }
    let header = nalu[0];
    let f_bit = header & 0x80;
    let nri = header & 0x60;
    let ntype = header & 0x1f;
    let fu_indicator = f_bit | nri | NALU_TYPE_FU_A;

    let frag_budget = max_payload.saturating_sub(2).max(1);
    let mut chunks = Vec::new();
    let mut offset = 1usize;
    while offset < nalu.len() {
        let take = (nalu.len() - offset).min(frag_budget);
        let start_bit = if offset == 1 { 0x80 } else { 0x00 };
        let end_bit = if offset + take == nalu.len() { 0x40 } else { 0x00 };
        let fu_header = start_bit | end_bit | ntype;
        let mut chunk = Vec::with_capacity(2 + take);
        chunk.push(fu_indicator);
        chunk.push(fu_header);
        chunk.extend_from_slice(&nalu[offset..offset + take]);
        chunks.push(chunk);
        offset += take;
    }
    chunks
}

/// RFC 6184 H.264 packetizer: pulls queued frames apart into RTP datagrams.
///
/// Supports the progressive `add_frame` contract: bytes handed over before
/// `last=true` are chunked and staged in [`Self::pending`] immediately (no
/// RTP header yet, since the marker bit can't be assigned until the frame's
/// final chunk is known); the closing call assigns sequence numbers, the
/// marker bit, and the RTP/prefix headers in one pass and moves everything
/// into the outgoing `queue`.
pub struct H264Packetizer {
    mtu: usize,
    payload_type: u8,
    ssrc: u32,
    next_seq: u16,
    queue: VecDeque<Vec<u8>>,
    pending: Vec<Vec<u8>>,
    pending_frame_id: Option<u32>,
    pending_sampling_ts: u32,
    pending_pose_ts: u32,
    pending_eos: bool,
    pending_save: bool,
}

impl H264Packetizer {
    #[must_use]
    pub fn new(mtu: usize, payload_type: u8, ssrc: u32, start_seq: u16) -> Self {
        Self {
            mtu,
            payload_type,
            ssrc,
            next_seq: start_seq,
            queue: VecDeque::new(),
            pending: Vec::new(),
            pending_frame_id: None,
            pending_sampling_ts: 0,
            pending_pose_ts: 0,
            pending_eos: false,
            pending_save: false,
        }
    }

    fn max_payload(&self) -> usize {
        self.mtu
            .saturating_sub(HEADER_LEN)
            .saturating_sub(crate::rtp::payload_prefix::PREFIX_LEN)
    }

    /// Advances the next sequence number by `n` without emitting packets,
    /// simulating a burst of datagrams lost in flight (used to exercise the
    /// depacketizer's resync path).
    pub fn skip_sequence(&mut self, n: u16) {
        self.next_seq = self.next_seq.wrapping_add(n);
    }
}

impl Packetizer for H264Packetizer {
    fn add_frame(
        &mut self,
        bytes: &[u8],
        frame_id: u32,
        end_of_stream: bool,
        sampling_ts: u32,
        pose_ts: u32,
        save_frame: bool,
        last: bool,
    ) -> Result<()> {
        if self.pending_frame_id.is_some_and(|id| id != frame_id) {
            // A new frame_id arrived without the previous one being closed;
            // whatever was staged for it is stale and gets dropped.
            self.pending.clear();
        }
        self.pending_frame_id = Some(frame_id);
        self.pending_sampling_ts = sampling_ts;
        self.pending_pose_ts = pose_ts;
        self.pending_eos = end_of_stream;
        self.pending_save = save_frame;

        let max_payload = self.max_payload();
        for nalu in split_annexb_nalus(bytes) {
            self.pending.extend(split_into_chunks(nalu, max_payload));
        }

        if !last {
            return Ok(());
        }

        if self.pending.is_empty() {
            self.pending_frame_id = None;
            return Err(MediaError::EmptyFrame);
        }

        let prefix = PayloadPrefix::new(
            self.pending_pose_ts,
            frame_id,
            self.pending_eos,
            self.pending_save,
        );
        let last_idx = self.pending.len() - 1;
        for (i, chunk) in self.pending.drain(..).enumerate() {
            let header = RtpHeader::new(self.payload_type, self.next_seq, self.pending_sampling_ts, self.ssrc)
                .with_marker(i == last_idx);
            let mut datagram = Vec::with_capacity(HEADER_LEN + crate::rtp::payload_prefix::PREFIX_LEN + chunk.len());
            header.encode(&mut datagram);
            prefix.encode(&mut datagram);
            datagram.extend_from_slice(&chunk);
            self.queue.push_back(datagram);
            self.next_seq = self.next_seq.wrapping_add(1);
        }
        self.pending_frame_id = None;
        Ok(())
    }

    fn create_next_packet(&mut self) -> Option<Vec<u8>> {
        self.queue.pop_front()
    }

    fn codec_id(&self) -> &'static str {
        CODEC_ID
    }
}

#[derive(Debug, Clone)]
struct FuState {
    nalu_header: u8,
    buf: Vec<u8>,
}

/// RFC 6184 H.264 payload parser: the codec-specific half of depacketizing,
/// plugged into [`crate::media::depacketizer::RtpDepacketizer`].
#[derive(Debug, Default)]
pub struct H264PayloadParser {
    fua: Option<FuState>,
    corrupted: bool,
    wrote_any: bool,
}

impl H264PayloadParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push_nalu(&mut self, nalu: &[u8], frame_buffer: &mut Vec<u8>) {
        frame_buffer.extend_from_slice(&START_CODE);
        frame_buffer.extend_from_slice(nalu);
        self.wrote_any = true;
    }
}

impl PayloadParser for H264PayloadParser {
    fn process_packet(&mut self, payload: &[u8], frame_buffer: &mut Vec<u8>) {
        if payload.is_empty() {
            self.corrupted = true;
            return;
        }
        let header = payload[0];
        let nalu_type = header & 0x1f;

        match nalu_type {
            1..=23 => {
                if self.fua.is_some() {
                    self.corrupted = true;
                    self.fua = None;
                }
                let nalu = payload.to_vec();
                self.push_nalu(&nalu, frame_buffer);
            }
            NALU_TYPE_STAP_A => {
                let mut rest = &payload[1..];
                while rest.len() >= 2 {
                    let size = u16::from_be_bytes([rest[0], rest[1]]) as usize;
                    rest = &rest[2..];
                    if size == 0 || size > rest.len() {
                        self.corrupted = true;
                        break;
                    }
                    let nalu = rest[..size].to_vec();
                    self.push_nalu(&nalu, frame_buffer);
                    rest = &rest[size..];
                }
            }
            NALU_TYPE_FU_A => {
                if payload.len() < 2 {
                    self.corrupted = true;
                    return;
                }
                let fu_indicator = header;
                let fu_header = payload[1];
                let start = fu_header & 0x80 != 0;
                let end = fu_header & 0x40 != 0;
                let ntype = fu_header & 0x1f;
                let orig_header = (fu_indicator & 0xe0) | ntype;

                if start {
                    let mut buf = Vec::with_capacity(payload.len() - 1);
                    buf.push(orig_header);
                    buf.extend_from_slice(&payload[2..]);
                    self.fua = Some(FuState {
                        nalu_header: orig_header,
                        buf,
                    });
                } else if let Some(st) = self.fua.as_mut() {
                    st.buf.extend_from_slice(&payload[2..]);
                } else {
                    self.corrupted = true;
                }

                if end {
                    match self.fua.take() {
                        Some(st) => self.push_nalu(&st.buf, frame_buffer),
                        None => self.corrupted = true,
                    }
                }
            }
            _ => {
                self.corrupted = true;
            }
        }
    }

    fn reset(&mut self) {
        self.fua = None;
        self.corrupted = false;
        self.wrote_any = false;
    }

    fn finish(&mut self) -> bool {
        !self.corrupted && self.wrote_any && self.fua.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annexb(nalus: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for n in nalus {
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(n);
        }
        out
    }

    #[test]
    fn single_nalu_roundtrip_through_packetizer_and_parser() {
        let mut packetizer = H264Packetizer::new(1200, 96, 0x1111, 0);
        let data = annexb(&[&[0x65, 1, 2, 3]]);
        packetizer
            .add_frame(&data, 1, false, 90_000, 456_789, false, true)
            .unwrap();

        let mut parser = H264PayloadParser::new();
        let mut frame_buffer = Vec::new();
        let mut saw_marker = false;
        while let Some(datagram) = packetizer.create_next_packet() {
            let (header, consumed) = RtpHeader::decode(&datagram).unwrap();
            let (_, rest) = PayloadPrefix::decode(&datagram[consumed..]).unwrap();
            parser.process_packet(rest, &mut frame_buffer);
            saw_marker = header.marker;
        }
        assert!(saw_marker);
        assert!(parser.finish());
        assert_eq!(frame_buffer, annexb(&[&[0x65, 1, 2, 3]]));
    }

    #[test]
    fn large_nalu_fragments_into_fu_a() {
        let mut big = vec![0x65u8];
        big.extend((0u8..40u8).map(|x| x.wrapping_add(1)));
        let mut packetizer = H264Packetizer::new(32, 96, 1, 0);
        let data = annexb(&[&big]);
        packetizer.add_frame(&data, 1, false, 1, 1, false, true).unwrap();

        let mut packets = Vec::new();
        while let Some(p) = packetizer.create_next_packet() {
            packets.push(p);
        }
        assert!(packets.len() > 1);

        let mut parser = H264PayloadParser::new();
        let mut frame_buffer = Vec::new();
        for datagram in &packets {
            let (_, consumed) = RtpHeader::decode(datagram).unwrap();
            let (_, rest) = PayloadPrefix::decode(&datagram[consumed..]).unwrap();
            parser.process_packet(rest, &mut frame_buffer);
        }
        assert!(parser.finish());
        assert_eq!(frame_buffer, annexb(&[&big]));
    }

    #[test]
    fn truncated_fu_a_is_reported_corrupted() {
        let mut parser = H264PayloadParser::new();
        let mut frame_buffer = Vec::new();
        // End fragment with no preceding start.
        parser.process_packet(&[28, 0x40, 1, 2, 3], &mut frame_buffer);
        assert!(!parser.finish());
    }

    #[test]
    fn empty_frame_is_rejected() {
        let mut packetizer = H264Packetizer::new(1200, 96, 1, 0);
        assert!(matches!(
            packetizer.add_frame(&[], 1, false, 1, 1, false, true),
            Err(MediaError::EmptyFrame)
        ));
    }

    #[test]
    fn frame_fed_as_two_slices_closes_only_on_last() {
        let mut packetizer = H264Packetizer::new(1200, 96, 0x2222, 0);
        let part_a = annexb(&[&[0x65, 1, 2]]);
        let part_b = annexb(&[&[0x65, 3, 4]]);

        packetizer
            .add_frame(&part_a, 9, false, 1000, 2000, false, false)
            .unwrap();
        // Nothing should be on the wire queue yet: the frame isn't closed.
        assert!(packetizer.create_next_packet().is_none());

        packetizer
            .add_frame(&part_b, 9, false, 1000, 2000, false, true)
            .unwrap();

        let mut parser = H264PayloadParser::new();
        let mut frame_buffer = Vec::new();
        let mut saw_marker = false;
        let mut count = 0;
        while let Some(datagram) = packetizer.create_next_packet() {
            let (header, consumed) = RtpHeader::decode(&datagram).unwrap();
            let (_, rest) = PayloadPrefix::decode(&datagram[consumed..]).unwrap();
            parser.process_packet(rest, &mut frame_buffer);
            saw_marker = header.marker;
            count += 1;
        }
        assert_eq!(count, 2, "one packet per staged slice");
        assert!(saw_marker);
        assert!(parser.finish());
        let mut expected = part_a;
        expected.extend_from_slice(&part_b);
        assert_eq!(frame_buffer, expected);
    }
}
