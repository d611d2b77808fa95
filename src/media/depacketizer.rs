use std::sync::Mutex;
use std::time::Instant;

use crate::rtp::header::HEADER_LEN;
use crate::rtp::{PayloadPrefix, RtpHeader};

use super::frame::Frame;

/// Number of in-flight sequence numbers the reassembly window tracks before
/// treating a gap as a resync rather than ordinary reordering.
pub const WINDOW: usize = 128;
/// Largest RTP datagram this crate accepts (matches the video socket's MTU).
pub const JITTER_SLOT_MTU: usize = 1500;

/// The codec-specific half of depacketization: concatenating payload bytes
/// (after the pose/frame-id prefix has been stripped by the reassembly core)
/// into the frame currently under construction.
///
/// The sequencing, windowing and per-frame bookkeeping invariants live in
/// [`RtpDepacketizer`]; only NAL-level (or equivalent) payload parsing is
/// delegated here, the same template-method split the original engine used
/// between its base depacketizer and codec subclasses.
pub trait PayloadParser: Send {
    /// Appends this packet's payload (prefix already stripped) to `frame_buffer`.
    fn process_packet(&mut self, payload: &[u8], frame_buffer: &mut Vec<u8>);

    /// Clears any in-progress fragmentation state. Called on a new frame
    /// boundary and whenever the core discards a frame.
    fn reset(&mut self);

    /// Called once the marker bit is seen. Returns `false` if the
    /// codec detected the assembled frame is malformed and it must be
    /// discarded instead of delivered.
    fn finish(&mut self) -> bool;
}

/// Trait object surface exposed to the video socket: `add_packet` is driven
/// by the network thread, `receive_frame_data`/`release_frame_data` by the
/// render thread. All three are safe to call concurrently on the same
/// instance.
pub trait Depacketizer: Send + Sync {
    fn add_packet(&self, packet: &[u8]);
    fn receive_frame_data(&self) -> Option<Frame>;
    fn release_frame_data(&self);
    fn codec_id(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
struct PacketView {
    slot: usize,
    len: usize,
}

struct JitterSlot {
    valid: bool,
    data: [u8; JITTER_SLOT_MTU],
}

impl JitterSlot {
    fn empty() -> Self {
        Self {
            valid: false,
            data: [0u8; JITTER_SLOT_MTU],
        }
    }
}

struct Inner<P> {
    initialized: bool,
    desired_seq: u16,
    last_processed_seq: u16,
    window: usize,
    views: Vec<Option<PacketView>>,
    view_head: usize,
    slots: Vec<JitterSlot>,
    frame_buffer: Vec<u8>,
    frame_id_set: bool,
    current_frame_id: u32,
    current_sampling_ts: u32,
    current_pose_ts: u32,
    current_eos: bool,
    current_save: bool,
    corrupted: bool,
    discarded_frames: u64,
    parser: P,
}

impl<P: PayloadParser> Inner<P> {
    fn new(parser: P, window: usize) -> Self {
        Self {
            initialized: false,
            desired_seq: 0,
            last_processed_seq: 0,
            window,
            views: vec![None; window],
            view_head: 0,
            slots: (0..window).map(|_| JitterSlot::empty()).collect(),
            frame_buffer: Vec::new(),
            frame_id_set: false,
            current_frame_id: 0,
            current_sampling_ts: 0,
            current_pose_ts: 0,
            current_eos: false,
            current_save: false,
            corrupted: false,
            discarded_frames: 0,
            parser,
        }
    }

    fn alloc_slot(&mut self) -> Option<usize> {
        self.slots.iter().position(|s| !s.valid)
    }

    fn discard_in_progress_frame(&mut self) {
        if !self.frame_buffer.is_empty() || self.frame_id_set {
            self.discarded_frames += 1;
        }
        self.frame_buffer.clear();
        self.frame_id_set = false;
        self.corrupted = false;
        self.parser.reset();
    }

    fn clear_window(&mut self) {
        for v in &mut self.views {
            *v = None;
        }
        for s in &mut self.slots {
            s.valid = false;
        }
        self.view_head = 0;
    }

    fn insert_at_ring(&mut self, ring_pos: usize, packet: &[u8]) {
        if self.views[ring_pos].is_some() {
            return; // duplicate: already holding a packet at this position
        }
        let Some(slot) = self.alloc_slot() else {
            return; // pool exhausted; drop (should not happen, pool == WINDOW)
        };
        let len = packet.len().min(JITTER_SLOT_MTU);
        self.slots[slot].data[..len].copy_from_slice(&packet[..len]);
        self.slots[slot].valid = true;
        self.views[ring_pos] = Some(PacketView { slot, len });
    }

    /// Handles one incoming datagram: classifies it against the window,
    /// stores it, then drains every contiguous packet starting at
    /// `desired_seq`, stopping at the first hole.
    fn add_packet(&mut self, packet: &[u8]) -> Option<Frame> {
        if packet.len() < HEADER_LEN {
            return None;
        }
        let Ok((header, _)) = RtpHeader::decode(packet) else {
            return None;
        };
        let seq = header.sequence_number;

        if !self.initialized {
            self.initialized = true;
            self.desired_seq = seq;
            self.last_processed_seq = seq.wrapping_sub(1);
            self.view_head = 0;
            self.insert_at_ring(0, packet);
        } else {
            let window = self.window as i32;
            let dist = signed_dist(seq, self.desired_seq);
            if (0..window).contains(&dist) {
                let ring_pos = (self.view_head + dist as usize) % self.window;
                self.insert_at_ring(ring_pos, packet);
            } else if (-window..0).contains(&dist) {
                let ring_pos = wrapping_ring_index(self.view_head, dist, self.window);
                let already_processed = signed_dist(self.last_processed_seq, seq) >= 0;
                if self.views[ring_pos].is_none() && !already_processed {
                    self.insert_at_ring(ring_pos, packet);
                }
            } else if dist >= window {
                // Too far ahead: resync onto this packet's sequence number.
                self.discard_in_progress_frame();
                self.clear_window();
                self.desired_seq = seq;
                self.insert_at_ring(0, packet);
            }
            // dist < -WINDOW: stale beyond recovery; dropped silently.
        }

        self.drain()
    }

    fn drain(&mut self) -> Option<Frame> {
        let mut completed = None;
        loop {
            let Some(view) = self.views[self.view_head] else {
                break;
            };
            let slot_idx = view.slot;
            // Copy out of the slot before mutably borrowing self again.
            let mut raw = [0u8; JITTER_SLOT_MTU];
            raw[..view.len].copy_from_slice(&self.slots[slot_idx].data[..view.len]);
            self.slots[slot_idx].valid = false;
            self.views[self.view_head] = None;

            if let Some(frame) = self.process_one(&raw[..view.len]) {
                completed = Some(frame);
            }

            self.view_head = (self.view_head + 1) % self.window;
            self.desired_seq = self.desired_seq.wrapping_add(1);
        }
        completed
    }

    fn process_one(&mut self, datagram: &[u8]) -> Option<Frame> {
        let Ok((header, consumed)) = RtpHeader::decode(datagram) else {
            return None;
        };
        self.last_processed_seq = header.sequence_number;
        let payload = &datagram[consumed..];
        let Ok((prefix, rest)) = PayloadPrefix::decode(payload) else {
            self.corrupted = true;
            return None;
        };

        if !self.frame_id_set {
            self.current_frame_id = prefix.frame_id;
            self.current_sampling_ts = header.timestamp;
            self.current_pose_ts = prefix.pose_ts;
            self.current_eos = prefix.end_of_stream;
            self.current_save = prefix.save_frame;
            self.frame_id_set = true;
        } else if prefix.frame_id != self.current_frame_id {
            // Per-frame inconsistency: discard the partial frame and start a
            // fresh one rooted at this packet, without disturbing sequencing.
            self.discard_in_progress_frame();
            self.current_frame_id = prefix.frame_id;
            self.current_sampling_ts = header.timestamp;
            self.current_pose_ts = prefix.pose_ts;
            self.current_eos = prefix.end_of_stream;
            self.current_save = prefix.save_frame;
            self.frame_id_set = true;
        }

        self.parser.process_packet(rest, &mut self.frame_buffer);

        if !header.marker {
            return None;
        }

        let well_formed = self.parser.finish() && !self.corrupted && !self.frame_buffer.is_empty();
        let frame = if well_formed {
            Some(Frame {
                data: std::mem::take(&mut self.frame_buffer),
                frame_id: self.current_frame_id,
                sampling_ts: self.current_sampling_ts,
                pose_ts: self.current_pose_ts,
                end_of_stream: self.current_eos,
                save_frame: self.current_save,
            })
        } else {
            self.discarded_frames += 1;
            None
        };

        self.frame_buffer.clear();
        self.frame_id_set = false;
        self.corrupted = false;
        self.parser.reset();
        frame
    }
}

fn signed_dist(a: u16, b: u16) -> i32 {
    i32::from(a.wrapping_sub(b) as i16)
}

fn wrapping_ring_index(head: usize, dist: i32, window: usize) -> usize {
    let window = window as i32;
    (((head as i32 + dist) % window + window) % window) as usize
}

/// The concrete reassembly core: generic sequencing/windowing machinery plus
/// a codec-specific [`PayloadParser`]. Completed frames are handed off to
/// the render thread through a single-slot mailbox so the two sides never
/// share a mutable buffer: `add_packet` never blocks on the consumer, and
/// `receive_frame_data` hands out an owned [`Frame`] rather than a borrow
/// into internal storage.
pub struct RtpDepacketizer<P> {
    inner: Mutex<Inner<P>>,
    ready: Mutex<Option<Frame>>,
    codec_id: &'static str,
    last_activity: Mutex<Instant>,
}

impl<P: PayloadParser> RtpDepacketizer<P> {
    pub fn new(codec_id: &'static str, parser: P) -> Self {
        Self::with_window(codec_id, parser, WINDOW)
    }

    /// Like [`Self::new`], but with a reassembly window other than the
    /// [`WINDOW`] default — used by tests that want to exercise resync
    /// behavior without needing hundreds of packets in flight.
    pub fn with_window(codec_id: &'static str, parser: P, window: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::new(parser, window)),
            ready: Mutex::new(None),
            codec_id,
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Like [`Self::new`], sourcing the window size from `[media]
    /// jitter_window` in `cfg` if set, falling back to [`WINDOW`].
    pub fn from_config(codec_id: &'static str, parser: P, cfg: &crate::config::Config) -> Self {
        let window = cfg.get_parsed("media", "jitter_window", WINDOW);
        Self::with_window(codec_id, parser, window)
    }

    /// Total frames dropped due to loss, corruption or a mailbox overwrite.
    pub fn discarded_frames(&self) -> u64 {
        self.inner.lock().expect("mutex poisoned").discarded_frames
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock().expect("mutex poisoned")
    }
}

impl<P: PayloadParser + Send> Depacketizer for RtpDepacketizer<P> {
    fn add_packet(&self, packet: &[u8]) {
        let completed = {
            let mut inner = self.inner.lock().expect("mutex poisoned");
            inner.add_packet(packet)
        };
        *self.last_activity.lock().expect("mutex poisoned") = Instant::now();
        if let Some(frame) = completed {
            // A single-slot mailbox: if the consumer hasn't picked up the
            // previous frame yet, it is superseded rather than queued —
            // acceptable for a latency-sensitive video stream where only the
            // newest frame matters, and frame ids only ever increase.
            *self.ready.lock().expect("mutex poisoned") = Some(frame);
        }
    }

    fn receive_frame_data(&self) -> Option<Frame> {
        self.ready.lock().expect("mutex poisoned").take()
    }

    fn release_frame_data(&self) {
        // Ownership already transferred by `receive_frame_data`; retained
        // for lifecycle parity with callers that expect an explicit release.
    }

    fn codec_id(&self) -> &'static str {
        self.codec_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::payload::h264::{H264Packetizer, H264PayloadParser};
    use crate::media::Packetizer;

    fn packets_for_frame(frame_id: u32, nalu: &[u8], start_seq: u16) -> Vec<Vec<u8>> {
        let mut p = H264Packetizer::new(1200, 96, 0xaa, start_seq);
        let mut data = Vec::new();
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(nalu);
        p.add_frame(&data, frame_id, false, frame_id * 3000, frame_id * 10, false, true)
            .unwrap();
        let mut out = Vec::new();
        while let Some(pkt) = p.create_next_packet() {
            out.push(pkt);
        }
        out
    }

    fn depacketizer() -> RtpDepacketizer<H264PayloadParser> {
        RtpDepacketizer::new("h264", H264PayloadParser::new())
    }

    #[test]
    fn in_order_single_packet_frame_is_delivered() {
        let d = depacketizer();
        let pkts = packets_for_frame(1, &[0x65, 1, 2, 3], 0);
        for pkt in &pkts {
            d.add_packet(pkt);
        }
        let frame = d.receive_frame_data().expect("frame should be ready");
        assert_eq!(frame.frame_id, 1);
        d.release_frame_data();
        assert!(d.receive_frame_data().is_none());
    }

    #[test]
    fn reordered_packets_within_window_still_assemble() {
        let d = depacketizer();
        // Prime desired_seq with an in-order genesis frame, as the first
        // packet a stream ever delivers is assumed in order.
        let genesis = packets_for_frame(1, &[0x65, 0], 9);
        d.add_packet(&genesis[0]);
        assert!(d.receive_frame_data().is_some());

        let mut big = vec![0x65u8];
        big.extend((0u8..60u8).map(|x| x.wrapping_add(1)));
        let pkts = packets_for_frame(2, &big, 10);
        assert!(pkts.len() >= 3, "need multiple fragments to reorder");

        // Deliver out of order: last, first, middle...
        d.add_packet(&pkts[pkts.len() - 1]);
        for pkt in &pkts[..pkts.len() - 1] {
            d.add_packet(pkt);
        }
        let frame = d.receive_frame_data().expect("frame should be ready");
        assert_eq!(frame.frame_id, 2);
    }

    #[test]
    fn duplicate_packet_is_ignored() {
        let d = depacketizer();
        let pkts = packets_for_frame(3, &[0x65, 9, 9], 20);
        d.add_packet(&pkts[0]);
        d.add_packet(&pkts[0]); // duplicate of the only (marker) packet
        let frame = d.receive_frame_data().expect("frame should be ready");
        assert_eq!(frame.frame_id, 3);
        assert!(d.receive_frame_data().is_none());
    }

    #[test]
    fn single_packet_loss_stalls_until_resync_or_never_completes() {
        let d = depacketizer();
        let mut big = vec![0x65u8];
        big.extend((0u8..60u8).map(|x| x.wrapping_add(1)));
        let pkts = packets_for_frame(4, &big, 30);
        assert!(pkts.len() >= 3);
        // Drop the middle packet.
        d.add_packet(&pkts[0]);
        for pkt in &pkts[2..] {
            d.add_packet(pkt);
        }
        // The hole blocks drain: nothing should be delivered yet.
        assert!(d.receive_frame_data().is_none());
    }

    #[test]
    fn far_forward_jump_triggers_resync_and_resumes() {
        let d = depacketizer();
        let first = packets_for_frame(5, &[0x65, 1], 100);
        d.add_packet(&first[0]);
        assert!(d.receive_frame_data().is_some());

        // Jump far ahead in sequence space: desired_seq was 101, so anything
        // at or beyond +128 triggers a resync rather than being buffered.
        let jumped = packets_for_frame(6, &[0x65, 2], 101 + WINDOW as u16);
        d.add_packet(&jumped[0]);
        let frame = d.receive_frame_data().expect("resync should resume delivery");
        assert_eq!(frame.frame_id, 6);
    }

    #[test]
    fn smaller_configured_window_resyncs_sooner() {
        let d: RtpDepacketizer<H264PayloadParser> =
            RtpDepacketizer::with_window("h264", H264PayloadParser::new(), 4);
        let first = packets_for_frame(1, &[0x65, 1], 0);
        d.add_packet(&first[0]);
        assert!(d.receive_frame_data().is_some());

        // With a window of 4, a jump of +4 already forces a resync, well
        // short of the default WINDOW's threshold.
        let jumped = packets_for_frame(2, &[0x65, 2], 1 + 4);
        d.add_packet(&jumped[0]);
        let frame = d.receive_frame_data().expect("resync should resume delivery");
        assert_eq!(frame.frame_id, 2);
    }

    #[test]
    fn from_config_reads_jitter_window_override() {
        let mut cfg = crate::config::Config::empty();
        cfg.sections
            .entry("media".to_string())
            .or_default()
            .insert("jitter_window".to_string(), "4".to_string());
        let d: RtpDepacketizer<H264PayloadParser> =
            RtpDepacketizer::from_config("h264", H264PayloadParser::new(), &cfg);

        let first = packets_for_frame(1, &[0x65, 1], 0);
        d.add_packet(&first[0]);
        assert!(d.receive_frame_data().is_some());

        let jumped = packets_for_frame(2, &[0x65, 2], 1 + 4);
        d.add_packet(&jumped[0]);
        let frame = d.receive_frame_data().expect("resync should resume delivery");
        assert_eq!(frame.frame_id, 2);
    }

    #[test]
    fn discarded_frame_counter_increments_on_loss() {
        let d = depacketizer();
        let mut big = vec![0x65u8];
        big.extend((0u8..60u8).map(|x| x.wrapping_add(1)));
        let pkts = packets_for_frame(7, &big, 200);
        d.add_packet(&pkts[0]);
        // Resync away without finishing the frame: desired_seq is now 201
        // (only one fragment was consumed), so +WINDOW clears the resync bar.
        let next = packets_for_frame(8, &[0x65, 1], 201 + WINDOW as u16);
        d.add_packet(&next[0]);
        assert!(d.discarded_frames() >= 1);
    }
}
