/// A single codec access unit (frame), as handed to a packetizer for sending
/// or handed back by a depacketizer after reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded frame bytes (e.g. an Annex-B access unit for H.264).
    pub data: Vec<u8>,
    /// Monotonically increasing id assigned by the sender.
    pub frame_id: u32,
    /// RTP 90 kHz sampling timestamp for this frame.
    pub sampling_ts: u32,
    /// Headset pose timestamp this frame was rendered against.
    pub pose_ts: u32,
    /// Marks the final frame of the stream.
    pub end_of_stream: bool,
    /// Requests the receiver persist this frame (e.g. for benchmarking capture).
    pub save_frame: bool,
}

impl Frame {
    #[must_use]
    pub fn new(data: Vec<u8>, frame_id: u32, sampling_ts: u32, pose_ts: u32) -> Self {
        Self {
            data,
            frame_id,
            sampling_ts,
            pose_ts,
            end_of_stream: false,
            save_frame: false,
        }
    }

    #[must_use]
    pub fn with_end_of_stream(mut self, end_of_stream: bool) -> Self {
        self.end_of_stream = end_of_stream;
        self
    }

    #[must_use]
    pub fn with_save_frame(mut self, save_frame: bool) -> Self {
        self.save_frame = save_frame;
        self
    }
}
