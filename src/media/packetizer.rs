use super::error::Result;

/// Turns frames (or progressively-fed slices of one frame) into a queue of
/// ready-to-send RTP datagrams.
///
/// Mirrors the original engine's `IPacketizer`: [`Self::add_frame`] stages
/// bytes belonging to the frame identified by `frame_id`, then
/// [`Self::create_next_packet`] is polled until it returns `None`. A frame
/// may be staged across several `add_frame` calls — e.g. as an encoder
/// hands over NAL units one at a time — with `last=false` on every call but
/// the closing one. `bytes` is only borrowed for the duration of the call;
/// a concrete packetizer is expected to have fully consumed the slice (copied
/// what it needs into its own datagram queue) before `add_frame` returns,
/// which satisfies the caller-facing contract that the bytes need only
/// remain live until that call completes.
pub trait Packetizer: Send {
    /// Stages `bytes` — a full frame, or the next slice of one already in
    /// progress — for frame `frame_id` and queues the resulting datagrams.
    /// `last=true` closes the frame, arming the marker bit on its final
    /// packet; a call that starts a new `frame_id` must supply a fresher
    /// `sampling_ts` than the frame it follows.
    #[allow(clippy::too_many_arguments)]
    fn add_frame(
        &mut self,
        bytes: &[u8],
        frame_id: u32,
        end_of_stream: bool,
        sampling_ts: u32,
        pose_ts: u32,
        save_frame: bool,
        last: bool,
    ) -> Result<()>;

    /// Pops the next queued RTP datagram (header + payload, ready to send
    /// over the wire), or `None` if the queue is currently empty.
    fn create_next_packet(&mut self) -> Option<Vec<u8>>;

    /// The registry `codec_id` this packetizer implements (e.g. `"h264"`).
    fn codec_id(&self) -> &'static str;
}
