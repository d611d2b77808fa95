use std::sync::Arc;

use wvb_media_transport::media::payload::h264::{H264Packetizer, H264PayloadParser};
use wvb_media_transport::media::{Depacketizer, Packetizer, RtpDepacketizer};
use wvb_media_transport::rtp::RtpClock;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

fn annexb_frame(len: usize) -> Vec<u8> {
    let mut nalu = vec![0x65u8];
    nalu.extend((0..len - 1).map(|i| (i % 256) as u8));
    let mut out = Vec::with_capacity(4 + nalu.len());
    out.extend_from_slice(&START_CODE);
    out.extend_from_slice(&nalu);
    out
}

fn new_depacketizer() -> RtpDepacketizer<H264PayloadParser> {
    RtpDepacketizer::new("h264", H264PayloadParser::new())
}

/// S1: in-order, one frame — packetize a 1 MiB access unit and feed every
/// datagram in order; expect one frame, byte-for-byte identical.
#[test]
fn s1_in_order_single_frame() {
    let data = annexb_frame(1024 * 1024);
    let mut packetizer = H264Packetizer::new(1472, 96, 0x1111, 0);
    packetizer
        .add_frame(&data, 1, false, 124_578, 456_789, true, true)
        .unwrap();

    let depacketizer = new_depacketizer();
    while let Some(datagram) = packetizer.create_next_packet() {
        depacketizer.add_packet(&datagram);
    }

    let out = depacketizer.receive_frame_data().expect("frame should be ready");
    depacketizer.release_frame_data();
    assert_eq!(out.frame_id, 1);
    assert_eq!(out.sampling_ts, 124_578);
    assert_eq!(out.pose_ts, 456_789);
    assert!(out.save_frame);
    assert_eq!(out.data, data);
}

/// S2: reordered within each 64-packet block — identical output to S1.
#[test]
fn s2_reordered_within_blocks() {
    let data = annexb_frame(256 * 1024);
    let mut packetizer = H264Packetizer::new(500, 96, 0x2222, 0);
    packetizer.add_frame(&data, 7, false, 1, 1, false, true).unwrap();

    let mut datagrams = Vec::new();
    while let Some(d) = packetizer.create_next_packet() {
        datagrams.push(d);
    }

    let depacketizer = new_depacketizer();
    for block in datagrams.chunks(64) {
        for datagram in block.iter().rev() {
            depacketizer.add_packet(datagram);
        }
    }

    let out = depacketizer.receive_frame_data().expect("frame should be ready");
    assert_eq!(out.frame_id, 7);
    assert_eq!(out.data, data);
}

/// S3: dropping one packet mid-frame yields no frame and increments the
/// discarded-frame counter.
#[test]
fn s3_single_packet_loss_discards_frame() {
    let data = annexb_frame(64 * 1024);
    let mut packetizer = H264Packetizer::new(500, 96, 0x3333, 0);
    packetizer.add_frame(&data, 1, false, 1, 1, false, true).unwrap();

    let mut datagrams = Vec::new();
    while let Some(d) = packetizer.create_next_packet() {
        datagrams.push(d);
    }
    assert!(datagrams.len() > 5, "need more than 5 fragments for this scenario");
    datagrams.remove(5);

    let depacketizer = new_depacketizer();
    for datagram in &datagrams {
        depacketizer.add_packet(datagram);
    }

    assert!(depacketizer.receive_frame_data().is_none());
}

/// S4: every packet delivered twice — identical output to a clean run.
#[test]
fn s4_duplicate_delivery() {
    let data = annexb_frame(128 * 1024);
    let mut packetizer = H264Packetizer::new(700, 96, 0x4444, 0);
    packetizer.add_frame(&data, 3, false, 1, 1, false, true).unwrap();

    let mut datagrams = Vec::new();
    while let Some(d) = packetizer.create_next_packet() {
        datagrams.push(d);
    }

    let depacketizer = new_depacketizer();
    for datagram in &datagrams {
        depacketizer.add_packet(datagram);
        depacketizer.add_packet(datagram);
    }

    let out = depacketizer.receive_frame_data().expect("frame should be ready");
    assert_eq!(out.frame_id, 3);
    assert_eq!(out.data, data);
}

/// S5: resync after a large forward sequence jump — first frame completes,
/// nothing spurious appears mid-jump, second frame completes after resync.
#[test]
fn s5_resync_after_far_jump() {
    let mut packetizer = H264Packetizer::new(1472, 96, 0x5555, 0);
    let first_data = annexb_frame(4096);
    packetizer
        .add_frame(&first_data, 1, false, 1, 1, false, true)
        .unwrap();
    let mut first_frame_packets = Vec::new();
    while let Some(d) = packetizer.create_next_packet() {
        first_frame_packets.push(d);
    }

    let depacketizer = new_depacketizer();
    for datagram in &first_frame_packets {
        depacketizer.add_packet(datagram);
    }
    let first = depacketizer.receive_frame_data().expect("first frame ready");
    assert_eq!(first.frame_id, 1);

    let before_discarded = depacketizer.discarded_frames();

    packetizer.skip_sequence(1000);
    let second_data = annexb_frame(4096);
    packetizer
        .add_frame(&second_data, 2, false, 2, 2, false, true)
        .unwrap();
    while let Some(d) = packetizer.create_next_packet() {
        depacketizer.add_packet(&d);
    }

    let second = depacketizer.receive_frame_data().expect("second frame ready after resync");
    assert_eq!(second.frame_id, 2);
    assert!(depacketizer.discarded_frames() >= before_discarded);
}

/// S6: clock handshake — a peer reconstructing a clock from a serialized NTP
/// epoch reports `now()` within one tick of the source clock on the same host.
#[test]
fn s6_clock_handshake_roundtrip() {
    let source = RtpClock::new();
    let ntp_bytes = source.ntp_epoch().to_be_bytes();
    let received_ntp = u64::from_be_bytes(ntp_bytes);
    let peer = RtpClock::from_peer_ntp_epoch(received_ntp);

    let a = source.now();
    let b = peer.now();
    assert!((a - b).abs() <= 1, "a={a} b={b}");
}

#[test]
fn depacketizer_trait_object_is_send_and_sync() {
    fn takes_arc(_d: Arc<dyn Depacketizer>) {}
    takes_arc(Arc::new(new_depacketizer()));
}
