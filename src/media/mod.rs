/// The jitter-buffered RTP reassembly core and the `Depacketizer`/`PayloadParser` traits.
pub mod depacketizer;
/// Error type shared by packetizers and depacketizers.
pub mod error;
/// The codec-agnostic access-unit type exchanged with packetizers/depacketizers.
pub mod frame;
/// The `Packetizer` trait.
pub mod packetizer;
/// Built-in codec payload handling.
pub mod payload;

pub use depacketizer::{Depacketizer, PayloadParser, RtpDepacketizer};
pub use error::MediaError;
pub use frame::Frame;
pub use packetizer::Packetizer;
