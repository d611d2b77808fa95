//! The codec module registry: the built-in H.264 module plus any codec
//! modules discovered as shared libraries in a plugin directory.
//!
//! Built-in modules are always registered before plugins, and plugins are
//! registered in whatever order the filesystem yields them in — callers
//! that need a deterministic codec_id must not rely on plugin ordering.

/// The `Module` enum unifying built-in and dynamically-loaded codecs.
pub mod descriptor;
/// Error type for registry discovery/loading failures.
pub mod error;
/// `libloading`-based dynamic plugin loading.
pub mod plugin;

use std::path::Path;
use std::sync::Arc;

use crate::log::log_sink::LogSink;
use crate::media::payload::h264;
use crate::media::{Depacketizer, Packetizer};

pub use descriptor::{Module, ModuleInfo};
pub use error::{RegistryError, Result};

/// Holds every codec module available to this process, in registration order.
pub struct Registry {
    modules: Vec<Module>,
}

impl Registry {
    /// Registers the built-in H.264 module, then scans `plugin_dir` (if
    /// `Some`) for additional shared-library modules.
    pub fn load(plugin_dir: Option<&Path>, log: &Arc<dyn LogSink>) -> Result<Self> {
        let mut modules = vec![builtin_h264_module()];

        if let Some(dir) = plugin_dir {
            for plugin in plugin::scan_plugin_dir(dir, log)? {
                modules.push(Module::Plugin(plugin));
            }
        }

        Ok(Self { modules })
    }

    /// Registers the built-in H.264 module, deriving `plugin_dir` from `cfg`'s
    /// `[registry] plugin_dir` key if one is set.
    pub fn from_config(cfg: &crate::config::Config, log: &Arc<dyn LogSink>) -> Result<Self> {
        let plugin_dir = cfg.get_non_empty("registry", "plugin_dir").map(Path::new);
        Self::load(plugin_dir, log)
    }

    /// A registry with only the built-in H.264 module; no plugin directory scan.
    #[must_use]
    pub fn builtin_only() -> Self {
        Self {
            modules: vec![builtin_h264_module()],
        }
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn find(&self, codec_id: &str) -> Result<&Module> {
        self.modules
            .iter()
            .find(|m| m.codec_id() == codec_id)
            .ok_or_else(|| RegistryError::UnknownCodec(codec_id.to_string()))
    }

    pub fn create_packetizer(&self, codec_id: &str, ssrc: u32) -> Result<Box<dyn Packetizer>> {
        Ok(self.find(codec_id)?.create_packetizer(ssrc))
    }

    pub fn create_depacketizer(&self, codec_id: &str) -> Result<Box<dyn Depacketizer>> {
        Ok(self.find(codec_id)?.create_depacketizer())
    }
}

/// SSRC the built-in H.264 module uses absent an explicit override — the
/// ASCII bytes of "H264" read as a big-endian `u32`.
const BUILTIN_H264_SSRC: u32 = 0x4832_3634;

fn builtin_h264_module() -> Module {
    Module::BuiltIn {
        name: "H.264 (RFC 6184)",
        codec_id: h264::CODEC_ID,
        ssrc_default: BUILTIN_H264_SSRC,
        create_packetizer: builtin_h264_packetizer,
        create_depacketizer: builtin_h264_depacketizer,
        self_test: Some(builtin_h264_self_test),
    }
}

/// Default MTU-sized, payload-type-96, zero-start-sequence H.264 packetizer.
/// The video socket overrides ssrc/start sequence as needed after construction
/// by going through [`h264::H264Packetizer::new`] directly when it needs more
/// control; this factory exists only to satisfy the registry's fixed signature.
fn builtin_h264_packetizer(ssrc: u32) -> Box<dyn Packetizer> {
    Box::new(h264::H264Packetizer::new(1400, 96, ssrc, 0))
}

fn builtin_h264_depacketizer() -> Box<dyn Depacketizer> {
    Box::new(crate::media::RtpDepacketizer::new(
        h264::CODEC_ID,
        h264::H264PayloadParser::new(),
    ))
}

/// Roundtrips a single-NALU frame through a fresh packetizer/depacketizer
/// pair and checks the bytes come back unchanged.
fn builtin_h264_self_test() -> bool {
    let nalu: &[u8] = &[0x65, 1, 2, 3, 4];
    let mut data = vec![0, 0, 0, 1];
    data.extend_from_slice(nalu);

    let mut packetizer = h264::H264Packetizer::new(1400, 96, BUILTIN_H264_SSRC, 0);
    if packetizer.add_frame(&data, 1, false, 1, 1, false, true).is_err() {
        return false;
    }

    let depacketizer = crate::media::RtpDepacketizer::new(h264::CODEC_ID, h264::H264PayloadParser::new());
    while let Some(datagram) = packetizer.create_next_packet() {
        depacketizer.add_packet(&datagram);
    }

    depacketizer.receive_frame_data().is_some_and(|frame| frame.data == data)
}
