use std::ffi::c_char;

use crate::media::{Depacketizer, Packetizer};

/// Opaque handle a plugin's `create_packetizer` returns across the dylib
/// boundary. Only ever touched through [`PluginModule`](super::plugin::PluginModule);
/// the host reconstitutes the `Box<dyn Packetizer>` via [`Box::from_raw`].
pub struct PacketizerHandle(pub Box<dyn Packetizer>);

/// Opaque handle a plugin's `create_depacketizer` returns across the dylib boundary.
pub struct DepacketizerHandle(pub Box<dyn Depacketizer>);

pub type CreatePacketizerFn = unsafe extern "C" fn(ssrc: u32) -> *mut PacketizerHandle;
pub type CreateDepacketizerFn = unsafe extern "C" fn() -> *mut DepacketizerHandle;

/// The single symbol every module (built-in or plugin) exposes discovery
/// through: a `name`/`codec_id` pair, its default SSRC, factory function
/// pointers, and an optional self-test hook.
#[repr(C)]
pub struct ModuleInfo {
    pub name: *const c_char,
    pub codec_id: *const c_char,
    /// SSRC a session should use for this codec absent an explicit override.
    pub ssrc_default: u32,
    pub create_packetizer: CreatePacketizerFn,
    pub create_depacketizer: CreateDepacketizerFn,
    /// Optional self-check a module can run at load time (e.g. a roundtrip
    /// sanity check of its own packetizer/depacketizer pair). `None`/null if
    /// the module doesn't provide one.
    pub self_test: Option<unsafe extern "C" fn() -> bool>,
}

/// Name of the exported symbol every module shared library must provide.
pub const MODULE_INFO_SYMBOL: &[u8] = b"get_module_info";

/// A codec module available to this process: the built-in H.264 module, or
/// one loaded from a shared library in the plugin directory. Built-ins are
/// always enumerated before plugins.
pub enum Module {
    BuiltIn {
        name: &'static str,
        codec_id: &'static str,
        ssrc_default: u32,
        create_packetizer: fn(u32) -> Box<dyn Packetizer>,
        create_depacketizer: fn() -> Box<dyn Depacketizer>,
        self_test: Option<fn() -> bool>,
    },
    Plugin(super::plugin::PluginModule),
}

impl Module {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::BuiltIn { name, .. } => name,
            Self::Plugin(p) => p.name(),
        }
    }

    #[must_use]
    pub fn codec_id(&self) -> &str {
        match self {
            Self::BuiltIn { codec_id, .. } => codec_id,
            Self::Plugin(p) => p.codec_id(),
        }
    }

    /// Default SSRC a session should use for this codec absent an override.
    #[must_use]
    pub fn ssrc_default(&self) -> u32 {
        match self {
            Self::BuiltIn { ssrc_default, .. } => *ssrc_default,
            Self::Plugin(p) => p.ssrc_default(),
        }
    }

    #[must_use]
    pub fn create_packetizer(&self, ssrc: u32) -> Box<dyn Packetizer> {
        match self {
            Self::BuiltIn { create_packetizer, .. } => create_packetizer(ssrc),
            Self::Plugin(p) => p.create_packetizer(ssrc),
        }
    }

    #[must_use]
    pub fn create_depacketizer(&self) -> Box<dyn Depacketizer> {
        match self {
            Self::BuiltIn { create_depacketizer, .. } => create_depacketizer(),
            Self::Plugin(p) => p.create_depacketizer(),
        }
    }

    /// Runs this module's self-test, if it provides one. `true` if the
    /// module has no self-test (nothing to fail) or its self-test passed.
    #[must_use]
    pub fn self_test(&self) -> bool {
        match self {
            Self::BuiltIn { self_test, .. } => self_test.is_none_or(|f| f()),
            Self::Plugin(p) => p.self_test(),
        }
    }
}
