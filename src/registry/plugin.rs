use std::ffi::CStr;

use libloading::{Library, Symbol};

use crate::log::log_sink::LogSink;
use crate::media::{Depacketizer, Packetizer};
use crate::sink_warn;

use super::descriptor::{ModuleInfo, MODULE_INFO_SYMBOL};
use super::error::{RegistryError, Result};

/// A codec module backed by a dynamically-loaded shared library.
///
/// The library is kept alive for the module's entire lifetime: it is only
/// unloaded when this value (and every `Box<dyn Packetizer/Depacketizer>` it
/// produced) has been dropped, since the vtables those trait objects point
/// into live inside the mapped library.
pub struct PluginModule {
    _lib: Library,
    name: String,
    codec_id: String,
    info: ModuleInfo,
}

// SAFETY: `ModuleInfo`'s function pointers are plain `extern "C" fn`s with no
// captured state, and `Library` itself is `Send + Sync` once loaded.
unsafe impl Send for PluginModule {}
unsafe impl Sync for PluginModule {}

impl PluginModule {
    /// Loads `path` as a shared library and calls its `get_module_info` export.
    ///
    /// # Safety caveat
    /// This trusts the plugin to hand back pointers produced by the same
    /// compiled definition of `PacketizerHandle`/`DepacketizerHandle` this
    /// crate uses; a mismatched plugin build can produce undefined behavior.
    /// That is an accepted limitation of this prototype's loading scheme,
    /// not something this loader can check for at runtime.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        // SAFETY: loading an arbitrary shared library is inherently unsafe;
        // the caller is responsible for only pointing this at trusted plugins.
        let lib = unsafe { Library::new(path) }?;

        let info = unsafe {
            let ctor: Symbol<unsafe extern "C" fn() -> ModuleInfo> =
                lib.get(MODULE_INFO_SYMBOL).map_err(|_| {
                    RegistryError::MissingSymbol("get_module_info")
                })?;
            ctor()
        };

        let name = unsafe { CStr::from_ptr(info.name) }
            .to_string_lossy()
            .into_owned();
        let codec_id = unsafe { CStr::from_ptr(info.codec_id) }
            .to_string_lossy()
            .into_owned();

        Ok(Self {
            _lib: lib,
            name,
            codec_id,
            info,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    #[must_use]
    pub fn ssrc_default(&self) -> u32 {
        self.info.ssrc_default
    }

    /// Runs the plugin's self-test export, if any. `true` if it has none.
    #[must_use]
    pub fn self_test(&self) -> bool {
        // SAFETY: the plugin contract guarantees any non-null `self_test`
        // points at a valid `extern "C" fn() -> bool` with no captured state.
        self.info.self_test.is_none_or(|f| unsafe { f() })
    }

    #[must_use]
    pub fn create_packetizer(&self, ssrc: u32) -> Box<dyn Packetizer> {
        // SAFETY: the plugin contract guarantees a non-null handle built
        // from a `Box<dyn Packetizer>` via `Box::into_raw`.
        unsafe {
            let raw = (self.info.create_packetizer)(ssrc);
            Box::from_raw(raw).0
        }
    }

    #[must_use]
    pub fn create_depacketizer(&self) -> Box<dyn Depacketizer> {
        // SAFETY: see `create_packetizer`.
        unsafe {
            let raw = (self.info.create_depacketizer)();
            Box::from_raw(raw).0
        }
    }
}

/// Scans `dir` for loadable shared libraries, skipping anything that fails
/// to load (logging a warning) rather than aborting the whole scan.
pub fn scan_plugin_dir(
    dir: &std::path::Path,
    log: &std::sync::Arc<dyn LogSink>,
) -> Result<Vec<PluginModule>> {
    let mut modules = Vec::new();
    if !dir.exists() {
        return Ok(modules);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match is_loadable_extension(&path) {
            true => match PluginModule::load(&path) {
                Ok(m) => modules.push(m),
                Err(e) => sink_warn!(log, "skipping plugin `{}`: {e}", path.display()),
            },
            false => continue,
        }
    }
    Ok(modules)
}

fn is_loadable_extension(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("so") | Some("dylib") | Some("dll")
    )
}
