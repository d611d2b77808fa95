use std::fmt;

/// Errors surfaced while discovering or loading codec modules.
#[derive(Debug)]
pub enum RegistryError {
    Io(std::io::Error),
    Loading(libloading::Error),
    MissingSymbol(&'static str),
    UnknownCodec(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error scanning plugin directory: {e}"),
            Self::Loading(e) => write!(f, "failed to load plugin library: {e}"),
            Self::MissingSymbol(name) => write!(f, "plugin is missing the `{name}` symbol"),
            Self::UnknownCodec(codec_id) => write!(f, "no registered module for codec_id `{codec_id}`"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<libloading::Error> for RegistryError {
    fn from(e: libloading::Error) -> Self {
        Self::Loading(e)
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
