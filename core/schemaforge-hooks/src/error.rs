//! Error types for the hook loader.

use std::path::PathBuf;
use thiserror::Error;

/// A hook source exists but cannot be turned into a working extension.
///
/// Always fatal to discovery: a broken hook file means a broken deployment.
#[derive(Debug, Error)]
pub enum HookLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path}: unknown hook handler '{name}'")]
    UnknownHandler { path: PathBuf, name: String },

    #[error("{path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
