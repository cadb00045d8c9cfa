//! Run file loading for the binary.
//!
//! The library is configured entirely through the address. The binary can
//! additionally read a small TOML file so long-lived deployments don't need
//! to spell everything out on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Error type for run file loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings a run file may provide. Every field is optional; command line
/// values take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunFile {
    /// Bind specifier or relay URL.
    pub address: Option<String>,

    /// Log filter directive (e.g. `info`, `wtf_serve=debug`).
    pub log_level: Option<String>,

    /// PEM certificate for TLS bare binds.
    pub cert_path: Option<PathBuf>,

    /// PEM private key for TLS bare binds.
    pub key_path: Option<PathBuf>,

    /// Prometheus exporter bind address.
    pub metrics_address: Option<String>,
}

/// Load a run file from disk.
pub fn load_config(path: &Path) -> Result<RunFile, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
