use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from netperf.toml. Every setting has a
/// default, so the file is optional and may be partial.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct NetperfConfig {
    pub scan: ScanConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Where auto-named reports are written.
    pub output_dir: PathBuf,
    /// File pattern for directory discovery.
    pub log_pattern: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Timestamp gap that splits unscoped sessions, in seconds.
    pub time_window_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_pattern: "*.log".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_window_secs: 300,
        }
    }
}

/// Errors loading the config file. A missing file is not an error — defaults
/// apply.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "cannot read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "cannot parse config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Load configuration, falling back to defaults when the file is absent.
pub fn load(path: &Path) -> Result<NetperfConfig, ConfigError> {
    if !path.exists() {
        return Ok(NetperfConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
