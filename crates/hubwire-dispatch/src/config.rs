use hubwire_progress::FailureLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read dispatch config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dispatch config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Dispatcher settings.
///
/// ```yaml
/// log_delivery_failures: true
/// failure_level: warn
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Attach a tracing logger to every reporter. When off, delivery
    /// failures are dropped without a trace.
    pub log_delivery_failures: bool,
    pub failure_level: FailureLevel,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            log_delivery_failures: true,
            failure_level: FailureLevel::Warn,
        }
    }
}

impl DispatchConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}
