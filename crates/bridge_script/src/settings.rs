//! Bridge settings

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Behaviour switches for the marshalling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalSettings {
    /// Zero-argument calls may be made without explicit call syntax.
    pub use_auto_call: bool,
    /// Log every marshalling failure, not only the ones surfaced to scripts.
    pub log_all_exceptions: bool,
    /// Warn when a 64-bit integer loses precision as a script number.
    pub warn_on_precision_loss: bool,
}

impl Default for MarshalSettings {
    fn default() -> Self {
        Self {
            use_auto_call: true,
            log_all_exceptions: false,
            warn_on_precision_loss: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl MarshalSettings {
    pub fn from_json(source: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
