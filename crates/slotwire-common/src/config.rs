//! Configuration model for containers, the engine and graph rendering.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::RANKDIRS;
use crate::error::{Result, SlotwireError};

/// Root configuration for a slotwire container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotwireConfig {
    /// Construction engine settings.
    pub engine: EngineConfig,
    /// DOT rendering settings.
    pub graph: GraphConfig,
}

impl SlotwireConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or a value fails
    /// validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading slotwire config");
        let content = std::fs::read_to_string(path).map_err(|e| SlotwireError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if RANKDIRS.contains(&self.graph.rankdir.as_str()) {
            Ok(())
        } else {
            Err(SlotwireError::Config {
                message: format!("unsupported graph rankdir: {}", self.graph.rankdir),
            })
        }
    }
}

/// Settings for the construction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Convert panics inside constructors into errors.
    pub recover_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recover_panics: true,
        }
    }
}

/// Settings for the DOT projection of dependency graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Layout direction (`LR`, `RL`, `TB` or `BT`).
    pub rankdir: String,
    /// Node font name.
    pub font: String,
    /// Append `file:line` of each constructor to node labels.
    pub show_locations: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            rankdir: crate::constants::DEFAULT_RANKDIR.to_string(),
            font: crate::constants::DEFAULT_FONT.to_string(),
            show_locations: true,
        }
    }
}
