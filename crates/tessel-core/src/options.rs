//! Runtime options
//!
//! Options are plain data with sensible defaults and can be loaded from a
//! TOML document:
//!
//! ```toml
//! validation = "unchecked"
//! auto_dispose = true
//! dispose_debug_level = 1
//!
//! [settings]
//! "app.theme" = "dark"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Highest meaningful `dispose_debug_level`
pub const MAX_DISPOSE_DEBUG_LEVEL: u8 = 2;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the options file
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse options: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Parsed but semantically invalid
    #[error("Invalid options: {0}")]
    ValidationError(String),
}

/// Validation mode of a runtime
///
/// `Checked` enables descriptor shape checks, refine restrictions, setting
/// namespace checks, event listener checks and property type checks.
/// `Unchecked` skips all of them; the rest of the API behaves identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    /// All validation enabled
    Checked,
    /// Validation skipped
    Unchecked,
}

impl Validation {
    /// Whether validation is enabled
    pub fn is_checked(self) -> bool {
        self == Validation::Checked
    }
}

impl Default for Validation {
    fn default() -> Self {
        if cfg!(feature = "checked") {
            Validation::Checked
        } else {
            Validation::Unchecked
        }
    }
}

/// Options for creating a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Validation mode
    pub validation: Validation,

    /// Register new objects in the live object table unless their class
    /// says otherwise
    pub auto_dispose: bool,

    /// Disposal logging verbosity (0 = quiet, 1 = sweeps, 2 = every object)
    pub dispose_debug_level: u8,

    /// Overrides for class-declared settings
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            validation: Validation::default(),
            auto_dispose: true,
            dispose_debug_level: 0,
            settings: BTreeMap::new(),
        }
    }
}

impl RuntimeOptions {
    /// Default options with validation forced on
    pub fn checked() -> Self {
        Self {
            validation: Validation::Checked,
            ..Default::default()
        }
    }

    /// Default options with validation forced off
    pub fn unchecked() -> Self {
        Self {
            validation: Validation::Unchecked,
            ..Default::default()
        }
    }

    /// Parse options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: RuntimeOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dispose_debug_level > MAX_DISPOSE_DEBUG_LEVEL {
            return Err(ConfigError::ValidationError(format!(
                "dispose_debug_level must be at most {}, got {}",
                MAX_DISPOSE_DEBUG_LEVEL, self.dispose_debug_level
            )));
        }
        for key in self.settings.keys() {
            if !key.contains('.') {
                return Err(ConfigError::ValidationError(format!(
                    "setting '{}' must be namespaced (e.g. 'app.{}')",
                    key, key
                )));
            }
        }
        Ok(())
    }
}
