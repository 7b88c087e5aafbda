//! Settings – the process configuration shared by the registry, the
//! documents and the conversion pipeline.
//!
//! A [`Settings`] value lives inside the [`crate::registry::Registry`] and is
//! changed only through [`Settings::apply`] with a [`SettingsPatch`], which
//! replaces exactly the fields it carries.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default read buffer for file encoding (500 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 500;

/// Default upper bound for a single rasterizer call.
pub const DEFAULT_RASTERIZER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory for temporary HTML/PDF files.
    #[serde(default = "Settings::default_directory")]
    pub directory: PathBuf,
    /// Read buffer size in bytes used when encoding files.
    #[serde(default = "Settings::default_buffer_size")]
    pub buffer_size: usize,
    /// Language tag assigned to new documents (ISO notation, e.g. "en-UK").
    #[serde(default = "Settings::default_language")]
    pub default_language: String,
    /// Ordered status levels; new documents start at the first one.
    #[serde(default = "Settings::default_status_levels")]
    pub status_levels: Vec<String>,
    /// Upper bound for one rasterizer invocation, in seconds.
    #[serde(default = "Settings::default_rasterizer_timeout_secs")]
    pub rasterizer_timeout_secs: u64,
}

/// Partial settings update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub directory: Option<PathBuf>,
    pub buffer_size: Option<usize>,
    pub default_language: Option<String>,
    pub status_levels: Option<Vec<String>>,
    pub rasterizer_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            buffer_size: Self::default_buffer_size(),
            default_language: Self::default_language(),
            status_levels: Self::default_status_levels(),
            rasterizer_timeout_secs: Self::default_rasterizer_timeout_secs(),
        }
    }
}

impl Settings {
    fn default_directory() -> PathBuf {
        std::env::temp_dir().join("doc-forge")
    }

    fn default_buffer_size() -> usize {
        DEFAULT_BUFFER_SIZE
    }

    fn default_language() -> String {
        "en-UK".to_string()
    }

    fn default_status_levels() -> Vec<String> {
        vec!["01_new".to_string()]
    }

    fn default_rasterizer_timeout_secs() -> u64 {
        DEFAULT_RASTERIZER_TIMEOUT_SECS
    }

    /// Status assigned to freshly created documents.
    pub fn initial_status(&self) -> String {
        self.status_levels.first().cloned().unwrap_or_default()
    }

    pub fn rasterizer_timeout(&self) -> Duration {
        Duration::from_secs(self.rasterizer_timeout_secs)
    }

    /// Overwrite every field present in `patch`.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(directory) = patch.directory {
            self.directory = directory;
        }
        if let Some(buffer_size) = patch.buffer_size {
            // A zero-sized buffer reader never makes progress.
            self.buffer_size = buffer_size.max(1);
        }
        if let Some(language) = patch.default_language {
            self.default_language = language;
        }
        if let Some(levels) = patch.status_levels {
            self.status_levels = levels;
        }
        if let Some(timeout) = patch.rasterizer_timeout_secs {
            self.rasterizer_timeout_secs = timeout;
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

impl SettingsPatch {
    /// Deserialise from JSON; missing fields stay `None`.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}
