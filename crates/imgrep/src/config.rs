//! Configuration loading and management.
//!
//! Pipeline options can be set programmatically, loaded from a TOML file, or
//! discovered by walking up from the current directory looking for
//! `imgrep.toml`.

use crate::error::{ImgrepError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pipeline configuration.
///
/// # Example
///
/// ```rust
/// use imgrep::config::ImgrepConfig;
///
/// // Create with defaults
/// let config = ImgrepConfig::default();
/// assert_eq!(config.language, "eng");
///
/// // Load from TOML file
/// // let config = ImgrepConfig::from_toml_file("imgrep.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgrepConfig {
    /// Path of the persisted cache file.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Tesseract language code (e.g., "eng", "deu").
    #[serde(default = "default_language")]
    pub language: String,

    /// Name or path of the tesseract executable.
    #[serde(default = "default_tesseract_program")]
    pub tesseract_program: String,

    /// Seconds to wait for a single OCR invocation before giving up.
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    /// File extensions considered images, compared case-insensitively and
    /// without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Maximum characters of matched text included in a search excerpt.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("ocr_cache.json")
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_tesseract_program() -> String {
    "tesseract".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

fn default_excerpt_chars() -> usize {
    200
}

impl Default for ImgrepConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            language: default_language(),
            tesseract_program: default_tesseract_program(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
            extensions: default_extensions(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

impl ImgrepConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ImgrepError::Io)?;

        toml::from_str(&content).map_err(|e| {
            ImgrepError::validation_with_source(format!("invalid config file {}", path.display()), e)
        })
    }

    /// Discover configuration automatically.
    ///
    /// Searches for `imgrep.toml` in the current directory and its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(ImgrepError::Io)?;

        loop {
            let candidate = current.join("imgrep.toml");
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}
