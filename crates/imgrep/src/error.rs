//! Error types for imgrep.
//!
//! All fallible operations in the library return [`Result`], built on a single
//! [`ImgrepError`] enum:
//!
//! - Use `thiserror` for automatic `Error` trait implementation
//! - Preserve error chains with `#[source]` attributes
//! - Include context in error messages (file names, cache paths, etc.)
//!
//! # Error Handling Philosophy
//!
//! **System errors always bubble up unchanged:**
//! - `ImgrepError::Io` (from `std::io::Error`) - file system and permission
//!   errors indicate real problems the user needs to see.
//!
//! **Per-file errors never abort a batch:**
//! - `Decode` and `Ocr` are recorded as `Error`-status cache entries by the
//!   worker; the job keeps going.
//!
//! **Cache errors are recoverable:**
//! - `CacheLoad` means the persisted cache is unreadable; callers substitute
//!   an empty store and continue.
//! - `CachePersist` means a write-through failed; the in-memory state stays
//!   authoritative for the session and the failure is surfaced via progress
//!   reporting.
use thiserror::Error;

/// Result type alias using `ImgrepError`.
pub type Result<T> = std::result::Result<T, ImgrepError>;

/// Main error type for all imgrep operations.
///
/// # Variants
///
/// - `Io` - File system and I/O errors (always bubble up)
/// - `CacheLoad` - Persisted cache unreadable or corrupt (recover with empty store)
/// - `CachePersist` - Write-through to the cache file failed (non-fatal)
/// - `Decode` - Image bytes could not be decoded (per-file)
/// - `Ocr` - The OCR engine failed on an image (per-file)
/// - `Validation` - Invalid input (folder path, configuration, parameters)
/// - `Serialization` - JSON encode/decode errors
/// - `AlreadyRunning` - A processing job is already running for this store
/// - `LockPoisoned` - Mutex poisoning (should not happen in normal operation)
#[derive(Debug, Error)]
pub enum ImgrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache load error: {message}")]
    CacheLoad {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cache persist error: {message}")]
    CachePersist {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("a processing job is already running for this cache")]
    AlreadyRunning,

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<serde_json::Error> for ImgrepError {
    fn from(err: serde_json::Error) -> Self {
        ImgrepError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $with_source:ident, $variant:ident) => {
        /// Create the error from a message.
        pub fn $name<S: Into<String>>(message: S) -> Self {
            Self::$variant {
                message: message.into(),
                source: None,
            }
        }

        /// Create the error from a message plus an underlying cause.
        pub fn $with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
            message: S,
            source: E,
        ) -> Self {
            Self::$variant {
                message: message.into(),
                source: Some(Box::new(source)),
            }
        }
    };
}

impl ImgrepError {
    error_constructor!(cache_load, cache_load_with_source, CacheLoad);
    error_constructor!(cache_persist, cache_persist_with_source, CachePersist);
    error_constructor!(decode, decode_with_source, Decode);
    error_constructor!(ocr, ocr_with_source, Ocr);
    error_constructor!(validation, validation_with_source, Validation);
    error_constructor!(serialization, serialization_with_source, Serialization);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ImgrepError = io_err.into();
        assert!(matches!(err, ImgrepError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_cache_load_error() {
        let err = ImgrepError::cache_load("truncated JSON");
        assert_eq!(err.to_string(), "Cache load error: truncated JSON");
    }

    #[test]
    fn test_cache_persist_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "cannot write");
        let err = ImgrepError::cache_persist_with_source("write-through failed", source);
        assert_eq!(err.to_string(), "Cache persist error: write-through failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_decode_error() {
        let err = ImgrepError::decode("not a PNG");
        assert_eq!(err.to_string(), "Decode error: not a PNG");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_ocr_error_with_source() {
        let source = std::io::Error::other("tesseract exited with status 1");
        let err = ImgrepError::ocr_with_source("recognition failed", source);
        assert_eq!(err.to_string(), "OCR error: recognition failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_error() {
        let err = ImgrepError::validation("path is not a directory");
        assert_eq!(err.to_string(), "Validation error: path is not a directory");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ImgrepError = json_err.into();
        assert!(matches!(err, ImgrepError::Serialization { .. }));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_already_running_display() {
        let err = ImgrepError::AlreadyRunning;
        assert_eq!(err.to_string(), "a processing job is already running for this cache");
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/file.txt")?;
            Ok(content)
        }

        let result = read_file();
        assert!(matches!(result.unwrap_err(), ImgrepError::Io(_)));
    }
}
