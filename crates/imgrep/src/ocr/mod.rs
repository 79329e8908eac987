//! OCR engine seam.
//!
//! The pipeline treats recognition as a black-box capability behind the
//! [`OcrEngine`] trait: bytes in, text out. The default implementation
//! shells out to Tesseract ([`TesseractEngine`]); tests inject scripted
//! engines through the same seam.

pub mod tesseract;

pub use tesseract::TesseractEngine;

use crate::Result;
use async_trait::async_trait;

/// A text-recognition capability.
///
/// Engines must be `Send + Sync`: the worker calls them from a background
/// task while the foreground keeps serving searches.
///
/// # Errors
///
/// `recognize` fails with [`crate::ImgrepError::Ocr`] for engine-level
/// failures and lets I/O errors bubble unchanged. The worker converts either
/// into an `Error`-status cache entry; a failing image never aborts a batch.
///
/// # Example
///
/// ```rust
/// use imgrep::ocr::OcrEngine;
/// use imgrep::Result;
/// use async_trait::async_trait;
///
/// struct FixedEngine;
///
/// #[async_trait]
/// impl OcrEngine for FixedEngine {
///     async fn recognize(&self, _image_bytes: &[u8]) -> Result<String> {
///         Ok("recognized text".to_string())
///     }
///
///     fn name(&self) -> &str {
///         "fixed"
///     }
/// }
/// ```
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract text from raw image bytes (PNG, JPEG, ...).
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String>;

    /// Short identifier used in logs and progress output.
    fn name(&self) -> &str;
}
