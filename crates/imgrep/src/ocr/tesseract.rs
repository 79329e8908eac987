//! Tesseract subprocess backend.
//!
//! Recognition shells out to the `tesseract` binary in stdin → stdout mode,
//! keeping the engine an external, replaceable collaborator. Each invocation
//! is bounded by a timeout; a hung engine fails one file, not the batch.

use crate::config::ImgrepConfig;
use crate::error::{ImgrepError, Result};
use crate::ocr::OcrEngine;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

/// OCR engine backed by the `tesseract` command-line program.
pub struct TesseractEngine {
    program: String,
    language: String,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(program: impl Into<String>, language: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn from_config(config: &ImgrepConfig) -> Self {
        Self::new(&config.tesseract_program, &config.language, config.ocr_timeout_secs)
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                // Failed to execute tesseract - an IO error (command not found, etc.) ~keep
                std::io::Error::other(format!("Failed to execute {}: {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ImgrepError::ocr("tesseract stdin was not captured"))?;
        stdin
            .write_all(image_bytes)
            .await
            .map_err(|e| ImgrepError::ocr_with_source("failed to stream image to tesseract", e))?;
        // Close stdin so tesseract sees end-of-input.
        drop(stdin);

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(std::io::Error::other(format!("Failed to wait for {}: {}", self.program, e)).into());
            }
            Err(_) => {
                // Timeout - child was already consumed by wait_with_output(), process is killed on drop ~keep
                return Err(ImgrepError::ocr(format!(
                    "tesseract timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            // Engine-level failures (unreadable input, missing language data) are OCR errors;
            // anything else is a system error and bubbles up as IO. ~keep
            let stderr_lower = stderr.to_lowercase();
            if stderr_lower.contains("error")
                || stderr_lower.contains("failed")
                || stderr_lower.contains("unsupported")
            {
                return Err(ImgrepError::ocr(format!("tesseract failed: {}", stderr.trim())));
            }

            return Err(std::io::Error::other(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ImgrepError::ocr_with_source("tesseract produced invalid UTF-8 output", e))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tesseract_available() -> bool {
        std::process::Command::new("tesseract")
            .arg("--version")
            .output()
            .is_ok()
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let engine = TesseractEngine::new("definitely-not-a-real-binary", "eng", 5);
        let result = engine.recognize(b"bytes").await;
        assert!(matches!(result.unwrap_err(), ImgrepError::Io(_)));
    }

    #[tokio::test]
    async fn test_recognize_rejects_garbage_input() {
        if !tesseract_available() {
            eprintln!("skipping: tesseract not installed");
            return;
        }

        let engine = TesseractEngine::new("tesseract", "eng", 30);
        let result = engine.recognize(b"not an image at all").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config() {
        let config = ImgrepConfig {
            tesseract_program: "/opt/tesseract/bin/tesseract".to_string(),
            language: "deu".to_string(),
            ocr_timeout_secs: 7,
            ..Default::default()
        };

        let engine = TesseractEngine::from_config(&config);
        assert_eq!(engine.program, "/opt/tesseract/bin/tesseract");
        assert_eq!(engine.language, "deu");
        assert_eq!(engine.timeout, Duration::from_secs(7));
    }
}
