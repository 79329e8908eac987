//! Folder scanning and the per-file processing loop.
//!
//! The worker owns the write side of the pipeline: it determines which files
//! still need recognition, processes them one at a time, and writes every
//! result through to the cache before moving on. Recognition failures become
//! `Error`-status entries; only the cancellation flag stops the loop early,
//! and only between files.

use crate::coordinator::{JobStatus, ProgressEvent};
use crate::decode;
use crate::error::{ImgrepError, Result};
use crate::ocr::OcrEngine;
use crate::store::{CacheEntry, TextCache};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;

/// List the files in `folder` still awaiting recognition.
///
/// Looks at direct children only (no recursion), keeps regular files whose
/// extension is in `extensions` (case-insensitive, no dot), and drops any
/// filename already present in `cached` - a cached key means "attempted",
/// whatever its status. The result is sorted so progress reporting is
/// deterministic across runs.
pub fn pending_files(folder: &Path, cached: &HashSet<String>, extensions: &[String]) -> Result<Vec<String>> {
    if !folder.is_dir() {
        return Err(ImgrepError::validation(format!(
            "Path is not a directory: {}",
            folder.display()
        )));
    }

    let mut pending = Vec::new();

    for entry in std::fs::read_dir(folder).map_err(ImgrepError::Io)? {
        let entry = entry.map_err(ImgrepError::Io)?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::debug!(path = %path.display(), "skipping non-UTF-8 filename");
            continue;
        };

        if !has_allowed_extension(&path, extensions) {
            continue;
        }

        if !cached.contains(filename) {
            pending.push(filename.to_string());
        }
    }

    pending.sort();
    Ok(pending)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lowered = e.to_lowercase();
            extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&lowered))
        })
        .unwrap_or(false)
}

/// Process a single file into a cache entry.
///
/// Reads the file, decode-validates it, and hands the bytes to the engine.
/// Any failure along the way - unreadable file, undecodable image, engine
/// error - is captured as an `Error`-status entry so the file counts as
/// attempted; this function never fails the batch.
pub async fn process_one(path: &Path, engine: &dyn OcrEngine) -> CacheEntry {
    match try_process(path, engine).await {
        Ok(text) => CacheEntry::ok(text),
        Err(e) => {
            tracing::debug!(file = %path.display(), error = %e, "recording failed attempt");
            CacheEntry::error(e.to_string())
        }
    }
}

async fn try_process(path: &Path, engine: &dyn OcrEngine) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImgrepError::decode_with_source(format!("failed to read {}", path.display()), e))?;

    // Reject undecodable images before invoking the engine; their failure
    // message names the real problem instead of an engine-specific one.
    decode::decode_image(&bytes)?;

    engine.recognize(&bytes).await
}

/// Run a processing job to completion or cancellation.
///
/// Files are processed strictly in order, each result written through to the
/// cache before the next file starts. The cancellation flag is checked
/// between files, never mid-file, so already-persisted entries always
/// survive a cancel. Persist failures are surfaced as events and do not stop
/// the job - the in-memory cache stays authoritative for the session.
pub(crate) async fn run(
    cache: Arc<TextCache>,
    engine: Arc<dyn OcrEngine>,
    folder: PathBuf,
    pending: Vec<String>,
    cancel: Arc<AtomicBool>,
    events: UnboundedSender<ProgressEvent>,
) -> JobStatus {
    let total = pending.len();

    for (index, filename) in pending.into_iter().enumerate() {
        if cancel.load(Ordering::Acquire) {
            tracing::info!(folder = %folder.display(), processed = index, "job cancelled");
            let _ = events.send(ProgressEvent::Cancelled { processed: index });
            return JobStatus::Cancelled;
        }

        let entry = process_one(&folder.join(&filename), engine.as_ref()).await;
        let status = entry.status;

        if let Err(e) = cache.put(filename.clone(), entry) {
            tracing::warn!(file = %filename, error = %e, "write-through failed, continuing");
            let _ = events.send(ProgressEvent::PersistFailed {
                filename: filename.clone(),
                message: e.to_string(),
            });
        }

        let _ = events.send(ProgressEvent::FileProcessed {
            filename,
            status,
            processed: index + 1,
            total,
        });
    }

    tracing::info!(folder = %folder.display(), processed = total, "job completed");
    let _ = events.send(ProgressEvent::Completed { processed: total });
    JobStatus::Completed
}
