//! Pipeline coordination.
//!
//! The [`Pipeline`] owns the cache and the OCR engine, and defines the
//! concurrency contract between background processing and foreground
//! queries: at most one job runs per cache (single-writer discipline,
//! enforced with an atomic flag), searches read snapshots and never block on
//! the worker, and progress flows to any listener over an event channel
//! rather than through direct presentation-layer calls.
//!
//! Job lifecycle: `Idle -> Running -> {Completed, Cancelled}`. Cancellation
//! is cooperative - the worker observes the flag between files, so entries
//! persisted before the cancel always survive.

use crate::config::ImgrepConfig;
use crate::error::{ImgrepError, Result};
use crate::ocr::OcrEngine;
use crate::search::{self, SearchHit};
use crate::store::{CacheSnapshot, EntryStatus, TextCache};
use crate::worker;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// State of a processing job. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Cancelled,
}

/// Progress notification emitted by the worker, consumed by any listener
/// (CLI, log, test harness).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The job was accepted; `total` files are pending.
    Started { folder: PathBuf, total: usize },
    /// One file finished (successfully or not) and its entry was written.
    FileProcessed {
        filename: String,
        status: EntryStatus,
        processed: usize,
        total: usize,
    },
    /// A write-through failed; the entry lives on in memory only.
    PersistFailed { filename: String, message: String },
    Completed { processed: usize },
    Cancelled { processed: usize },
}

/// Cheap cloneable handle for requesting cancellation from another task
/// (e.g. a signal handler) while the job owner drains events.
#[derive(Clone)]
pub struct Canceller {
    flag: Arc<AtomicBool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Handle to a running (or finished) processing job.
#[derive(Debug)]
pub struct JobHandle {
    pending: Vec<String>,
    cancel: Arc<AtomicBool>,
    status: Arc<Mutex<JobStatus>>,
    events: UnboundedReceiver<ProgressEvent>,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Filenames this job set out to process, in order.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Request cooperative cancellation. Takes effect after the file
    /// currently being processed (if any) is persisted.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            flag: Arc::clone(&self.cancel),
        }
    }

    pub fn status(&self) -> Result<JobStatus> {
        self.status
            .lock()
            .map(|s| *s)
            .map_err(|e| ImgrepError::LockPoisoned(format!("job status mutex poisoned: {}", e)))
    }

    /// Receive the next progress event; `None` once the job is done and the
    /// channel is drained.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Wait for the job to finish and return its terminal status.
    pub async fn wait(self) -> Result<JobStatus> {
        self.task
            .await
            .map_err(|e| std::io::Error::other(format!("worker task failed: {}", e)))?;

        self.status
            .lock()
            .map(|s| *s)
            .map_err(|e| ImgrepError::LockPoisoned(format!("job status mutex poisoned: {}", e)))
    }
}

/// Orchestrates folder processing against one cache instance.
pub struct Pipeline {
    cache: Arc<TextCache>,
    engine: Arc<dyn OcrEngine>,
    config: ImgrepConfig,
    running: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(cache: TextCache, engine: Arc<dyn OcrEngine>, config: ImgrepConfig) -> Self {
        Self {
            cache: Arc::new(cache),
            engine,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start processing `folder` on a background task.
    ///
    /// Fails with [`ImgrepError::AlreadyRunning`] while another job is
    /// `Running` (synchronous rejection, no state change), and with
    /// [`ImgrepError::Validation`] when `folder` is not a directory. The
    /// pending set is every allow-listed image file in the folder minus the
    /// filenames already cached.
    pub fn start(&self, folder: impl AsRef<Path>) -> Result<JobHandle> {
        let folder = folder.as_ref().to_path_buf();

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ImgrepError::AlreadyRunning);
        }

        let pending = match self
            .cache
            .keys()
            .and_then(|keys| worker::pending_files(&folder, &keys, &self.config.extensions))
        {
            Ok(pending) => pending,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };

        tracing::info!(folder = %folder.display(), pending = pending.len(), "starting processing job");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let _ = events_tx.send(ProgressEvent::Started {
            folder: folder.clone(),
            total: pending.len(),
        });

        let cancel = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(JobStatus::Running));

        let cache = Arc::clone(&self.cache);
        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let worker_cancel = Arc::clone(&cancel);
        let worker_status = Arc::clone(&status);
        let worker_pending = pending.clone();

        let task = tokio::spawn(async move {
            let outcome = worker::run(cache, engine, folder, worker_pending, worker_cancel, events_tx).await;
            if let Ok(mut current) = worker_status.lock() {
                *current = outcome;
            }
            // Release the single-writer slot only after the terminal status
            // is recorded.
            running.store(false, Ordering::Release);
        });

        Ok(JobHandle {
            pending,
            cancel,
            status,
            events: events_rx,
            task,
        })
    }

    /// Whether a job currently holds the single-writer slot.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Search the cache as of now. Reads a snapshot; never blocks on a
    /// running job and never observes a half-written entry.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let snapshot = self.cache.snapshot()?;
        Ok(search::search_with_excerpt(query, &snapshot, self.config.excerpt_chars))
    }

    pub fn snapshot(&self) -> Result<CacheSnapshot> {
        self.cache.snapshot()
    }

    pub fn cache(&self) -> &TextCache {
        &self.cache
    }

    pub fn config(&self) -> &ImgrepConfig {
        &self.config
    }
}
