//! imgrep - Incremental OCR Cache Pipeline
//!
//! imgrep scans a folder of images, extracts text from each via an external
//! OCR engine, caches the extracted text keyed by filename, and serves
//! case-insensitive substring search over the cached text.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imgrep::{ImgrepConfig, Pipeline, TesseractEngine, TextCache};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> imgrep::Result<()> {
//! let config = ImgrepConfig::default();
//! let cache = TextCache::load_or_default(&config.cache_path);
//! let engine = Arc::new(TesseractEngine::from_config(&config));
//! let pipeline = Pipeline::new(cache, engine, config);
//!
//! // Process every not-yet-cached image in the folder.
//! let handle = pipeline.start("scans/")?;
//! handle.wait().await?;
//!
//! // Search never blocks on processing.
//! for hit in pipeline.search("invoice")? {
//!     println!("{}: {}", hit.filename, hit.excerpt);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Store** (`store`): durable filename → text mapping; write-through JSON
//!   persistence, one rewrite per entry, temp-file + atomic rename
//! - **Worker** (`worker`): folder scan, sequential per-file processing,
//!   per-file failures recorded as `Error` entries
//! - **Coordinator** (`coordinator`): job lifecycle, single-writer
//!   discipline, progress events, cooperative cancellation
//! - **Search** (`search`): snapshot reads, case-insensitive substring match
//! - **OCR** (`ocr`): engine seam plus the Tesseract subprocess backend

#![deny(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod decode;
pub mod error;
pub mod ocr;
pub mod search;
pub mod store;
pub mod worker;

pub use error::{ImgrepError, Result};

pub use config::ImgrepConfig;
pub use coordinator::{JobHandle, JobStatus, Pipeline, ProgressEvent};
pub use ocr::{OcrEngine, TesseractEngine};
pub use search::{SearchHit, search, search_with_excerpt};
pub use store::{CacheEntry, CacheSnapshot, CacheStats, EntryStatus, TextCache};
