//! imgrep command-line interface.
//!
//! Thin front end over the library pipeline: progress and diagnostics go to
//! stderr, search results and stats go to stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgrep::{
    EntryStatus, ImgrepConfig, Pipeline, ProgressEvent, TesseractEngine, TextCache, search_with_excerpt,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "imgrep",
    version,
    about = "OCR a folder of images once, search the extracted text forever"
)]
struct Cli {
    /// Cache file path (overrides imgrep.toml)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Config file path (skips imgrep.toml discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// OCR every image in a folder that is not cached yet
    Process {
        /// Folder containing the images (scanned non-recursively)
        folder: PathBuf,

        /// Tesseract language code (e.g. "eng", "deu")
        #[arg(long)]
        lang: Option<String>,
    },

    /// Case-insensitive substring search over the cached text
    Search {
        /// Text to look for; empty matches every successfully processed file
        query: String,
    },

    /// Show cache counters
    Stats,

    /// Delete the cache, allowing previously failed files to be retried
    Clear,
}

fn load_config(cli: &Cli) -> anyhow::Result<ImgrepConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            ImgrepConfig::from_toml_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => ImgrepConfig::discover()?.unwrap_or_default(),
    };

    if let Some(cache) = &cli.cache {
        config.cache_path = cache.clone();
    }

    Ok(config)
}

async fn process(folder: PathBuf, config: ImgrepConfig) -> anyhow::Result<()> {
    let cache = TextCache::load_or_default(&config.cache_path);
    let engine = Arc::new(TesseractEngine::from_config(&config));
    let pipeline = Pipeline::new(cache, engine, config);

    let mut handle = pipeline.start(&folder)?;

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancellation requested; finishing the current file");
            canceller.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        print_event(&event);
    }
    handle.wait().await?;

    let stats = pipeline.cache().stats()?;
    eprintln!(
        "cache now holds {} entries ({} ok, {} failed)",
        stats.total_entries, stats.ok_entries, stats.error_entries
    );
    Ok(())
}

fn print_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::Started { folder, total } => {
            eprintln!("processing {} pending file(s) in {}", total, folder.display());
        }
        ProgressEvent::FileProcessed {
            filename,
            status,
            processed,
            total,
        } => {
            let outcome = match status {
                EntryStatus::Ok => "ok",
                EntryStatus::Error => "error",
            };
            eprintln!("[{}/{}] {} ... {}", processed, total, filename, outcome);
        }
        ProgressEvent::PersistFailed { filename, message } => {
            eprintln!("warning: could not persist entry for {}: {}", filename, message);
        }
        ProgressEvent::Completed { processed } => {
            eprintln!("done: {} file(s) processed", processed);
        }
        ProgressEvent::Cancelled { processed } => {
            eprintln!("cancelled after {} file(s)", processed);
        }
    }
}

fn search(query: &str, config: &ImgrepConfig) -> anyhow::Result<()> {
    let cache = TextCache::load(&config.cache_path)
        .with_context(|| format!("loading cache {}", config.cache_path.display()))?;
    let snapshot = cache.snapshot()?;

    let hits = search_with_excerpt(query, &snapshot, config.excerpt_chars);
    if hits.is_empty() {
        eprintln!("no matches");
        return Ok(());
    }

    for hit in hits {
        println!("{}: {}", hit.filename, hit.excerpt);
    }
    Ok(())
}

fn stats(config: &ImgrepConfig) -> anyhow::Result<()> {
    let cache = TextCache::load(&config.cache_path)
        .with_context(|| format!("loading cache {}", config.cache_path.display()))?;
    let stats = cache.stats()?;

    println!("cache file:    {}", config.cache_path.display());
    println!("total entries: {}", stats.total_entries);
    println!("ok entries:    {}", stats.ok_entries);
    println!("error entries: {}", stats.error_entries);
    println!("file size:     {} bytes", stats.file_size_bytes);
    Ok(())
}

fn clear(config: &ImgrepConfig) -> anyhow::Result<()> {
    let cache = TextCache::load_or_default(&config.cache_path);
    cache.clear()?;
    eprintln!("cache cleared: {}", config.cache_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Process { folder, lang } => {
            if let Some(lang) = lang {
                config.language = lang;
            }
            process(folder, config).await
        }
        Command::Search { query } => search(&query, &config),
        Command::Stats => stats(&config),
        Command::Clear => clear(&config),
    }
}
