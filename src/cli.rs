//! CLI argument parsing and command handlers

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::indexer::{Indexer, DEFAULT_MAX_RESULTS};
use crate::observer::{ChannelObserver, IndexEvent};
use crate::watcher::{self, WatchConfig};

/// Findex: local-first file indexing and ranked search
#[derive(Parser, Debug)]
#[command(
    name = "fdx",
    version,
    about = "A fast file indexing and search engine",
    long_about = "Findex scans directory trees into an in-memory index and answers \
                  ranked name/path searches against it. Indexes persist across \
                  sessions, so 'fdx search' is instant once 'fdx index' has run."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a directory tree and save the index
    Index {
        /// Directory to index (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Do not descend into subdirectories
        #[arg(long)]
        no_recursive: bool,

        /// Directory to exclude, with its whole subtree (repeatable)
        #[arg(long = "exclude-dir", value_name = "DIR")]
        exclude_dirs: Vec<PathBuf>,

        /// File pattern to exclude, glob syntax (repeatable, e.g. "*.tmp")
        #[arg(long = "exclude", value_name = "GLOB")]
        exclude_patterns: Vec<String>,

        /// Where to save the index (defaults to the user cache directory)
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Query a saved index
    Search {
        /// Search query; terms match file names, extensions and path segments
        query: String,

        /// Index file to load (defaults to the user cache directory)
        #[arg(long, value_name = "FILE")]
        index: Option<PathBuf>,

        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_MAX_RESULTS)]
        limit: usize,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Show statistics for a saved index
    Stats {
        /// Index file to load (defaults to the user cache directory)
        #[arg(long, value_name = "FILE")]
        index: Option<PathBuf>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Watch a directory and re-scan on changes
    Watch {
        /// Directory to watch (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Debounce window in milliseconds
        #[arg(long, default_value_t = 2000)]
        debounce: u64,

        /// Where to save the index after each re-scan (defaults to the user
        /// cache directory)
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,

        /// Suppress output (only log errors)
        #[arg(short, long)]
        quiet: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        match self.command {
            Command::Index {
                path,
                no_recursive,
                exclude_dirs,
                exclude_patterns,
                save,
                quiet,
            } => handle_index(path, !no_recursive, exclude_dirs, exclude_patterns, save, quiet),
            Command::Search {
                query,
                index,
                limit,
                json,
                pretty,
            } => handle_search(query, index, limit, json, pretty),
            Command::Stats {
                index,
                json,
                pretty,
            } => handle_stats(index, json, pretty),
            Command::Watch {
                path,
                debounce,
                save,
                quiet,
            } => handle_watch(path, debounce, save, quiet),
        }
    }
}

/// Default saved-index location: `<user cache dir>/findex/index.bin`
pub fn default_index_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("findex")
        .join("index.bin")
}

/// Handle the `index` command
fn handle_index(
    path: PathBuf,
    recursive: bool,
    exclude_dirs: Vec<PathBuf>,
    exclude_patterns: Vec<String>,
    save: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let indexer = Indexer::new();
    indexer.set_exclude_directories(exclude_dirs);
    indexer.set_exclude_patterns(exclude_patterns);

    let (observer, rx) = ChannelObserver::new();
    indexer.set_observer(Arc::new(observer));

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(100);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb
    };

    let start = Instant::now();
    indexer.start_indexing(&path, recursive)?;

    // Drain observer events until the scan reports completion
    let summary = loop {
        match rx.recv() {
            Ok(IndexEvent::Progress(percent)) => pb.set_position(percent as u64),
            Ok(IndexEvent::Finished(summary)) => break summary,
            Err(_) => bail!("Scanner exited without reporting completion"),
        }
    };
    indexer.wait();
    pb.finish_and_clear();

    if !quiet {
        println!(
            "Indexed {} files and {} directories in {:.1}s ({} skipped)",
            summary.files,
            summary.directories,
            start.elapsed().as_secs_f64(),
            summary.skipped
        );
    }

    let target = save.unwrap_or_else(default_index_path);
    indexer.save_index(&target)?;
    if !quiet {
        println!("Index saved to {}", target.display());
    }

    Ok(())
}

/// Handle the `search` command
fn handle_search(
    query: String,
    index: Option<PathBuf>,
    limit: usize,
    json: bool,
    pretty: bool,
) -> Result<()> {
    let indexer = load_saved_index(index)?;
    let results = indexer.search(&query, limit);

    if json {
        let json_str = if pretty {
            serde_json::to_string_pretty(&results)?
        } else {
            serde_json::to_string(&results)?
        };
        println!("{}", json_str);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }

    for result in &results {
        println!(
            "{:>7.1}  {:>12}  {}  {}",
            result.score,
            if result.record.is_directory {
                "<dir>".to_string()
            } else {
                result.record.size.to_string()
            },
            result.record.modified.format("%Y-%m-%d %H:%M"),
            result.record.path.display()
        );
    }

    Ok(())
}

/// Handle the `stats` command
fn handle_stats(index: Option<PathBuf>, json: bool, pretty: bool) -> Result<()> {
    let indexer = load_saved_index(index)?;
    let stats = indexer.stats();

    if json {
        let json_str = if pretty {
            serde_json::to_string_pretty(&stats)?
        } else {
            serde_json::to_string(&stats)?
        };
        println!("{}", json_str);
        return Ok(());
    }

    println!("Index statistics");
    println!("================");
    println!("Records:        {}", stats.total_records);
    println!("Files:          {}", stats.total_files);
    println!("Directories:    {}", stats.total_directories);
    println!("Terms:          {}", stats.total_terms);
    println!("Indexed roots:");
    for root in &stats.indexed_roots {
        println!("  {}", root.display());
    }

    Ok(())
}

/// Handle the `watch` command
fn handle_watch(path: PathBuf, debounce: u64, save: Option<PathBuf>, quiet: bool) -> Result<()> {
    let indexer = Indexer::new();
    let target = save.unwrap_or_else(default_index_path);

    // Initial scan so the first save happens before any change arrives
    if !quiet {
        println!("Running initial scan of {}...", path.display());
    }
    indexer.start_indexing(&path, true)?;
    indexer.wait();
    indexer.save_index(&target)?;
    if !quiet {
        if let Some(summary) = indexer.last_scan() {
            println!(
                "Indexed {} files and {} directories; saved to {}",
                summary.files,
                summary.directories,
                target.display()
            );
        }
    }

    let config = WatchConfig {
        debounce_ms: debounce,
        quiet,
        save_to: Some(target),
    };
    watcher::watch(&path, &indexer, config)
}

/// Load the index file into a fresh indexer, with a friendly error when it
/// is missing
fn load_saved_index(index: Option<PathBuf>) -> Result<Indexer> {
    let index_path = index.unwrap_or_else(default_index_path);
    let indexer = Indexer::new();
    indexer
        .load_index(&index_path)
        .with_context(|| format!("No usable index at {} (run 'fdx index' first)", index_path.display()))?;
    Ok(indexer)
}
