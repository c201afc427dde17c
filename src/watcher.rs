//! File system watcher for automatic re-scanning
//!
//! The watcher monitors an indexed root for changes and re-scans it after a
//! configurable debounce window, so rapid bursts of changes (multi-file
//! moves, format-on-save) collapse into a single scan.

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::indexer::Indexer;

/// Configuration for watch mode
#[derive(Debug, Clone, Default)]
pub struct WatchConfig {
    /// Debounce duration in milliseconds; the re-scan fires this long after
    /// the last observed change
    pub debounce_ms: u64,
    /// Suppress output (only log errors)
    pub quiet: bool,
    /// Save the index here after every re-scan
    pub save_to: Option<PathBuf>,
}

impl WatchConfig {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            ..Default::default()
        }
    }
}

/// Watch `path` for changes and re-scan it through `indexer`
///
/// Blocks until the watch channel disconnects. The debounce timer resets on
/// every event, so a quiet period of `debounce_ms` is required before a
/// re-scan runs.
pub fn watch(path: &Path, indexer: &Indexer, config: WatchConfig) -> Result<()> {
    log::info!(
        "Starting watcher for {} with {}ms debounce",
        path.display(),
        config.debounce_ms
    );

    let (tx, rx) = channel();

    let mut watcher = RecommendedWatcher::new(tx, Config::default())
        .context("Failed to create file watcher")?;

    watcher
        .watch(path, RecursiveMode::Recursive)
        .context("Failed to start watching directory")?;

    if !config.quiet {
        println!(
            "Watching {} for changes (debounce: {}ms)...",
            path.display(),
            config.debounce_ms
        );
    }

    let mut pending: HashSet<PathBuf> = HashSet::new();
    let mut last_event: Option<Instant> = None;
    let debounce = Duration::from_millis(config.debounce_ms);

    loop {
        // Short receive timeout so the debounce timer is checked regularly
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => {
                if let Some(changed) = process_event(&event) {
                    log::debug!("Detected change: {}", changed.display());
                    pending.insert(changed);
                    last_event = Some(Instant::now());
                }
            }
            Ok(Err(e)) => {
                log::warn!("Watch error: {}", e);
            }
            Err(RecvTimeoutError::Timeout) => {
                let Some(last) = last_event else { continue };
                if pending.is_empty() || last.elapsed() < debounce {
                    continue;
                }

                if !config.quiet {
                    println!("Detected {} changed path(s), re-scanning...", pending.len());
                }

                match rescan(path, indexer, &config) {
                    Ok(()) => {}
                    Err(e) => {
                        eprintln!("Re-scan failed: {:#}", e);
                        log::error!("Re-scan failed: {:#}", e);
                    }
                }

                pending.clear();
                last_event = None;
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("Watcher channel disconnected, stopping");
                break;
            }
        }
    }

    if !config.quiet {
        println!("Watcher stopped.");
    }

    Ok(())
}

/// Run one re-scan and optionally persist the refreshed index
fn rescan(path: &Path, indexer: &Indexer, config: &WatchConfig) -> Result<()> {
    let start = Instant::now();
    indexer.start_indexing(path, true)?;
    indexer.wait();

    if let Some(summary) = indexer.last_scan() {
        if !config.quiet {
            println!(
                "Re-scanned {} files and {} directories in {:.1}ms",
                summary.files,
                summary.directories,
                start.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    if let Some(ref target) = config.save_to {
        indexer.save_index(target)?;
        if !config.quiet {
            println!("Index saved to {}", target.display());
        }
    }

    Ok(())
}

/// Extract the changed path from a file system event
///
/// Returns None for events that should not trigger a re-scan (access
/// notifications, metadata-only churn).
fn process_event(event: &Event) -> Option<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            event.paths.first().cloned()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_new() {
        let config = WatchConfig::new(2000);
        assert_eq!(config.debounce_ms, 2000);
        assert!(!config.quiet);
        assert!(config.save_to.is_none());
    }

    #[test]
    fn test_process_event_create() {
        let event = Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![PathBuf::from("/data/file.txt")],
            attrs: Default::default(),
        };

        assert_eq!(process_event(&event), Some(PathBuf::from("/data/file.txt")));
    }

    #[test]
    fn test_process_event_remove() {
        let event = Event {
            kind: EventKind::Remove(notify::event::RemoveKind::File),
            paths: vec![PathBuf::from("/data/file.txt")],
            attrs: Default::default(),
        };

        assert!(process_event(&event).is_some());
    }

    #[test]
    fn test_process_event_access_ignored() {
        let event = Event {
            kind: EventKind::Access(notify::event::AccessKind::Read),
            paths: vec![PathBuf::from("/data/file.txt")],
            attrs: Default::default(),
        };

        assert!(process_event(&event).is_none());
    }
}
