//! File indexing engine
//!
//! The indexer owns the record store and the term index. It scans directory
//! trees on a dedicated worker thread, answers ranked queries from the
//! caller's thread while a scan is running, and persists the index across
//! sessions.
//!
//! # Concurrency
//!
//! One mutex guards the shared state (records, terms, indexed roots). The
//! worker takes the lock only for each in-memory insertion, never across a
//! filesystem call, so `search` stays responsive during a scan. The
//! indexing flag and progress percentage are atomics readable without the
//! lock. At most one scan runs per instance; cancellation is cooperative.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::models::{FileRecord, IndexStats, ScanSummary, SearchResult};
use crate::observer::IndexObserver;
use crate::persist::{self, IndexSnapshot};
use crate::query;
use crate::terms::{self, TermIndex};

/// Default result cap for searches
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Shared mutable index state, guarded by one mutex
#[derive(Default)]
struct IndexState {
    records: HashMap<PathBuf, FileRecord>,
    terms: TermIndex,
    roots: BTreeSet<PathBuf>,
}

/// Exclusion rules, snapshotted when a scan starts so mid-scan
/// configuration changes only affect the next scan
struct ScanRules {
    exclude_dirs: Vec<PathBuf>,
    patterns: GlobSet,
}

impl ScanRules {
    /// Prefix match against the excluded directory list; pruning the
    /// subtree is the walker's job
    fn is_dir_excluded(&self, path: &Path) -> bool {
        self.exclude_dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Glob patterns match against the entry's base name (e.g. `*.tmp`)
    fn is_pattern_excluded(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.patterns.is_match(Path::new(name)))
            .unwrap_or(false)
    }
}

/// File indexing and search component
///
/// All methods take `&self`; the indexer is safe to share behind an `Arc`
/// between the thread driving scans and threads issuing queries.
pub struct Indexer {
    state: Arc<Mutex<IndexState>>,
    indexing: Arc<AtomicBool>,
    progress: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
    observer: Mutex<Option<Arc<dyn IndexObserver>>>,
    exclude_dirs: Mutex<Vec<PathBuf>>,
    exclude_patterns: Mutex<Vec<String>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    last_summary: Arc<Mutex<Option<ScanSummary>>>,
}

impl Indexer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(IndexState::default())),
            indexing: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(AtomicU8::new(0)),
            cancel: Arc::new(AtomicBool::new(false)),
            observer: Mutex::new(None),
            exclude_dirs: Mutex::new(Vec::new()),
            exclude_patterns: Mutex::new(Vec::new()),
            worker: Mutex::new(None),
            last_summary: Arc::new(Mutex::new(None)),
        }
    }

    /// Register the observer that receives progress and completion events.
    /// Takes effect on the next `start_indexing` call.
    pub fn set_observer(&self, observer: Arc<dyn IndexObserver>) {
        *self.observer.lock().unwrap() = Some(observer);
    }

    /// Replace the excluded directory list. Takes effect on the next scan.
    pub fn set_exclude_directories(&self, dirs: Vec<PathBuf>) {
        *self.exclude_dirs.lock().unwrap() = dirs;
    }

    /// Replace the excluded file pattern list (glob syntax, matched against
    /// entry base names). Takes effect on the next scan.
    pub fn set_exclude_patterns(&self, patterns: Vec<String>) {
        *self.exclude_patterns.lock().unwrap() = patterns;
    }

    /// True while a scan worker is active
    pub fn is_indexing(&self) -> bool {
        self.indexing.load(Ordering::SeqCst)
    }

    /// Scan progress percentage (0-100)
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Begin scanning `root` on a background worker
    ///
    /// Fails, with no state change, if `root` is not an existing directory,
    /// if an exclusion pattern does not compile, or if a scan is already in
    /// progress (the running scan is unaffected).
    pub fn start_indexing(&self, root: impl AsRef<Path>, recursive: bool) -> Result<()> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            bail!("Not a directory: {}", root.display());
        }

        // Compile the exclusion snapshot before flipping the indexing flag
        // so a bad pattern leaves the instance untouched
        let rules = Arc::new(self.compile_rules()?);

        if self
            .indexing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            bail!("Indexing already in progress");
        }

        self.cancel.store(false, Ordering::SeqCst);
        self.progress.store(0, Ordering::SeqCst);

        // Reap the previous worker; it has already cleared the flag
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }

        let task = ScanTask {
            state: Arc::clone(&self.state),
            indexing: Arc::clone(&self.indexing),
            progress: Arc::clone(&self.progress),
            cancel: Arc::clone(&self.cancel),
            last_summary: Arc::clone(&self.last_summary),
            observer: self.observer.lock().unwrap().clone(),
            rules,
            root,
            recursive,
        };

        let handle = match std::thread::Builder::new()
            .name("findex-scanner".to_string())
            .spawn(move || task.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                self.indexing.store(false, Ordering::SeqCst);
                return Err(e).context("Failed to spawn scanner thread");
            }
        };

        *self.worker.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Request cooperative cancellation of the active scan
    ///
    /// Safe to call at any time (a no-op when idle) and returns without
    /// waiting for the worker; use [`Indexer::wait`] to join it. Whatever
    /// was indexed before cancellation is kept.
    pub fn stop_indexing(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Block until the current scan's worker thread exits
    pub fn wait(&self) {
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Search the index and return ranked results, capped at `max_results`
    ///
    /// Candidates are the union across query terms of every path posted
    /// under an index term containing that query term. An empty query, a
    /// query with no matches, or `max_results == 0` return an empty vector;
    /// `search` has no failure mode. Safe to call during an active scan;
    /// the result is a consistent (possibly transiently incomplete)
    /// snapshot.
    pub fn search(&self, query_text: &str, max_results: usize) -> Vec<SearchResult> {
        let query_terms = terms::tokenize(query_text);
        if query_terms.is_empty() || max_results == 0 {
            return Vec::new();
        }

        // Snapshot candidate records under the lock; score outside it.
        // Candidate paths are re-validated against the record store, so a
        // stale term posting can never surface a recordless path.
        let candidates: Vec<FileRecord> = {
            let state = self.state.lock().unwrap();
            let mut paths = BTreeSet::new();
            for term in &query_terms {
                paths.extend(state.terms.paths_matching(term));
            }
            paths
                .iter()
                .filter_map(|path| state.records.get(path.as_path()).cloned())
                .collect()
        };

        let mut results: Vec<SearchResult> = candidates
            .iter()
            .filter_map(|record| query::score_record(record, &query_terms))
            .collect();

        query::rank(&mut results);
        results.truncate(max_results);
        results
    }

    /// Roots that have been indexed (or loaded) so far
    pub fn indexed_directories(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().roots.iter().cloned().collect()
    }

    /// Total records in the store
    pub fn total_indexed_files(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    /// Snapshot of index statistics
    pub fn stats(&self) -> IndexStats {
        let state = self.state.lock().unwrap();
        let total_directories = state.records.values().filter(|r| r.is_directory).count();
        IndexStats {
            total_records: state.records.len(),
            total_files: state.records.len() - total_directories,
            total_directories,
            total_terms: state.terms.len(),
            indexed_roots: state.roots.iter().cloned().collect(),
        }
    }

    /// Summary of the most recently finished scan
    pub fn last_scan(&self) -> Option<ScanSummary> {
        self.last_summary.lock().unwrap().clone()
    }

    /// Drop every record, term and indexed root
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.records.clear();
        state.terms.clear();
        state.roots.clear();
    }

    /// Serialize the indexed roots and all records to `path`
    pub fn save_index(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = {
            let state = self.state.lock().unwrap();
            let mut records: Vec<FileRecord> = state.records.values().cloned().collect();
            // Deterministic file layout
            records.sort_by(|a, b| a.path.cmp(&b.path));
            IndexSnapshot {
                roots: state.roots.iter().cloned().collect(),
                records,
            }
        };
        persist::save(path.as_ref(), &snapshot)
    }

    /// Replace in-memory state with the contents of a saved index
    ///
    /// All-or-nothing: the file is parsed completely before live state is
    /// touched, so a failure leaves the previous index intact. The term
    /// index is rebuilt from the loaded records. Loading never triggers a
    /// re-scan; staleness is the caller's concern.
    pub fn load_index(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = persist::load(path.as_ref())?;

        let mut state = self.state.lock().unwrap();
        let IndexState {
            records,
            terms,
            roots,
        } = &mut *state;

        *records = snapshot
            .records
            .into_iter()
            .map(|r| (r.path.clone(), r))
            .collect();
        terms.rebuild(records.keys().map(PathBuf::as_path));
        *roots = snapshot.roots.into_iter().collect();
        Ok(())
    }

    /// Compile the current exclusion configuration into a scan snapshot
    fn compile_rules(&self) -> Result<ScanRules> {
        let mut builder = GlobSetBuilder::new();
        for pattern in self.exclude_patterns.lock().unwrap().iter() {
            let glob = Glob::new(pattern)
                .with_context(|| format!("Invalid exclude pattern: {}", pattern))?;
            builder.add(glob);
        }
        let patterns = builder.build().context("Failed to compile exclude patterns")?;

        Ok(ScanRules {
            exclude_dirs: self.exclude_dirs.lock().unwrap().clone(),
            patterns,
        })
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

/// One scan: everything the worker thread needs, moved in at spawn time
struct ScanTask {
    state: Arc<Mutex<IndexState>>,
    indexing: Arc<AtomicBool>,
    progress: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
    last_summary: Arc<Mutex<Option<ScanSummary>>>,
    observer: Option<Arc<dyn IndexObserver>>,
    rules: Arc<ScanRules>,
    root: PathBuf,
    recursive: bool,
}

impl ScanTask {
    fn run(self) {
        let start = Instant::now();
        log::info!("Scanning {} (recursive: {})", self.root.display(), self.recursive);

        // The flag clears even if the scan panics
        let indexing = Arc::clone(&self.indexing);
        let _guard = scopeguard::guard((), move |_| {
            indexing.store(false, Ordering::SeqCst);
        });

        // Discovery pass: collect candidate entries with exclusions applied
        let (entries, mut skipped) = self.discover();
        let total = entries.len();
        log::info!("Discovered {} entries under {}", total, self.root.display());

        self.state.lock().unwrap().roots.insert(self.root.clone());

        let mut summary = ScanSummary {
            files: 0,
            directories: 0,
            skipped: 0,
            cancelled: self.cancel.load(Ordering::SeqCst),
            elapsed_ms: 0,
        };
        let mut last_percent = 0u8;

        // Processing pass: build records and postings, lock held only for
        // the in-memory insertion
        for (i, path) in entries.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                summary.cancelled = true;
                break;
            }

            let metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            let record = FileRecord::from_metadata(path, &metadata);
            if record.is_directory {
                summary.directories += 1;
            } else {
                summary.files += 1;
            }

            {
                let mut state = self.state.lock().unwrap();
                state.terms.insert_path(path);
                state.records.insert(record.path.clone(), record);
            }

            let percent = (((i + 1) * 100) / total.max(1)) as u8;
            if percent != last_percent {
                last_percent = percent;
                self.progress.store(percent, Ordering::SeqCst);
                if let Some(ref obs) = self.observer {
                    obs.on_progress(percent);
                }
            }
        }

        if !summary.cancelled {
            self.progress.store(100, Ordering::SeqCst);
            if last_percent != 100 {
                if let Some(ref obs) = self.observer {
                    obs.on_progress(100);
                }
            }
        }

        summary.skipped = skipped;
        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "Scan of {} {}: {} files, {} directories, {} skipped in {}ms",
            self.root.display(),
            if summary.cancelled { "cancelled" } else { "complete" },
            summary.files,
            summary.directories,
            summary.skipped,
            summary.elapsed_ms
        );

        *self.last_summary.lock().unwrap() = Some(summary.clone());

        // Clear the flag before notifying so a finished callback observes a
        // quiescent indexer
        self.indexing.store(false, Ordering::SeqCst);
        if let Some(ref obs) = self.observer {
            obs.on_finished(&summary);
        }
    }

    /// Walk the tree and collect candidate paths, pruning excluded
    /// subtrees. Walk errors are logged and counted, never fatal.
    fn discover(&self) -> (Vec<PathBuf>, usize) {
        let mut entries = Vec::new();
        let mut skipped = 0;

        let mut builder = WalkBuilder::new(&self.root);
        // This indexer sees everything unless told otherwise: no gitignore
        // handling, no hidden-file filtering
        builder.standard_filters(false).follow_links(false);
        if !self.recursive {
            builder.max_depth(Some(1));
        }
        let dir_rules = Arc::clone(&self.rules);
        builder.filter_entry(move |entry| !dir_rules.is_dir_excluded(entry.path()));

        for result in builder.build() {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Walk error under {}: {}", self.root.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            // The root itself is not indexed; records denote entries
            // beneath a root
            if entry.depth() == 0 {
                continue;
            }

            if self.rules.is_pattern_excluded(entry.path()) {
                log::debug!("Excluded by pattern: {}", entry.path().display());
                continue;
            }

            entries.push(entry.into_path());
        }

        (entries, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scan(indexer: &Indexer, root: &Path, recursive: bool) {
        indexer.start_indexing(root, recursive).unwrap();
        indexer.wait();
    }

    #[test]
    fn test_new_indexer_is_idle_and_empty() {
        let indexer = Indexer::new();
        assert!(!indexer.is_indexing());
        assert_eq!(indexer.progress(), 0);
        assert_eq!(indexer.total_indexed_files(), 0);
        assert!(indexer.indexed_directories().is_empty());
    }

    #[test]
    fn test_start_indexing_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let indexer = Indexer::new();

        let result = indexer.start_indexing(temp.path().join("missing"), true);
        assert!(result.is_err());
        assert!(!indexer.is_indexing());
        assert_eq!(indexer.total_indexed_files(), 0);
    }

    #[test]
    fn test_start_indexing_rejects_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let indexer = Indexer::new();
        indexer.set_exclude_patterns(vec!["[".to_string()]);

        assert!(indexer.start_indexing(temp.path(), true).is_err());
        assert!(!indexer.is_indexing());
    }

    #[test]
    fn test_scan_builds_records_and_roots() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("docs")).unwrap();
        std::fs::write(temp.path().join("docs/report.txt"), b"data").unwrap();
        std::fs::write(temp.path().join("notes.md"), b"notes").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);

        assert!(!indexer.is_indexing());
        assert_eq!(indexer.progress(), 100);
        // docs/, docs/report.txt, notes.md
        assert_eq!(indexer.total_indexed_files(), 3);
        assert_eq!(indexer.indexed_directories(), vec![temp.path().to_path_buf()]);

        let summary = indexer.last_scan().unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 1);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_non_recursive_scan_stays_shallow() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/deep.txt"), b"x").unwrap();
        std::fs::write(temp.path().join("top.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), false);

        // sub/ and top.txt, but not sub/deep.txt
        assert_eq!(indexer.total_indexed_files(), 2);
        assert!(indexer.search("deep", 10).is_empty());
    }

    #[test]
    fn test_empty_directory_scan_completes() {
        let temp = TempDir::new().unwrap();
        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);

        assert_eq!(indexer.progress(), 100);
        assert_eq!(indexer.total_indexed_files(), 0);
    }

    #[test]
    fn test_exclude_directory_prunes_subtree() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("keep")).unwrap();
        std::fs::create_dir(temp.path().join("skip")).unwrap();
        std::fs::write(temp.path().join("keep/alpha.txt"), b"x").unwrap();
        std::fs::write(temp.path().join("skip/bravo.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        indexer.set_exclude_directories(vec![temp.path().join("skip")]);
        scan(&indexer, temp.path(), true);

        assert!(indexer.search("bravo", 10).is_empty());
        assert_eq!(indexer.search("alpha", 10).len(), 1);
        // keep/, keep/alpha.txt
        assert_eq!(indexer.total_indexed_files(), 2);
    }

    #[test]
    fn test_exclude_pattern_skips_matching_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("alpha.tmp"), b"x").unwrap();
        std::fs::write(temp.path().join("alpha.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        indexer.set_exclude_patterns(vec!["*.tmp".to_string()]);
        scan(&indexer, temp.path(), true);

        let results = indexer.search("alpha", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.name, "alpha.txt");
        assert_eq!(indexer.total_indexed_files(), 1);
    }

    #[test]
    fn test_exclusion_change_mid_config_applies_to_next_scan() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("scratch.tmp"), b"x").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);
        assert_eq!(indexer.total_indexed_files(), 1);

        indexer.set_exclude_patterns(vec!["*.tmp".to_string()]);
        indexer.clear();
        scan(&indexer, temp.path(), true);
        assert_eq!(indexer.total_indexed_files(), 0);
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("report.txt"), b"data").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);
        let first = indexer.search("report", 10);

        scan(&indexer, temp.path(), true);
        let second = indexer.search("report", 10);

        assert_eq!(indexer.total_indexed_files(), 1);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].record, second[0].record);
        assert_eq!(first[0].score, second[0].score);
    }

    #[test]
    fn test_stop_indexing_when_idle_is_noop() {
        let indexer = Indexer::new();
        indexer.stop_indexing();
        assert!(!indexer.is_indexing());
    }

    #[test]
    fn test_clear_empties_everything() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("alpha.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);
        assert_ne!(indexer.total_indexed_files(), 0);

        indexer.clear();
        assert_eq!(indexer.total_indexed_files(), 0);
        assert!(indexer.indexed_directories().is_empty());
        assert!(indexer.search("alpha", 10).is_empty());
    }

    #[test]
    fn test_search_empty_query_returns_nothing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("alpha.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);

        assert!(indexer.search("", 10).is_empty());
        assert!(indexer.search("///...", 10).is_empty());
        assert!(indexer.search("alpha", 0).is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("report.txt"), b"data").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);

        let index_file = temp.path().join("saved.bin");
        indexer.save_index(&index_file).unwrap();

        let restored = Indexer::new();
        restored.load_index(&index_file).unwrap();

        assert_eq!(
            restored.total_indexed_files(),
            // saved.bin itself was written after the scan, so it is absent
            indexer.total_indexed_files()
        );
        assert_eq!(restored.indexed_directories(), indexer.indexed_directories());

        let original = indexer.search("report", 10);
        let reloaded = restored.search("report", 10);
        assert_eq!(original.len(), reloaded.len());
        assert_eq!(original[0].record, reloaded[0].record);
        assert_eq!(original[0].score, reloaded[0].score);
    }

    #[test]
    fn test_failed_load_leaves_state_untouched() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("alpha.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);
        let before = indexer.total_indexed_files();

        let bogus = temp.path().join("bogus.bin");
        std::fs::write(&bogus, b"not an index").unwrap();
        assert!(indexer.load_index(&bogus).is_err());

        assert_eq!(indexer.total_indexed_files(), before);
        assert_eq!(indexer.search("alpha", 10).len(), 1);
    }

    #[test]
    fn test_stats_counts() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("dir")).unwrap();
        std::fs::write(temp.path().join("dir/f.txt"), b"x").unwrap();

        let indexer = Indexer::new();
        scan(&indexer, temp.path(), true);

        let stats = indexer.stats();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_directories, 1);
        assert!(stats.total_terms > 0);
        assert_eq!(stats.indexed_roots, vec![temp.path().to_path_buf()]);
    }
}
