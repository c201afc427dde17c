//! Findex: local-first file indexing and ranked search
//!
//! Findex scans directory trees on a background worker into an in-memory
//! inverted index and answers ranked name/path searches against it while
//! the scan is still running. Indexes persist across sessions through a
//! compact binary snapshot.
//!
//! # Architecture
//!
//! - **Indexer**: owns the record store and term index; scans on a worker
//!   thread with cooperative cancellation
//! - **Query engine**: tokenizes queries, collects candidates through the
//!   term index, and ranks them deterministically
//! - **Persistence**: versioned binary snapshot of roots and records; the
//!   term index is rebuilt on load
//!
//! # Example Usage
//!
//! ```no_run
//! use findex::Indexer;
//!
//! let indexer = Indexer::new();
//! indexer.set_exclude_patterns(vec!["*.tmp".to_string()]);
//! indexer.start_indexing("/home/user/docs", true).unwrap();
//! indexer.wait();
//!
//! for result in indexer.search("report", 10) {
//!     println!("{:.1}  {}", result.score, result.record.path.display());
//! }
//! ```

pub mod cli;
pub mod indexer;
pub mod models;
pub mod observer;
pub mod output;
pub mod persist;
pub mod query;
pub mod terms;
pub mod watcher;

// Re-export commonly used types
pub use indexer::{Indexer, DEFAULT_MAX_RESULTS};
pub use models::{FileRecord, IndexStats, ScanSummary, SearchResult};
pub use observer::{ChannelObserver, IndexEvent, IndexObserver};
