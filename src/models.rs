//! Core data models for Findex
//!
//! These structures represent the metadata snapshots and query output that
//! Findex provides to embedding applications and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// Metadata snapshot for one indexed filesystem entry
///
/// A record is created when the scanner first observes a path and replaced
/// wholesale on re-scan; it is never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    /// Full path (unique key within the store)
    pub path: PathBuf,
    /// Base name of the entry
    pub name: String,
    /// Extension, lower-cased, without the leading dot (empty if none)
    pub extension: String,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// True if this entry is a directory
    pub is_directory: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl FileRecord {
    /// Build a record from a path and its filesystem metadata
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        // Entries without a readable mtime get the epoch so they sort last
        // among equal scores
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            path: path.to_path_buf(),
            name,
            extension,
            modified,
            is_directory: metadata.is_dir(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
        }
    }

    /// Lower-cased file stem (name without the extension)
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// A ranked match produced by a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched record
    pub record: FileRecord,
    /// Relevance score (higher is more relevant)
    pub score: f64,
    /// Query terms that matched this record
    pub matching_terms: Vec<String>,
}

/// Summary of a completed (or cancelled) scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Files added or replaced during the scan
    pub files: usize,
    /// Directories added or replaced during the scan
    pub directories: usize,
    /// Entries skipped due to I/O errors
    pub skipped: usize,
    /// True if the scan was cancelled before completion
    pub cancelled: bool,
    /// Wall-clock duration of the scan in milliseconds
    pub elapsed_ms: u64,
}

/// Point-in-time statistics about the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total records in the store (files and directories)
    pub total_records: usize,
    /// File records only
    pub total_files: usize,
    /// Directory records only
    pub total_directories: usize,
    /// Distinct terms in the inverted index
    pub total_terms: usize,
    /// Root directories that have been indexed
    pub indexed_roots: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_from_file_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Report.TXT");
        std::fs::write(&path, b"hello").unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        let record = FileRecord::from_metadata(&path, &metadata);

        assert_eq!(record.name, "Report.TXT");
        assert_eq!(record.extension, "txt");
        assert_eq!(record.stem(), "report");
        assert_eq!(record.size, 5);
        assert!(!record.is_directory);
    }

    #[test]
    fn test_record_from_directory_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src");
        std::fs::create_dir(&path).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        let record = FileRecord::from_metadata(&path, &metadata);

        assert!(record.is_directory);
        assert_eq!(record.size, 0);
        assert_eq!(record.extension, "");
    }

    #[test]
    fn test_record_without_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Makefile");
        std::fs::write(&path, b"all:").unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        let record = FileRecord::from_metadata(&path, &metadata);

        assert_eq!(record.extension, "");
        assert_eq!(record.stem(), "makefile");
    }
}
