//! Term-based inverted index for fast file name search
//!
//! This module implements the core indexing structure used by Findex. A term
//! is a normalized token derived from a path component. By building an
//! inverted index mapping terms to file paths, a query only has to examine
//! the paths whose names or parent segments actually share a token with the
//! query, instead of the whole record store.
//!
//! # Algorithm
//!
//! 1. **Indexing**: Split every path component into lower-cased tokens,
//!    record the path under each token
//! 2. **Querying**: Tokenize the query the same way, collect the union of
//!    postings for every index term containing a query token
//! 3. **Scoring**: Rank the candidate records (see the `query` module)

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Split text into normalized search tokens
///
/// Tokens are lower-cased and split on every non-alphanumeric byte, which
/// covers path separators, dots, dashes, underscores and whitespace. The
/// same rule is applied at index time and at query time.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Extract the index terms for a filesystem path
///
/// Every component of the path contributes tokens, so a query can match on
/// the file name, its extension, or any parent directory segment.
pub fn extract_terms(path: &Path) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    for component in path.iter() {
        for token in tokenize(&component.to_string_lossy()) {
            terms.insert(token);
        }
    }
    terms
}

/// Inverted index: term -> set of paths that produced the term
///
/// Postings are kept in `BTreeSet`s so iteration order (and therefore
/// candidate order before scoring) is deterministic across runs.
#[derive(Debug, Default)]
pub struct TermIndex {
    terms: HashMap<String, BTreeSet<PathBuf>>,
}

impl TermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path under every term derived from it
    pub fn insert_path(&mut self, path: &Path) {
        for term in extract_terms(path) {
            self.terms
                .entry(term)
                .or_default()
                .insert(path.to_path_buf());
        }
    }

    /// Collect every path posted under an index term that contains `token`
    /// as a substring
    pub fn paths_matching(&self, token: &str) -> BTreeSet<PathBuf> {
        let mut paths = BTreeSet::new();
        for (term, postings) in &self.terms {
            if term.contains(token) {
                paths.extend(postings.iter().cloned());
            }
        }
        paths
    }

    /// Number of distinct terms in the index
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Drop all terms and postings
    pub fn clear(&mut self) {
        self.terms.clear();
    }

    /// Rebuild the index from scratch for the given paths
    pub fn rebuild<'a>(&mut self, paths: impl Iterator<Item = &'a Path>) {
        self.clear();
        for path in paths {
            self.insert_path(path);
        }
    }
}
