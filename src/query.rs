//! Relevance scoring and result ranking
//!
//! Scoring is a pure function of the record and the query terms: no clock
//! reads and no index state, so identical inputs always produce identical
//! scores. Recency only participates in the tie-break ordering, never in
//! the score itself.

use std::cmp::Ordering;

use crate::models::{FileRecord, SearchResult};
use crate::terms;

// Per-term match weights, strongest to weakest. A name match always
// outranks a match on a parent directory segment.
const WEIGHT_STEM_EXACT: f64 = 100.0;
const WEIGHT_STEM_PREFIX: f64 = 60.0;
const WEIGHT_STEM_SUBSTRING: f64 = 40.0;
const WEIGHT_EXTENSION: f64 = 30.0;
const WEIGHT_PATH_SEGMENT: f64 = 15.0;

/// Score a candidate record against the tokenized query
///
/// Each query term contributes the weight of its strongest match class, so
/// records matching more distinct terms accumulate higher scores. Returns
/// `None` when no term matches at all (possible because candidates are the
/// union across query terms).
pub fn score_record(record: &FileRecord, query_terms: &[String]) -> Option<SearchResult> {
    let stem = record.stem();
    let parent_terms = record
        .path
        .parent()
        .map(terms::extract_terms)
        .unwrap_or_default();

    let mut score = 0.0;
    let mut matching_terms = Vec::new();

    for term in query_terms {
        let weight = if stem == *term {
            WEIGHT_STEM_EXACT
        } else if stem.starts_with(term.as_str()) {
            WEIGHT_STEM_PREFIX
        } else if stem.contains(term.as_str()) {
            WEIGHT_STEM_SUBSTRING
        } else if record.extension == *term {
            WEIGHT_EXTENSION
        } else if parent_terms.iter().any(|t| t.contains(term.as_str())) {
            WEIGHT_PATH_SEGMENT
        } else {
            0.0
        };

        if weight > 0.0 {
            score += weight;
            matching_terms.push(term.clone());
        }
    }

    if matching_terms.is_empty() {
        return None;
    }

    Some(SearchResult {
        record: record.clone(),
        score,
        matching_terms,
    })
}

/// Sort results deterministically: score descending, then most recently
/// modified first, then path lexical order
pub fn rank(results: &mut [SearchResult]) {
    results.sort_by(compare);
}

fn compare(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.record.modified.cmp(&a.record.modified))
        .then_with(|| a.record.path.cmp(&b.record.path))
}
