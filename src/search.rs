//! Hybrid search across both catalogs.
//!
//! Google Books is always queried with the caller's text. Open Library is
//! asked for an exact bibkey match when the query looks like an ISBN (the hit
//! is placed ahead of everything else) and for a free-text search otherwise
//! (its results follow Google's). The merged list is then deduplicated on the
//! case-insensitive (title, author) fingerprint, first occurrence winning, and
//! stably reordered so candidates with cover art come first.

use crate::catalog::{BibkeyCatalog, VolumeCatalog};
use crate::classifier::{is_isbn_shaped, normalize_isbn_query};
use crate::config::DEFAULT_MAX_RESULTS;
use crate::models::BookCandidate;
use std::collections::HashSet;

pub struct BookSearch<A, B> {
    volumes: A,
    bibkeys: B,
    max_results: usize,
}

impl<A: VolumeCatalog, B: BibkeyCatalog> BookSearch<A, B> {
    pub fn new(volumes: A, bibkeys: B) -> Self {
        Self {
            volumes,
            bibkeys,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn volumes(&self) -> &A {
        &self.volumes
    }

    pub fn bibkeys(&self) -> &B {
        &self.bibkeys
    }

    /// Ordered candidates for `raw_query`. Never fails; an empty result means
    /// neither catalog had a match (or the query was blank, in which case no
    /// request is made).
    pub fn hybrid_search(&self, raw_query: &str) -> Vec<BookCandidate> {
        let query = raw_query.trim();
        let stripped = normalize_isbn_query(query);
        if query.is_empty() || stripped.is_empty() {
            return vec![];
        }
        let isbn_shaped = is_isbn_shaped(&stripped);

        let mut merged = self.volumes.search(query, self.max_results);
        if isbn_shaped {
            if let Some(exact) = self.bibkeys.lookup_by_isbn(&stripped) {
                merged.insert(0, exact);
            }
        } else {
            merged.extend(self.bibkeys.search_text(query, self.max_results));
        }
        let fetched = merged.len();

        let results = covers_first(dedupe_candidates(merged));
        log::info!(
            "search \"{}\" isbn_shaped={} fetched={} returned={}",
            query,
            isbn_shaped,
            fetched,
            results.len()
        );
        results
    }
}

/// Keep the first candidate for each fingerprint, preserving order.
pub fn dedupe_candidates(candidates: Vec<BookCandidate>) -> Vec<BookCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.fingerprint()))
        .collect()
}

/// Stable partition: candidates with a cover, then those without.
pub fn covers_first(mut candidates: Vec<BookCandidate>) -> Vec<BookCandidate> {
    candidates.sort_by_key(|candidate| !candidate.has_cover());
    candidates
}
