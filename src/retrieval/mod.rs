//! Search service: query text in, ranked knowledge entries out
//!
//! Operates on one immutable [`Corpus`] snapshot, so concurrent searches
//! never need to coordinate with each other.

use crate::embedding::{Corpus, EmbeddingError, EmbeddingProvider, VectorIndexError};
use crate::knowledge::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("Vector search failed: {0}")]
    VectorSearchError(#[from] VectorIndexError),
}

/// An entry with the cosine similarity it scored against the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: Entry,
    /// Index row the entry was found at
    pub row: usize,
    pub score: f32,
}

/// An entry that cleared the relevance threshold, as handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub similarity_score: f32,
}

impl From<ScoredEntry> for RelevantEntry {
    fn from(scored: ScoredEntry) -> Self {
        Self {
            entry: scored.entry,
            similarity_score: scored.score,
        }
    }
}

/// Return up to `k` entries ranked by similarity to `query`.
///
/// An empty corpus, a blank query or `k == 0` returns nothing without calling
/// the encoder.
/// Rows that point past the entry list are dropped.
pub fn search(
    provider: &dyn EmbeddingProvider,
    corpus: &Corpus,
    query: &str,
    k: usize,
) -> Result<Vec<ScoredEntry>, SearchError> {
    if k == 0 || corpus.index().is_empty() || query.trim().is_empty() {
        return Ok(Vec::new());
    }

    // The index normalizes the query before scoring
    let query_vector = provider.embed(query)?;
    let hits = corpus.index().search(&query_vector, k)?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        match corpus.entry(hit.entry_id) {
            Some(entry) => results.push(ScoredEntry {
                entry: entry.clone(),
                row: hit.row,
                score: hit.score,
            }),
            None => warn!(
                "Dropping row {}: entry {} outside {} entries",
                hit.row,
                hit.entry_id,
                corpus.len()
            ),
        }
    }

    debug!("Query '{}' matched {} entries", query, results.len());
    Ok(results)
}

/// Search, then keep only results scoring at least `threshold`
pub fn relevant(
    provider: &dyn EmbeddingProvider,
    corpus: &Corpus,
    query: &str,
    threshold: f32,
    k: usize,
) -> Result<Vec<RelevantEntry>, SearchError> {
    Ok(search(provider, corpus, query, k)?
        .into_iter()
        .filter(|scored| scored.score >= threshold)
        .map(RelevantEntry::from)
        .collect())
}
