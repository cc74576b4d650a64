/// Index builder: entries in, searchable corpus out
use super::{EmbeddingError, EmbeddingProvider, FlatIndex, VectorIndexError};
use crate::knowledge::Entry;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] VectorIndexError),
}

/// An index together with the exact entry list it was built from
///
/// Published and replaced as one unit; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct Corpus {
    index: FlatIndex,
    entries: Vec<Entry>,
    model: String,
}

impl Corpus {
    /// Pair an index with entries without checking that they agree.
    ///
    /// Search tolerates a mismatch by dropping rows whose entry is missing;
    /// the persistence layer is where mismatches are rejected.
    pub fn from_parts(index: FlatIndex, entries: Vec<Entry>, model: impl Into<String>) -> Self {
        if index.len() != entries.len() {
            warn!(
                "Corpus paired with mismatched sizes: {} rows, {} entries",
                index.len(),
                entries.len()
            );
        }
        Self {
            index,
            entries,
            model: model.into(),
        }
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, id: usize) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Name of the encoder the vectors came from
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Embeds entries in batches and builds a flat index over them
pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Build a corpus from `entries`, keeping their order as row order.
    ///
    /// An empty entry list yields an empty index without calling the encoder.
    pub fn build(&self, entries: Vec<Entry>) -> Result<Corpus, BuildError> {
        let dimension = self.provider.dimension();
        let model = self.provider.model_name().to_string();

        if entries.is_empty() {
            info!("No knowledge entries; built empty index");
            return Ok(Corpus::from_parts(FlatIndex::empty(dimension), entries, model));
        }

        let start = Instant::now();
        let texts: Vec<String> = entries.iter().map(Entry::encoding_text).collect();
        info!("Creating embeddings for {} entries...", texts.len());

        // Blank rows keep their slot as a zero vector and always score 0
        let mut vectors = vec![vec![0.0; dimension]; texts.len()];
        let rows: Vec<usize> = (0..texts.len())
            .filter(|&row| !texts[row].trim().is_empty())
            .collect();
        if rows.len() < texts.len() {
            warn!(
                "{} entries have no text and will never match",
                texts.len() - rows.len()
            );
        }

        for chunk in rows.chunks(self.batch_size) {
            let batch: Vec<String> = chunk.iter().map(|&row| texts[row].clone()).collect();
            let embeddings = self.provider.embed_batch(&batch)?;
            if embeddings.len() != chunk.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    chunk.len(),
                    embeddings.len()
                ))
                .into());
            }
            debug!("Embedded chunk of {} entries", chunk.len());
            for (&row, embedding) in chunk.iter().zip(embeddings) {
                vectors[row] = embedding;
            }
        }

        let index = FlatIndex::from_vectors(dimension, vectors)?;

        info!(
            "Built flat index with {} vectors ({}D) in {}ms",
            index.len(),
            dimension,
            start.elapsed().as_millis()
        );

        Ok(Corpus::from_parts(index, entries, model))
    }
}
