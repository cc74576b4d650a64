/// Embedding & indexing
///
/// - EmbeddingProvider trait for abstraction over text encoders
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - FlatIndex for exact inner-product search over normalized vectors
/// - IndexBuilder to turn knowledge entries into a searchable Corpus
mod builder;
mod provider;
mod vector_index;

pub use builder::{BuildError, Corpus, IndexBuilder};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use vector_index::{l2_normalize, FlatIndex, IndexHit, VectorIndexError};
