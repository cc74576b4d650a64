//! supportrag - knowledge retrieval for a food-delivery support chat
//!
//! Turns FAQ pairs and order summaries into normalized embeddings, serves
//! nearest-neighbor queries over them with a relevance threshold, and keeps
//! the index and its entry list persisted together on disk.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod retrieval;
pub mod storage;
pub mod tools;

pub use engine::{InitOutcome, RetrievalEngine};
pub use error::{Result, SupportError};
