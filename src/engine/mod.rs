//! Retrieval engine lifecycle
//!
//! Owns the currently served [`Corpus`] and the machinery to load or rebuild
//! it. Readers take a cheap `Arc` snapshot; `initialize` and `rebuild` are
//! serialized and publish a fully built corpus with a single pointer swap.

use crate::config::Config;
use crate::embedding::{Corpus, EmbeddingProvider, IndexBuilder};
use crate::error::{Result, SupportError};
use crate::knowledge::KnowledgeStore;
use crate::retrieval::{self, RelevantEntry, ScoredEntry};
use crate::storage::IndexStore;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

/// How `initialize` reached the ready state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Restored from the persisted artifacts
    Loaded { entries: usize },
    /// Built from the knowledge sources; `persisted` is false if the save failed
    Built { entries: usize, persisted: bool },
    /// Already ready, nothing was done
    AlreadyReady,
}

pub struct RetrievalEngine {
    provider: Arc<dyn EmbeddingProvider>,
    knowledge: KnowledgeStore,
    builder: IndexBuilder,
    store: IndexStore,
    current: RwLock<Option<Arc<Corpus>>>,
    lifecycle: Mutex<()>,
}

impl RetrievalEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        knowledge: KnowledgeStore,
        store: IndexStore,
        batch_size: usize,
    ) -> Self {
        let builder = IndexBuilder::new(provider.clone(), batch_size);
        Self {
            provider,
            knowledge,
            builder,
            store,
            current: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Wire the engine from configuration. Nothing is loaded until `initialize`.
    pub fn from_config(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if provider.dimension() != config.index.vector_dim {
            return Err(SupportError::InvalidConfigValue {
                path: "index.vector_dim".to_string(),
                message: format!(
                    "Encoder {} produces {}D vectors, config expects {}D",
                    provider.model_name(),
                    provider.dimension(),
                    config.index.vector_dim
                ),
            });
        }

        let knowledge = KnowledgeStore::new(
            config.sources.faq_file.clone(),
            config.sources.order_file.clone(),
        );
        let store = IndexStore::new(config.index.path.clone(), &config.index.entries_suffix);
        Ok(Self::new(
            provider,
            knowledge,
            store,
            config.embedding.batch_size,
        ))
    }

    /// Load the persisted corpus, or build and persist a new one.
    ///
    /// A no-op once the engine is ready.
    pub fn initialize(&self) -> Result<InitOutcome> {
        let _guard = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());

        if self.is_ready() {
            return Ok(InitOutcome::AlreadyReady);
        }

        match self.store.load(self.provider.dimension()) {
            Ok(corpus) if corpus.model() != self.provider.model_name() => {
                warn!(
                    "Persisted index was built with {}, active encoder is {}; rebuilding",
                    corpus.model(),
                    self.provider.model_name()
                );
            }
            Ok(corpus) => {
                let entries = corpus.len();
                self.publish(corpus);
                info!("Retrieval engine initialized from persisted index");
                return Ok(InitOutcome::Loaded { entries });
            }
            Err(e) if e.is_missing_or_corrupt() => {
                warn!("No usable persisted index ({}); building a new one", e);
            }
            Err(e) => {
                warn!("Could not read persisted index ({}); building a new one", e);
            }
        }

        let corpus = self.builder.build(self.knowledge.assemble())?;
        let entries = corpus.len();
        // Publish even if the save fails; the next rebuild retries persistence
        let persisted = match self.store.save(&corpus) {
            Ok(()) => true,
            Err(e) => {
                warn!("Serving unsaved index: {}", e);
                false
            }
        };
        self.publish(corpus);

        info!("Retrieval engine initialized with {} entries", entries);
        Ok(InitOutcome::Built { entries, persisted })
    }

    /// Re-assemble, re-embed and persist, then swap in the new corpus.
    ///
    /// If any step fails the previously served corpus stays in place.
    pub fn rebuild(&self) -> Result<usize> {
        let _guard = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());

        info!("Rebuilding retrieval index");
        let corpus = self.builder.build(self.knowledge.assemble())?;
        self.store.save(&corpus)?;

        let entries = corpus.len();
        self.publish(corpus);
        info!("Rebuild complete: serving {} entries", entries);
        Ok(entries)
    }

    /// The corpus currently being served
    pub fn snapshot(&self) -> Result<Arc<Corpus>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(SupportError::EngineNotInitialized)
    }

    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
        let corpus = self.snapshot()?;
        Ok(retrieval::search(
            self.provider.as_ref(),
            &corpus,
            query,
            k,
        )?)
    }

    pub fn relevant(&self, query: &str, threshold: f32, k: usize) -> Result<Vec<RelevantEntry>> {
        let corpus = self.snapshot()?;
        Ok(retrieval::relevant(
            self.provider.as_ref(),
            &corpus,
            query,
            threshold,
            k,
        )?)
    }

    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn entry_count(&self) -> Option<usize> {
        self.snapshot().ok().map(|corpus| corpus.len())
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    fn publish(&self, corpus: Corpus) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::new(corpus));
    }
}
