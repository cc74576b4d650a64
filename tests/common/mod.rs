//! Shared fixtures: a deterministic offline encoder and on-disk knowledge sources
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use supportrag::config::Config;
use supportrag::embedding::{EmbeddingError, EmbeddingProvider};
use supportrag::RetrievalEngine;
use tempfile::TempDir;

pub const DIMENSION: usize = 256;

/// Bag-of-words encoder: each token adds 1.0 to a BLAKE3-chosen bucket.
///
/// Crude plural folding ("refunds" -> "refund") keeps related phrasings close.
pub struct HashingProvider {
    pub batch_calls: AtomicUsize,
}

impl HashingProvider {
    pub fn new() -> Self {
        Self {
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn bucket(token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(bytes) % DIMENSION as u64) as usize
    }
}

impl EmbeddingProvider for HashingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut vector = vec![0.0; DIMENSION];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = match token.strip_suffix('s') {
                Some(stem) if stem.len() >= 3 => stem,
                _ => token,
            };
            vector[Self::bucket(token)] += 1.0;
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "hashing-bow"
    }
}

pub fn faq(question: &str, answer: &str) -> serde_json::Value {
    serde_json::json!({ "question": question, "answer": answer })
}

pub fn order(order_id: &str, restaurant: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "order_id": order_id,
        "customer_name": "Jordan Reyes",
        "customer_phone": "+1-555-0100",
        "restaurant": restaurant,
        "items": [
            { "name": "Pad Thai", "quantity": 2, "price": 11.5 },
            { "name": "Spring Rolls", "quantity": 1, "price": 6.0 }
        ],
        "total_amount": 29.0,
        "status": status,
        "delivery_address": "221 Baker St",
        "order_time": "2024-05-01T11:30:00Z",
        "estimated_delivery": "2024-05-01T12:15:00Z",
        "driver_name": "Ana"
    })
}

pub fn sample_faqs() -> Vec<serde_json::Value> {
    vec![
        faq(
            "How do refunds work?",
            "Refunds post in 3-5 days.",
        ),
        faq(
            "How can I change my delivery address?",
            "You can edit the address before the restaurant starts preparing your order.",
        ),
        faq(
            "Which payment methods are accepted?",
            "We accept credit cards, debit cards and digital wallets.",
        ),
        faq(
            "Can I cancel my order?",
            "Orders can be cancelled free of charge within five minutes of ordering.",
        ),
    ]
}

/// A temp directory holding the JSON sources and the index location
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new(faqs: &[serde_json::Value], orders: &[serde_json::Value]) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.sources.faq_file = dir.path().join("faqs.json");
        config.sources.order_file = dir.path().join("order_database.json");
        config.sources.restaurant_file = dir.path().join("restaurant_data.json");
        config.index.path = dir.path().join("data").join("faiss_index.bin");
        config.index.vector_dim = DIMENSION;
        config.embedding.batch_size = 2;

        let fixture = Self { dir, config };
        fixture.write_faqs(faqs);
        fixture.write_orders(orders);
        fixture
    }

    pub fn write_faqs(&self, faqs: &[serde_json::Value]) {
        write_json(&self.config.sources.faq_file, faqs);
    }

    pub fn write_orders(&self, orders: &[serde_json::Value]) {
        write_json(&self.config.sources.order_file, orders);
    }

    pub fn write_restaurants(&self, restaurants: &[serde_json::Value]) {
        write_json(&self.config.sources.restaurant_file, restaurants);
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.index.path.clone()
    }

    pub fn engine(&self, provider: Arc<HashingProvider>) -> RetrievalEngine {
        RetrievalEngine::from_config(&self.config, provider).unwrap()
    }
}

fn write_json(path: &Path, value: &[serde_json::Value]) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}
