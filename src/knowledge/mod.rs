//! Knowledge store: the ordered list of retrievable entries
//!
//! Entries are assembled from two read-only JSON tables, FAQ pairs first and
//! then one synthesized summary per order. Position in the assembled list is
//! the entry's identity and its row in the similarity index.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Category tag for entries synthesized from order records
pub const ORDER_CATEGORY: &str = "order_data";

/// One retrievable knowledge unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Back-reference to the originating order, lookup key only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_order_id: Option<String>,
}

impl Entry {
    /// Text handed to the encoder for this entry
    pub fn encoding_text(&self) -> String {
        format!("{} {}", self.question, self.answer)
    }

    pub fn is_order_data(&self) -> bool {
        self.source_order_id.is_some()
    }
}

/// FAQ source record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<FaqRecord> for Entry {
    fn from(faq: FaqRecord) -> Self {
        Self {
            question: faq.question,
            answer: faq.answer,
            category: faq.category,
            source_order_id: None,
        }
    }
}

/// A line item on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Order source record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub restaurant: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: String,
    pub delivery_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl OrderRecord {
    /// Items as `name (xquantity)`, comma-separated
    pub fn items_text(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} (x{})", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Flatten the record into a retrievable entry
    pub fn to_entry(&self) -> Entry {
        Entry {
            question: format!("Order {} details", self.order_id),
            answer: format!(
                "Order ID: {}, Customer: {}, Restaurant: {}, Items: {}, Total: ${:.2}, Status: {}, Delivery Address: {}",
                self.order_id,
                self.customer_name,
                self.restaurant,
                self.items_text(),
                self.total_amount,
                self.status,
                self.delivery_address
            ),
            category: Some(ORDER_CATEGORY.to_string()),
            source_order_id: Some(self.order_id.clone()),
        }
    }
}

/// Concatenate FAQ entries then order entries, preserving source order
pub fn assemble_entries(faqs: Vec<FaqRecord>, orders: &[OrderRecord]) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::with_capacity(faqs.len() + orders.len());
    entries.extend(faqs.into_iter().map(Entry::from));
    entries.extend(orders.iter().map(OrderRecord::to_entry));
    entries
}

/// Read a JSON array from disk
pub fn read_json_table<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(records)
}

/// Read a JSON array, degrading any failure to an empty table
pub fn load_table_or_empty<T: DeserializeOwned>(path: &Path, label: &str) -> Vec<T> {
    match read_json_table(path) {
        Ok(records) => {
            info!("Loaded {} {} records from {}", records.len(), label, path.display());
            records
        }
        Err(e) => {
            warn!("{} source unavailable, continuing without it: {:#}", label, e);
            Vec::new()
        }
    }
}

/// Assembles the entry sequence from the configured FAQ and order tables
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    faq_path: PathBuf,
    order_path: PathBuf,
}

impl KnowledgeStore {
    pub fn new(faq_path: PathBuf, order_path: PathBuf) -> Self {
        Self {
            faq_path,
            order_path,
        }
    }

    pub fn load_faqs(&self) -> Vec<FaqRecord> {
        load_table_or_empty(&self.faq_path, "FAQ")
    }

    pub fn load_orders(&self) -> Vec<OrderRecord> {
        load_table_or_empty(&self.order_path, "order")
    }

    /// Produce the canonical entry sequence for the current source snapshot.
    ///
    /// Never fails: an unreadable source contributes nothing.
    pub fn assemble(&self) -> Vec<Entry> {
        let faqs = self.load_faqs();
        let orders = self.load_orders();
        let entries = assemble_entries(faqs, &orders);
        info!(
            "Assembled {} knowledge entries ({} from orders)",
            entries.len(),
            orders.len()
        );
        entries
    }
}
