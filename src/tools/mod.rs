//! Support tools exposed to the chat layer
//!
//! FAQ search goes through the retrieval engine. Orders and restaurants are
//! small tables scanned directly by id or name.

mod refund;

pub use refund::{RefundDecision, RefundType};

use crate::config::Config;
use crate::engine::RetrievalEngine;
use crate::error::Result;
use crate::knowledge::{load_table_or_empty, OrderRecord};
use crate::retrieval::RelevantEntry;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Statuses for which a delivery estimate is still meaningful
const IN_PROGRESS_STATUSES: [&str; 3] = ["confirmed", "preparing", "out_for_delivery"];

/// Restaurant record; everything except the name is passed through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaqSearchResponse {
    pub success: bool,
    pub query: String,
    pub faqs: Vec<RelevantEntry>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTracking {
    pub order: OrderRecord,
    /// Whole minutes until the estimated delivery, for orders still in progress
    pub minutes_remaining: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered {
        delivered_at: Option<String>,
    },
    OnTheWay {
        status: String,
        estimated_delivery: String,
        minutes_remaining: i64,
    },
    RunningLate {
        status: String,
    },
}

impl DeliveryStatus {
    pub fn message(&self) -> String {
        match self {
            DeliveryStatus::Delivered { .. } => "Your order has been delivered!".to_string(),
            DeliveryStatus::OnTheWay {
                minutes_remaining, ..
            } => format!(
                "Your order will be delivered in approximately {} minutes.",
                minutes_remaining
            ),
            DeliveryStatus::RunningLate { .. } => {
                "Your order is running late. Please contact support for assistance.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub summary: String,
    pub order: OrderRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct EscalationTicket {
    pub ticket_id: String,
    pub issue: String,
    pub message: String,
    pub estimated_response_time: String,
    pub contact_methods: Vec<String>,
}

/// Parse an order timestamp: RFC 3339, or a naive ISO timestamp taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub struct SupportTools {
    engine: Arc<RetrievalEngine>,
    orders: Vec<OrderRecord>,
    restaurants: Vec<Restaurant>,
    relevance_threshold: f32,
    faq_limit: usize,
}

impl SupportTools {
    pub fn new(
        engine: Arc<RetrievalEngine>,
        orders: Vec<OrderRecord>,
        restaurants: Vec<Restaurant>,
        relevance_threshold: f32,
        faq_limit: usize,
    ) -> Self {
        Self {
            engine,
            orders,
            restaurants,
            relevance_threshold,
            faq_limit,
        }
    }

    /// Load the order and restaurant tables named in the config
    pub fn from_config(config: &Config, engine: Arc<RetrievalEngine>) -> Self {
        Self::new(
            engine,
            load_table_or_empty(&config.sources.order_file, "order"),
            load_table_or_empty(&config.sources.restaurant_file, "restaurant"),
            config.retrieval.relevance_threshold,
            config.retrieval.default_k,
        )
    }

    pub fn find_order(&self, order_id: &str) -> Option<&OrderRecord> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    pub fn search_faq(&self, query: &str) -> Result<FaqSearchResponse> {
        let faqs = self
            .engine
            .relevant(query, self.relevance_threshold, self.faq_limit)?;

        let message = if faqs.is_empty() {
            "No relevant FAQs found. Please try rephrasing your question or contact support for assistance.".to_string()
        } else {
            format!("Found {} relevant FAQ(s) for your query.", faqs.len())
        };

        Ok(FaqSearchResponse {
            success: !faqs.is_empty(),
            query: query.to_string(),
            faqs,
            message,
        })
    }

    pub fn track_order(&self, order_id: &str) -> Option<OrderTracking> {
        self.track_order_at(order_id, Utc::now())
    }

    pub fn track_order_at(&self, order_id: &str, now: DateTime<Utc>) -> Option<OrderTracking> {
        let order = self.find_order(order_id)?;

        let minutes_remaining = if IN_PROGRESS_STATUSES.contains(&order.status.as_str()) {
            order
                .estimated_delivery
                .as_deref()
                .and_then(parse_timestamp)
                .filter(|eta| *eta > now)
                .map(|eta| (eta - now).num_minutes())
        } else {
            None
        };

        Some(OrderTracking {
            order: order.clone(),
            minutes_remaining,
        })
    }

    pub fn check_delivery_time(&self, order_id: &str) -> Option<DeliveryStatus> {
        self.check_delivery_time_at(order_id, Utc::now())
    }

    pub fn check_delivery_time_at(
        &self,
        order_id: &str,
        now: DateTime<Utc>,
    ) -> Option<DeliveryStatus> {
        let order = self.find_order(order_id)?;

        if order.status == "delivered" {
            return Some(DeliveryStatus::Delivered {
                delivered_at: order.delivery_time.clone(),
            });
        }

        let eta = order
            .estimated_delivery
            .as_deref()
            .and_then(|raw| parse_timestamp(raw).map(|eta| (raw, eta)));

        Some(match eta {
            Some((raw, eta)) if eta > now => DeliveryStatus::OnTheWay {
                status: order.status.clone(),
                estimated_delivery: raw.to_string(),
                minutes_remaining: (eta - now).num_minutes(),
            },
            _ => DeliveryStatus::RunningLate {
                status: order.status.clone(),
            },
        })
    }

    pub fn process_refund(&self, order_id: &str, reason: &str) -> Option<RefundDecision> {
        self.process_refund_at(order_id, reason, Utc::now())
    }

    pub fn process_refund_at(
        &self,
        order_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Option<RefundDecision> {
        self.find_order(order_id)
            .map(|order| refund::evaluate(order, reason, now))
    }

    /// Case-insensitive lookup by restaurant name
    pub fn get_restaurant_info(&self, name: &str) -> Option<&Restaurant> {
        let wanted = name.to_lowercase();
        self.restaurants
            .iter()
            .find(|r| r.name.to_lowercase() == wanted)
    }

    pub fn get_order_summary(&self, order_id: &str) -> Option<OrderSummary> {
        let order = self.find_order(order_id)?;

        let mut lines = vec![
            format!("Order ID: {}", order.order_id),
            format!("Customer: {}", order.customer_name),
            format!("Restaurant: {}", order.restaurant),
            format!("Items: {}", order.items_text()),
            format!("Total: ${:.2}", order.total_amount),
            format!("Status: {}", order.status),
            format!("Delivery Address: {}", order.delivery_address),
        ];
        if let Some(order_time) = &order.order_time {
            lines.push(format!("Order Time: {}", order_time));
        }
        if let Some(eta) = &order.estimated_delivery {
            lines.push(format!("Estimated Delivery: {}", eta));
        }
        if let Some(driver) = &order.driver_name {
            lines.push(format!("Driver: {}", driver));
        }

        Some(OrderSummary {
            order_id: order.order_id.clone(),
            summary: lines.join("\n"),
            order: order.clone(),
        })
    }

    pub fn escalate_to_human(&self, issue: &str) -> EscalationTicket {
        let number = uuid::Uuid::new_v4().as_u128() % 900_000 + 100_000;
        let ticket_id = format!("TICKET-{}", number);

        EscalationTicket {
            message: format!(
                "Your issue has been escalated to our human support team. Ticket ID: {}. A support agent will contact you within 5 minutes.",
                ticket_id
            ),
            ticket_id,
            issue: issue.to_string(),
            estimated_response_time: "5 minutes".to_string(),
            contact_methods: vec![
                "In-app chat".to_string(),
                "Phone: 1-800-FOOD-HELP".to_string(),
                "Email: support@fooddelivery.com".to_string(),
            ],
        }
    }
}
