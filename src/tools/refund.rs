//! Refund eligibility policy
use super::parse_timestamp;
use crate::knowledge::OrderRecord;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Orders cancelled this soon after placing are refunded in full
const GRACE_PERIOD_MINUTES: i64 = 5;

/// Quality complaints are accepted this long after ordering
const COMPLAINT_WINDOW_HOURS: i64 = 2;

const LATE_OR_COLD_SHARE: f64 = 0.2;
const IN_KITCHEN_SHARE: f64 = 0.5;

const PROCESSING_TIME: &str = "3-5 business days";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundType {
    Full,
    Partial,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundDecision {
    pub order_id: String,
    pub refund_type: RefundType,
    pub refund_amount: f64,
    pub reason: String,
    pub processing_time: Option<String>,
    pub message: String,
}

impl RefundDecision {
    pub fn approved(&self) -> bool {
        self.refund_type != RefundType::None
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Decide how much of `order` to refund for `reason` at time `now`
pub fn evaluate(order: &OrderRecord, reason: &str, now: DateTime<Utc>) -> RefundDecision {
    let reason_lower = reason.to_lowercase();
    let since_order = order
        .order_time
        .as_deref()
        .and_then(parse_timestamp)
        .map(|placed| now - placed);

    let within = |limit: Duration| since_order.map_or(false, |elapsed| elapsed < limit);

    let (refund_type, share) = if within(Duration::minutes(GRACE_PERIOD_MINUTES)) {
        (RefundType::Full, 1.0)
    } else if order.status == "delivered" && within(Duration::hours(COMPLAINT_WINDOW_HOURS)) {
        if reason_lower.contains("wrong") || reason_lower.contains("damaged") {
            (RefundType::Full, 1.0)
        } else if reason_lower.contains("late") || reason_lower.contains("cold") {
            (RefundType::Partial, LATE_OR_COLD_SHARE)
        } else {
            (RefundType::None, 0.0)
        }
    } else if order.status == "confirmed" || order.status == "preparing" {
        (RefundType::Partial, IN_KITCHEN_SHARE)
    } else {
        (RefundType::None, 0.0)
    };

    let refund_amount = round_cents(order.total_amount * share);

    if refund_type == RefundType::None || refund_amount <= 0.0 {
        return RefundDecision {
            order_id: order.order_id.clone(),
            refund_type: RefundType::None,
            refund_amount: 0.0,
            reason: reason.to_string(),
            processing_time: None,
            message: "This order is not eligible for a refund based on our policy. Please contact support for further assistance.".to_string(),
        };
    }

    RefundDecision {
        order_id: order.order_id.clone(),
        refund_type,
        refund_amount,
        reason: reason.to_string(),
        processing_time: Some(PROCESSING_TIME.to_string()),
        message: format!(
            "Refund approved for ${:.2}. The amount will be credited to your original payment method within {}.",
            refund_amount, PROCESSING_TIME
        ),
    }
}
