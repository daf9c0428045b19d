// src/models/payment.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use validator::Validate;

/// Lifecycle of a payment: `pending` -> `succeeded`, or `pending` -> `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown payment status '{0}'")]
pub struct UnknownPaymentStatus(String);

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownPaymentStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(UnknownPaymentStatus(s)),
        }
    }
}

/// Represents the 'payments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,

    /// Snapshot of the course price when the order was created.
    pub amount: Decimal,

    /// Provider order id. Always set for rows created by the purchase flow.
    pub paypal_order_id: Option<String>,

    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment about to be recorded as `pending`.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: i64,
    pub course_id: i64,
    pub amount: Decimal,
    pub paypal_order_id: String,
}

/// Row for the payment history view, joined with the course title.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentHistoryEntry {
    pub id: i64,
    #[serde(rename = "course")]
    pub course_id: i64,
    pub course_title: String,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub paypal_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub course_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub approval_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CaptureOrderRequest {
    #[serde(alias = "orderID")]
    #[validate(length(min = 1, max = 255))]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureOrderResponse {
    pub status: &'static str,
    pub details: serde_json::Value,
}

/// Outcome of one reconciliation sweep over stale `pending` payments.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub errors: usize,
}
