// src/paypal/mod.rs

//! External payment provider seam.
//!
//! The payment flow only ever talks to a [`PaymentProvider`]. Production wires in
//! [`PaypalApi`]; tests wire in a fake.

mod api;
mod config;
mod data_objects;
mod error;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use api::PaypalApi;
pub use config::{PaypalConfig, PaypalMode, Secret};
pub use data_objects::{CreatedOrder, ProviderOrderStatus};
pub use error::ProviderError;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a capture-intent order for `amount` in `currency`.
    /// Returns the provider's order id and the URL where the buyer approves it.
    async fn create_order(&self, amount: Decimal, currency: &str) -> Result<CreatedOrder, ProviderError>;

    /// Captures a buyer-approved order. Returns the provider's capture details verbatim.
    async fn capture_order(&self, order_id: &str) -> Result<serde_json::Value, ProviderError>;

    /// Looks up the current status of an order without changing it.
    async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError>;
}
