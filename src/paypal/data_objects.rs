use serde::{Deserialize, Serialize};
use url::Url;

use super::ProviderError;

/// Result of a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub approval_url: String,
}

/// HATEOAS link attached to PayPal order responses.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkDescription {
    pub href: String,
    pub rel: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// The subset of the Orders v2 order object we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
}

impl TryFrom<OrderResponse> for CreatedOrder {
    type Error = ProviderError;

    fn try_from(order: OrderResponse) -> Result<Self, Self::Error> {
        if order.id.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("order id is empty".to_string()));
        }
        // "payer-action" replaces "approve" when the order carries an experience context
        let approval = order
            .links
            .iter()
            .find(|l| l.rel == "approve")
            .or_else(|| order.links.iter().find(|l| l.rel == "payer-action"))
            .ok_or(ProviderError::MissingApprovalLink)?;
        if Url::parse(&approval.href).is_err() {
            return Err(ProviderError::MalformedResponse(format!(
                "approval link is not a URL: {}",
                approval.href
            )));
        }
        Ok(CreatedOrder {
            order_id: order.id.clone(),
            approval_url: approval.href.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOrderStatus {
    Created,
    Saved,
    Approved,
    PayerActionRequired,
    Completed,
    Voided,
    Other(String),
}

impl From<&str> for ProviderOrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "CREATED" => ProviderOrderStatus::Created,
            "SAVED" => ProviderOrderStatus::Saved,
            "APPROVED" => ProviderOrderStatus::Approved,
            "PAYER_ACTION_REQUIRED" => ProviderOrderStatus::PayerActionRequired,
            "COMPLETED" => ProviderOrderStatus::Completed,
            "VOIDED" => ProviderOrderStatus::Voided,
            other => ProviderOrderStatus::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_json(links: serde_json::Value) -> OrderResponse {
        serde_json::from_value(serde_json::json!({
            "id": "5O190127TN364715T",
            "status": "CREATED",
            "links": links,
        }))
        .unwrap()
    }

    #[test]
    fn extracts_approval_link() {
        let order = order_json(serde_json::json!([
            { "href": "https://api.sandbox.paypal.com/v2/checkout/orders/5O190127TN364715T", "rel": "self", "method": "GET" },
            { "href": "https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T", "rel": "approve", "method": "GET" }
        ]));
        let created = CreatedOrder::try_from(order).unwrap();
        assert_eq!(created.order_id, "5O190127TN364715T");
        assert_eq!(
            created.approval_url,
            "https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T"
        );
    }

    #[test]
    fn accepts_payer_action_link() {
        let order = order_json(serde_json::json!([
            { "href": "https://www.sandbox.paypal.com/checkoutnow?token=abc", "rel": "payer-action" }
        ]));
        let created = CreatedOrder::try_from(order).unwrap();
        assert_eq!(created.approval_url, "https://www.sandbox.paypal.com/checkoutnow?token=abc");
    }

    #[test]
    fn missing_approval_link_is_an_error() {
        let order = order_json(serde_json::json!([
            { "href": "https://api.sandbox.paypal.com/v2/checkout/orders/x", "rel": "self" }
        ]));
        let err = CreatedOrder::try_from(order).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApprovalLink));
    }

    #[test]
    fn relative_approval_link_is_malformed() {
        let order = order_json(serde_json::json!([
            { "href": "/checkoutnow?token=abc", "rel": "approve" }
        ]));
        let err = CreatedOrder::try_from(order).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn parses_order_status() {
        assert_eq!(ProviderOrderStatus::from("COMPLETED"), ProviderOrderStatus::Completed);
        assert_eq!(ProviderOrderStatus::from("VOIDED"), ProviderOrderStatus::Voided);
        assert_eq!(
            ProviderOrderStatus::from("SOMETHING_NEW"),
            ProviderOrderStatus::Other("SOMETHING_NEW".to_string())
        );
    }
}
