use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{
    Client, Method,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    CreatedOrder, PaymentProvider, PaypalConfig, ProviderError, ProviderOrderStatus,
    data_objects::OrderResponse,
};

/// Tokens are refreshed this long before PayPal says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// PayPal Orders v2 REST client.
pub struct PaypalApi {
    config: PaypalConfig,
    client: Client,
    token: Mutex<Option<AccessToken>>,
}

impl PaypalApi {
    pub fn new(config: PaypalConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Initialization(e.to_string()))?;
        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.mode.base_url())
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting PayPal access token");
        let response = self
            .client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.reveal()),
            )
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!("{status}: {message}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = token.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        tracing::trace!("Sending PayPal request: {} {}", method, url);

        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            Err(ProviderError::Rejected { status, message })
        }
    }
}

/// PayPal expects the amount as a string with exactly two decimals.
fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

#[async_trait]
impl PaymentProvider for PaypalApi {
    async fn create_order(&self, amount: Decimal, currency: &str) -> Result<CreatedOrder, ProviderError> {
        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": currency,
                    "value": format_amount(amount),
                }
            }]
        });
        let order = self
            .rest_query::<OrderResponse, Value>(Method::POST, "/v2/checkout/orders", Some(body))
            .await?;
        tracing::info!("PayPal order {} created", order.id);
        CreatedOrder::try_from(order)
    }

    async fn capture_order(&self, order_id: &str) -> Result<Value, ProviderError> {
        let path = format!("/v2/checkout/orders/{order_id}/capture");
        let details = self
            .rest_query::<Value, Value>(Method::POST, &path, Some(serde_json::json!({})))
            .await?;
        tracing::info!("PayPal order {} captured", order_id);
        Ok(details)
    }

    async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
        let path = format!("/v2/checkout/orders/{order_id}");
        let order = self
            .rest_query::<OrderResponse, ()>(Method::GET, &path, None)
            .await?;
        let status = order
            .status
            .ok_or_else(|| ProviderError::MalformedResponse("order status missing".to_string()))?;
        Ok(ProviderOrderStatus::from(status.as_str()))
    }
}
