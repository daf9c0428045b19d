// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use elearn_backend::{
    config::Config,
    db::InMemoryStore,
    paypal::{CreatedOrder, PaymentProvider, PaypalConfig, ProviderError, ProviderOrderStatus},
    routes,
    state::AppState,
    utils::jwt::sign_jwt,
};
use rust_decimal::Decimal;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Scriptable stand-in for PayPal.
#[derive(Default)]
pub struct FakeProvider {
    pub fail_create: Mutex<bool>,
    pub fail_capture: Mutex<bool>,
    pub created: Mutex<Vec<(Decimal, String)>>,
    pub captured: Mutex<Vec<String>>,
    pub statuses: Mutex<HashMap<String, ProviderOrderStatus>>,
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_order(&self, amount: Decimal, currency: &str) -> Result<CreatedOrder, ProviderError> {
        if *self.fail_create.lock().unwrap() {
            return Err(ProviderError::Transport("simulated network error".to_string()));
        }
        let mut created = self.created.lock().unwrap();
        created.push((amount, currency.to_string()));
        let order_id = format!("FAKE-ORDER-{}", created.len());
        Ok(CreatedOrder {
            approval_url: format!("https://www.sandbox.paypal.com/checkoutnow?token={order_id}"),
            order_id,
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<serde_json::Value, ProviderError> {
        if *self.fail_capture.lock().unwrap() {
            return Err(ProviderError::Rejected {
                status: 422,
                message: "ORDER_NOT_APPROVED".to_string(),
            });
        }
        self.captured.lock().unwrap().push(order_id.to_string());
        Ok(serde_json::json!({ "id": order_id, "status": "COMPLETED" }))
    }

    async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .unwrap_or(ProviderOrderStatus::Created))
    }
}

pub struct TestApp {
    pub address: String,
    pub store: InMemoryStore,
    pub provider: Arc<FakeProvider>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Issues a bearer token the test server accepts.
pub fn token(user_id: i64, role: &str) -> String {
    sign_jwt(user_id, role, JWT_SECRET, 600).expect("Failed to sign token")
}

/// Helper function to spawn the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    let store = InMemoryStore::new();
    let provider = Arc::new(FakeProvider::default());

    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        reconcile_after_minutes: 30,
        paypal: PaypalConfig::default(),
    };

    let state = AppState {
        store: Arc::new(store.clone()),
        provider: provider.clone(),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        provider,
        client: reqwest::Client::new(),
    }
}

/// Creates a course through the instructor API and returns its id.
pub async fn create_course(app: &TestApp, instructor_id: i64, price: &str) -> i64 {
    let response = app
        .client
        .post(app.url("/api/instructor/courses"))
        .bearer_auth(token(instructor_id, "instructor"))
        .json(&serde_json::json!({
            "title": "Systems Programming in Rust",
            "description": "From ownership to async.",
            "price": price,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().expect("course id")
}
