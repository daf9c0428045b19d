// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;

use crate::paypal::{PaypalConfig, PaypalMode, Secret};

/// Minutes a `pending` payment must age before the reconciliation sweep re-queries it.
pub const DEFAULT_RECONCILE_AFTER_MINUTES: i64 = 30;

/// Log filter directive. Read on its own so logging can start before the rest of the config.
pub fn rust_log_from_env() -> String {
    env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub reconcile_after_minutes: i64,
    pub paypal: PaypalConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let reconcile_after_minutes = env::var("RECONCILE_AFTER_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RECONCILE_AFTER_MINUTES);

        Self {
            database_url,
            jwt_secret,
            bind_addr,
            reconcile_after_minutes,
            paypal: paypal_config_from_env(),
        }
    }
}

fn paypal_config_from_env() -> PaypalConfig {
    let mode = match env::var("PAYPAL_MODE") {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, falling back to sandbox", e);
            PaypalMode::Sandbox
        }),
        Err(_) => PaypalMode::Sandbox,
    };

    let client_id = env::var("PAYPAL_CLIENT_ID").unwrap_or_else(|_| {
        tracing::warn!("PAYPAL_CLIENT_ID not set, provider calls will be rejected");
        String::new()
    });

    let client_secret = Secret::new(env::var("PAYPAL_CLIENT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("PAYPAL_CLIENT_SECRET not set, provider calls will be rejected");
        String::new()
    }));

    let currency = env::var("PAYPAL_CURRENCY").unwrap_or_else(|_| "USD".to_string());

    let timeout_secs = env::var("PAYPAL_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(15);

    PaypalConfig {
        mode,
        client_id,
        client_secret,
        currency,
        timeout: Duration::from_secs(timeout_secs),
    }
}
