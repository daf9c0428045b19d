// src/main.rs

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dotenvy::dotenv;
use elearn_backend::{
    config::{self, Config},
    db::{PgStore, Store},
    paypal::{PaymentProvider, PaypalApi},
    routes,
    services::payments,
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(config::rust_log_from_env());
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Load configuration after logging is up so its warnings are kept
    let config = Config::from_env();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let provider: Arc<dyn PaymentProvider> = Arc::new(PaypalApi::new(config.paypal.clone())?);
    tracing::info!("PayPal client configured ({:?} mode)", config.paypal.mode);

    // Settle orders left pending by a previous run
    let before = Utc::now() - chrono::Duration::minutes(config.reconcile_after_minutes);
    match payments::reconcile_pending(store.as_ref(), provider.as_ref(), before).await {
        Ok(report) => tracing::info!("Startup reconcile: {:?}", report),
        Err(e) => tracing::error!("Startup reconcile failed: {}", e),
    }

    // Create AppState
    let state = AppState {
        store,
        provider,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}
