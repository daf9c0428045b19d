// src/handlers/payments.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::Config,
    db::Store,
    error::AppError,
    models::{
        event::EventType,
        payment::{CaptureOrderRequest, CaptureOrderResponse, CreateOrderRequest, CreateOrderResponse},
    },
    paypal::PaymentProvider,
    services::{analytics, payments},
    utils::jwt::Claims,
};

/// Starts a course purchase.
///
/// Creates a provider order for the course price and a `pending` payment.
/// Returns the order id and the URL where the buyer approves the payment.
pub async fn create_order(
    State(store): State<Arc<dyn Store>>,
    State(provider): State<Arc<dyn PaymentProvider>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let (_, order) = payments::begin_purchase(
        store.as_ref(),
        provider.as_ref(),
        &config.paypal.currency,
        user_id,
        req.course_id,
    )
    .await?;

    Ok(Json(CreateOrderResponse {
        order_id: order.order_id,
        approval_url: order.approval_url,
    }))
}

/// Captures an approved order, marks the payment succeeded and enrolls the buyer.
pub async fn capture_order(
    State(store): State<Arc<dyn Store>>,
    State(provider): State<Arc<dyn PaymentProvider>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CaptureOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let (payment, details) =
        payments::complete_purchase(store.as_ref(), provider.as_ref(), user_id, &req.order_id)
            .await?;

    analytics::record_event(
        store.clone(),
        user_id,
        EventType::CoursePurchase,
        serde_json::json!({
            "course": payment.course_id,
            "payment": payment.id,
            "amount": payment.amount.to_string(),
        }),
    );

    Ok(Json(CaptureOrderResponse {
        status: "success",
        details,
    }))
}

/// Lists the caller's payments, newest first.
pub async fn list_payments(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = store.list_payments_for_user(claims.user_id()?).await?;
    Ok(Json(history))
}

/// Re-checks stale `pending` payments against the provider.
/// Admin only.
pub async fn reconcile(
    State(store): State<Arc<dyn Store>>,
    State(provider): State<Arc<dyn PaymentProvider>>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let before = Utc::now() - Duration::minutes(config.reconcile_after_minutes);
    let report = payments::reconcile_pending(store.as_ref(), provider.as_ref(), before).await?;
    Ok(Json(report))
}
