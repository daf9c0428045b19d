// src/services/payments.rs

//! Two-phase purchase flow against the payment provider.
//!
//! `begin_purchase` creates the provider order and a local `pending` row.
//! `complete_purchase` captures it, flips the row to `succeeded` and grants the enrollment.
//! `reconcile_pending` settles rows whose capture never reached us.

use chrono::{DateTime, Duration, Utc};

use crate::{
    db::{CourseStore, EnrollmentStore, PaymentStore},
    error::AppError,
    models::{
        enrollment::Enrollment,
        payment::{NewPayment, Payment, PaymentStatus, ReconcileReport},
    },
    paypal::{CreatedOrder, PaymentProvider, ProviderOrderStatus},
};

/// How long a capture claim blocks other captures of the same order.
/// Must outlast the provider request timeout.
pub const CAPTURE_CLAIM_TTL_SECONDS: i64 = 120;

/// Creates a provider order for the course's current price and records it as `pending`.
///
/// No row is written when the provider call fails. Never enrolls.
pub async fn begin_purchase<S>(
    store: &S,
    provider: &dyn PaymentProvider,
    currency: &str,
    user_id: i64,
    course_id: i64,
) -> Result<(Payment, CreatedOrder), AppError>
where
    S: CourseStore + PaymentStore + ?Sized,
{
    let course = store
        .get_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if course.is_free() {
        return Err(AppError::BadRequest(
            "Course is free; enroll directly instead".to_string(),
        ));
    }

    let order = provider
        .create_order(course.price, currency)
        .await
        .map_err(|e| {
            tracing::warn!(
                "Order creation failed for user {} course {}: {}",
                user_id,
                course.id,
                e
            );
            AppError::from(e)
        })?;

    let payment = store
        .insert_payment(NewPayment {
            user_id,
            course_id: course.id,
            amount: course.price,
            paypal_order_id: order.order_id.clone(),
        })
        .await?;

    tracing::info!(
        "Payment {} pending: order {} for course {} ({} {})",
        payment.id,
        order.order_id,
        course.id,
        payment.amount,
        currency
    );

    Ok((payment, order))
}

/// Captures a previously created order and grants the course.
///
/// * Unknown order ids (or orders belonging to someone else) are `NotFound`, with no provider call.
/// * Orders that already left `pending` are rejected with `Conflict`, also without a provider call.
/// * Concurrent captures of one order are serialized by a claim; the loser gets `Conflict`.
/// * A provider failure leaves the payment `pending` and releases the claim.
pub async fn complete_purchase<S>(
    store: &S,
    provider: &dyn PaymentProvider,
    user_id: i64,
    order_id: &str,
) -> Result<(Payment, serde_json::Value), AppError>
where
    S: PaymentStore + EnrollmentStore + ?Sized,
{
    let mut payment = store
        .find_payment_by_order_id(order_id)
        .await?
        .filter(|p| p.user_id == user_id)
        .ok_or(AppError::NotFound("Payment not found".to_string()))?;

    match payment.status {
        PaymentStatus::Pending => {}
        PaymentStatus::Succeeded => {
            return Err(AppError::Conflict(
                "Order has already been captured".to_string(),
            ));
        }
        PaymentStatus::Failed => {
            return Err(AppError::Conflict(
                "Payment has failed; start a new purchase".to_string(),
            ));
        }
    }

    // Only one request at a time may talk to the provider about this order
    let stale_before = Utc::now() - Duration::seconds(CAPTURE_CLAIM_TTL_SECONDS);
    if !store.claim_capture(payment.id, stale_before).await? {
        return Err(AppError::Conflict(
            "Order capture is already in progress".to_string(),
        ));
    }

    let details = match provider.capture_order(order_id).await {
        Ok(details) => details,
        Err(e) => {
            tracing::warn!("Capture failed for order {}: {}", order_id, e);
            store.release_capture(payment.id).await?;
            return Err(e.into());
        }
    };

    settle_succeeded(store, &payment).await?;
    payment.status = PaymentStatus::Succeeded;

    tracing::info!(
        "Payment {} succeeded: user {} enrolled in course {}",
        payment.id,
        payment.user_id,
        payment.course_id
    );

    Ok((payment, details))
}

/// Moves a payment to `succeeded` (if it is still `pending`) and ensures the enrollment.
///
/// Losing the compare-and-set to a concurrent capture is fine as long as the row ended up
/// `succeeded`; anything else is a conflict.
async fn settle_succeeded<S>(store: &S, payment: &Payment) -> Result<Enrollment, AppError>
where
    S: PaymentStore + EnrollmentStore + ?Sized,
{
    let transitioned = store
        .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Succeeded)
        .await?;

    if !transitioned {
        let order_id = payment.paypal_order_id.as_deref().unwrap_or_default();
        let current = store.find_payment_by_order_id(order_id).await?;
        match current.map(|p| p.status) {
            Some(PaymentStatus::Succeeded) => {
                tracing::debug!("Payment {} already settled concurrently", payment.id);
            }
            other => {
                return Err(AppError::Conflict(format!(
                    "Payment {} could not be marked succeeded (status: {})",
                    payment.id,
                    other.map(|s| s.as_str()).unwrap_or("missing")
                )));
            }
        }
    }

    let (enrollment, _) = store
        .ensure_enrollment(payment.user_id, payment.course_id)
        .await?;
    Ok(enrollment)
}

/// Re-queries the provider for every `pending` payment created before `before`.
///
/// `COMPLETED` orders are settled as if captured here; `VOIDED` orders are marked `failed`.
/// Orders in any other state stay `pending`. Provider and settlement errors are counted and skipped.
pub async fn reconcile_pending<S>(
    store: &S,
    provider: &dyn PaymentProvider,
    before: DateTime<Utc>,
) -> Result<ReconcileReport, AppError>
where
    S: PaymentStore + EnrollmentStore + ?Sized,
{
    let stale = store.stale_pending_payments(before).await?;
    let mut report = ReconcileReport::default();

    for payment in stale {
        let Some(order_id) = payment.paypal_order_id.as_deref() else {
            continue;
        };
        report.checked += 1;

        let status = match provider.order_status(order_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Reconcile: could not query order {}: {}", order_id, e);
                report.errors += 1;
                continue;
            }
        };

        match status {
            ProviderOrderStatus::Completed => match settle_succeeded(store, &payment).await {
                Ok(_) => {
                    tracing::info!("Reconcile: payment {} settled as succeeded", payment.id);
                    report.succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!("Reconcile: could not settle payment {}: {}", payment.id, e);
                    report.errors += 1;
                }
            },
            ProviderOrderStatus::Voided => {
                if store
                    .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
                    .await?
                {
                    tracing::info!("Reconcile: payment {} marked failed", payment.id);
                    report.failed += 1;
                }
            }
            other => {
                tracing::debug!("Reconcile: order {} still {:?}", order_id, other);
                report.still_pending += 1;
            }
        }
    }

    if report.checked > 0 {
        tracing::info!("Reconcile sweep finished: {:?}", report);
    }

    Ok(report)
}
