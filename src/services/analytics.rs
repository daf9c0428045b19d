// src/services/analytics.rs

use std::sync::Arc;

use crate::{db::EventStore, models::event::EventType};

/// Records a usage event in the background.
///
/// Fire-and-forget: the caller never waits on it and a failed insert is only logged.
pub fn record_event<S>(store: Arc<S>, user_id: i64, event_type: EventType, metadata: serde_json::Value)
where
    S: EventStore + ?Sized + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = store.record_event(user_id, event_type, metadata).await {
            tracing::warn!(
                "Dropped {} event for user {}: {}",
                event_type.as_str(),
                user_id,
                e
            );
        }
    });
}
