// src/models/event.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, types::Json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CoursePurchase,
    QuizAttempt,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CoursePurchase => "COURSE_PURCHASE",
            EventType::QuizAttempt => "QUIZ_ATTEMPT",
        }
    }
}

/// Represents the 'events' table. Usage analytics only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: i64,
    pub user_id: i64,
    pub event_type: String,
    pub metadata: Option<Json<serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}
