// src/models/quiz_attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};

/// Submitted answers, keyed by question id (as a string).
/// Values are kept verbatim; anything that is not an option index grades as wrong.
pub type SubmittedAnswers = HashMap<String, Value>;

/// Represents the 'quiz_attempts' table in the database.
/// Rows are insert-only: every submission is a new attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub answers: Json<SubmittedAnswers>,
    /// Percentage in 0..=100.
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// An attempt that has been graded but not yet persisted.
#[derive(Debug, Clone)]
pub struct NewQuizAttempt {
    pub user_id: i64,
    pub quiz_id: i64,
    pub answers: SubmittedAnswers,
    pub score: f64,
}

/// Attempt joined with its quiz title, for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizAttemptSummary {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "quiz")]
    pub quiz_id: i64,
    pub quiz_title: String,
    pub answers: Json<SubmittedAnswers>,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    #[serde(alias = "quiz_id")]
    pub quiz: i64,

    /// Key: Question ID, Value: selected option index.
    /// Kept loose so that a malformed shape grades as wrong instead of failing the request.
    #[serde(default)]
    pub answers: Value,
}

impl SubmitAttemptRequest {
    /// The submitted answers as a map. Anything other than a JSON object counts as no answers.
    pub fn submitted_answers(&self) -> SubmittedAnswers {
        match &self.answers {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => SubmittedAnswers::new(),
        }
    }
}

/// Response for a freshly graded attempt.
#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub id: i64,
    pub quiz: i64,
    pub quiz_title: String,
    pub answers: SubmittedAnswers,
    pub score: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub submitted_at: DateTime<Utc>,
}
