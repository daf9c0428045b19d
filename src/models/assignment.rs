// src/models/assignment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'assignments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn is_overdue_at(&self, at: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| at > due)
    }
}

/// DTO for creating an assignment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Represents the 'submissions' table in the database.
///
/// `score` stays empty until an instructor grades the submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "assignment")]
    pub assignment_id: i64,
    pub text_answer: String,
    pub score: Option<f64>,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

/// A submission about to be persisted.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: i64,
    pub assignment_id: i64,
    pub text_answer: String,
}

/// DTO for handing in an assignment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    #[serde(alias = "assignment_id")]
    pub assignment: i64,
    #[validate(length(min = 1, max = 50000))]
    pub text_answer: String,
}

/// DTO for grading a submission.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeSubmissionRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}
