// src/db/mod.rs

//! Storage ports.
//!
//! Handlers and services only see these traits. [`postgres::PgStore`] is the production
//! backend; [`memory::InMemoryStore`] backs the test suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, CreateAssignmentRequest, NewSubmission, Submission},
        course::{Course, CreateCourseRequest},
        enrollment::Enrollment,
        event::EventType,
        payment::{NewPayment, Payment, PaymentHistoryEntry, PaymentStatus},
        question::{CreateQuizRequest, Question, Quiz},
        quiz_attempt::{NewQuizAttempt, QuizAttempt, QuizAttemptSummary},
    },
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Mirrors an identity-provider user locally. Updates the role if it changed.
    async fn ensure_user(&self, id: i64, role: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn create_course(
        &self,
        instructor_id: i64,
        req: &CreateCourseRequest,
    ) -> Result<Course, AppError>;
    async fn get_course(&self, id: i64) -> Result<Option<Course>, AppError>;
    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Get-or-create on (student, course). The flag is `true` when a row was inserted.
    async fn ensure_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<(Enrollment, bool), AppError>;
    async fn list_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>, AppError>;
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<(Quiz, Vec<Question>), AppError>;
    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;
    /// Questions ordered by position.
    async fn questions_for_quiz(&self, quiz_id: i64) -> Result<Vec<Question>, AppError>;
    async fn insert_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, AppError>;
    /// Newest first. `None` lists every learner's attempts.
    async fn list_attempts(&self, user_id: Option<i64>)
    -> Result<Vec<QuizAttemptSummary>, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a payment in `pending` state.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, AppError>;
    async fn find_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, AppError>;
    /// Marks a `pending` payment as being captured. Fails (returns `false`) when the payment
    /// is not `pending` or another claim newer than `stale_before` is still held.
    async fn claim_capture(&self, id: i64, stale_before: DateTime<Utc>) -> Result<bool, AppError>;
    async fn release_capture(&self, id: i64) -> Result<(), AppError>;
    /// Compare-and-set on status. Returns `false` when the row was not in `from`.
    async fn transition_payment(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, AppError>;
    async fn list_payments_for_user(&self, user_id: i64)
    -> Result<Vec<PaymentHistoryEntry>, AppError>;
    /// `pending` payments with an order id created before `before`, oldest first.
    async fn stale_pending_payments(&self, before: DateTime<Utc>) -> Result<Vec<Payment>, AppError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn create_assignment(&self, req: &CreateAssignmentRequest) -> Result<Assignment, AppError>;
    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>, AppError>;
    async fn list_assignments(&self, course_id: i64) -> Result<Vec<Assignment>, AppError>;
    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError>;
    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, AppError>;
    /// Newest first. `None` lists every learner's submissions.
    async fn list_submissions(&self, user_id: Option<i64>) -> Result<Vec<Submission>, AppError>;
    /// Sets the score. Returns `None` if the submission does not exist.
    async fn grade_submission(&self, id: i64, score: f64) -> Result<Option<Submission>, AppError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn record_event(
        &self,
        user_id: i64,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> Result<(), AppError>;
}

/// Everything the HTTP layer needs from storage.
pub trait Store:
    UserStore + CourseStore + EnrollmentStore + QuizStore + AssignmentStore + PaymentStore + EventStore
{
}

impl<T> Store for T where
    T: UserStore
        + CourseStore
        + EnrollmentStore
        + QuizStore
        + AssignmentStore
        + PaymentStore
        + EventStore
{
}
