// src/db/memory.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{
    AssignmentStore, CourseStore, EnrollmentStore, EventStore, PaymentStore, QuizStore, UserStore,
};
use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, CreateAssignmentRequest, NewSubmission, Submission},
        course::{Course, CreateCourseRequest},
        enrollment::Enrollment,
        event::{Event, EventType},
        payment::{NewPayment, Payment, PaymentHistoryEntry, PaymentStatus},
        question::{CreateQuizRequest, Question, Quiz},
        quiz_attempt::{NewQuizAttempt, QuizAttempt, QuizAttemptSummary},
    },
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, String>,
    courses: Vec<Course>,
    quizzes: Vec<Quiz>,
    questions: Vec<Question>,
    attempts: Vec<QuizAttempt>,
    assignments: Vec<Assignment>,
    submissions: Vec<Submission>,
    enrollments: Vec<Enrollment>,
    payments: Vec<Payment>,
    /// payment id -> when its capture was claimed
    capture_claims: HashMap<i64, DateTime<Utc>>,
    events: Vec<Event>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A thread-safe in-memory store.
///
/// All tables sit behind one lock so that get-or-create and compare-and-set behave
/// like their SQL counterparts. Used by the test suite and for local demos.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded analytics events.
    pub async fn events(&self) -> Vec<Event> {
        self.tables.read().await.events.clone()
    }

    /// Mirrored users and their roles.
    pub async fn users(&self) -> HashMap<i64, String> {
        self.tables.read().await.users.clone()
    }

    /// Snapshot of every payment row.
    pub async fn payments(&self) -> Vec<Payment> {
        self.tables.read().await.payments.clone()
    }

    /// Every enrollment row, across students.
    pub async fn all_enrollments(&self) -> Vec<Enrollment> {
        self.tables.read().await.enrollments.clone()
    }

    /// Every attempt row, across learners.
    pub async fn all_attempts(&self) -> Vec<QuizAttempt> {
        self.tables.read().await.attempts.clone()
    }

    /// Overwrites a course price. Lets tests change prices between order and capture.
    pub async fn set_course_price(&self, course_id: i64, price: rust_decimal::Decimal) {
        let mut tables = self.tables.write().await;
        if let Some(course) = tables.courses.iter_mut().find(|c| c.id == course_id) {
            course.price = price;
        }
    }

    /// Backdates a payment so the reconciliation sweep considers it stale.
    pub async fn backdate_payment(&self, payment_id: i64, created_at: DateTime<Utc>) {
        let mut tables = self.tables.write().await;
        if let Some(p) = tables.payments.iter_mut().find(|p| p.id == payment_id) {
            p.created_at = created_at;
        }
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn ensure_user(&self, id: i64, role: &str) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.users.insert(id, role.to_string());
        Ok(())
    }
}

#[async_trait]
impl CourseStore for InMemoryStore {
    async fn create_course(
        &self,
        instructor_id: i64,
        req: &CreateCourseRequest,
    ) -> Result<Course, AppError> {
        let mut tables = self.tables.write().await;
        let course = Course {
            id: tables.next_id(),
            title: req.title.clone(),
            description: req.description.clone(),
            instructor_id,
            price: req.price,
            created_at: Utc::now(),
        };
        tables.courses.push(course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let tables = self.tables.read().await;
        let mut courses = tables.courses.clone();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(courses)
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn ensure_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<(Enrollment, bool), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
        {
            return Ok((existing.clone(), false));
        }
        let enrollment = Enrollment {
            id: tables.next_id(),
            student_id,
            course_id,
            enrolled_at: Utc::now(),
        };
        tables.enrollments.push(enrollment.clone());
        Ok((enrollment, true))
    }

    async fn list_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuizStore for InMemoryStore {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<(Quiz, Vec<Question>), AppError> {
        let mut tables = self.tables.write().await;
        let quiz = Quiz {
            id: tables.next_id(),
            course_id: req.course_id,
            title: req.title.clone(),
            description: req.description.clone(),
            created_at: Utc::now(),
        };
        let mut questions = Vec::with_capacity(req.questions.len());
        for (position, q) in req.questions.iter().enumerate() {
            questions.push(Question {
                id: tables.next_id(),
                quiz_id: quiz.id,
                text: q.text.clone(),
                options: Json(q.options.clone()),
                correct_answer: q.correct_answer,
                position: position as i32,
            });
        }
        tables.quizzes.push(quiz.clone());
        tables.questions.extend(questions.iter().cloned());
        Ok((quiz, questions))
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn questions_for_quiz(&self, quiz_id: i64) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.position, q.id));
        Ok(questions)
    }

    async fn insert_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, AppError> {
        let mut tables = self.tables.write().await;
        let row = QuizAttempt {
            id: tables.next_id(),
            user_id: attempt.user_id,
            quiz_id: attempt.quiz_id,
            answers: Json(attempt.answers),
            score: attempt.score,
            submitted_at: Utc::now(),
        };
        tables.attempts.push(row.clone());
        Ok(row)
    }

    async fn list_attempts(
        &self,
        user_id: Option<i64>,
    ) -> Result<Vec<QuizAttemptSummary>, AppError> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<QuizAttemptSummary> = tables
            .attempts
            .iter()
            .filter(|a| user_id.is_none_or(|uid| a.user_id == uid))
            .map(|a| QuizAttemptSummary {
                id: a.id,
                user_id: a.user_id,
                quiz_id: a.quiz_id,
                quiz_title: tables
                    .quizzes
                    .iter()
                    .find(|q| q.id == a.quiz_id)
                    .map(|q| q.title.clone())
                    .unwrap_or_default(),
                answers: a.answers.clone(),
                score: a.score,
                submitted_at: a.submitted_at,
            })
            .collect();
        attempts.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(attempts)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let mut tables = self.tables.write().await;
        if tables
            .payments
            .iter()
            .any(|p| p.paypal_order_id.as_deref() == Some(payment.paypal_order_id.as_str()))
        {
            return Err(AppError::InternalServerError(format!(
                "duplicate paypal_order_id {}",
                payment.paypal_order_id
            )));
        }
        let now = Utc::now();
        let row = Payment {
            id: tables.next_id(),
            user_id: payment.user_id,
            course_id: payment.course_id,
            amount: payment.amount,
            paypal_order_id: Some(payment.paypal_order_id),
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.payments.push(row.clone());
        Ok(row)
    }

    async fn find_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .find(|p| p.paypal_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn claim_capture(&self, id: i64, stale_before: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let pending = tables
            .payments
            .iter()
            .any(|p| p.id == id && p.status == PaymentStatus::Pending);
        if !pending {
            return Ok(false);
        }
        if tables
            .capture_claims
            .get(&id)
            .is_some_and(|claimed_at| *claimed_at >= stale_before)
        {
            return Ok(false);
        }
        tables.capture_claims.insert(id, Utc::now());
        Ok(true)
    }

    async fn release_capture(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.capture_claims.remove(&id);
        Ok(())
    }

    async fn transition_payment(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.payments.iter_mut().find(|p| p.id == id) {
            Some(p) if p.status == from => {
                p.status = to;
                p.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_payments_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<PaymentHistoryEntry>, AppError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<PaymentHistoryEntry> = tables
            .payments
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| PaymentHistoryEntry {
                id: p.id,
                course_id: p.course_id,
                course_title: tables
                    .courses
                    .iter()
                    .find(|c| c.id == p.course_id)
                    .map(|c| c.title.clone())
                    .unwrap_or_default(),
                amount: p.amount,
                status: p.status,
                paypal_order_id: p.paypal_order_id.clone(),
                created_at: p.created_at,
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn stale_pending_payments(&self, before: DateTime<Utc>) -> Result<Vec<Payment>, AppError> {
        let tables = self.tables.read().await;
        let mut stale: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|p| {
                p.status == PaymentStatus::Pending
                    && p.paypal_order_id.is_some()
                    && p.created_at < before
            })
            .cloned()
            .collect();
        stale.sort_by_key(|p| (p.created_at, p.id));
        Ok(stale)
    }
}

#[async_trait]
impl AssignmentStore for InMemoryStore {
    async fn create_assignment(&self, req: &CreateAssignmentRequest) -> Result<Assignment, AppError> {
        let mut tables = self.tables.write().await;
        let assignment = Assignment {
            id: tables.next_id(),
            course_id: req.course_id,
            title: req.title.clone(),
            description: req.description.clone(),
            due_date: req.due_date,
            created_at: Utc::now(),
        };
        tables.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_assignments(&self, course_id: i64) -> Result<Vec<Assignment>, AppError> {
        let tables = self.tables.read().await;
        let mut assignments: Vec<Assignment> = tables
            .assignments
            .iter()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect();
        // Undated assignments last
        assignments.sort_by_key(|a| (a.due_date.is_none(), a.due_date, a.id));
        Ok(assignments)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError> {
        let mut tables = self.tables.write().await;
        let row = Submission {
            id: tables.next_id(),
            user_id: submission.user_id,
            assignment_id: submission.assignment_id,
            text_answer: submission.text_answer,
            score: None,
            submitted_at: Utc::now(),
            graded_at: None,
        };
        tables.submissions.push(row.clone());
        Ok(row)
    }

    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_submissions(&self, user_id: Option<i64>) -> Result<Vec<Submission>, AppError> {
        let tables = self.tables.read().await;
        let mut submissions: Vec<Submission> = tables
            .submissions
            .iter()
            .filter(|s| user_id.is_none_or(|uid| s.user_id == uid))
            .cloned()
            .collect();
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(submissions)
    }

    async fn grade_submission(&self, id: i64, score: f64) -> Result<Option<Submission>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.submissions.iter_mut().find(|s| s.id == id).map(|s| {
            s.score = Some(score);
            s.graded_at = Some(Utc::now());
            s.clone()
        }))
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn record_event(
        &self,
        user_id: i64,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let event = Event {
            id: tables.next_id(),
            user_id,
            event_type: event_type.as_str().to_string(),
            metadata: Some(Json(metadata)),
            timestamp: Utc::now(),
        };
        tables.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn seed_course(store: &InMemoryStore) -> Course {
        store
            .create_course(
                1,
                &CreateCourseRequest {
                    title: "Ownership in Depth".to_string(),
                    description: String::new(),
                    price: dec!(29.99),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ensure_enrollment_is_get_or_create() {
        let store = InMemoryStore::new();
        let course = seed_course(&store).await;

        let (first, created) = store.ensure_enrollment(5, course.id).await.unwrap();
        assert!(created);
        let (second, created_again) = store.ensure_enrollment(5, course.id).await.unwrap();
        assert!(!created_again);
        assert_eq!(first, second);
        assert_eq!(store.list_enrollments(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transition_payment_is_compare_and_set() {
        let store = InMemoryStore::new();
        let course = seed_course(&store).await;
        let payment = store
            .insert_payment(NewPayment {
                user_id: 5,
                course_id: course.id,
                amount: dec!(29.99),
                paypal_order_id: "ORDER-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        assert!(
            store
                .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Succeeded)
                .await
                .unwrap()
        );
        assert!(
            !store
                .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Succeeded)
                .await
                .unwrap()
        );
        let stored = store.find_payment_by_order_id("ORDER-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_stale_pending_payments_filters_by_age_and_status() {
        let store = InMemoryStore::new();
        let course = seed_course(&store).await;
        let old = store
            .insert_payment(NewPayment {
                user_id: 5,
                course_id: course.id,
                amount: dec!(29.99),
                paypal_order_id: "OLD".to_string(),
            })
            .await
            .unwrap();
        store
            .insert_payment(NewPayment {
                user_id: 5,
                course_id: course.id,
                amount: dec!(29.99),
                paypal_order_id: "FRESH".to_string(),
            })
            .await
            .unwrap();
        store
            .backdate_payment(old.id, Utc::now() - chrono::Duration::hours(2))
            .await;

        let stale = store
            .stale_pending_payments(Utc::now() - chrono::Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].paypal_order_id.as_deref(), Some("OLD"));
    }

    #[tokio::test]
    async fn test_capture_claim_is_exclusive_until_released_or_stale() {
        let store = InMemoryStore::new();
        let course = seed_course(&store).await;
        let payment = store
            .insert_payment(NewPayment {
                user_id: 5,
                course_id: course.id,
                amount: dec!(29.99),
                paypal_order_id: "ORDER-1".to_string(),
            })
            .await
            .unwrap();
        let an_hour_ago = Utc::now() - chrono::Duration::hours(1);

        assert!(store.claim_capture(payment.id, an_hour_ago).await.unwrap());
        assert!(!store.claim_capture(payment.id, an_hour_ago).await.unwrap());

        // A claim older than the cut-off can be taken over
        assert!(store.claim_capture(payment.id, Utc::now() + chrono::Duration::seconds(1)).await.unwrap());

        store.release_capture(payment.id).await.unwrap();
        assert!(store.claim_capture(payment.id, an_hour_ago).await.unwrap());

        store
            .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Succeeded)
            .await
            .unwrap();
        store.release_capture(payment.id).await.unwrap();
        assert!(!store.claim_capture(payment.id, an_hour_ago).await.unwrap());
    }

    #[tokio::test]
    async fn test_submissions_are_graded_in_place() {
        let store = InMemoryStore::new();
        let course = seed_course(&store).await;
        let assignment = store
            .create_assignment(&CreateAssignmentRequest {
                course_id: course.id,
                title: "Borrow checker essay".to_string(),
                description: String::new(),
                due_date: None,
            })
            .await
            .unwrap();

        let submission = store
            .insert_submission(NewSubmission {
                user_id: 5,
                assignment_id: assignment.id,
                text_answer: "Lifetimes are regions.".to_string(),
            })
            .await
            .unwrap();
        assert!(submission.score.is_none());

        let graded = store.grade_submission(submission.id, 90.0).await.unwrap().unwrap();
        assert_eq!(graded.score, Some(90.0));
        assert!(graded.graded_at.is_some());
        assert!(store.grade_submission(9999, 50.0).await.unwrap().is_none());

        assert_eq!(store.list_submissions(Some(5)).await.unwrap().len(), 1);
        assert!(store.list_submissions(Some(6)).await.unwrap().is_empty());
        assert_eq!(store.list_submissions(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_user() {
        let store = InMemoryStore::new();
        let course = seed_course(&store).await;
        for (user, order) in [(5, "A"), (6, "B")] {
            store
                .insert_payment(NewPayment {
                    user_id: user,
                    course_id: course.id,
                    amount: course.price,
                    paypal_order_id: order.to_string(),
                })
                .await
                .unwrap();
        }
        let history = store.list_payments_for_user(5).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].course_title, "Ownership in Depth");
    }
}
