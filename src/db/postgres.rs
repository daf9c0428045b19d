// src/db/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};

use super::{
    AssignmentStore, CourseStore, EnrollmentStore, EventStore, PaymentStore, QuizStore, UserStore,
};
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

const PAYMENT_COLUMNS: &str =
    "id, user_id, course_id, amount, paypal_order_id, status, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, course_id, title, description, due_date, created_at";

const SUBMISSION_COLUMNS: &str =
    "id, user_id, assignment_id, text_answer, score, submitted_at, graded_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn ensure_user(&self, id: i64, role: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, role)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET role = EXCLUDED.role
            WHERE users.role IS DISTINCT FROM EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(role)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn create_course(
        &self,
        instructor_id: i64,
        req: &CreateCourseRequest,
    ) -> Result<Course, AppError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (title, description, instructor_id, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, instructor_id, price, created_at
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(instructor_id)
        .bind(req.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create course: {:?}", e);
            AppError::from(e)
        })?;

        Ok(course)
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, title, description, instructor_id, price, created_at FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, description, instructor_id, price, created_at
            FROM courses
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }
}

#[async_trait]
impl EnrollmentStore for PgStore {
    async fn ensure_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<(Enrollment, bool), AppError> {
        // ON CONFLICT keeps concurrent callers from racing into a unique violation
        let inserted = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (student_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (student_id, course_id) DO NOTHING
            RETURNING id, student_id, course_id, enrolled_at
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(enrollment) = inserted {
            return Ok((enrollment, true));
        }

        let existing = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, student_id, course_id, enrolled_at
            FROM enrollments
            WHERE student_id = $1 AND course_id = $2
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((existing, false))
    }

    async fn list_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>, AppError> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, student_id, course_id, enrolled_at
            FROM enrollments
            WHERE student_id = $1
            ORDER BY enrolled_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(enrollments)
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<(Quiz, Vec<Question>), AppError> {
        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (course_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, course_id, title, description, created_at
            "#,
        )
        .bind(req.course_id)
        .bind(&req.title)
        .bind(&req.description)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(req.questions.len());
        for (position, q) in req.questions.iter().enumerate() {
            let question = sqlx::query_as::<_, Question>(
                r#"
                INSERT INTO questions (quiz_id, text, options, correct_answer, position)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, quiz_id, text, options, correct_answer, position
                "#,
            )
            .bind(quiz.id)
            .bind(&q.text)
            .bind(Json(&q.options))
            .bind(q.correct_answer)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await?;
            questions.push(question);
        }

        tx.commit().await?;

        Ok((quiz, questions))
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "SELECT id, course_id, title, description, created_at FROM quizzes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn questions_for_quiz(&self, quiz_id: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, text, options, correct_answer, position
            FROM questions
            WHERE quiz_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn insert_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, AppError> {
        let row = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (user_id, quiz_id, answers, score)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, quiz_id, answers, score, submitted_at
            "#,
        )
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(Json(&attempt.answers))
        .bind(attempt.score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert quiz attempt: {:?}", e);
            AppError::from(e)
        })?;

        Ok(row)
    }

    async fn list_attempts(
        &self,
        user_id: Option<i64>,
    ) -> Result<Vec<QuizAttemptSummary>, AppError> {
        let attempts = sqlx::query_as::<_, QuizAttemptSummary>(
            r#"
            SELECT a.id, a.user_id, a.quiz_id, q.title AS quiz_title, a.answers, a.score, a.submitted_at
            FROM quiz_attempts a
            JOIN quizzes q ON a.quiz_id = q.id
            WHERE ($1::BIGINT IS NULL OR a.user_id = $1)
            ORDER BY a.submitted_at DESC, a.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let sql = format!(
            r#"
            INSERT INTO payments (user_id, course_id, amount, paypal_order_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment.user_id)
            .bind(payment.course_id)
            .bind(payment.amount)
            .bind(&payment.paypal_order_id)
            .bind(PaymentStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert payment: {:?}", e);
                AppError::from(e)
            })?;

        Ok(row)
    }

    async fn find_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, AppError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE paypal_order_id = $1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn claim_capture(&self, id: i64, stale_before: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET capture_claimed_at = NOW()
            WHERE id = $1
              AND status = 'pending'
              AND (capture_claimed_at IS NULL OR capture_claimed_at < $2)
            "#,
        )
        .bind(id)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_capture(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE payments SET capture_claimed_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn transition_payment(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_payments_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<PaymentHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, PaymentHistoryEntry>(
            r#"
            SELECT p.id, p.course_id, c.title AS course_title, p.amount, p.status,
                   p.paypal_order_id, p.created_at
            FROM payments p
            JOIN courses c ON p.course_id = c.id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn stale_pending_payments(&self, before: DateTime<Utc>) -> Result<Vec<Payment>, AppError> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE status = 'pending' AND paypal_order_id IS NOT NULL AND created_at < $1
            ORDER BY created_at, id
            "#
        );
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(before)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }
}

#[async_trait]
impl AssignmentStore for PgStore {
    async fn create_assignment(&self, req: &CreateAssignmentRequest) -> Result<Assignment, AppError> {
        let sql = format!(
            r#"
            INSERT INTO assignments (course_id, title, description, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );
        let assignment = sqlx::query_as::<_, Assignment>(&sql)
            .bind(req.course_id)
            .bind(&req.title)
            .bind(&req.description)
            .bind(req.due_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create assignment: {:?}", e);
                AppError::from(e)
            })?;

        Ok(assignment)
    }

    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>, AppError> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1");
        let assignment = sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(assignment)
    }

    async fn list_assignments(&self, course_id: i64) -> Result<Vec<Assignment>, AppError> {
        let sql = format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM assignments
            WHERE course_id = $1
            ORDER BY due_date ASC NULLS LAST, id
            "#
        );
        let assignments = sqlx::query_as::<_, Assignment>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(assignments)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError> {
        let sql = format!(
            r#"
            INSERT INTO submissions (user_id, assignment_id, text_answer)
            VALUES ($1, $2, $3)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Submission>(&sql)
            .bind(submission.user_id)
            .bind(submission.assignment_id)
            .bind(&submission.text_answer)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert submission: {:?}", e);
                AppError::from(e)
            })?;

        Ok(row)
    }

    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, AppError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(submission)
    }

    async fn list_submissions(&self, user_id: Option<i64>) -> Result<Vec<Submission>, AppError> {
        let sql = format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM submissions
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
            ORDER BY submitted_at DESC, id DESC
            "#
        );
        let submissions = sqlx::query_as::<_, Submission>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(submissions)
    }

    async fn grade_submission(&self, id: i64, score: f64) -> Result<Option<Submission>, AppError> {
        let sql = format!(
            r#"
            UPDATE submissions
            SET score = $2, graded_at = NOW()
            WHERE id = $1
            RETURNING {SUBMISSION_COLUMNS}
            "#
        );
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .bind(score)
            .fetch_optional(&self.pool)
            .await?;

        Ok(submission)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn record_event(
        &self,
        user_id: i64,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO events (user_id, event_type, metadata) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(event_type.as_str())
            .bind(Json(metadata))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
