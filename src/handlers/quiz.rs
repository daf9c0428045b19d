// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    db::Store,
    error::AppError,
    models::{
        event::EventType,
        question::{CreateQuizRequest, PublicQuestion, QuizDetail},
        quiz_attempt::{AttemptResult, SubmitAttemptRequest},
    },
    services::{analytics, grading},
    utils::jwt::Claims,
};

/// Creates a quiz with its questions.
///
/// Only the course's instructor (or an admin) may add quizzes to it.
pub async fn create_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(pos) = payload.questions.iter().position(|q| !q.answer_in_range()) {
        return Err(AppError::BadRequest(format!(
            "questions[{}]: correct_answer must index one of the options",
            pos
        )));
    }

    let course = store
        .get_course(payload.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if course.instructor_id != claims.user_id()? && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Only the course instructor can add quizzes".to_string(),
        ));
    }

    let (quiz, questions) = store.create_quiz(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(QuizDetail {
            id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title,
            description: quiz.description,
            questions: questions.into_iter().map(PublicQuestion::from).collect(),
        }),
    ))
}

/// Returns a quiz for taking. Answer keys are never included.
pub async fn get_quiz(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = store
        .get_quiz(id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = store.questions_for_quiz(quiz.id).await?;

    Ok(Json(QuizDetail {
        id: quiz.id,
        course_id: quiz.course_id,
        title: quiz.title,
        description: quiz.description,
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    }))
}

/// Submits a user's quiz answers and records the graded attempt.
///
/// * Compares answers with the stored answer keys.
/// * Score is the percentage of questions answered correctly.
/// * Always inserts a new attempt; earlier attempts are never touched.
pub async fn submit_attempt(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let answers = req.submitted_answers();

    let (quiz, attempt, grade) =
        grading::submit_attempt(store.as_ref(), user_id, req.quiz, answers).await?;

    analytics::record_event(
        store.clone(),
        user_id,
        EventType::QuizAttempt,
        serde_json::json!({ "quiz": quiz.id, "attempt": attempt.id, "score": grade.score }),
    );

    Ok((
        StatusCode::CREATED,
        Json(AttemptResult {
            id: attempt.id,
            quiz: quiz.id,
            quiz_title: quiz.title,
            answers: attempt.answers.0,
            score: attempt.score,
            correct_count: grade.correct_count,
            total_questions: grade.total_questions,
            submitted_at: attempt.submitted_at,
        }),
    ))
}

/// Lists attempts, newest first. Learners see their own; staff see everyone's.
pub async fn list_attempts(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scope = if claims.is_staff() {
        None
    } else {
        Some(claims.user_id()?)
    };

    let attempts = store.list_attempts(scope).await?;
    Ok(Json(attempts))
}
