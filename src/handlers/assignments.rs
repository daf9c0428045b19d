// src/handlers/assignments.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    db::Store,
    error::AppError,
    models::{
        assignment::{
            CreateAssignmentRequest, CreateSubmissionRequest, GradeSubmissionRequest,
            NewSubmission,
        },
        course::Course,
    },
    utils::jwt::Claims,
};

/// Only the course's instructor (or an admin) may manage its coursework.
fn ensure_teaches(claims: &Claims, course: &Course) -> Result<(), AppError> {
    if course.instructor_id != claims.user_id()? && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Only the course instructor can manage its assignments".to_string(),
        ));
    }
    Ok(())
}

/// Creates an assignment on a course the caller teaches.
pub async fn create_assignment(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = store
        .get_course(payload.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;
    ensure_teaches(&claims, &course)?;

    let assignment = store.create_assignment(&payload).await?;
    tracing::info!("Assignment {} created on course {}", assignment.id, course.id);

    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn get_assignment(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = store
        .get_assignment(id)
        .await?
        .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

    Ok(Json(assignment))
}

/// Lists a course's assignments, soonest due first.
pub async fn list_course_assignments(
    State(store): State<Arc<dyn Store>>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let assignments = store.list_assignments(course_id).await?;
    Ok(Json(assignments))
}

/// Hands in an assignment. Submissions after the due date are refused.
pub async fn submit_assignment(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let assignment = store
        .get_assignment(req.assignment)
        .await?
        .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

    if assignment.is_overdue_at(Utc::now()) {
        return Err(AppError::BadRequest(
            "The due date for this assignment has passed".to_string(),
        ));
    }

    let submission = store
        .insert_submission(NewSubmission {
            user_id,
            assignment_id: assignment.id,
            text_answer: req.text_answer,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

/// Lists submissions, newest first. Learners see their own; staff see everyone's.
pub async fn list_submissions(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scope = if claims.is_staff() {
        None
    } else {
        Some(claims.user_id()?)
    };

    let submissions = store.list_submissions(scope).await?;
    Ok(Json(submissions))
}

/// Records the instructor's score for a submission.
pub async fn grade_submission(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<GradeSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let submission = store
        .get_submission(id)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;
    let assignment = store
        .get_assignment(submission.assignment_id)
        .await?
        .ok_or(AppError::NotFound("Assignment not found".to_string()))?;
    let course = store
        .get_course(assignment.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;
    ensure_teaches(&claims, &course)?;

    let graded = store
        .grade_submission(id, req.score)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    tracing::info!("Submission {} graded {}", graded.id, req.score);
    Ok(Json(graded))
}
