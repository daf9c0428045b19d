// src/handlers/courses.rs

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
    models::course::CreateCourseRequest,
    utils::jwt::Claims,
};

/// Lists all courses, newest first.
pub async fn list_courses(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let courses = store.list_courses().await?;
    Ok(Json(courses))
}

/// Retrieves a single course by ID.
pub async fn get_course(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store
        .get_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// Creates a course owned by the calling instructor.
pub async fn create_course(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let instructor_id = claims.user_id()?;
    let course = store.create_course(instructor_id, &payload).await?;

    tracing::info!("Course {} created by instructor {}", course.id, instructor_id);

    Ok((StatusCode::CREATED, Json(course)))
}

/// Self-enrollment. Only free courses; paid courses go through the purchase flow.
///
/// Returns 201 when the enrollment is new and 200 when it already existed.
pub async fn enroll(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let course = store
        .get_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !course.is_free() {
        return Err(AppError::Forbidden(
            "This course must be purchased before enrolling".to_string(),
        ));
    }

    let (_, created) = store.ensure_enrollment(user_id, course.id).await?;

    if created {
        Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "status": "enrolled" })),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "status": "already enrolled" })),
        ))
    }
}

/// Lists the caller's enrollments.
pub async fn my_enrollments(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let enrollments = store.list_enrollments(claims.user_id()?).await?;
    Ok(Json(enrollments))
}
