// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assignments, courses, payments, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Public catalogue routes, learner routes behind auth, instructor and admin routes
///   behind an extra role check.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, payment provider, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/courses", get(courses::list_courses))
        .route("/courses/{id}", get(courses::get_course))
        .route("/courses/{id}/assignments", get(assignments::list_course_assignments))
        .route("/quizzes/{id}", get(quiz::get_quiz))
        .route("/assignments/{id}", get(assignments::get_assignment));

    let learner_routes = Router::new()
        .route("/courses/{id}/enroll", post(courses::enroll))
        .route("/enrollments", get(courses::my_enrollments))
        .route(
            "/quiz-attempts",
            get(quiz::list_attempts).post(quiz::submit_attempt),
        )
        .route(
            "/submissions",
            get(assignments::list_submissions).post(assignments::submit_assignment),
        )
        .route("/payments", get(payments::list_payments))
        .route("/payments/create-order", post(payments::create_order))
        .route("/payments/capture-order", post(payments::capture_order))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Double middleware protection: Auth first, then role check
    let instructor_routes = Router::new()
        .route("/instructor/courses", post(courses::create_course))
        .route("/instructor/quizzes", post(quiz::create_quiz))
        .route("/instructor/assignments", post(assignments::create_assignment))
        .route(
            "/instructor/submissions/{id}/grade",
            put(assignments::grade_submission),
        )
        .layer(middleware::from_fn(instructor_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/admin/payments/reconcile", post(payments::reconcile))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .merge(public_routes)
        .merge(learner_routes)
        .merge(instructor_routes)
        .merge(admin_routes);

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
