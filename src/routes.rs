// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::admin, state::AppState};

/// Assembles the admin router.
///
/// * Question validation and student enrollment live under `/api/admin`.
/// * Identity is established upstream; no auth layer is applied here.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let question_routes = Router::new()
        .route("/validate", post(admin::validate_question))
        .route("/validate-batch", post(admin::validate_question_batch));

    let student_routes = Router::new()
        .route("/", get(admin::list_students))
        .route("/batch", post(admin::enroll_students))
        .route("/{id}", delete(admin::delete_student));

    Router::new()
        .nest("/api/admin/questions", question_routes)
        .nest("/api/admin/students", student_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
