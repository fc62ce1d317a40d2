// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assessment, attempt},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (assessments, attempts, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, session registry, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let assessment_routes = Router::new()
        .route("/", get(assessment::list_assessments))
        .route("/{id}", get(assessment::get_assessment))
        .route("/{id}/start", post(assessment::start_session));

    let attempt_routes = Router::new()
        .route("/{id}", get(attempt::get_progress))
        .route("/{id}/answer", post(attempt::select_answer))
        .route("/{id}/flag", post(attempt::toggle_flag))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .route("/{id}/result", get(attempt::get_result));

    let admin_routes = Router::new()
        .route("/assessments", post(admin::create_assessment))
        .route("/questions", post(admin::create_question));

    Router::new()
        .nest("/api/assessments", assessment_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
