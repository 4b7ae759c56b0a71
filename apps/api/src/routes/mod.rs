pub mod auth;
pub mod health;
pub mod matchings;
pub mod resumes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Uploads are capped at 10 MiB.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        // Resumes
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload).get(resumes::handle_list),
        )
        .route("/api/v1/resumes/:id", get(resumes::handle_get))
        .route("/api/v1/resumes/:id/analyze", post(resumes::handle_analyze))
        // JD matching
        .route(
            "/api/v1/matchings",
            post(matchings::handle_create).get(matchings::handle_list),
        )
        .route("/api/v1/matchings/:id", get(matchings::handle_get))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
