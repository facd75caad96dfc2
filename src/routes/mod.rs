mod admin;
mod ai_tutor;
mod auth;
mod chat_sessions;
mod courses;
mod dashboard;
mod health;
mod lessons;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::middleware::rate_limit::{api_rate_limit_middleware, auth_rate_limit_middleware};
use crate::response::json_error;
use crate::state::AppState;

/// Health endpoints answer on `/health` and `/api/health`; everything else
/// lives under `/api`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/chat-sessions", chat_sessions::router())
        .nest("/api/admin", admin::router())
        .nest("/api/courses", courses::router())
        .nest("/api/lessons", lessons::router())
        .nest("/api/ai-tutor", ai_tutor::router())
        .nest("/api/dashboard", dashboard::router())
        .nest("/health", health::router())
        .nest("/api/health", health::router())
        .layer(middleware::from_fn(auth_rate_limit_middleware))
        .layer(middleware::from_fn(api_rate_limit_middleware))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "Route not found").into_response()
}
