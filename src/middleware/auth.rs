use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::AuthUser;
use crate::response::AppError;

/// Rejects requests without a valid bearer token and stores the verified
/// user in the request extensions.
pub async fn require_auth(mut req: Request<Body>, next: Next) -> Response {
    let Some(token) = crate::auth::extract_token(req.headers()) else {
        return AppError::unauthorized("Access token required").into_response();
    };

    match crate::auth::verify_token(&token) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(_) => AppError::forbidden("Invalid or expired token").into_response(),
    }
}

/// Attaches the user when a valid token is present, passes through otherwise.
pub async fn optional_auth(mut req: Request<Body>, next: Next) -> Response {
    if let Some(token) = crate::auth::extract_token(req.headers()) {
        if let Ok(user) = crate::auth::verify_token(&token) {
            req.extensions_mut().insert(user);
        }
    }
    next.run(req).await
}

/// Course authoring gate. Layered after `require_auth`.
pub async fn require_staff(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<AuthUser>() {
        Some(user) if matches!(user.role.as_str(), "TEACHER" | "ADMIN" | "CONTENT_CREATOR") => {
            next.run(req).await
        }
        Some(_) => AppError::forbidden("Insufficient permissions").into_response(),
        None => AppError::unauthorized("Access token required").into_response(),
    }
}

/// Admin-only gate. Layered after `require_auth`.
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<AuthUser>() {
        Some(user) if user.role == "ADMIN" => next.run(req).await,
        Some(_) => AppError::forbidden("Access denied - Admin only").into_response(),
        None => AppError::unauthorized("Access token required").into_response(),
    }
}
