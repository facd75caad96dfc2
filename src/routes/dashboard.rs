use axum::extract::State;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::db::operations::dashboard;
use crate::middleware::auth::require_auth;
use crate::response::AppError;
use crate::state::AppState;

const STATS_ERROR: &str = "Server error fetching dashboard stats";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/stats", get(stats))
        .route_layer(from_fn(require_auth))
}

async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(STATS_ERROR));
    };

    match user.role.as_str() {
        "STUDENT" => {
            let payload = dashboard::student_dashboard(proxy.as_ref(), &user.id)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, "student dashboard failed");
                    AppError::internal(STATS_ERROR)
                })?;
            Ok(Json(payload).into_response())
        }
        "TEACHER" | "ADMIN" => {
            let scope_to_teacher = user.role == "TEACHER";
            let payload = dashboard::staff_dashboard(proxy.as_ref(), &user.id, scope_to_teacher)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, "staff dashboard failed");
                    AppError::internal(STATS_ERROR)
                })?;
            Ok(Json(payload).into_response())
        }
        _ => Err(AppError::forbidden("Access denied")),
    }
}
