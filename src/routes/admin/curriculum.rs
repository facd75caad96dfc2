use axum::extract::{Path, State};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;

use crate::db::operations::curriculum::{self, CurriculumPatch, NewCurriculumEntry};
use crate::middleware::auth::require_auth;
use crate::response::AppError;
use crate::state::AppState;

const FETCH_ERROR: &str = "Unable to fetch curriculum";
const ADD_ERROR: &str = "Unable to add curriculum entry";
const UPDATE_ERROR: &str = "Unable to update curriculum entry";
const DELETE_ERROR: &str = "Unable to delete curriculum entry";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create_entry))
        .route("/:id", get(list_by_program).put(update_entry).delete(delete_entry))
        .route_layer(from_fn(require_auth))
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

/// The path segment is a program id on GET and an entry id on PUT/DELETE.
async fn list_by_program(
    State(state): State<AppState>,
    Path(program_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(FETCH_ERROR));
    };

    let entries = curriculum::list_by_program(proxy.as_ref(), &program_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "curriculum list failed");
            AppError::internal(FETCH_ERROR)
        })?;

    Ok(Json(entries))
}

async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<NewCurriculumEntry>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(ADD_ERROR));
    };

    let created = curriculum::insert_entry(proxy.as_ref(), &payload)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "curriculum insert failed");
            AppError::internal(ADD_ERROR)
        })?;

    Ok(Json(created))
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CurriculumPatch>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(UPDATE_ERROR));
    };

    let updated = curriculum::update_entry(proxy.as_ref(), &id, &patch)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "curriculum update failed");
            AppError::internal(UPDATE_ERROR)
        })?;

    match updated {
        Some(entry) => Ok(Json(entry)),
        None => Err(AppError::not_found("Curriculum entry not found")),
    }
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(DELETE_ERROR));
    };

    let removed = curriculum::delete_entry(proxy.as_ref(), &id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "curriculum delete failed");
            AppError::internal(DELETE_ERROR)
        })?;

    if !removed {
        return Err(AppError::not_found("Curriculum entry not found"));
    }

    Ok(Json(SuccessResponse { success: true }))
}
