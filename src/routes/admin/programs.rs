use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::operations::program::{self, ProgramPatch};
use crate::response::AppError;
use crate::state::AppState;

const SERVER_ERROR: &str = "Server error";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/cos-programs", get(list_programs).post(create_program))
        .route(
            "/cos-programs/:id",
            put(update_program).delete(delete_program),
        )
}

#[derive(Debug, Deserialize)]
struct CreateProgramRequest {
    title: Option<String>,
    abbreviation: Option<String>,
}

#[derive(Serialize)]
struct DeletedResponse {
    success: bool,
}

async fn list_programs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(SERVER_ERROR));
    };

    let programs = program::list_active_cos(proxy.as_ref())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "program list failed");
            AppError::internal(SERVER_ERROR)
        })?;

    Ok(Json(programs))
}

async fn create_program(
    State(state): State<AppState>,
    Json(payload): Json<CreateProgramRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = payload.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("Program title is required"));
    }

    let abbreviation = payload
        .abbreviation
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(SERVER_ERROR));
    };

    let created = program::insert_program(proxy.as_ref(), &title, abbreviation)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "program insert failed");
            AppError::internal(SERVER_ERROR)
        })?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ProgramPatch>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(SERVER_ERROR));
    };

    let updated = program::update_program(proxy.as_ref(), &id, &patch)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "program update failed");
            AppError::internal(SERVER_ERROR)
        })?;

    match updated {
        Some(current) => Ok(Json(current)),
        None => Err(AppError::not_found("Program not found")),
    }
}

async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(SERVER_ERROR));
    };

    let removed = program::delete_program(proxy.as_ref(), &id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "program delete failed");
            AppError::internal(SERVER_ERROR)
        })?;

    if !removed {
        return Err(AppError::not_found("Program not found"));
    }

    Ok(Json(DeletedResponse { success: true }))
}
