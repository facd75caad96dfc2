use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Json;
use serde::Serialize;

use crate::db::operations::faculty::{self, FacultyPatch, NewFaculty};
use crate::response::AppError;
use crate::state::AppState;

const FETCH_ERROR: &str = "Failed to fetch faculty";
const SUBJECTS_ERROR: &str = "Failed to fetch subjects";
const ADD_ERROR: &str = "Failed to add faculty";
const UPDATE_ERROR: &str = "Failed to update faculty";
const DELETE_ERROR: &str = "Failed to delete faculty";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/faculty", get(list_faculty).post(create_faculty))
        .route("/faculty/:id", put(update_faculty).delete(delete_faculty))
        .route("/subjects", get(list_subjects))
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

async fn list_faculty(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(FETCH_ERROR));
    };

    let members = faculty::list_with_subjects(proxy.as_ref())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "faculty list failed");
            AppError::internal(FETCH_ERROR)
        })?;

    Ok(Json(members))
}

async fn list_subjects(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(SUBJECTS_ERROR));
    };

    let subjects = faculty::list_subjects(proxy.as_ref()).await.map_err(|err| {
        tracing::error!(error = %err, "subject list failed");
        AppError::internal(SUBJECTS_ERROR)
    })?;

    Ok(Json(subjects))
}

async fn create_faculty(
    State(state): State<AppState>,
    Json(payload): Json<NewFaculty>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(ADD_ERROR));
    };

    let created = faculty::insert_faculty(proxy.as_ref(), &payload)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "faculty insert failed");
            AppError::internal(ADD_ERROR)
        })?;

    Ok(Json(created))
}

async fn update_faculty(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<FacultyPatch>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(UPDATE_ERROR));
    };

    let updated = faculty::update_faculty(proxy.as_ref(), &id, &patch)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "faculty update failed");
            AppError::internal(UPDATE_ERROR)
        })?;

    if !updated {
        return Err(AppError::not_found("Faculty not found"));
    }

    Ok(Json(SuccessResponse { success: true }))
}

async fn delete_faculty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(DELETE_ERROR));
    };

    let removed = faculty::delete_faculty(proxy.as_ref(), &id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "faculty delete failed");
            AppError::internal(DELETE_ERROR)
        })?;

    if !removed {
        return Err(AppError::not_found("Faculty not found"));
    }

    Ok(Json(SuccessResponse { success: true }))
}
