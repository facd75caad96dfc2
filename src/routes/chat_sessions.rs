use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::db::operations::chat_session;
use crate::middleware::auth::require_auth;
use crate::response::AppError;
use crate::state::AppState;

const LIST_ERROR: &str = "Unable to fetch chat sessions";
const CREATE_ERROR: &str = "Unable to create chat session";
const GET_ERROR: &str = "Unable to fetch chat session";
const UPDATE_ERROR: &str = "Unable to update chat session";
const DELETE_ERROR: &str = "Unable to delete chat session";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route(
            "/:id",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route_layer(from_fn(require_auth))
}

#[derive(Debug, Default, Deserialize)]
struct SessionBody {
    title: Option<String>,
    messages: Option<Value>,
}

#[derive(Serialize)]
struct DeletedResponse {
    success: bool,
}

async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(LIST_ERROR));
    };

    let sessions = chat_session::list_for_user(proxy.as_ref(), &user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "chat session list failed");
            AppError::internal(LIST_ERROR)
        })?;

    Ok(Json(sessions))
}

async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SessionBody>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(CREATE_ERROR));
    };

    let session = chat_session::insert_session(proxy.as_ref(), &user.id, body.title, body.messages)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "chat session insert failed");
            AppError::internal(CREATE_ERROR)
        })?;

    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(GET_ERROR));
    };

    let Some(session) = chat_session::find_by_id_and_user(proxy.as_ref(), &id, &user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "chat session lookup failed");
            AppError::internal(GET_ERROR)
        })?
    else {
        return Err(AppError::not_found("Chat session not found"));
    };

    Ok(Json(session))
}

async fn update_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<SessionBody>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(UPDATE_ERROR));
    };

    let updated =
        chat_session::update_session(proxy.as_ref(), &id, &user.id, body.title, body.messages)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "chat session update failed");
                AppError::internal(UPDATE_ERROR)
            })?;

    match updated {
        Some(session) => Ok(Json(session)),
        None => Err(AppError::not_found("Chat session not found")),
    }
}

async fn delete_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(DELETE_ERROR));
    };

    let deleted = chat_session::delete_session(proxy.as_ref(), &id, &user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "chat session delete failed");
            AppError::internal(DELETE_ERROR)
        })?;

    if !deleted {
        return Err(AppError::not_found("Chat session not found"));
    }

    Ok(Json(DeletedResponse { success: true }))
}
