use axum::extract::{Path, Query, State};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::ai_interaction::{self, AiInteraction, NewAiInteraction};
use crate::middleware::auth::require_auth;
use crate::response::AppError;
use crate::services::tutor;
use crate::state::AppState;

const ASK_ERROR: &str = "Server error processing AI request";
const HISTORY_ERROR: &str = "Server error fetching AI history";
const RATE_ERROR: &str = "Server error rating response";

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/ask", post(ask))
        .route("/history", get(history))
        .route("/:id/rate", post(rate))
        .route_layer(from_fn(require_auth))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    message: Option<String>,
    r#type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AskResponse {
    response: String,
    interaction_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<String>,
    context: Option<String>,
}

#[derive(Serialize)]
struct HistoryResponse {
    interactions: Vec<AiInteraction>,
}

#[derive(Debug, Deserialize)]
struct RateRequest {
    helpful: Option<bool>,
}

#[derive(Serialize)]
struct RateResponse {
    interaction: AiInteraction,
}

async fn ask(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = payload.message.unwrap_or_default();
    if message.is_empty() {
        return Err(AppError::bad_request("Message is required"));
    }

    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(ASK_ERROR));
    };

    let context = tutor::build_context(proxy.as_ref(), &message)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "tutor context build failed");
            AppError::internal(ASK_ERROR)
        })?;

    let answer = tutor::respond(proxy.as_ref(), state.llm().as_ref(), &message, context.as_deref())
        .await;

    let interaction = ai_interaction::insert_interaction(
        proxy.as_ref(),
        &NewAiInteraction {
            user_id: user.id,
            r#type: payload.r#type,
            context,
            user_message: message,
            ai_response: answer.clone(),
        },
    )
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "interaction insert failed");
        AppError::internal(ASK_ERROR)
    })?;

    Ok(Json(AskResponse {
        response: answer,
        interaction_id: interaction.id,
    }))
}

async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(HISTORY_ERROR));
    };

    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let interactions =
        ai_interaction::list_for_user(proxy.as_ref(), &user.id, limit, query.context.as_deref())
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "interaction list failed");
                AppError::internal(HISTORY_ERROR)
            })?;

    Ok(Json(HistoryResponse { interactions }))
}

async fn rate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(RATE_ERROR));
    };

    let updated = ai_interaction::set_helpful(proxy.as_ref(), &id, &user.id, payload.helpful)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "interaction rating failed");
            AppError::internal(RATE_ERROR)
        })?;

    match updated {
        Some(interaction) => Ok(Json(RateResponse { interaction })),
        None => Err(AppError::not_found("Interaction not found")),
    }
}
