use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::SecondsFormat;
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(summary))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[derive(Serialize)]
struct SummaryBody {
    status: &'static str,
    message: &'static str,
    uptime: u64,
    database: &'static str,
}

async fn summary(State(state): State<AppState>) -> Json<SummaryBody> {
    Json(SummaryBody {
        status: "ok",
        message: "AI Inclusive Learning Platform API is running",
        uptime: state.uptime_seconds(),
        database: database_label(&state).await,
    })
}

#[derive(Serialize)]
struct LivenessBody {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

async fn liveness(State(state): State<AppState>) -> Json<LivenessBody> {
    Json(LivenessBody {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
}

#[derive(Serialize)]
struct ReadinessBody {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "databaseLatencyMs")]
    database_latency_ms: Option<u64>,
}

async fn readiness(State(state): State<AppState>) -> Response {
    if let Some(proxy) = state.db_proxy() {
        let health = proxy.health().await;
        if health.reachable {
            let body = ReadinessBody {
                status: "healthy",
                timestamp: now_iso(),
                uptime: state.uptime_seconds(),
                database: "connected",
                database_latency_ms: health.latency_ms,
            };
            return Json(body).into_response();
        }
    }

    let body = ReadinessBody {
        status: "unhealthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        database: "disconnected",
        database_latency_ms: None,
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

async fn database_label(state: &AppState) -> &'static str {
    let Some(proxy) = state.db_proxy() else {
        return "disconnected";
    };
    if proxy.health().await.reachable {
        "connected"
    } else {
        "disconnected"
    }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
