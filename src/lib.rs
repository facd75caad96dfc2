#![allow(dead_code)]

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Router wired the same way `main` does it, for in-process tests.
pub async fn create_app() -> axum::Router {
    let db_proxy = db::DatabaseProxy::from_env().await.ok();

    routes::router(AppState::new(db_proxy))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
