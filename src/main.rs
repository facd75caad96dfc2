use std::net::SocketAddr;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tisa_backend_rust::config::Config;
use tisa_backend_rust::db;
use tisa_backend_rust::logging;
use tisa_backend_rust::routes;
use tisa_backend_rust::seed;
use tisa_backend_rust::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // The guard keeps the file appender flushing until exit.
    let _log_guard = logging::init_tracing(&config.log_level);

    let db_proxy = db::DatabaseProxy::from_env()
        .await
        .map_err(|err| tracing::warn!(error = %err, "starting without a database connection"))
        .ok();

    if let Some(ref proxy) = db_proxy {
        prepare_database(proxy).await;
    }

    let state = AppState::new(db_proxy);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    tracing::info!(%addr, "tisa-backend listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    if let Err(err) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server exited with error");
    }

    tracing::info!("HTTP server stopped");
}

async fn prepare_database(proxy: &db::DatabaseProxy) {
    if let Err(err) = db::migrate::run_migrations(proxy.pool()).await {
        tracing::error!(error = %err, "failed to run database migrations");
        return;
    }
    seed::seed_test_accounts(proxy).await;
    seed::seed_demo_data(proxy).await;
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
