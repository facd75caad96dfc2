pub mod config;
pub mod migrate;
pub mod operations;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

use crate::db::config::{DbConfig, DbConfigError, HealthCheckConfig};

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of the most recent background `SELECT 1` probe. `probed` stays
/// false until the first probe lands, so readiness reports unhealthy during
/// startup instead of guessing.
#[derive(Debug, Clone, Default)]
pub struct DbHealth {
    pub probed: bool,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
    pub last_error: Option<String>,
    pub failed_probes: u32,
}

impl DbHealth {
    fn record_success(&mut self, latency: Duration) {
        self.probed = true;
        self.reachable = true;
        self.latency_ms = Some(latency.as_millis() as u64);
        self.last_error = None;
        self.failed_probes = 0;
    }

    fn record_failure(&mut self, error: String) {
        self.probed = true;
        self.reachable = false;
        self.latency_ms = None;
        self.last_error = Some(error);
        self.failed_probes = self.failed_probes.saturating_add(1);
    }
}

/// Postgres pool plus the probe task that keeps [`DbHealth`] current for the
/// health endpoints.
pub struct DatabaseProxy {
    pool: PgPool,
    probe: HealthCheckConfig,
    health: RwLock<DbHealth>,
}

impl DatabaseProxy {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        let proxy = Arc::new(Self {
            pool,
            probe: config.health_check,
            health: RwLock::new(DbHealth::default()),
        });

        tokio::spawn(Arc::clone(&proxy).probe_loop());

        Ok(proxy)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Snapshot of the last probe outcome.
    pub async fn health(&self) -> DbHealth {
        self.health.read().await.clone()
    }

    // The first tick completes immediately, so health is populated right
    // after startup.
    async fn probe_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.probe.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.probe_once().await;
        }
    }

    async fn probe_once(&self) {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.probe.timeout,
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await;

        let mut health = self.health.write().await;
        let was_down = health.probed && !health.reachable;

        match outcome {
            Ok(Ok(_)) => {
                health.record_success(started.elapsed());
                if was_down {
                    tracing::info!("database probe recovered");
                }
            }
            Ok(Err(err)) => {
                health.record_failure(err.to_string());
                if health.failed_probes == 1 {
                    tracing::warn!(error = %err, "database probe failed");
                }
            }
            Err(_) => {
                let timeout_ms = self.probe.timeout.as_millis() as u64;
                health.record_failure(format!("probe timed out after {timeout_ms}ms"));
                if health.failed_probes == 1 {
                    tracing::warn!(timeout_ms, "database probe timed out");
                }
            }
        }
    }
}
