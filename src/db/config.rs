use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PROBE_INTERVAL_MS: u64 = 5000;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("Missing required env var: {0}")]
    Missing(&'static str),
}

/// Pool settings plus the liveness probe cadence.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub health_check: HealthCheckConfig,
}

#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let url =
            std::env::var("DATABASE_URL").map_err(|_| DbConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(env_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )),
            health_check: HealthCheckConfig {
                interval: Duration::from_millis(env_or(
                    "DB_HEALTH_CHECK_INTERVAL_MS",
                    DEFAULT_PROBE_INTERVAL_MS,
                )),
                timeout: Duration::from_millis(env_or(
                    "DB_HEALTH_CHECK_TIMEOUT_MS",
                    DEFAULT_PROBE_TIMEOUT_MS,
                )),
            },
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
