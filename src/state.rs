use std::sync::Arc;
use std::time::Instant;

use crate::db::DatabaseProxy;
use crate::services::llm::LlmClient;

/// Shared handler state. `db_proxy` is `None` when the server came up
/// without a reachable database; handlers answer 500 for data routes in
/// that mode while health stays accurate.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db_proxy: Option<Arc<DatabaseProxy>>,
    llm: Arc<LlmClient>,
}

impl AppState {
    pub fn new(db_proxy: Option<Arc<DatabaseProxy>>) -> Self {
        Self {
            started_at: Instant::now(),
            db_proxy,
            llm: Arc::new(LlmClient::from_env()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn llm(&self) -> Arc<LlmClient> {
        Arc::clone(&self.llm)
    }
}
