use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::jobs::TaskQueue;
use crate::providers::ProviderRegistry;
use crate::storage::Storage;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: TaskQueue,
    pub storage: Storage,
    pub providers: Arc<ProviderRegistry>,
    pub config: Config,
}
