//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::RelayConfig;
use crate::db::PassportStore;
use crate::service::PassportService;
use crate::shopify::MetafieldClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The pool is established once at startup and
/// handed in here; the service gets its dependencies injected rather than
/// reaching for globals, so "not yet connected" is a state `main` deals
/// with before any request is served.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,
    pool: PgPool,
    service: PassportService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: RelayConfig, pool: PgPool) -> Self {
        let store = PassportStore::new(pool.clone());
        let remote = MetafieldClient::new(&config.shopify);
        let service = PassportService::new(store, remote);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                service,
            }),
        }
    }

    /// Get a reference to the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the passport service.
    #[must_use]
    pub fn service(&self) -> &PassportService {
        &self.inner.service
    }
}
