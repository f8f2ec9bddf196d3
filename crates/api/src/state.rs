use std::sync::Arc;

use boltzq_db::store::JobStore;
use boltzq_worker::dispatcher::Dispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all axum handlers via
/// `State<AppState>`. Cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// Durable job storage (PostgreSQL in production, in-memory in tests).
    pub store: Arc<dyn JobStore>,
    /// Producer handle of the execution queue.
    pub dispatcher: Dispatcher,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
