use std::sync::Arc;

use shotforge_cloud::AssetFetcher;
use shotforge_comfyui::{CorrelationStore, JobDispatcher};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: shotforge_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Workflow template every dispatched batch hydrates from.
    pub template: Arc<serde_json::Value>,
    /// Job dispatcher (hydration, addressing, ComfyUI submission).
    pub dispatcher: Arc<JobDispatcher>,
    /// Volatile correlation store, shared with the dispatcher so the
    /// reconciler can claim entries the dispatcher parked.
    pub correlation: Arc<dyn CorrelationStore>,
    /// Retrying asset fetcher over the configured object store.
    pub fetcher: Arc<AssetFetcher>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<shotforge_events::EventBus>,
}
