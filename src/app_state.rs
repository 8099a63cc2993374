//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::hub::Hub;
use crate::service::MetricsSimulator;
use crate::ws::{ConnectionSettings, OriginAllowList};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast hub handle.
    pub hub: Hub,
    /// Built-in metrics producer.
    pub simulator: Arc<MetricsSimulator>,
    /// Timing applied to every new WebSocket connection.
    pub connection_settings: ConnectionSettings,
    /// Origins allowed to open a WebSocket.
    pub allowed_origins: Arc<OriginAllowList>,
    /// Upgraded WebSocket connections still running their pumps.
    pub connections: TaskTracker,
}
