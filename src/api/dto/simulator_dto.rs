//! Metrics simulator DTOs.

use serde::Serialize;
use utoipa::ToSchema;

/// Response body for `POST /simulators/{service_id}` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct SimulatorStartedResponse {
    /// Service being sampled.
    pub service_id: String,
    /// Seconds between samples.
    pub interval_secs: u64,
}

/// Response body for `GET /simulators`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SimulatorListResponse {
    /// Service ids with a running simulator, sorted.
    pub services: Vec<String>,
}
