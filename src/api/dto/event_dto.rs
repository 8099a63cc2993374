//! Event publishing and connection DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ConnectionId, EventKind};

/// Request body for `POST /events`.
///
/// Same shape as the frames viewers receive.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishEventRequest {
    /// Event kind: `ResourceUpdate`, `Metrics` or `Log`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary JSON payload relayed verbatim.
    #[schema(value_type = Object)]
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Response body for `POST /events` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishEventResponse {
    /// Always `"accepted"`: delivery is fire-and-forget.
    pub status: String,
    /// Kind the event was published as.
    #[serde(rename = "type")]
    pub kind: EventKind,
}

/// Response body for `GET /connections`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionCountResponse {
    /// Number of registered viewer connections.
    pub count: usize,
    /// Ids of the registered connections, in no particular order.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<ConnectionId>,
}

impl From<Vec<ConnectionId>> for ConnectionCountResponse {
    fn from(ids: Vec<ConnectionId>) -> Self {
        Self {
            count: ids.len(),
            ids,
        }
    }
}
