//! Event publishing and connection count handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ConnectionCountResponse, PublishEventRequest, PublishEventResponse};
use crate::app_state::AppState;
use crate::domain::{Envelope, EventKind};
use crate::error::{ErrorResponse, HubError};

/// `POST /events`: Publish an event to every connected viewer.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] if `type` is not a known event kind.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Publish an event",
    description = "Broadcasts `{type, payload}` to every viewer connected at the time the hub processes it. Fire-and-forget: a 202 means the event was queued, not delivered.",
    request_body = PublishEventRequest,
    responses(
        (status = 202, description = "Event queued for broadcast", body = PublishEventResponse),
        (status = 400, description = "Unknown event type", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    Json(req): Json<PublishEventRequest>,
) -> Result<impl IntoResponse, HubError> {
    let kind: EventKind = req.kind.parse()?;
    state.hub.publish(Envelope::new(kind, req.payload)).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishEventResponse {
            status: "accepted".to_string(),
            kind,
        }),
    ))
}

/// `GET /connections`: Number of connected viewers.
#[utoipa::path(
    get,
    path = "/api/v1/connections",
    tag = "Events",
    summary = "List connected viewers",
    description = "Reads one registry snapshot: the count and ids of registered connections. The value may trail in-flight registrations.",
    responses(
        (status = 200, description = "Live connections", body = ConnectionCountResponse),
    )
)]
pub async fn connection_count(State(state): State<AppState>) -> impl IntoResponse {
    let ids = state.hub.registry().snapshot().await;
    Json(ConnectionCountResponse::from(ids))
}

/// Event routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(publish_event))
        .route("/connections", get(connection_count))
}
