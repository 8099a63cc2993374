//! Metrics simulator handlers: start, stop, list.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{SimulatorListResponse, SimulatorStartedResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, HubError};

/// `POST /simulators/{service_id}`: Start sampling a service.
#[utoipa::path(
    post,
    path = "/api/v1/simulators/{service_id}",
    tag = "Simulators",
    summary = "Start a metrics simulator",
    description = "Publishes a synthetic Metrics event for the service on every tick. Restarts the simulator if one is already running.",
    params(
        ("service_id" = String, Path, description = "Service identifier"),
    ),
    responses(
        (status = 202, description = "Simulator running", body = SimulatorStartedResponse),
    )
)]
pub async fn start_simulator(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    state.simulator.start(&service_id).await;
    (
        StatusCode::ACCEPTED,
        Json(SimulatorStartedResponse {
            service_id,
            interval_secs: state.simulator.interval().as_secs(),
        }),
    )
}

/// `DELETE /simulators/{service_id}`: Stop sampling a service.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if no simulator runs for the service.
#[utoipa::path(
    delete,
    path = "/api/v1/simulators/{service_id}",
    tag = "Simulators",
    summary = "Stop a metrics simulator",
    params(
        ("service_id" = String, Path, description = "Service identifier"),
    ),
    responses(
        (status = 204, description = "Simulator stopped"),
        (status = 404, description = "No simulator for this service", body = ErrorResponse),
    )
)]
pub async fn stop_simulator(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, HubError> {
    if state.simulator.stop(&service_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HubError::NotFound(format!("simulator for service {service_id}")))
    }
}

/// `GET /simulators`: List running simulators.
#[utoipa::path(
    get,
    path = "/api/v1/simulators",
    tag = "Simulators",
    summary = "List metrics simulators",
    responses(
        (status = 200, description = "Running simulators", body = SimulatorListResponse),
    )
)]
pub async fn list_simulators(State(state): State<AppState>) -> impl IntoResponse {
    Json(SimulatorListResponse {
        services: state.simulator.running().await,
    })
}

/// Simulator routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/simulators", get(list_simulators))
        .route(
            "/simulators/{service_id}",
            post(start_simulator).delete(stop_simulator),
        )
}
