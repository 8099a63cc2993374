//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    ConnectionCountResponse, PublishEventRequest, PublishEventResponse, SimulatorListResponse,
    SimulatorStartedResponse,
};
use super::handlers::{events, simulators, system};
use crate::domain::EventKind;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification, served by Swagger UI when the
/// `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "stratus-hub", description = "Real-time WebSocket broadcast hub"),
    paths(
        system::health_handler,
        events::publish_event,
        events::connection_count,
        simulators::start_simulator,
        simulators::stop_simulator,
        simulators::list_simulators,
    ),
    components(schemas(
        EventKind,
        PublishEventRequest,
        PublishEventResponse,
        ConnectionCountResponse,
        SimulatorStartedResponse,
        SimulatorListResponse,
        system::HealthResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Health and status"),
        (name = "Events", description = "Broadcast publishing"),
        (name = "Simulators", description = "Synthetic metrics producers"),
    )
)]
pub struct ApiDoc;
