use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::bus::ConnectionState;
use crate::common::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether the MQTT client is currently connected
    pub broker_connected: bool,
}

/// Health check endpoint
///
/// Always 200 while the process is serving. A broker outage is reported in the
/// body, not as a failure, since the registry endpoints keep working.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        broker_connected: state.bus.state() == ConnectionState::Connected,
    })
}
