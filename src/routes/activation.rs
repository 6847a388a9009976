use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::activation::{ActivationReport, ActivationState, DetectionTally, asset_topic};
use crate::bus::ReceivedMessage;
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::{AssetSelector, resolve_asset};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActivationRequest {
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivationResponse {
    pub asset: String,
    pub topic: String,
    /// Payload sent on the topic, `"True"` or `"False"`
    pub payload: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LatestActivationResponse {
    pub topic: String,
    /// Parsed state, `null` if the latest payload is not `"True"`/`"False"`
    pub active: Option<bool>,
    pub message: ReceivedMessage,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DetectionRequest {
    /// Objects detected in the frame
    pub detections: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DetectionResponse {
    pub asset: String,
    #[serde(flatten)]
    pub tally: DetectionTally,
    pub detection_rate: Option<f64>,
}

impl DetectionResponse {
    fn new(asset: String, tally: DetectionTally) -> Self {
        Self {
            asset,
            detection_rate: tally.detection_rate(),
            tally,
        }
    }
}

/// Activate or deactivate every asset that has a buzzer
#[utoipa::path(
    post,
    path = "/api/activation",
    request_body = ActivationRequest,
    responses(
        (status = 200, description = "Publish attempted for every bound asset", body = ActivationReport),
    ),
    tag = "activation"
)]
pub async fn set_all(
    State(state): State<AppState>,
    Json(body): Json<ActivationRequest>,
) -> AppResult<Json<ActivationReport>> {
    let locations = state.registry.list_buzzers_with_assets().await?;
    let report = state
        .activator
        .set_all(locations.values(), ActivationState::from_active(body.active))
        .await;
    Ok(Json(report))
}

/// Activate or deactivate one asset
#[utoipa::path(
    put,
    path = "/api/activation/{asset_name}",
    params(("asset_name" = String, Path, description = "Asset name")),
    request_body = ActivationRequest,
    responses(
        (status = 200, description = "Activation published", body = ActivationResponse),
        (status = 404, description = "Asset not found"),
        (status = 503, description = "Broker unavailable"),
    ),
    tag = "activation"
)]
pub async fn set_one(
    State(state): State<AppState>,
    Path(asset_name): Path<String>,
    Json(body): Json<ActivationRequest>,
) -> AppResult<Json<ActivationResponse>> {
    let asset = resolve_asset(&state.registry, &AssetSelector::Name(asset_name)).await?;
    let activation = ActivationState::from_active(body.active);

    state.activator.set_asset(&asset.name, activation).await?;

    Ok(Json(ActivationResponse {
        topic: asset_topic(&asset.name),
        asset: asset.name,
        payload: activation.as_payload().to_string(),
    }))
}

/// Latest message received on an asset's activation topic
#[utoipa::path(
    get,
    path = "/api/activation/{asset_name}",
    params(("asset_name" = String, Path, description = "Asset name as used in the topic")),
    responses(
        (status = 200, description = "Latest message", body = LatestActivationResponse),
        (status = 404, description = "Nothing received on that topic"),
    ),
    tag = "activation"
)]
pub async fn latest(
    State(state): State<AppState>,
    Path(asset_name): Path<String>,
) -> AppResult<Json<LatestActivationResponse>> {
    let topic = asset_topic(&asset_name);
    let message = state
        .latest_messages
        .get(&topic)
        .ok_or_else(|| AppError::NotFound(format!("Message on '{topic}'")))?;

    Ok(Json(LatestActivationResponse {
        active: ActivationState::from_message(&message.payload).map(ActivationState::is_active),
        topic,
        message,
    }))
}

/// Report one analysed frame from a detection process
///
/// Any detection activates the asset; an empty frame deactivates it.
#[utoipa::path(
    post,
    path = "/api/detections/{asset_name}",
    params(("asset_name" = String, Path, description = "Asset name")),
    request_body = DetectionRequest,
    responses(
        (status = 200, description = "Frame counted and activation published", body = DetectionResponse),
        (status = 404, description = "Asset not found"),
        (status = 503, description = "Broker unavailable"),
    ),
    tag = "activation"
)]
pub async fn report_detection(
    State(state): State<AppState>,
    Path(asset_name): Path<String>,
    Json(body): Json<DetectionRequest>,
) -> AppResult<Json<DetectionResponse>> {
    let asset = resolve_asset(&state.registry, &AssetSelector::Name(asset_name)).await?;

    let tally = state.record_detection(&asset.name, body.detections);
    let activation = ActivationState::from_active(body.detections > 0);
    state.activator.set_asset(&asset.name, activation).await?;

    Ok(Json(DetectionResponse::new(asset.name, tally)))
}

/// Frame counts reported for an asset so far
#[utoipa::path(
    get,
    path = "/api/detections/{asset_name}",
    params(("asset_name" = String, Path, description = "Asset name")),
    responses(
        (status = 200, description = "Detection statistics", body = DetectionResponse),
        (status = 404, description = "No frames reported for that asset"),
    ),
    tag = "activation"
)]
pub async fn detection_stats(
    State(state): State<AppState>,
    Path(asset_name): Path<String>,
) -> AppResult<Json<DetectionResponse>> {
    let asset = resolve_asset(&state.registry, &AssetSelector::Name(asset_name)).await?;
    let tally = state
        .detection_tally(&asset.name)
        .ok_or_else(|| AppError::NotFound(format!("Detections for '{}'", asset.name)))?;

    Ok(Json(DetectionResponse::new(asset.name, tally)))
}
