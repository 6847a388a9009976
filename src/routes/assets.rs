use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::AppState;
use crate::entity::{buzzers, cameras};
use crate::error::{AppError, AppResult};
use crate::registry::{AssetDevices, Coordinate};

#[derive(Debug, Serialize, ToSchema)]
pub struct CameraResponse {
    pub id: i32,
    pub name: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl From<cameras::Model> for CameraResponse {
    fn from(c: cameras::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzerResponse {
    pub id: i32,
    pub latitude: String,
    pub longitude: String,
    pub asset_id: Option<i32>,
}

impl From<buzzers::Model> for BuzzerResponse {
    fn from(b: buzzers::Model) -> Self {
        Self {
            id: b.id,
            latitude: b.latitude,
            longitude: b.longitude,
            asset_id: b.asset_id,
        }
    }
}

/// Asset with its linked cameras and bound buzzer
#[derive(Debug, Serialize, ToSchema)]
pub struct AssetResponse {
    pub id: i32,
    pub name: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub cameras: Vec<CameraResponse>,
    pub buzzer: Option<BuzzerResponse>,
}

impl From<AssetDevices> for AssetResponse {
    fn from(devices: AssetDevices) -> Self {
        Self {
            id: devices.asset.id,
            name: devices.asset.name,
            latitude: devices.asset.latitude,
            longitude: devices.asset.longitude,
            cameras: devices.cameras.into_iter().map(CameraResponse::from).collect(),
            buzzer: devices.buzzer.map(BuzzerResponse::from),
        }
    }
}

/// Body for creating an asset or a camera
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceRequest {
    pub name: String,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i32,
}

/// List assets with their devices
#[utoipa::path(
    get,
    path = "/api/assets",
    responses(
        (status = 200, description = "Assets retrieved successfully", body = Vec<AssetResponse>),
    ),
    tag = "assets"
)]
pub async fn list_assets(State(state): State<AppState>) -> AppResult<Json<Vec<AssetResponse>>> {
    let devices: Vec<AssetDevices> = state
        .registry
        .list_assets_with_devices()
        .await?
        .try_collect()
        .await?;

    Ok(Json(devices.into_iter().map(AssetResponse::from).collect()))
}

/// Register a new asset
#[utoipa::path(
    post,
    path = "/api/assets",
    request_body = PlaceRequest,
    responses(
        (status = 201, description = "Asset created", body = CreatedResponse),
        (status = 409, description = "Name missing"),
    ),
    tag = "assets"
)]
pub async fn create_asset(
    State(state): State<AppState>,
    Json(body): Json<PlaceRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .registry
        .insert_asset(&body.name, body.latitude, body.longitude)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Delete an asset; its buzzer is unbound and its camera links removed
#[utoipa::path(
    delete,
    path = "/api/assets/{asset_id}",
    params(("asset_id" = i32, Path, description = "Asset id")),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 404, description = "Asset not found"),
    ),
    tag = "assets"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.registry.delete_asset(asset_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Asset {asset_id}")))
    }
}

/// Link a camera to an asset
#[utoipa::path(
    put,
    path = "/api/assets/{asset_id}/cameras/{camera_id}",
    params(
        ("asset_id" = i32, Path, description = "Asset id"),
        ("camera_id" = i32, Path, description = "Camera id"),
    ),
    responses(
        (status = 204, description = "Camera linked"),
        (status = 409, description = "Already linked or unknown id"),
    ),
    tag = "assets"
)]
pub async fn link_camera(
    State(state): State<AppState>,
    Path((asset_id, camera_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.registry.link_asset_camera(asset_id, camera_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a camera link from an asset
#[utoipa::path(
    delete,
    path = "/api/assets/{asset_id}/cameras/{camera_id}",
    params(
        ("asset_id" = i32, Path, description = "Asset id"),
        ("camera_id" = i32, Path, description = "Camera id"),
    ),
    responses(
        (status = 204, description = "Link removed"),
        (status = 404, description = "No such link"),
    ),
    tag = "assets"
)]
pub async fn unlink_camera(
    State(state): State<AppState>,
    Path((asset_id, camera_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    if state.registry.unlink_asset_camera(asset_id, camera_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Link between asset {asset_id} and camera {camera_id}"
        )))
    }
}
