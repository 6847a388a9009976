use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::common::AppState;
use crate::error::{AppError, AppResult};

use super::assets::{CreatedResponse, PlaceRequest};

/// Register a new camera
#[utoipa::path(
    post,
    path = "/api/cameras",
    request_body = PlaceRequest,
    responses(
        (status = 201, description = "Camera created", body = CreatedResponse),
        (status = 409, description = "Name missing"),
    ),
    tag = "cameras"
)]
pub async fn create_camera(
    State(state): State<AppState>,
    Json(body): Json<PlaceRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .registry
        .insert_camera(&body.name, body.latitude, body.longitude)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Delete a camera and its asset links
#[utoipa::path(
    delete,
    path = "/api/cameras/{camera_id}",
    params(("camera_id" = i32, Path, description = "Camera id")),
    responses(
        (status = 204, description = "Camera deleted"),
        (status = 404, description = "Camera not found"),
    ),
    tag = "cameras"
)]
pub async fn delete_camera(
    State(state): State<AppState>,
    Path(camera_id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.registry.delete_camera(camera_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Camera {camera_id}")))
    }
}
