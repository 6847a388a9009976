use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::registry::{BuzzerLocation, Coordinate, find_near};
use crate::routes::{AssetSelector, resolve_asset};

use super::assets::CreatedResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBuzzerRequest {
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    /// Asset to bind the new buzzer to
    pub asset_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RebindRequest {
    /// Asset id or asset name
    #[schema(value_type = Object)]
    pub asset: AssetSelector,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NearQuery {
    /// Clicked latitude
    pub lat: f64,
    /// Clicked longitude
    pub lon: f64,
}

/// List buzzers bound to an asset, at the asset's coordinates
#[utoipa::path(
    get,
    path = "/api/buzzers",
    responses(
        (status = 200, description = "Bound buzzers retrieved successfully", body = Vec<BuzzerLocation>),
    ),
    tag = "buzzers"
)]
pub async fn list_buzzers(State(state): State<AppState>) -> AppResult<Json<Vec<BuzzerLocation>>> {
    let locations = state.registry.list_buzzers_with_assets().await?;
    Ok(Json(locations.into_values().collect()))
}

/// Find the bound buzzer at a clicked map position
#[utoipa::path(
    get,
    path = "/api/buzzers/near",
    params(NearQuery),
    responses(
        (status = 200, description = "Buzzer found within tolerance", body = BuzzerLocation),
        (status = 400, description = "Coordinates are not finite numbers"),
        (status = 404, description = "Nothing near that position"),
    ),
    tag = "buzzers"
)]
pub async fn find_buzzer_near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> AppResult<Json<BuzzerLocation>> {
    if !query.lat.is_finite() || !query.lon.is_finite() {
        return Err(AppError::BadRequest("lat and lon must be finite".to_string()));
    }

    let locations = state.registry.list_buzzers_with_assets().await?;

    find_near(locations.values(), query.lat, query.lon)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Buzzer near ({}, {})", query.lat, query.lon)))
}

/// Register a new buzzer
#[utoipa::path(
    post,
    path = "/api/buzzers",
    request_body = CreateBuzzerRequest,
    responses(
        (status = 201, description = "Buzzer created", body = CreatedResponse),
        (status = 409, description = "Asset unknown or already has a buzzer"),
    ),
    tag = "buzzers"
)]
pub async fn create_buzzer(
    State(state): State<AppState>,
    Json(body): Json<CreateBuzzerRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .registry
        .insert_buzzer(body.latitude, body.longitude, body.asset_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Bind a buzzer to an asset, taking the asset away from any other buzzer
#[utoipa::path(
    put,
    path = "/api/buzzers/{buzzer_id}/asset",
    params(("buzzer_id" = i32, Path, description = "Buzzer id")),
    request_body = RebindRequest,
    responses(
        (status = 204, description = "Buzzer rebound"),
        (status = 404, description = "Buzzer or asset not found"),
    ),
    tag = "buzzers"
)]
pub async fn rebind_buzzer(
    State(state): State<AppState>,
    Path(buzzer_id): Path<i32>,
    Json(body): Json<RebindRequest>,
) -> AppResult<StatusCode> {
    let asset = resolve_asset(&state.registry, &body.asset).await?;
    state.registry.rebind_buzzer(buzzer_id, asset.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Clear a buzzer's asset binding
#[utoipa::path(
    delete,
    path = "/api/buzzers/{buzzer_id}/asset",
    params(("buzzer_id" = i32, Path, description = "Buzzer id")),
    responses(
        (status = 204, description = "Buzzer unbound"),
        (status = 404, description = "Buzzer not found"),
    ),
    tag = "buzzers"
)]
pub async fn unbind_buzzer(
    State(state): State<AppState>,
    Path(buzzer_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.registry.unbind_buzzer(buzzer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a buzzer
#[utoipa::path(
    delete,
    path = "/api/buzzers/{buzzer_id}",
    params(("buzzer_id" = i32, Path, description = "Buzzer id")),
    responses(
        (status = 204, description = "Buzzer deleted"),
        (status = 404, description = "Buzzer not found"),
    ),
    tag = "buzzers"
)]
pub async fn delete_buzzer(
    State(state): State<AppState>,
    Path(buzzer_id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.registry.delete_buzzer(buzzer_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Buzzer {buzzer_id}")))
    }
}
