pub mod activation;
pub mod assets;
pub mod buzzers;
pub mod cameras;
pub mod health;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::entity::assets as asset_entity;
use crate::error::{AppError, AppResult};
use crate::registry::AssetRegistry;

/// Reference to an asset in a request body: its numeric id or its name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssetSelector {
    Id(i32),
    Name(String),
}

/// Resolve an asset by id, or by name (case-insensitive).
///
/// A name is only ever matched against names, even when it is all digits.
pub async fn resolve_asset(
    registry: &AssetRegistry,
    selector: &AssetSelector,
) -> AppResult<asset_entity::Model> {
    match selector {
        AssetSelector::Id(id) => registry
            .find_asset(*id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset '{id}'"))),
        AssetSelector::Name(name) => registry
            .find_asset_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset '{name}'"))),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        assets::list_assets,
        assets::create_asset,
        assets::delete_asset,
        assets::link_camera,
        assets::unlink_camera,
        cameras::create_camera,
        cameras::delete_camera,
        buzzers::list_buzzers,
        buzzers::find_buzzer_near,
        buzzers::create_buzzer,
        buzzers::rebind_buzzer,
        buzzers::unbind_buzzer,
        buzzers::delete_buzzer,
        activation::set_all,
        activation::set_one,
        activation::latest,
        activation::report_detection,
        activation::detection_stats,
    ),
    components(
        schemas(
            health::HealthResponse,
            assets::AssetResponse,
            assets::CameraResponse,
            assets::BuzzerResponse,
            assets::PlaceRequest,
            assets::CreatedResponse,
            buzzers::CreateBuzzerRequest,
            buzzers::RebindRequest,
            crate::registry::BuzzerLocation,
            activation::ActivationRequest,
            activation::ActivationResponse,
            activation::LatestActivationResponse,
            activation::DetectionRequest,
            activation::DetectionResponse,
            crate::activation::ActivationReport,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "assets", description = "Monitored assets and their camera links"),
        (name = "cameras", description = "Video sources"),
        (name = "buzzers", description = "Alert devices and their asset binding"),
        (name = "activation", description = "Buzzer activation over MQTT"),
    ),
    info(
        title = "Muttley API",
        description = "Port asset registry and buzzer activation",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let registry_routes = Router::new()
        .route("/assets", get(assets::list_assets).post(assets::create_asset))
        .route("/assets/{asset_id}", delete(assets::delete_asset))
        .route(
            "/assets/{asset_id}/cameras/{camera_id}",
            put(assets::link_camera).delete(assets::unlink_camera),
        )
        .route("/cameras", post(cameras::create_camera))
        .route("/cameras/{camera_id}", delete(cameras::delete_camera))
        .route("/buzzers", get(buzzers::list_buzzers).post(buzzers::create_buzzer))
        .route("/buzzers/near", get(buzzers::find_buzzer_near))
        .route("/buzzers/{buzzer_id}", delete(buzzers::delete_buzzer))
        .route(
            "/buzzers/{buzzer_id}/asset",
            put(buzzers::rebind_buzzer).delete(buzzers::unbind_buzzer),
        );

    let activation_routes = Router::new()
        .route("/activation", post(activation::set_all))
        .route(
            "/activation/{asset_name}",
            get(activation::latest).put(activation::set_one),
        )
        .route(
            "/detections/{asset_name}",
            get(activation::detection_stats).post(activation::report_detection),
        );

    let api_routes = Router::new()
        .merge(registry_routes)
        .merge(activation_routes)
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
