use std::sync::Arc;

use sea_orm::Database;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muttley::bus::{BusClient, LatestMessages, QoS};
use muttley::common::AppState;
use muttley::config::{Config, Deployment};
use muttley::registry::AssetRegistry;
use muttley::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so RUST_LOG from .env applies (fail-fast)
    let config = Config::from_env()?;

    // Initialize tracing; JSON lines in production
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,muttley=debug".into());
    if config.deployment == Deployment::Prod {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting muttley...");
    tracing::info!(
        deployment = ?config.deployment,
        host = %config.api_host,
        port = config.api_port,
        broker = %config.bus_options().server_uri(),
        "Configuration loaded"
    );

    // Connect to database (fail-fast)
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connection established");

    let registry = AssetRegistry::new(db);
    tracing::info!("Ensuring registry schema...");
    registry.create_schema().await?;

    // The broker may come up later; registry endpoints work without it.
    let latest_messages = Arc::new(LatestMessages::new());
    let bus = Arc::new(BusClient::new(config.bus_options(), latest_messages.clone())?);
    match bus.connect().await {
        Ok(()) => {
            if let Err(e) = bus
                .subscribe(&config.mqtt_subscribe_topic, QoS::AtLeastOnce)
                .await
            {
                tracing::error!(error = %e, "Failed to subscribe to activation topics");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "MQTT broker unreachable, activation endpoints will return 503");
        }
    }

    let state = AppState::new(registry, Arc::clone(&bus), latest_messages, config.clone());

    // Build router
    let app = routes::build_router(state);

    // Start server with graceful shutdown
    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    bus.disconnect().await;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
