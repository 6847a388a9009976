//! Helpers for tests that need a registry or a bus client.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};

use crate::bus::{BusClient, BusOptions, BusResult, LatestMessages};
use crate::registry::{AssetRegistry, RegistryResult};

/// Registry backed by a fresh in-memory SQLite database with the schema applied.
///
/// The pool is pinned to one connection so every query sees the same database.
pub async fn memory_registry() -> RegistryResult<AssetRegistry> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    let registry = AssetRegistry::new(db);
    registry.create_schema().await?;
    Ok(registry)
}

/// Bus client that is never connected, pointing at a port nothing listens on.
pub fn offline_bus() -> BusResult<(Arc<BusClient>, Arc<LatestMessages>)> {
    let latest = Arc::new(LatestMessages::new());
    let options = BusOptions {
        host: "127.0.0.1".to_string(),
        port: 1,
        ..BusOptions::default()
    };
    let bus = BusClient::new(options, latest.clone())?;
    Ok((Arc::new(bus), latest))
}
