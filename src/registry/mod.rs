//! Asset registry: assets, cameras, buzzers and the links between them.
//!
//! Every write goes through [`AssetRegistry`]. The one-to-one buzzer binding is
//! enforced by the schema (unique nullable foreign key) and kept consistent by
//! [`AssetRegistry::rebind_buzzer`], which runs inside a single transaction.

mod coordinate;
mod error;
mod types;

use std::collections::BTreeMap;

use futures::{Stream, StreamExt, stream};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    NotSet, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

pub use coordinate::Coordinate;
pub use error::{RegistryError, RegistryResult};
pub use types::{AssetDevices, BuzzerLocation, COORDINATE_TOLERANCE, find_near};

use crate::entity::{asset_cameras, assets, buzzers, cameras};

#[derive(Clone)]
pub struct AssetRegistry {
    db: DatabaseConnection,
}

impl AssetRegistry {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the registry tables if they do not exist yet.
    ///
    /// Safe to call on every startup: applied migrations are skipped.
    pub async fn create_schema(&self) -> RegistryResult<()> {
        migration::Migrator::up(&self.db, None).await?;
        tracing::debug!("Registry schema ready");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Assets
    // ---------------------------------------------------------------------

    /// Insert an asset and return its generated id.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` for a blank name, `Storage` if the database fails.
    pub async fn insert_asset(
        &self,
        name: &str,
        latitude: impl Into<Coordinate>,
        longitude: impl Into<Coordinate>,
    ) -> RegistryResult<i32> {
        let name = required_name(name, "asset")?;
        let asset = assets::ActiveModel {
            id: NotSet,
            name: Set(name),
            latitude: Set(Some(latitude.into().into_inner())),
            longitude: Set(Some(longitude.into().into_inner())),
        }
        .insert(&self.db)
        .await?;

        tracing::debug!(id = asset.id, name = %asset.name, "Inserted asset");
        Ok(asset.id)
    }

    pub async fn find_asset(&self, asset_id: i32) -> RegistryResult<Option<assets::Model>> {
        Ok(assets::Entity::find_by_id(asset_id).one(&self.db).await?)
    }

    /// Look an asset up by name, ignoring case.
    ///
    /// Names are folded in Rust since SQLite's `LOWER` only folds ASCII.
    pub async fn find_asset_by_name(&self, name: &str) -> RegistryResult<Option<assets::Model>> {
        let wanted = name.trim().to_lowercase();
        let asset = self
            .list_assets()
            .await?
            .into_iter()
            .find(|asset| asset.name.to_lowercase() == wanted);
        Ok(asset)
    }

    pub async fn list_assets(&self) -> RegistryResult<Vec<assets::Model>> {
        Ok(assets::Entity::find()
            .order_by_asc(assets::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Delete an asset. Its camera links go with it and its buzzer is unbound.
    ///
    /// Returns `false` when no asset had that id.
    pub async fn delete_asset(&self, asset_id: i32) -> RegistryResult<bool> {
        let result = assets::Entity::delete_by_id(asset_id).exec(&self.db).await?;
        tracing::debug!(asset_id, deleted = result.rows_affected, "Deleted asset");
        Ok(result.rows_affected > 0)
    }

    // ---------------------------------------------------------------------
    // Cameras
    // ---------------------------------------------------------------------

    /// Insert a camera and return its generated id.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` for a blank name, `Storage` if the database fails.
    pub async fn insert_camera(
        &self,
        name: &str,
        latitude: impl Into<Coordinate>,
        longitude: impl Into<Coordinate>,
    ) -> RegistryResult<i32> {
        let name = required_name(name, "camera")?;
        let camera = cameras::ActiveModel {
            id: NotSet,
            name: Set(name),
            latitude: Set(Some(latitude.into().into_inner())),
            longitude: Set(Some(longitude.into().into_inner())),
        }
        .insert(&self.db)
        .await?;

        tracing::debug!(id = camera.id, name = %camera.name, "Inserted camera");
        Ok(camera.id)
    }

    pub async fn delete_camera(&self, camera_id: i32) -> RegistryResult<bool> {
        let result = cameras::Entity::delete_by_id(camera_id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Link an asset to a camera.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` if the pair is already linked or either id is unknown.
    pub async fn link_asset_camera(&self, asset_id: i32, camera_id: i32) -> RegistryResult<()> {
        asset_cameras::Entity::insert(asset_cameras::ActiveModel {
            asset_id: Set(asset_id),
            camera_id: Set(camera_id),
        })
        .exec_without_returning(&self.db)
        .await?;

        tracing::debug!(asset_id, camera_id, "Linked camera to asset");
        Ok(())
    }

    pub async fn unlink_asset_camera(&self, asset_id: i32, camera_id: i32) -> RegistryResult<bool> {
        let result = asset_cameras::Entity::delete_by_id((asset_id, camera_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    // ---------------------------------------------------------------------
    // Buzzers
    // ---------------------------------------------------------------------

    /// Insert a buzzer, optionally bound to an asset, and return its id.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` if `asset_id` is unknown or already has a buzzer;
    /// the existing binding is left untouched.
    pub async fn insert_buzzer(
        &self,
        latitude: impl Into<Coordinate>,
        longitude: impl Into<Coordinate>,
        asset_id: Option<i32>,
    ) -> RegistryResult<i32> {
        let buzzer = buzzers::ActiveModel {
            id: NotSet,
            latitude: Set(latitude.into().into_inner()),
            longitude: Set(longitude.into().into_inner()),
            asset_id: Set(asset_id),
        }
        .insert(&self.db)
        .await?;

        tracing::debug!(id = buzzer.id, asset_id = ?buzzer.asset_id, "Inserted buzzer");
        Ok(buzzer.id)
    }

    pub async fn find_buzzer(&self, buzzer_id: i32) -> RegistryResult<Option<buzzers::Model>> {
        Ok(buzzers::Entity::find_by_id(buzzer_id).one(&self.db).await?)
    }

    pub async fn delete_buzzer(&self, buzzer_id: i32) -> RegistryResult<bool> {
        let result = buzzers::Entity::delete_by_id(buzzer_id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Bind `buzzer_id` to `asset_id`, moving the asset away from any other buzzer.
    ///
    /// Both writes share one transaction: on any error nothing is applied, so
    /// no asset ever ends up with two buzzers or silently loses its buzzer.
    ///
    /// # Errors
    ///
    /// `NotFound` if either id is unknown, `Storage` if the database fails.
    pub async fn rebind_buzzer(&self, buzzer_id: i32, asset_id: i32) -> RegistryResult<()> {
        let txn = self.db.begin().await?;

        if assets::Entity::find_by_id(asset_id).one(&txn).await?.is_none() {
            return Err(RegistryError::NotFound(format!("Asset {asset_id}")));
        }
        if buzzers::Entity::find_by_id(buzzer_id).one(&txn).await?.is_none() {
            return Err(RegistryError::NotFound(format!("Buzzer {buzzer_id}")));
        }

        let cleared = buzzers::Entity::update_many()
            .col_expr(buzzers::Column::AssetId, Expr::value(Option::<i32>::None))
            .filter(buzzers::Column::AssetId.eq(asset_id))
            .exec(&txn)
            .await?;

        buzzers::Entity::update_many()
            .col_expr(buzzers::Column::AssetId, Expr::value(asset_id))
            .filter(buzzers::Column::Id.eq(buzzer_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(
            buzzer_id,
            asset_id,
            previous_cleared = cleared.rows_affected,
            "Buzzer rebound"
        );
        Ok(())
    }

    /// Clear a buzzer's asset binding.
    ///
    /// # Errors
    ///
    /// `NotFound` if the buzzer does not exist.
    pub async fn unbind_buzzer(&self, buzzer_id: i32) -> RegistryResult<()> {
        let result = buzzers::Entity::update_many()
            .col_expr(buzzers::Column::AssetId, Expr::value(Option::<i32>::None))
            .filter(buzzers::Column::Id.eq(buzzer_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RegistryError::NotFound(format!("Buzzer {buzzer_id}")));
        }
        tracing::debug!(buzzer_id, "Buzzer unbound");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Composite queries
    // ---------------------------------------------------------------------

    /// Stream every asset with its cameras and buzzer, ordered by asset id.
    ///
    /// Devices are loaded per asset as the stream is polled. Nothing is cached:
    /// calling this again reads the current state.
    pub async fn list_assets_with_devices(
        &self,
    ) -> RegistryResult<impl Stream<Item = RegistryResult<AssetDevices>> + '_> {
        let assets_list = self.list_assets().await?;
        Ok(stream::iter(assets_list).then(move |asset| self.load_devices(asset)))
    }

    async fn load_devices(&self, asset: assets::Model) -> RegistryResult<AssetDevices> {
        let cameras_list = asset
            .find_related(cameras::Entity)
            .order_by_asc(cameras::Column::Id)
            .all(&self.db)
            .await?;

        let buzzer = buzzers::Entity::find()
            .filter(buzzers::Column::AssetId.eq(asset.id))
            .one(&self.db)
            .await?;

        Ok(AssetDevices {
            asset,
            cameras: cameras_list,
            buzzer,
        })
    }

    /// Buzzers bound to an asset, keyed by buzzer id, at the asset's position.
    ///
    /// Unbound buzzers are never included.
    pub async fn list_buzzers_with_assets(&self) -> RegistryResult<BTreeMap<i32, BuzzerLocation>> {
        let rows = buzzers::Entity::find()
            .filter(buzzers::Column::AssetId.is_not_null())
            .find_also_related(assets::Entity)
            .order_by_asc(buzzers::Column::Id)
            .all(&self.db)
            .await?;

        let locations = rows
            .into_iter()
            .filter_map(|(buzzer, asset)| {
                let asset = asset?;
                Some((
                    buzzer.id,
                    BuzzerLocation {
                        id: buzzer.id,
                        name: asset.name,
                        lat: asset.latitude.as_deref().and_then(coordinate::parse_degrees),
                        lon: asset.longitude.as_deref().and_then(coordinate::parse_degrees),
                    },
                ))
            })
            .collect();

        Ok(locations)
    }
}

fn required_name(name: &str, kind: &str) -> RegistryResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::ConstraintViolation(format!(
            "{kind} name is required"
        )));
    }
    Ok(trimmed.to_string())
}
