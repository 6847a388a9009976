//! Asset registry tests against an in-memory SQLite database.
//!
//! Run with: cargo test --test registry_test

use std::collections::HashMap;

use futures::TryStreamExt;
use muttley::entity::{asset_cameras, buzzers, cameras};
use muttley::registry::{AssetDevices, AssetRegistry, RegistryError};
use muttley::test_utils::memory_registry;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

async fn registry() -> AssetRegistry {
    memory_registry().await.expect("in-memory registry")
}

async fn all_buzzers(registry: &AssetRegistry) -> Vec<buzzers::Model> {
    buzzers::Entity::find()
        .all(registry.connection())
        .await
        .unwrap()
}

async fn collect_devices(registry: &AssetRegistry) -> Vec<AssetDevices> {
    registry
        .list_assets_with_devices()
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

/// No asset is referenced by more than one buzzer.
async fn assert_one_to_one(registry: &AssetRegistry) {
    let mut seen: HashMap<i32, i32> = HashMap::new();
    for buzzer in all_buzzers(registry).await {
        if let Some(asset_id) = buzzer.asset_id {
            if let Some(other) = seen.insert(asset_id, buzzer.id) {
                panic!("asset {asset_id} bound to buzzers {other} and {}", buzzer.id);
            }
        }
    }
}

#[tokio::test]
async fn create_schema_is_idempotent() {
    let registry = registry().await;
    registry.create_schema().await.unwrap();
    registry.create_schema().await.unwrap();

    let id = registry.insert_asset("EMAP", "-2.578183", "-44.36666").await.unwrap();
    registry.create_schema().await.unwrap();
    assert!(registry.find_asset(id).await.unwrap().is_some());
}

#[tokio::test]
async fn coordinates_are_stored_as_exact_text() {
    let registry = registry().await;
    let id = registry
        .insert_asset("Granel Química", "-2.573947", "-44.3655073")
        .await
        .unwrap();

    let asset = registry.find_asset(id).await.unwrap().unwrap();
    assert_eq!(asset.name, "Granel Química");
    assert_eq!(asset.latitude.as_deref(), Some("-2.573947"));
    assert_eq!(asset.longitude.as_deref(), Some("-44.3655073"));

    let camera_id = registry
        .insert_camera("Cam Terminal de Cobre", -2.570986_f64, -44.365199_f64)
        .await
        .unwrap();
    let camera = cameras::Entity::find_by_id(camera_id)
        .one(registry.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(camera.latitude.as_deref(), Some("-2.570986"));
    assert_eq!(camera.longitude.as_deref(), Some("-44.365199"));
}

#[tokio::test]
async fn ids_are_generated() {
    let registry = registry().await;
    let first = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let second = registry.insert_asset("Terminal de Cobre", "2", "2").await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn blank_name_is_a_constraint_violation() {
    let registry = registry().await;

    let err = registry.insert_asset("   ", "1", "1").await.unwrap_err();
    assert!(matches!(err, RegistryError::ConstraintViolation(_)), "{err:?}");

    let err = registry.insert_camera("", "1", "1").await.unwrap_err();
    assert!(matches!(err, RegistryError::ConstraintViolation(_)), "{err:?}");

    assert!(registry.list_assets().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_camera_link_is_rejected() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let camera = registry.insert_camera("Cam EMAP", "1", "1").await.unwrap();

    registry.link_asset_camera(asset, camera).await.unwrap();
    let err = registry.link_asset_camera(asset, camera).await.unwrap_err();
    assert!(matches!(err, RegistryError::ConstraintViolation(_)), "{err:?}");

    let links = asset_cameras::Entity::find()
        .all(registry.connection())
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn link_to_unknown_camera_is_rejected() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();

    let err = registry.link_asset_camera(asset, 42).await.unwrap_err();
    assert!(matches!(err, RegistryError::ConstraintViolation(_)), "{err:?}");
}

#[tokio::test]
async fn cameras_are_many_to_many() {
    let registry = registry().await;
    let emap = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let granel = registry.insert_asset("Granel Química", "2", "2").await.unwrap();
    let shared = registry.insert_camera("Cam Cais", "1", "1").await.unwrap();
    let own = registry.insert_camera("Cam EMAP", "1", "1").await.unwrap();

    registry.link_asset_camera(emap, shared).await.unwrap();
    registry.link_asset_camera(emap, own).await.unwrap();
    registry.link_asset_camera(granel, shared).await.unwrap();

    let devices = collect_devices(&registry).await;
    let camera_ids = |idx: usize| devices[idx].cameras.iter().map(|c| c.id).collect::<Vec<_>>();
    assert_eq!(camera_ids(0), vec![shared, own]);
    assert_eq!(camera_ids(1), vec![shared]);
}

#[tokio::test]
async fn insert_buzzer_on_taken_asset_keeps_existing_binding() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "-2.578183", "-44.36666").await.unwrap();
    let first = registry
        .insert_buzzer("-2.578183", "-44.36666", Some(asset))
        .await
        .unwrap();

    let err = registry
        .insert_buzzer("-2.578183", "-44.36666", Some(asset))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ConstraintViolation(_)), "{err:?}");

    let buzzers_now = all_buzzers(&registry).await;
    assert_eq!(buzzers_now.len(), 1);
    assert_eq!(buzzers_now[0].id, first);
    assert_eq!(buzzers_now[0].asset_id, Some(asset));
}

#[tokio::test]
async fn insert_buzzer_for_unknown_asset_is_rejected() {
    let registry = registry().await;
    let err = registry.insert_buzzer("0", "0", Some(7)).await.unwrap_err();
    assert!(matches!(err, RegistryError::ConstraintViolation(_)), "{err:?}");
}

#[tokio::test]
async fn deleting_asset_unlinks_devices_but_keeps_them() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let cam_a = registry.insert_camera("Cam A", "1", "1").await.unwrap();
    let cam_b = registry.insert_camera("Cam B", "1", "1").await.unwrap();
    registry.link_asset_camera(asset, cam_a).await.unwrap();
    registry.link_asset_camera(asset, cam_b).await.unwrap();
    let buzzer = registry.insert_buzzer("1", "1", Some(asset)).await.unwrap();

    assert!(registry.delete_asset(asset).await.unwrap());

    let remaining_cameras = cameras::Entity::find()
        .all(registry.connection())
        .await
        .unwrap();
    assert_eq!(remaining_cameras.len(), 2);

    let links = asset_cameras::Entity::find()
        .all(registry.connection())
        .await
        .unwrap();
    assert!(links.is_empty());

    let buzzer = registry.find_buzzer(buzzer).await.unwrap().unwrap();
    assert_eq!(buzzer.asset_id, None);

    assert!(!registry.delete_asset(asset).await.unwrap());
}

#[tokio::test]
async fn deleting_camera_removes_only_its_links() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let cam_a = registry.insert_camera("Cam A", "1", "1").await.unwrap();
    let cam_b = registry.insert_camera("Cam B", "1", "1").await.unwrap();
    registry.link_asset_camera(asset, cam_a).await.unwrap();
    registry.link_asset_camera(asset, cam_b).await.unwrap();

    assert!(registry.delete_camera(cam_a).await.unwrap());

    let devices = collect_devices(&registry).await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].cameras.len(), 1);
    assert_eq!(devices[0].cameras[0].id, cam_b);
}

#[tokio::test]
async fn unlink_reports_whether_a_link_existed() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let camera = registry.insert_camera("Cam", "1", "1").await.unwrap();
    registry.link_asset_camera(asset, camera).await.unwrap();

    assert!(registry.unlink_asset_camera(asset, camera).await.unwrap());
    assert!(!registry.unlink_asset_camera(asset, camera).await.unwrap());
}

#[tokio::test]
async fn rebind_moves_buzzer_between_assets() {
    let registry = registry().await;
    let emap = registry.insert_asset("EMAP", "-2.578183", "-44.36666").await.unwrap();
    let granel = registry
        .insert_asset("Granel Química", "-2.573947", "-44.3655073")
        .await
        .unwrap();
    let b1 = registry.insert_buzzer("-2.578183", "-44.36666", None).await.unwrap();

    registry.rebind_buzzer(b1, emap).await.unwrap();
    registry.rebind_buzzer(b1, granel).await.unwrap();

    let located = registry.list_buzzers_with_assets().await.unwrap();
    assert_eq!(located.len(), 1);
    let entry = &located[&b1];
    assert_eq!(entry.id, b1);
    assert_eq!(entry.name, "Granel Química");
    assert_eq!(entry.lat, Some(-2.573947));
    assert_eq!(entry.lon, Some(-44.3655073));

    let devices = collect_devices(&registry).await;
    let emap_devices = devices.iter().find(|d| d.asset.id == emap).unwrap();
    assert!(emap_devices.buzzer.is_none());
}

#[tokio::test]
async fn rebind_takes_asset_from_previous_buzzer() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let old = registry.insert_buzzer("1", "1", Some(asset)).await.unwrap();
    let new = registry.insert_buzzer("1", "1", None).await.unwrap();

    registry.rebind_buzzer(new, asset).await.unwrap();

    assert_eq!(registry.find_buzzer(old).await.unwrap().unwrap().asset_id, None);
    assert_eq!(
        registry.find_buzzer(new).await.unwrap().unwrap().asset_id,
        Some(asset)
    );
    assert_one_to_one(&registry).await;
}

#[tokio::test]
async fn rebind_sequence_keeps_one_to_one_binding() {
    let registry = registry().await;
    let mut assets = Vec::new();
    for name in ["EMAP", "Granel Química", "Terminal de Cobre"] {
        assets.push(registry.insert_asset(name, "1", "1").await.unwrap());
    }
    let mut buzzer_ids = Vec::new();
    for _ in 0..3 {
        buzzer_ids.push(registry.insert_buzzer("1", "1", None).await.unwrap());
    }

    // Expected binding buzzer -> asset, updated alongside the registry.
    let mut expected: HashMap<i32, i32> = HashMap::new();
    let steps = [
        (0, 0),
        (1, 1),
        (2, 2),
        (0, 1),
        (1, 1),
        (2, 0),
        (0, 2),
        (1, 0),
        (2, 2),
        (0, 0),
    ];

    for (b, a) in steps {
        let (buzzer, asset) = (buzzer_ids[b], assets[a]);
        registry.rebind_buzzer(buzzer, asset).await.unwrap();

        expected.retain(|_, bound| *bound != asset);
        expected.insert(buzzer, asset);

        assert_one_to_one(&registry).await;
        let actual: HashMap<i32, i32> = all_buzzers(&registry)
            .await
            .into_iter()
            .filter_map(|bz| bz.asset_id.map(|asset_id| (bz.id, asset_id)))
            .collect();
        assert_eq!(actual, expected, "after rebind({buzzer}, {asset})");
    }
}

#[tokio::test]
async fn failed_rebind_changes_nothing() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let bound = registry.insert_buzzer("1", "1", Some(asset)).await.unwrap();

    let err = registry.rebind_buzzer(999, asset).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)), "{err:?}");

    let err = registry.rebind_buzzer(bound, 999).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)), "{err:?}");

    assert_eq!(
        registry.find_buzzer(bound).await.unwrap().unwrap().asset_id,
        Some(asset)
    );
}

#[tokio::test]
async fn rebind_rolls_back_cleared_binding_when_bind_fails() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let old = registry.insert_buzzer("1", "1", Some(asset)).await.unwrap();
    let new = registry.insert_buzzer("2", "2", None).await.unwrap();

    // Let the clear step through, then fail the bind step.
    registry
        .connection()
        .execute_unprepared(&format!(
            "CREATE TRIGGER refuse_bind BEFORE UPDATE ON buzzers \
             WHEN NEW.id = {new} AND NEW.asset_id IS NOT NULL \
             BEGIN SELECT RAISE(ABORT, 'bind refused'); END"
        ))
        .await
        .unwrap();

    assert!(registry.rebind_buzzer(new, asset).await.is_err());

    assert_eq!(
        registry.find_buzzer(old).await.unwrap().unwrap().asset_id,
        Some(asset)
    );
    assert_eq!(registry.find_buzzer(new).await.unwrap().unwrap().asset_id, None);
    assert_one_to_one(&registry).await;
}

#[tokio::test]
async fn unbind_clears_binding() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    let buzzer = registry.insert_buzzer("1", "1", Some(asset)).await.unwrap();

    registry.unbind_buzzer(buzzer).await.unwrap();
    assert_eq!(registry.find_buzzer(buzzer).await.unwrap().unwrap().asset_id, None);

    let err = registry.unbind_buzzer(404).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn buzzer_listing_skips_unbound_and_tolerates_bad_coordinates() {
    let registry = registry().await;
    let good = registry.insert_asset("EMAP", "-2.578183", "-44.36666").await.unwrap();
    let odd = registry.insert_asset("Sem Coordenada", "", "oeste").await.unwrap();
    let bound_good = registry.insert_buzzer("0", "0", Some(good)).await.unwrap();
    let bound_odd = registry.insert_buzzer("0", "0", Some(odd)).await.unwrap();
    let unbound = registry.insert_buzzer("0", "0", None).await.unwrap();

    let located = registry.list_buzzers_with_assets().await.unwrap();
    assert_eq!(located.keys().copied().collect::<Vec<_>>(), vec![bound_good, bound_odd]);
    assert!(!located.contains_key(&unbound));

    assert_eq!(located[&bound_good].lat, Some(-2.578183));
    assert_eq!(located[&bound_odd].lat, None);
    assert_eq!(located[&bound_odd].lon, None);
    assert_eq!(located[&bound_odd].name, "Sem Coordenada");
}

#[tokio::test]
async fn asset_listing_is_recomputed_on_each_call() {
    let registry = registry().await;
    let emap = registry.insert_asset("EMAP", "1", "1").await.unwrap();

    let before = collect_devices(&registry).await;
    assert_eq!(before.len(), 1);
    assert!(before[0].buzzer.is_none());

    let buzzer = registry.insert_buzzer("1", "1", Some(emap)).await.unwrap();
    registry.insert_asset("Terminal de Cobre", "2", "2").await.unwrap();

    let after = collect_devices(&registry).await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].buzzer.as_ref().map(|b| b.id), Some(buzzer));
    assert!(after[1].cameras.is_empty());
    assert!(after[1].buzzer.is_none());
}

#[tokio::test]
async fn asset_lookup_by_name_ignores_case() {
    let registry = registry().await;
    let id = registry.insert_asset("Terminal de Cobre", "1", "1").await.unwrap();

    let found = registry.find_asset_by_name("terminal DE cobre").await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(id));
    assert!(registry.find_asset_by_name("EMAP").await.unwrap().is_none());
}

#[tokio::test]
async fn asset_lookup_folds_accented_letters() {
    let registry = registry().await;
    let id = registry.insert_asset("Granel Química", "1", "1").await.unwrap();

    let found = registry.find_asset_by_name(" GRANEL QUÍMICA ").await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(id));
}

#[tokio::test]
async fn buzzers_by_asset_filter_uses_unique_binding() {
    let registry = registry().await;
    let asset = registry.insert_asset("EMAP", "1", "1").await.unwrap();
    registry.insert_buzzer("1", "1", Some(asset)).await.unwrap();
    registry.insert_buzzer("2", "2", None).await.unwrap();

    let bound = buzzers::Entity::find()
        .filter(buzzers::Column::AssetId.eq(asset))
        .all(registry.connection())
        .await
        .unwrap();
    assert_eq!(bound.len(), 1);
}
