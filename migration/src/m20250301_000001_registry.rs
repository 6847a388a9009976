use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Coordinates are kept as TEXT so the exact digits entered survive.

        // ========== ASSETS ==========
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assets::Name).text().not_null())
                    .col(ColumnDef::new(Assets::Latitude).text())
                    .col(ColumnDef::new(Assets::Longitude).text())
                    .to_owned(),
            )
            .await?;

        // ========== CAMERAS ==========
        manager
            .create_table(
                Table::create()
                    .table(Cameras::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cameras::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cameras::Name).text().not_null())
                    .col(ColumnDef::new(Cameras::Latitude).text())
                    .col(ColumnDef::new(Cameras::Longitude).text())
                    .to_owned(),
            )
            .await?;

        // ========== ASSET_CAMERAS (N:N) ==========
        manager
            .create_table(
                Table::create()
                    .table(AssetCameras::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AssetCameras::AssetId).integer().not_null())
                    .col(ColumnDef::new(AssetCameras::CameraId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(AssetCameras::AssetId)
                            .col(AssetCameras::CameraId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_asset_cameras_asset")
                            .from(AssetCameras::Table, AssetCameras::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_asset_cameras_camera")
                            .from(AssetCameras::Table, AssetCameras::CameraId)
                            .to(Cameras::Table, Cameras::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== BUZZERS (1:1 with assets) ==========
        manager
            .create_table(
                Table::create()
                    .table(Buzzers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Buzzers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Buzzers::Latitude).text().not_null())
                    .col(ColumnDef::new(Buzzers::Longitude).text().not_null())
                    .col(ColumnDef::new(Buzzers::AssetId).integer().unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_buzzers_asset")
                            .from(Buzzers::Table, Buzzers::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Buzzers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(AssetCameras::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Cameras::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Assets {
    Table,
    Id,
    Name,
    Latitude,
    Longitude,
}

#[derive(DeriveIden)]
pub enum Cameras {
    Table,
    Id,
    Name,
    Latitude,
    Longitude,
}

#[derive(DeriveIden)]
enum AssetCameras {
    Table,
    AssetId,
    CameraId,
}

#[derive(DeriveIden)]
enum Buzzers {
    Table,
    Id,
    Latitude,
    Longitude,
    AssetId,
}
