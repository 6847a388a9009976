use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::asset_cameras::Entity")]
    AssetCameras,
    #[sea_orm(has_one = "super::buzzers::Entity")]
    Buzzer,
}

impl Related<super::asset_cameras::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetCameras.def()
    }
}

impl Related<super::buzzers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buzzer.def()
    }
}

impl Related<super::cameras::Entity> for Entity {
    fn to() -> RelationDef {
        super::asset_cameras::Relation::Camera.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::asset_cameras::Relation::Asset.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
