//! sea-orm entities for the asset registry tables.

pub mod asset_cameras;
pub mod assets;
pub mod buzzers;
pub mod cameras;
