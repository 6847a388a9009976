use serde::Serialize;
use utoipa::ToSchema;

use crate::entity::{assets, buzzers, cameras};

/// Tolerance, in degrees on each axis, used to match a map click to a record.
pub const COORDINATE_TOLERANCE: f64 = 0.0005;

/// An asset with every device attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDevices {
    pub asset: assets::Model,
    pub cameras: Vec<cameras::Model>,
    pub buzzer: Option<buzzers::Model>,
}

/// A buzzer currently bound to an asset, placed at the asset's position.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BuzzerLocation {
    /// Buzzer id
    pub id: i32,
    /// Name of the bound asset
    #[serde(rename = "nome")]
    pub name: String,
    /// Asset latitude, `null` when missing or unparsable
    pub lat: Option<f64>,
    /// Asset longitude, `null` when missing or unparsable
    pub lon: Option<f64>,
}

impl BuzzerLocation {
    /// Whether `(lat, lon)` falls within [`COORDINATE_TOLERANCE`] of this record.
    ///
    /// Records with a missing coordinate never match.
    #[must_use]
    pub fn is_near(&self, lat: f64, lon: f64) -> bool {
        match (self.lat, self.lon) {
            (Some(own_lat), Some(own_lon)) => {
                (own_lat - lat).abs() < COORDINATE_TOLERANCE
                    && (own_lon - lon).abs() < COORDINATE_TOLERANCE
            }
            _ => false,
        }
    }
}

/// First location (in iteration order) near `(lat, lon)`.
pub fn find_near<'a, I>(locations: I, lat: f64, lon: f64) -> Option<&'a BuzzerLocation>
where
    I: IntoIterator<Item = &'a BuzzerLocation>,
{
    locations.into_iter().find(|loc| loc.is_near(lat, lon))
}
