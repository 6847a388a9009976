use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::activation::{Activator, DetectionTally};
use crate::bus::{BusClient, LatestMessages};
use crate::config::Config;
use crate::registry::AssetRegistry;

/// Detection frame counts per asset name.
pub type DetectionTallies = Arc<Mutex<HashMap<String, DetectionTally>>>;

#[derive(Clone)]
pub struct AppState {
    pub registry: AssetRegistry,
    pub bus: Arc<BusClient>,
    pub latest_messages: Arc<LatestMessages>,
    pub activator: Activator,
    pub detections: DetectionTallies,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        registry: AssetRegistry,
        bus: Arc<BusClient>,
        latest_messages: Arc<LatestMessages>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            activator: Activator::new(Arc::clone(&bus)),
            bus,
            latest_messages,
            detections: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Count one detection frame for `asset_name` and return the updated tally.
    pub fn record_detection(&self, asset_name: &str, detections: u32) -> DetectionTally {
        let mut tallies = self
            .detections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let tally = tallies.entry(asset_name.to_string()).or_default();
        tally.record(detections);
        *tally
    }

    #[must_use]
    pub fn detection_tally(&self, asset_name: &str) -> Option<DetectionTally> {
        self.detections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(asset_name)
            .copied()
    }
}
