//! Asset activation over the message bus.
//!
//! Consumers listen on `assets/<asset-name>` and expect the literal payloads
//! `"True"` and `"False"`, not JSON booleans.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::bus::{BusClient, BusError, MessageBody, PublishOptions};
use crate::registry::BuzzerLocation;

pub const ASSET_TOPIC_PREFIX: &str = "assets";

/// Topic carrying the activation state of `asset_name`.
#[must_use]
pub fn asset_topic(asset_name: &str) -> String {
    format!("{ASSET_TOPIC_PREFIX}/{asset_name}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Active,
    Inactive,
}

impl ActivationState {
    #[must_use]
    pub fn from_active(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// Wire payload understood by the buzzer consumers.
    #[must_use]
    pub fn as_payload(self) -> &'static str {
        match self {
            Self::Active => "True",
            Self::Inactive => "False",
        }
    }

    /// Read a state back from a received message. Only the exact texts count.
    #[must_use]
    pub fn from_message(body: &MessageBody) -> Option<Self> {
        match body.as_text()? {
            "True" => Some(Self::Active),
            "False" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_payload())
    }
}

/// Outcome of activating several assets at once.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActivationReport {
    /// Assets whose message was accepted by the broker client
    pub published: Vec<String>,
    /// Assets whose publish failed
    pub failed: Vec<String>,
}

/// Publishes activation state changes for assets.
#[derive(Debug, Clone)]
pub struct Activator {
    bus: Arc<BusClient>,
}

impl Activator {
    #[must_use]
    pub fn new(bus: Arc<BusClient>) -> Self {
        Self { bus }
    }

    /// Publish `state` for a single asset.
    pub async fn set_asset(&self, asset_name: &str, state: ActivationState) -> Result<(), BusError> {
        let topic = asset_topic(asset_name);
        self.bus
            .publish(&topic, state.as_payload(), PublishOptions::default())
            .await?;
        tracing::info!(asset = asset_name, state = %state, "Activation published");
        Ok(())
    }

    /// Publish `state` for every location, continuing past failures.
    pub async fn set_all<'a, I>(&self, locations: I, state: ActivationState) -> ActivationReport
    where
        I: IntoIterator<Item = &'a BuzzerLocation>,
    {
        let mut report = ActivationReport::default();
        for location in locations {
            match self.set_asset(&location.name, state).await {
                Ok(()) => report.published.push(location.name.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, asset = %location.name, "Activation failed");
                    report.failed.push(location.name.clone());
                }
            }
        }
        report
    }
}

/// Frame counts reported by a detection process for one asset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DetectionTally {
    pub frames_with_detections: u64,
    pub frames_without_detections: u64,
}

impl DetectionTally {
    /// Count one frame and return the activation state it calls for.
    pub fn record(&mut self, detections: u32) -> ActivationState {
        if detections > 0 {
            self.frames_with_detections += 1;
            ActivationState::Active
        } else {
            self.frames_without_detections += 1;
            ActivationState::Inactive
        }
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames_with_detections + self.frames_without_detections
    }

    /// Share of frames with at least one detection, `None` before any frame.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn detection_rate(&self) -> Option<f64> {
        let frames = self.frames();
        if frames == 0 {
            return None;
        }
        Some(self.frames_with_detections as f64 / frames as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_uses_asset_name_verbatim() {
        assert_eq!(asset_topic("Granel Química"), "assets/Granel Química");
    }

    #[test]
    fn payloads_are_python_style_literals() {
        assert_eq!(ActivationState::Active.as_payload(), "True");
        assert_eq!(ActivationState::Inactive.as_payload(), "False");
        assert_eq!(ActivationState::from_active(true), ActivationState::Active);
    }

    #[test]
    fn only_exact_literals_parse_back() {
        let decoded = |raw: &[u8]| ActivationState::from_message(&MessageBody::decode(raw));
        assert_eq!(decoded(b"True"), Some(ActivationState::Active));
        assert_eq!(decoded(b"False"), Some(ActivationState::Inactive));
        // JSON booleans are a different contract.
        assert_eq!(decoded(b"true"), None);
        assert_eq!(decoded(b"yes"), None);
    }

    #[test]
    fn tally_tracks_frames_and_rate() {
        let mut tally = DetectionTally::default();
        assert_eq!(tally.detection_rate(), None);

        assert_eq!(tally.record(2), ActivationState::Active);
        assert_eq!(tally.record(0), ActivationState::Inactive);
        assert_eq!(tally.record(0), ActivationState::Inactive);
        assert_eq!(tally.record(1), ActivationState::Active);

        assert_eq!(tally.frames(), 4);
        assert_eq!(tally.frames_with_detections, 2);
        assert_eq!(tally.detection_rate(), Some(0.5));
    }
}
