use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;

use super::message::{MessageBody, QoS, ReceivedMessage};

/// Receives every message delivered by a [`BusClient`](super::BusClient).
///
/// Called on the client's background delivery task, never on the thread that
/// called `subscribe`. Implementations synchronize their own state.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool);
}

/// Handler that drops every message, for publish-only clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreMessages;

impl MessageHandler for IgnoreMessages {
    fn on_message(&self, topic: &str, _payload: &[u8], _qos: QoS, _retain: bool) {
        tracing::trace!(topic, "Ignoring delivered message");
    }
}

/// Keeps the most recent message per topic. Older messages are overwritten.
#[derive(Debug, Default)]
pub struct LatestMessages {
    by_topic: RwLock<HashMap<String, ReceivedMessage>>,
}

impl LatestMessages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest message received on `topic`, if any.
    #[must_use]
    pub fn get(&self, topic: &str) -> Option<ReceivedMessage> {
        self.by_topic
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
    }

    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .by_topic
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        topics.sort();
        topics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_topic
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, topic: &str, message: ReceivedMessage) {
        self.by_topic
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.to_string(), message);
    }
}

impl MessageHandler for LatestMessages {
    fn on_message(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) {
        let payload = MessageBody::decode(payload);
        tracing::debug!(topic, %qos, retain, payload = ?payload, "Message received");

        self.store(
            topic,
            ReceivedMessage {
                payload,
                qos,
                retain,
                received_at: Utc::now(),
            },
        );
    }
}
