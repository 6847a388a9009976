use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// MQTT quality of service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "i32")]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl From<QoS> for i32 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<i32> for QoS {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(other),
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i32::from(*self))
    }
}

/// Outgoing message body.
///
/// `Json` values are serialized before sending; text and bytes go out as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Wire bytes for this payload.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a JSON value cannot be encoded.
    pub fn encode(self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Text(text) => Ok(text.into_bytes()),
            Self::Json(value) => serde_json::to_vec(&value),
            Self::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Decoded body of a received message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Json(serde_json::Value),
    Text(String),
}

impl MessageBody {
    /// Decode as JSON, falling back to (lossy) UTF-8 text.
    #[must_use]
    pub fn decode(payload: &[u8]) -> Self {
        match serde_json::from_slice(payload) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(payload).into_owned()),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Latest message seen on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReceivedMessage {
    #[schema(value_type = Object)]
    pub payload: MessageBody,
    #[schema(value_type = i32)]
    pub qos: QoS,
    pub retain: bool,
    pub received_at: DateTime<Utc>,
}
