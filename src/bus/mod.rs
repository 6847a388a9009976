//! Message bus: publish/subscribe over the MQTT broker.

mod client;
mod error;
mod handler;
mod message;

pub use client::{BusClient, BusOptions, ConnectionState, PublishOptions};
pub use error::{BusError, BusResult};
pub use handler::{IgnoreMessages, LatestMessages, MessageHandler};
pub use message::{MessageBody, Payload, QoS, ReceivedMessage};
