#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("create MQTT client: {0}")]
    Client(#[source] paho_mqtt::Error),

    #[error("connect to MQTT broker: {0}")]
    Connect(#[source] paho_mqtt::Error),

    #[error("not connected to the MQTT broker")]
    NotConnected,

    #[error("publish to {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: paho_mqtt::Error,
    },

    #[error("subscribe to {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: paho_mqtt::Error,
    },

    #[error("encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type BusResult<T> = Result<T, BusError>;
