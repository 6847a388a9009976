use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use paho_mqtt as mqtt;
use tokio::task::JoinHandle;

use super::error::{BusError, BusResult};
use super::handler::{IgnoreMessages, MessageHandler};
use super::message::{Payload, QoS};

/// Messages buffered between the paho callback thread and the delivery task.
const DELIVERY_BUFFER: usize = 256;

/// Where and how to reach the broker.
#[derive(Debug, Clone)]
pub struct BusOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    /// Pause after a successful connect before `connect` returns.
    pub settle_delay: Duration,
}

impl BusOptions {
    #[must_use]
    pub fn server_uri(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: format!("muttley-{}", uuid::Uuid::new_v4()),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    pub retain: bool,
    pub qos: QoS,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            retain: false,
            qos: QoS::AtLeastOnce,
        }
    }
}

/// Connection-scoped publish/subscribe client for the MQTT broker.
///
/// Construct one per connection, share it behind an `Arc`, call
/// [`connect`](Self::connect) at startup and [`disconnect`](Self::disconnect)
/// at shutdown. Incoming messages are handed to the [`MessageHandler`] given
/// at construction, on a background task.
pub struct BusClient {
    client: mqtt::AsyncClient,
    deliveries: mqtt::AsyncReceiver<Option<mqtt::Message>>,
    handler: Arc<dyn MessageHandler>,
    options: BusOptions,
    state: Arc<Mutex<ConnectionState>>,
    delivery_task: Mutex<Option<JoinHandle<()>>>,
}

impl BusClient {
    /// Create a client. Nothing is sent until [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns `BusError::Client` if paho rejects the options.
    pub fn new(options: BusOptions, handler: Arc<dyn MessageHandler>) -> BusResult<Self> {
        let mut client = mqtt::AsyncClient::new(
            mqtt::CreateOptionsBuilder::new()
                .server_uri(options.server_uri())
                .client_id(&options.client_id)
                .finalize(),
        )
        .map_err(BusError::Client)?;

        // Must be set up before connecting or early messages are lost.
        let deliveries = client.get_stream(DELIVERY_BUFFER);

        Ok(Self {
            client,
            deliveries,
            handler,
            options,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            delivery_task: Mutex::new(None),
        })
    }

    /// Client that only publishes; delivered messages are dropped.
    pub fn publisher(options: BusOptions) -> BusResult<Self> {
        Self::new(options, Arc::new(IgnoreMessages))
    }

    #[must_use]
    pub fn options(&self) -> &BusOptions {
        &self.options
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Connect to the broker and start the delivery task.
    ///
    /// Waits for the configured settle delay before returning.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Connect` if the broker cannot be reached; the client
    /// stays `Disconnected` and may be connected again later. `NotConnected`
    /// if the connection drops before the settle delay ends.
    pub async fn connect(&self) -> BusResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let server_uri = self.options.server_uri();
        tracing::info!(
            %server_uri,
            client_id = %self.options.client_id,
            "Connecting to MQTT broker"
        );
        self.set_state(ConnectionState::Connecting);

        let connect_options = mqtt::ConnectOptionsBuilder::new()
            .keep_alive_interval(self.options.keep_alive)
            .connect_timeout(self.options.connect_timeout)
            .clean_session(true)
            .finalize();

        if let Err(e) = self.client.connect(connect_options).await {
            tracing::error!(error = %e, %server_uri, "Failed to connect to MQTT broker");
            self.set_state(ConnectionState::Disconnected);
            return Err(BusError::Connect(e));
        }

        self.start_delivery();
        tokio::time::sleep(self.options.settle_delay).await;
        self.finish_connect(self.client.is_connected())?;

        tracing::info!(%server_uri, "Connected to MQTT broker");
        Ok(())
    }

    /// Publish `message` on `topic`.
    ///
    /// The result mirrors what the broker client reports; nothing is retried.
    ///
    /// # Errors
    ///
    /// `NotConnected` outside the `Connected` state, `Encode` for a JSON value
    /// that cannot be serialized, `Publish` when paho reports a failure.
    pub async fn publish(
        &self,
        topic: &str,
        message: impl Into<Payload>,
        options: PublishOptions,
    ) -> BusResult<()> {
        self.ensure_connected()?;
        let payload = message.into().encode()?;

        let message = mqtt::MessageBuilder::new()
            .topic(topic)
            .payload(payload)
            .qos(options.qos.into())
            .retained(options.retain)
            .finalize();

        tracing::debug!(topic, retain = options.retain, qos = %options.qos, "Publishing message");
        self.client.publish(message).await.map_err(|source| {
            tracing::warn!(error = %source, topic, "Publish failed");
            BusError::Publish {
                topic: topic.to_string(),
                source,
            }
        })
    }

    /// Publish with `retain` set, so the broker keeps it for late subscribers.
    pub async fn publish_durable(
        &self,
        topic: &str,
        message: impl Into<Payload>,
        qos: QoS,
    ) -> BusResult<()> {
        self.publish(topic, message, PublishOptions { retain: true, qos })
            .await
    }

    /// Ask the broker for future messages on `topic`.
    ///
    /// Matching messages reach the handler on the delivery task.
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> BusResult<()> {
        self.ensure_connected()?;

        self.client
            .subscribe(topic, qos.into())
            .await
            .map_err(|source| BusError::Subscribe {
                topic: topic.to_string(),
                source,
            })?;

        tracing::info!(topic, %qos, "Subscribed");
        Ok(())
    }

    /// Stop the delivery task and close the connection. Never fails.
    pub async fn disconnect(&self) {
        let task = self
            .delivery_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }

        if self.client.is_connected() {
            if let Err(e) = self.client.disconnect(None).await {
                tracing::debug!(error = %e, "Broker disconnect reported an error");
            }
            tracing::info!("Disconnected from MQTT broker");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Settle the state after the connect delay.
    ///
    /// The delivery task may have seen the connection drop in the meantime;
    /// that `Disconnected` must not be overwritten.
    fn finish_connect(&self, still_connected: bool) -> BusResult<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if still_connected && *state == ConnectionState::Connecting {
            *state = ConnectionState::Connected;
            Ok(())
        } else {
            *state = ConnectionState::Disconnected;
            tracing::warn!("MQTT connection lost while settling");
            Err(BusError::NotConnected)
        }
    }

    fn ensure_connected(&self) -> BusResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BusError::NotConnected)
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn start_delivery(&self) {
        let mut slot = self
            .delivery_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        *slot = Some(tokio::spawn(deliver(
            self.deliveries.clone(),
            Arc::clone(&self.handler),
            Arc::clone(&self.state),
        )));
    }
}

async fn deliver(
    deliveries: mqtt::AsyncReceiver<Option<mqtt::Message>>,
    handler: Arc<dyn MessageHandler>,
    state: Arc<Mutex<ConnectionState>>,
) {
    tracing::debug!("Delivery loop started");

    while let Ok(next) = deliveries.recv().await {
        match next {
            Some(message) => {
                let qos = QoS::try_from(message.qos()).unwrap_or_default();
                handler.on_message(message.topic(), message.payload(), qos, message.retained());
            }
            // paho signals a dropped connection with `None`.
            None => {
                tracing::warn!("Lost connection to MQTT broker");
                *state.lock().unwrap_or_else(PoisonError::into_inner) =
                    ConnectionState::Disconnected;
            }
        }
    }

    tracing::debug!("Delivery loop stopped");
}

impl Debug for BusClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusClient")
            .field("server_uri", &self.options.server_uri())
            .field("client_id", &self.options.client_id)
            .field("state", &self.state())
            .finish()
    }
}
