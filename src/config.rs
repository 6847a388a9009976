use std::env;
use std::time::Duration;

use crate::bus::BusOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // MQTT broker
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_keepalive_seconds: u64,
    pub mqtt_connect_timeout_seconds: u64,
    pub mqtt_settle_millis: u64,
    pub mqtt_subscribe_topic: String,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is set but blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is set but blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = string_or("DATABASE_URL", "sqlite://monitoring.db?mode=rwc");
        if database_url.trim().is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            // Database
            database_url,

            // MQTT broker
            mqtt_host: string_or("MQTT_HOST", "localhost"),
            mqtt_port: parse_or(lookup("MQTT_PORT"), 1883),
            mqtt_client_id: lookup("MQTT_CLIENT_ID")
                .unwrap_or_else(|| format!("muttley-{}", uuid::Uuid::new_v4())),
            mqtt_keepalive_seconds: parse_or(lookup("MQTT_KEEPALIVE_SECONDS"), 60),
            mqtt_connect_timeout_seconds: parse_or(lookup("MQTT_CONNECT_TIMEOUT_SECONDS"), 10),
            mqtt_settle_millis: parse_or(lookup("MQTT_SETTLE_MILLIS"), 500),
            mqtt_subscribe_topic: string_or("MQTT_SUBSCRIBE_TOPIC", "assets/#"),

            // API settings
            api_host: string_or("API_HOST", "0.0.0.0"),
            api_port: parse_or(lookup("API_PORT"), 3000),

            // Application metadata
            deployment: Deployment::from_str(&string_or("DEPLOYMENT", "local")),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    #[must_use]
    pub fn bus_options(&self) -> BusOptions {
        BusOptions {
            host: self.mqtt_host.clone(),
            port: self.mqtt_port,
            client_id: self.mqtt_client_id.clone(),
            keep_alive: Duration::from_secs(self.mqtt_keepalive_seconds),
            connect_timeout: Duration::from_secs(self.mqtt_connect_timeout_seconds),
            settle_delay: Duration::from_millis(self.mqtt_settle_millis),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
