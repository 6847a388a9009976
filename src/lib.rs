//! Muttley - port asset registry and buzzer activation bus
//!
//! Assets, cameras and buzzers live in the [`registry`]; activation state is
//! published over MQTT through the [`bus`]. The library exposes the core
//! modules for testing and reuse.

pub mod activation;
pub mod bus;
pub mod common;
pub mod config;
pub mod entity;
pub mod error;
pub mod registry;
pub mod routes;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
