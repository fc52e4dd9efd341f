//! MQTT v5 client adapter: turns broker publishes into [`InboundMessage`]s.
//!
//! [`InboundMessage`]: explorer_api::InboundMessage

mod backoff;
mod client;
pub mod error;
mod properties;
mod status;
mod url;

pub use backoff::Backoff;
pub use client::{MqttSourceConfig, inbound_from_publish, spawn_mqtt_source};
pub use error::SourceError;
pub use properties::map_publish_properties;
pub use status::{ConnectionStatus, StatusReceiver, idle_status};
pub use url::{BrokerAddress, DEFAULT_PORT, DEFAULT_TLS_PORT, parse_broker_url};
