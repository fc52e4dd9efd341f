use serde::{Deserialize, Serialize};

use crate::Qos;

/// Saved broker connection settings. Opaque to the indexing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: String,
    pub name: String,
    /// `mqtt://host[:port]`, `mqtts://host[:port]` or bare `host[:port]`.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_start: Option<bool>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_expiry: Option<u32>,
}

impl ConnectionProfile {
    /// Profile with a fresh v4 UUID and no optional settings.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            client_id: None,
            username: None,
            password: None,
            keepalive: None,
            clean_start: None,
            session_expiry: None,
        }
    }
}

/// One topic filter to subscribe to after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// e.g. `#`, `sensors/#`.
    pub filter: String,
    #[serde(default)]
    pub qos: Qos,
}

impl Default for SubscriptionSpec {
    fn default() -> Self {
        Self {
            filter: "#".into(),
            qos: Qos::AtMostOnce,
        }
    }
}

/// `mqttui_` followed by eight hex digits of a v4 UUID.
pub fn generate_client_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("mqttui_{}", &uuid[..8])
}
