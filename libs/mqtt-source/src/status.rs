use serde::Serialize;
use tokio::sync::watch;

/// Broker connection state as seen by the source task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Error { message: String },
}

pub type StatusReceiver = watch::Receiver<ConnectionStatus>;

/// Receiver for a status that never changes, for runs without a broker.
pub fn idle_status() -> StatusReceiver {
    let (_, rx) = watch::channel(ConnectionStatus::Disconnected);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(ConnectionStatus::Reconnecting { attempt: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "reconnecting", "attempt": 3}));
        let json = serde_json::to_value(ConnectionStatus::Connected).unwrap();
        assert_eq!(json, serde_json::json!({"state": "connected"}));
    }
}
