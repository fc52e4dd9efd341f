use std::time::Duration;

use rumqttc::Transport;
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::mqttbytes::v5::{ConnectProperties, ConnectReturnCode, Packet, Publish};
use rumqttc::v5::{AsyncClient, Event, MqttOptions};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use explorer_api::{ConnectionProfile, InboundMessage, Qos, SubscriptionSpec, generate_client_id};

use crate::SourceError;
use crate::backoff::Backoff;
use crate::properties::map_publish_properties;
use crate::status::{ConnectionStatus, StatusReceiver};
use crate::url::{BrokerAddress, parse_broker_url};

const DEFAULT_KEEPALIVE_SECS: u64 = 60;
const REQUEST_CAPACITY: usize = 64;

// ═══════════════════════════════════════════════════════════════
//  Source config
// ═══════════════════════════════════════════════════════════════

/// Everything needed to open one broker session.
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub address: BrokerAddress,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive: Duration,
    pub clean_start: bool,
    pub session_expiry: Option<u32>,
    pub subscriptions: Vec<SubscriptionSpec>,
}

impl MqttSourceConfig {
    /// Resolve a profile, filling the client id, keep-alive and clean
    /// start defaults.
    pub fn from_profile(
        profile: &ConnectionProfile,
        subscriptions: Vec<SubscriptionSpec>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            address: parse_broker_url(&profile.url)?,
            client_id: profile.client_id.clone().unwrap_or_else(generate_client_id),
            username: profile.username.clone(),
            password: profile.password.clone(),
            keepalive: Duration::from_secs(profile.keepalive.unwrap_or(DEFAULT_KEEPALIVE_SECS)),
            clean_start: profile.clean_start.unwrap_or(true),
            session_expiry: profile.session_expiry,
            subscriptions,
        })
    }

    pub fn mqtt_options(&self) -> MqttOptions {
        let mut props = ConnectProperties::new();
        props.session_expiry_interval = self.session_expiry;

        let mut opts = MqttOptions::new(&self.client_id, &self.address.host, self.address.port);
        opts.set_connect_properties(props);
        opts.set_keep_alive(self.keepalive);
        opts.set_clean_start(self.clean_start);
        if let Some(username) = &self.username {
            opts.set_credentials(username, self.password.clone().unwrap_or_default());
        }
        if self.address.tls {
            opts.set_transport(Transport::tls_with_default_config());
        }
        opts
    }
}

fn to_wire_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn from_wire_qos(qos: QoS) -> Qos {
    match qos {
        QoS::AtMostOnce => Qos::AtMostOnce,
        QoS::AtLeastOnce => Qos::AtLeastOnce,
        QoS::ExactlyOnce => Qos::ExactlyOnce,
    }
}

/// Convert a received publish into the engine's inbound event.
pub fn inbound_from_publish(publish: &Publish) -> InboundMessage {
    let (content_type, properties) = map_publish_properties(publish.properties.as_ref());
    InboundMessage {
        topic: String::from_utf8_lossy(&publish.topic).into_owned(),
        payload: publish.payload.to_vec(),
        qos: from_wire_qos(publish.qos),
        retained: publish.retain,
        dup: publish.dup,
        content_type,
        properties,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Source task: broker → InboundMessage channel
// ═══════════════════════════════════════════════════════════════

/// Connect and forward every publish into `tx` until `token` is cancelled
/// or the receiver goes away. Connection errors are retried with backoff.
pub fn spawn_mqtt_source(
    config: MqttSourceConfig,
    tx: mpsc::Sender<InboundMessage>,
    token: CancellationToken,
) -> (StatusReceiver, JoinHandle<()>) {
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
    let task = tokio::spawn(run(config, tx, status_tx, token));
    (status_rx, task)
}

async fn run(
    config: MqttSourceConfig,
    tx: mpsc::Sender<InboundMessage>,
    status: watch::Sender<ConnectionStatus>,
    token: CancellationToken,
) {
    let broker = format!("{}:{}", config.address.host, config.address.port);
    let (client, mut eventloop) = AsyncClient::new(config.mqtt_options(), REQUEST_CAPACITY);
    let mut backoff = Backoff::new();

    status.send_replace(ConnectionStatus::Connecting);
    tracing::info!(%broker, client_id = %config.client_id, tls = config.address.tls, "connecting");

    loop {
        let event = tokio::select! {
            event = eventloop.poll() => event,
            _ = token.cancelled() => break,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    let message = format!("connection rejected: {:?}", ack.code);
                    tracing::error!(%broker, "{message}");
                    status.send_replace(ConnectionStatus::Error { message });
                    continue;
                }
                backoff.reset();
                status.send_replace(ConnectionStatus::Connected);
                tracing::info!(%broker, session_present = ack.session_present, "connected");
                subscribe_all(&client, &config.subscriptions);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if tx.send(inbound_from_publish(&publish)).await.is_err() {
                    tracing::info!("ingest closed, stopping source");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::debug!(pkid = ack.pkid, "subscription acknowledged");
            }
            Ok(_) => {}
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(%broker, error = %e, delay_ms = delay.as_millis() as u64, "connection error, reconnecting");
                status.send_replace(ConnectionStatus::Reconnecting {
                    attempt: backoff.attempt(),
                });
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => break,
                }
            }
        }
    }

    let _ = client.try_disconnect();
    status.send_replace(ConnectionStatus::Disconnected);
    tracing::info!(%broker, "source stopped");
}

/// Queue every subscription without awaiting the request channel, which
/// only drains while the event loop is polled.
fn subscribe_all(client: &AsyncClient, subscriptions: &[SubscriptionSpec]) {
    for sub in subscriptions {
        match client.try_subscribe(sub.filter.clone(), to_wire_qos(sub.qos)) {
            Ok(()) => tracing::info!(filter = %sub.filter, qos = %sub.qos, "subscribing"),
            Err(e) => tracing::warn!(filter = %sub.filter, error = %e, "subscribe failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults_are_filled() {
        let profile = ConnectionProfile::new("local", "mqtts://broker:8884");
        let config = MqttSourceConfig::from_profile(&profile, vec![SubscriptionSpec::default()]).unwrap();

        assert!(config.client_id.starts_with("mqttui_"));
        assert_eq!(config.keepalive, Duration::from_secs(60));
        assert!(config.clean_start);
        assert!(config.address.tls);
        assert_eq!(config.address.port, 8884);
        assert_eq!(config.subscriptions[0].filter, "#");
    }

    #[test]
    fn explicit_profile_values_win() {
        let mut profile = ConnectionProfile::new("p", "broker");
        profile.client_id = Some("fixed".into());
        profile.keepalive = Some(5);
        profile.clean_start = Some(false);
        let config = MqttSourceConfig::from_profile(&profile, Vec::new()).unwrap();

        assert_eq!(config.client_id, "fixed");
        assert_eq!(config.keepalive, Duration::from_secs(5));
        assert!(!config.clean_start);
    }

    #[test]
    fn session_expiry_rides_on_connect_properties() {
        let mut profile = ConnectionProfile::new("p", "broker");
        profile.session_expiry = Some(300);
        let opts = MqttSourceConfig::from_profile(&profile, Vec::new()).unwrap().mqtt_options();

        let props = opts.connect_properties().unwrap();
        assert_eq!(props.session_expiry_interval, Some(300));

        let plain = MqttSourceConfig::from_profile(&ConnectionProfile::new("p", "broker"), Vec::new()).unwrap();
        assert_eq!(plain.mqtt_options().connect_properties().unwrap().session_expiry_interval, None);
    }

    #[test]
    fn bad_url_is_reported() {
        let profile = ConnectionProfile::new("p", "mqtt://h:port");
        assert!(matches!(
            MqttSourceConfig::from_profile(&profile, Vec::new()),
            Err(SourceError::InvalidPort(_))
        ));
    }

    #[test]
    fn publish_maps_flags_and_topic() {
        let mut publish = Publish::new("sensors/t", QoS::AtLeastOnce, b"21.5".to_vec(), None);
        publish.retain = true;
        publish.dup = true;
        let inbound = inbound_from_publish(&publish);

        assert_eq!(inbound.topic, "sensors/t");
        assert_eq!(inbound.payload, b"21.5");
        assert_eq!(inbound.qos, Qos::AtLeastOnce);
        assert!(inbound.retained && inbound.dup);
        assert!(inbound.properties.is_empty());
    }
}
