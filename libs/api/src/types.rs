use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::payload::decode_preview;

// ════════════════════════════════════════════════════════════════
//  QoS
// ════════════════════════════════════════════════════════════════

/// Delivery-guarantee level attached to a message. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qos {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl Qos {
    /// Levels above 2 fall back to `AtMostOnce`.
    pub fn from_u8_lossy(level: u8) -> Self {
        Self::try_from(level).unwrap_or_default()
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for Qos {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Qos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for Qos {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Qos {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(deserializer)?;
        Qos::try_from(level)
            .map_err(|l| serde::de::Error::custom(format!("qos must be 0, 1 or 2, got {l}")))
    }
}

// ════════════════════════════════════════════════════════════════
//  MessageId
// ════════════════════════════════════════════════════════════════

/// Process-unique message identifier. Ids are handed out in arrival
/// order, so comparing two ids compares their arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(MessageId)
    }
}

/// Monotonic id source shared by every ingest path of the process.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ════════════════════════════════════════════════════════════════
//  Properties
// ════════════════════════════════════════════════════════════════

/// Loosely-typed protocol property value.
///
/// Equality is structural per variant, which is what the metadata diff
/// relies on. `Bytes` serializes as base64.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Bytes(Vec<u8>),
    List(Vec<PropertyValue>),
    Map(PropertyMap),
}

/// Ordered string-keyed property bag.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

impl PropertyValue {
    /// JSON view used for display and for value comparison in diffs.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Number(n) => serde_json::Value::Number(n.clone()),
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Bytes(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
            PropertyValue::List(items) => {
                serde_json::Value::Array(items.iter().map(PropertyValue::to_json).collect())
            }
            PropertyValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<u64> for PropertyValue {
    fn from(n: u64) -> Self {
        PropertyValue::Number(n.into())
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ════════════════════════════════════════════════════════════════
//  InboundMessage
// ════════════════════════════════════════════════════════════════

/// A message-arrival event as produced by the protocol client, before
/// it is stamped and decoded.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retained: bool,
    pub dup: bool,
    /// Content-type hint from the protocol properties, if any.
    pub content_type: Option<String>,
    /// Remaining protocol properties. Empty when the protocol sent none.
    pub properties: PropertyMap,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  MessageRecord
// ════════════════════════════════════════════════════════════════

/// One received message. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: MessageId,
    pub topic: String,
    /// Arrival time, Unix ms.
    pub ts: i64,
    pub payload: Vec<u8>,
    /// Decoded text, present only for printable UTF-8 payloads.
    pub payload_text: Option<String>,
    pub payload_json: Option<serde_json::Value>,
    pub content_type: Option<String>,
    pub properties: Option<PropertyMap>,
    pub retained: bool,
    pub qos: Qos,
    pub dup: bool,
}

impl MessageRecord {
    /// Stamp an inbound event with id and arrival time and attach its
    /// decoded previews.
    pub fn from_inbound(id: MessageId, ts: i64, inbound: InboundMessage) -> Self {
        let decoded = decode_preview(&inbound.payload, inbound.content_type.as_deref());
        let properties = if inbound.properties.is_empty() {
            None
        } else {
            Some(inbound.properties)
        };
        Self {
            id,
            topic: inbound.topic,
            ts,
            payload: inbound.payload,
            payload_text: decoded.text,
            payload_json: decoded.json,
            content_type: inbound.content_type,
            properties,
            retained: inbound.retained,
            qos: inbound.qos,
            dup: inbound.dup,
        }
    }
}

impl Serialize for MessageRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("MessageRecord", 11)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("topic", &self.topic)?;
        s.serialize_field("ts", &self.ts)?;
        s.serialize_field(
            "payload",
            &base64::engine::general_purpose::STANDARD.encode(&self.payload),
        )?;
        s.serialize_field("payload_text", &self.payload_text)?;
        s.serialize_field("payload_json", &self.payload_json)?;
        s.serialize_field("content_type", &self.content_type)?;
        s.serialize_field("properties", &self.properties)?;
        s.serialize_field("retained", &self.retained)?;
        s.serialize_field("qos", &self.qos)?;
        s.serialize_field("dup", &self.dup)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_rejects_levels_above_two() {
        assert_eq!(Qos::try_from(2), Ok(Qos::ExactlyOnce));
        assert_eq!(Qos::try_from(3), Err(3));
        assert_eq!(Qos::from_u8_lossy(7), Qos::AtMostOnce);
    }

    #[test]
    fn id_generator_is_monotonic() {
        let ids = MessageIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a < b);
        assert_eq!(a, MessageId(1));
    }

    #[test]
    fn from_inbound_keeps_flags_and_decodes_json() {
        let mut inbound = InboundMessage::new("sensors/t", br#"{"v":1}"#.to_vec());
        inbound.qos = Qos::AtLeastOnce;
        inbound.retained = true;
        let record = MessageRecord::from_inbound(MessageId(9), 1_000, inbound);

        assert_eq!(record.id, MessageId(9));
        assert_eq!(record.ts, 1_000);
        assert!(record.retained);
        assert_eq!(record.qos, Qos::AtLeastOnce);
        assert_eq!(record.payload_json, Some(serde_json::json!({"v": 1})));
        assert_eq!(record.payload_text.as_deref(), Some(r#"{"v":1}"#));
        assert!(record.properties.is_none());
    }

    #[test]
    fn record_serializes_payload_as_base64() {
        let record = MessageRecord::from_inbound(MessageId(1), 0, InboundMessage::new("a", vec![0xff, 0x00]));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["payload"], "/wA=");
        assert_eq!(json["payload_text"], serde_json::Value::Null);
    }

    #[test]
    fn bytes_property_renders_as_base64() {
        let value = PropertyValue::Bytes(vec![1, 2, 3]);
        assert_eq!(value.to_json(), serde_json::json!("AQID"));
    }
}
