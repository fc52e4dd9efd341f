//! Shared data model of the topic explorer: message records, protocol
//! properties, connection profiles and the payload decoder.

pub mod payload;
pub mod profile;
pub mod types;
pub mod util;

pub use payload::{DecodedPayload, decode_preview};
pub use profile::{ConnectionProfile, SubscriptionSpec, generate_client_id};
pub use types::{
    InboundMessage, MessageId, MessageIdGenerator, MessageRecord, PropertyMap, PropertyValue, Qos,
};
pub use util::{format_hex_byte, format_json_path, now_ms};
