use serde::Serialize;
use serde_json::Value;

use explorer_api::{MessageRecord, PropertyMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataDifference {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataDiff {
    pub differences: Vec<MetadataDifference>,
    pub has_changes: bool,
}

const NO_CONTENT_TYPE: &str = "none";

/// Field-by-field comparison of delivery flags, content type and
/// protocol properties. A property missing on one side shows as `null`.
pub fn metadata_diff(old: &MessageRecord, new: &MessageRecord) -> MetadataDiff {
    let mut differences = Vec::new();
    let mut push = |field: String, old_value: Value, new_value: Value| {
        differences.push(MetadataDifference {
            field,
            old_value,
            new_value,
        });
    };

    if old.qos != new.qos {
        push("QoS".into(), old.qos.as_u8().into(), new.qos.as_u8().into());
    }
    if old.retained != new.retained {
        push("Retained".into(), old.retained.into(), new.retained.into());
    }
    if old.dup != new.dup {
        push("Duplicate".into(), old.dup.into(), new.dup.into());
    }
    if old.content_type != new.content_type {
        let shown = |ct: &Option<String>| Value::from(ct.as_deref().unwrap_or(NO_CONTENT_TYPE));
        push("Content Type".into(), shown(&old.content_type), shown(&new.content_type));
    }

    let empty = PropertyMap::new();
    let old_props = old.properties.as_ref().unwrap_or(&empty);
    let new_props = new.properties.as_ref().unwrap_or(&empty);
    let keys = old_props
        .keys()
        .chain(new_props.keys().filter(|k| !old_props.contains_key(*k)));
    for key in keys {
        let (a, b) = (old_props.get(key), new_props.get(key));
        if a != b {
            let json = |v: Option<&explorer_api::PropertyValue>| v.map_or(Value::Null, |v| v.to_json());
            push(format!("Property: {key}"), json(a), json(b));
        }
    }

    MetadataDiff {
        has_changes: !differences.is_empty(),
        differences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorer_api::{InboundMessage, MessageId, PropertyValue, Qos};

    fn record(inbound: InboundMessage) -> MessageRecord {
        MessageRecord::from_inbound(MessageId(1), 0, inbound)
    }

    #[test]
    fn flags_and_content_type() {
        let old = record(InboundMessage::new("t", b"x".to_vec()));
        let mut inbound = InboundMessage::new("t", b"x".to_vec());
        inbound.qos = Qos::ExactlyOnce;
        inbound.dup = true;
        inbound.content_type = Some("text/plain".into());
        let new = record(inbound);

        let diff = metadata_diff(&old, &new);
        let fields: Vec<_> = diff.differences.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["QoS", "Duplicate", "Content Type"]);
        assert_eq!(diff.differences[0].new_value, Value::from(2));
        assert_eq!(diff.differences[2].old_value, Value::from("none"));
    }

    #[test]
    fn properties_compare_over_the_key_union() {
        let mut a = InboundMessage::new("t", Vec::new());
        a.properties.insert("region".into(), "eu".into());
        a.properties.insert("seq".into(), PropertyValue::from(1u64));
        let mut b = InboundMessage::new("t", Vec::new());
        b.properties.insert("seq".into(), PropertyValue::from(1u64));
        b.properties.insert("zone".into(), "a".into());

        let diff = metadata_diff(&record(a), &record(b));
        let fields: Vec<_> = diff.differences.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["Property: region", "Property: zone"]);
        assert_eq!(diff.differences[0].new_value, Value::Null);
        assert_eq!(diff.differences[1].new_value, Value::from("a"));
    }

    #[test]
    fn bytes_and_string_with_same_rendering_still_differ() {
        let mut a = InboundMessage::new("t", Vec::new());
        a.properties.insert("k".into(), PropertyValue::Bytes(vec![1, 2, 3]));
        let mut b = InboundMessage::new("t", Vec::new());
        b.properties.insert("k".into(), "AQID".into());

        assert!(metadata_diff(&record(a), &record(b)).has_changes);
    }
}
