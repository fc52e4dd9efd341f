use rumqttc::v5::mqttbytes::v5::PublishProperties;

use explorer_api::{PropertyMap, PropertyValue};

/// Flatten v5 publish properties into the loosely-typed property bag.
///
/// The content type is also returned on its own since it drives payload
/// decoding. A user property key seen more than once becomes a list.
pub fn map_publish_properties(props: Option<&PublishProperties>) -> (Option<String>, PropertyMap) {
    let mut map = PropertyMap::new();
    let Some(props) = props else {
        return (None, map);
    };

    if let Some(v) = props.payload_format_indicator {
        map.insert("payload_format_indicator".into(), u64::from(v).into());
    }
    if let Some(v) = props.message_expiry_interval {
        map.insert("message_expiry_interval".into(), u64::from(v).into());
    }
    if let Some(v) = props.topic_alias {
        map.insert("topic_alias".into(), u64::from(v).into());
    }
    if let Some(v) = &props.response_topic {
        map.insert("response_topic".into(), v.as_str().into());
    }
    if let Some(v) = &props.correlation_data {
        map.insert("correlation_data".into(), PropertyValue::Bytes(v.to_vec()));
    }
    if !props.subscription_identifiers.is_empty() {
        let ids = props
            .subscription_identifiers
            .iter()
            .map(|id| PropertyValue::from(*id as u64))
            .collect();
        map.insert("subscription_identifiers".into(), PropertyValue::List(ids));
    }
    if let Some(v) = &props.content_type {
        map.insert("content_type".into(), v.as_str().into());
    }

    for (key, value) in &props.user_properties {
        let value = PropertyValue::from(value.as_str());
        match map.remove(key) {
            None => {
                map.insert(key.clone(), value);
            }
            Some(PropertyValue::List(mut items)) => {
                items.push(value);
                map.insert(key.clone(), PropertyValue::List(items));
            }
            Some(first) => {
                map.insert(key.clone(), PropertyValue::List(vec![first, value]));
            }
        }
    }

    (props.content_type.clone(), map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_maps_to_empty() {
        let (ct, map) = map_publish_properties(None);
        assert!(ct.is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn standard_fields_and_repeated_user_properties() {
        let props = PublishProperties {
            content_type: Some("application/json".into()),
            message_expiry_interval: Some(30),
            correlation_data: Some(vec![1u8, 2, 3].into()),
            user_properties: vec![
                ("site".into(), "a".into()),
                ("site".into(), "b".into()),
                ("site".into(), "c".into()),
                ("unit".into(), "C".into()),
            ],
            ..Default::default()
        };
        let (ct, map) = map_publish_properties(Some(&props));

        assert_eq!(ct.as_deref(), Some("application/json"));
        assert_eq!(map["message_expiry_interval"], PropertyValue::from(30u64));
        assert_eq!(map["correlation_data"], PropertyValue::Bytes(vec![1, 2, 3]));
        assert_eq!(
            map["site"],
            PropertyValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(map["unit"], PropertyValue::from("C"));
    }
}
