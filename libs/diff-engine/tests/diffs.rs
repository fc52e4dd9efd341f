use proptest::prelude::*;
use serde_json::{Value, json};

use diff_engine::{ChangeKind, hex_diff, json_diff, metadata_diff, text_diff};
use explorer_api::{InboundMessage, MessageId, MessageRecord, PropertyValue, Qos};

// =============================================================================
// Fixed cases
// =============================================================================

#[test]
fn hex_diff_reports_change_then_addition() {
    let diff = hex_diff(&[0x01, 0x02], &[0x01, 0x03, 0x04]);
    assert!(diff.has_changes);
    assert_eq!(diff.changes.len(), 2);

    assert_eq!(diff.changes[0].offset, 1);
    assert_eq!(diff.changes[0].kind, ChangeKind::Changed);
    assert_eq!(diff.changes[0].old_byte, Some(0x02));
    assert_eq!(diff.changes[0].new_byte, Some(0x03));

    assert_eq!(diff.changes[1].offset, 2);
    assert_eq!(diff.changes[1].kind, ChangeKind::Added);
    assert_eq!(diff.changes[1].new_byte, Some(0x04));
}

#[test]
fn json_diff_reports_removed_then_added_key() {
    let diff = json_diff(&json!({"a": 1, "b": 2}), &json!({"a": 1, "c": 3}));
    assert!(diff.has_changes);
    assert_eq!(diff.changes.len(), 2);

    assert_eq!(diff.changes[0].path, vec!["b"]);
    assert_eq!(diff.changes[0].kind, ChangeKind::Removed);
    assert_eq!(diff.changes[0].old_value, Some(json!(2)));

    assert_eq!(diff.changes[1].path, vec!["c"]);
    assert_eq!(diff.changes[1].kind, ChangeKind::Added);
    assert_eq!(diff.changes[1].new_value, Some(json!(3)));
}

// =============================================================================
// Comparing anything with itself reports no change
// =============================================================================

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_record() -> impl Strategy<Value = MessageRecord> {
    (
        prop::collection::vec(any::<u8>(), 0..32),
        0u8..3,
        any::<bool>(),
        any::<bool>(),
        prop::option::of("[a-z/]{1,12}"),
        prop::collection::btree_map("[a-z]{1,4}", "[a-z]{0,4}", 0..3),
    )
        .prop_map(|(payload, qos, retained, dup, content_type, props)| {
            let mut inbound = InboundMessage::new("t", payload);
            inbound.qos = Qos::from_u8_lossy(qos);
            inbound.retained = retained;
            inbound.dup = dup;
            inbound.content_type = content_type;
            inbound.properties = props
                .into_iter()
                .map(|(k, v)| (k, PropertyValue::from(v)))
                .collect();
            MessageRecord::from_inbound(MessageId(1), 0, inbound)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn text_against_itself(lines in prop::collection::vec("[a-c ]{0,5}", 0..12)) {
        let text = lines.join("\n");
        let diff = text_diff(&text, &text);
        prop_assert!(!diff.has_changes);
    }

    #[test]
    fn json_against_itself(value in arb_json()) {
        prop_assert!(!json_diff(&value, &value).has_changes);
    }

    #[test]
    fn bytes_against_themselves(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assert!(!hex_diff(&bytes, &bytes).has_changes);
    }

    #[test]
    fn metadata_against_itself(record in arb_record()) {
        prop_assert!(!metadata_diff(&record, &record).has_changes);
    }

    #[test]
    fn text_diff_covers_every_line(
        old in prop::collection::vec("[ab]", 0..10),
        new in prop::collection::vec("[ab]", 0..10),
    ) {
        let diff = text_diff(&old.join("\n"), &new.join("\n"));
        let lines = diff.hunks.first().map(|h| h.lines.clone()).unwrap_or_default();

        let old_side: Vec<_> = lines.iter().filter(|l| l.old_line.is_some()).map(|l| l.content.clone()).collect();
        let new_side: Vec<_> = lines.iter().filter(|l| l.new_line.is_some()).map(|l| l.content.clone()).collect();
        prop_assert_eq!(old_side, old);
        prop_assert_eq!(new_side, new);
    }
}
