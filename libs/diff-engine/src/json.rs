use serde::Serialize;
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonChange {
    /// Object keys and `[i]` array indices from the root.
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonDiff {
    pub changes: Vec<JsonChange>,
    pub has_changes: bool,
}

/// Deep structural comparison, one entry per differing leaf.
///
/// `null` and a missing key are the same thing here.
pub fn json_diff(old: &Value, new: &Value) -> JsonDiff {
    let mut changes = Vec::new();
    compare(&mut Vec::new(), Some(old), Some(new), &mut changes);
    JsonDiff {
        has_changes: !changes.is_empty(),
        changes,
    }
}

fn compare(path: &mut Vec<String>, old: Option<&Value>, new: Option<&Value>, out: &mut Vec<JsonChange>) {
    let old = old.filter(|v| !v.is_null());
    let new = new.filter(|v| !v.is_null());

    let (old, new) = match (old, new) {
        (None, None) => return,
        (Some(o), Some(n)) if o == n => return,
        (None, Some(n)) => {
            out.push(change(path, ChangeKind::Added, None, Some(n)));
            return;
        }
        (Some(o), None) => {
            out.push(change(path, ChangeKind::Removed, Some(o), None));
            return;
        }
        (Some(o), Some(n)) => (o, n),
    };

    match (old, new) {
        (Value::Array(a), Value::Array(b)) => {
            for i in 0..a.len().max(b.len()) {
                path.push(format!("[{i}]"));
                compare(path, a.get(i), b.get(i), out);
                path.pop();
            }
        }
        (Value::Object(a), Value::Object(b)) => {
            let keys = a.keys().chain(b.keys().filter(|k| !a.contains_key(*k)));
            for key in keys {
                path.push(key.clone());
                compare(path, a.get(key), b.get(key), out);
                path.pop();
            }
        }
        (Value::Number(a), Value::Number(b)) if same_number(a, b) => {}
        // Scalars of any kind, or an array against an object.
        _ => out.push(change(path, ChangeKind::Changed, Some(old), Some(new))),
    }
}

/// `20` and `20.0` are the same reading.
fn same_number(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        a.as_f64() == b.as_f64()
    } else {
        a.as_i64() == b.as_i64() && a.as_u64() == b.as_u64()
    }
}

fn change(path: &[String], kind: ChangeKind, old: Option<&Value>, new: Option<&Value>) -> JsonChange {
    JsonChange {
        path: path.to_vec(),
        kind,
        old_value: old.cloned(),
        new_value: new.cloned(),
    }
}
