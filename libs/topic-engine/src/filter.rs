use std::collections::HashSet;

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

use crate::tree::{NodeId, TopicTree};

const MINUTE_MS: i64 = 60_000;

/// Display-list predicates. All default to "off".
///
/// Query strings send untouched form fields as `key=`; an empty value
/// reads as "off" for every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TreeFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub retained_only: bool,
    /// `None` or `Some(0)` means no time bound.
    #[serde(default, deserialize_with = "lenient_option")]
    pub changed_in_minutes: Option<u32>,
}

/// A field that arrives either typed (JSON) or as text (query string).
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Native(T),
    Text(String),
}

/// `true`/`false`, `1`/`0`, `on`/`off`; empty text is `false`.
pub fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Lenient::<bool>::deserialize(deserializer)? {
        Lenient::Native(value) => Ok(value),
        Lenient::Text(text) => match text.trim() {
            "" | "false" | "0" | "off" => Ok(false),
            "true" | "1" | "on" => Ok(true),
            other => Err(D::Error::invalid_value(Unexpected::Str(other), &"a boolean")),
        },
    }
}

/// Typed or textual value; `null` and empty text are `None`.
pub fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + std::str::FromStr,
{
    match Option::<Lenient<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Native(value)) => Ok(Some(value)),
        Some(Lenient::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Lenient::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::invalid_value(Unexpected::Str(&text), &"a number")),
    }
}

impl TreeFilter {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    fn time_bound(&self) -> Option<u32> {
        self.changed_in_minutes.filter(|m| *m > 0)
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.retained_only || self.time_bound().is_some()
    }
}

/// One row of the flattened display list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatItem {
    pub id: NodeId,
    pub depth: usize,
}

/// Ids of nodes that match `filter`, closed upward over their ancestors.
///
/// Descendants of a match are not included unless they match themselves.
pub fn filter_tree(tree: &TopicTree, filter: &TreeFilter, now_ms: i64) -> HashSet<NodeId> {
    let needle = filter.query.to_lowercase();
    let threshold = filter
        .time_bound()
        .map(|minutes| now_ms - i64::from(minutes) * MINUTE_MS);

    let mut visible = HashSet::new();
    for node in tree.nodes() {
        let query_ok = needle.is_empty()
            || node.path().to_lowercase().contains(&needle)
            || node.name.to_lowercase().contains(&needle);
        let retained_ok = !filter.retained_only || node.retained;
        let time_ok = threshold.is_none_or(|t| node.last_timestamp.is_some_and(|ts| ts >= t));

        if !(query_ok && retained_ok && time_ok) {
            continue;
        }
        if !visible.insert(node.id.clone()) {
            continue;
        }
        for ancestor in tree.ancestors(&node.id) {
            // Already present means its own chain was added with it.
            if !visible.insert(ancestor.id.clone()) {
                break;
            }
        }
    }
    visible
}

/// Depth-first pre-order walk over expanded nodes.
///
/// Starts from `root_ids` when given, otherwise from the tree's sorted
/// roots. With `visible`, nodes outside the set are skipped along with
/// their subtrees.
pub fn flatten_tree(
    tree: &TopicTree,
    visible: Option<&HashSet<NodeId>>,
    root_ids: Option<&[NodeId]>,
) -> Vec<FlatItem> {
    let shown = |id: &NodeId| visible.is_none_or(|set| set.contains(id));
    let roots = root_ids.unwrap_or_else(|| tree.roots());

    let mut out = Vec::new();
    let mut stack: Vec<(&NodeId, usize)> = roots
        .iter()
        .rev()
        .filter(|id| shown(id))
        .map(|id| (id, 0))
        .collect();

    while let Some((id, depth)) = stack.pop() {
        let Some(node) = tree.get(id) else { continue };
        out.push(FlatItem {
            id: node.id.clone(),
            depth,
        });
        if node.expanded {
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .filter(|child| shown(child))
                    .map(|child| (child, depth + 1)),
            );
        }
    }
    out
}

/// Filter then flatten. An inactive filter flattens the whole tree.
pub fn display_list(tree: &TopicTree, filter: &TreeFilter, now_ms: i64) -> Vec<FlatItem> {
    if filter.is_active() {
        let visible = filter_tree(tree, filter, now_ms);
        flatten_tree(tree, Some(&visible), None)
    } else {
        flatten_tree(tree, None, None)
    }
}
