use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use explorer_api::{MessageId, MessageRecord, Qos};

/// Nodes shallower than this start expanded.
const AUTO_EXPAND_DEPTH: usize = 2;

/// Stable node key: the full slash-joined path from the root.
pub type NodeId = String;

// ════════════════════════════════════════════════════════════════
//  TopicNode
// ════════════════════════════════════════════════════════════════

/// One node per unique topic prefix.
///
/// The summary fields describe the latest message on this exact topic;
/// they are not aggregated from descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicNode {
    pub id: NodeId,
    /// Last path segment. Empty for empty segments (`a//b`).
    pub name: String,
    /// Non-owning back-reference into the same arena.
    pub parent_id: Option<NodeId>,
    /// Keys of the direct children, sorted, no duplicates.
    pub children: Vec<NodeId>,
    pub expanded: bool,
    pub last_payload_id: Option<MessageId>,
    pub last_timestamp: Option<i64>,
    pub retained: bool,
    pub qos: Option<Qos>,
}

impl TopicNode {
    fn new(id: NodeId, name: &str, parent_id: Option<NodeId>, expanded: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent_id,
            children: Vec::new(),
            expanded,
            last_payload_id: None,
            last_timestamp: None,
            retained: false,
            qos: None,
        }
    }

    /// Full topic path of this node. Same string as `id`.
    pub fn path(&self) -> &str {
        &self.id
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════
//  TopicTree
// ════════════════════════════════════════════════════════════════

/// Prefix trie over `/`-delimited topic segments, stored as an arena
/// keyed by path.
///
/// Parents own the child lists; children only hold their parent's key.
/// Nodes are never removed individually, only by [`TopicTree::clear`].
#[derive(Debug, Default, Clone)]
pub struct TopicTree {
    nodes: HashMap<NodeId, TopicNode>,
    /// Nodes without a parent, sorted.
    roots: Vec<NodeId>,
}

impl TopicTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every missing ancestor of `topic` and the leaf itself,
    /// wiring each new node into its parent's sorted child list.
    ///
    /// Idempotent. Empty segments are kept as empty-named nodes.
    /// Returns the number of nodes created.
    pub fn ensure_path(&mut self, topic: &str) -> usize {
        let mut created = 0;
        let mut path = String::with_capacity(topic.len());
        let mut parent: Option<NodeId> = None;

        for (depth, segment) in topic.split('/').enumerate() {
            if depth > 0 {
                path.push('/');
            }
            path.push_str(segment);

            if !self.nodes.contains_key(&path) {
                let node = TopicNode::new(
                    path.clone(),
                    segment,
                    parent.clone(),
                    depth < AUTO_EXPAND_DEPTH,
                );
                self.nodes.insert(path.clone(), node);
                match parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
                    Some(parent_node) => insert_sorted(&mut parent_node.children, path.clone()),
                    None => insert_sorted(&mut self.roots, path.clone()),
                }
                created += 1;
            }

            parent = Some(path.clone());
        }

        created
    }

    /// Refresh the leaf summary from the newest message on its topic.
    /// The leaf must already exist.
    pub(crate) fn refresh_summary(&mut self, record: &MessageRecord) {
        if let Some(leaf) = self.nodes.get_mut(&record.topic) {
            leaf.last_payload_id = Some(record.id);
            leaf.last_timestamp = Some(record.ts);
            leaf.retained = record.retained;
            leaf.qos = Some(record.qos);
        }
    }

    /// Flip a node's expansion flag. Returns the new state, or `None`
    /// for an unknown node.
    pub fn toggle_expanded(&mut self, id: &str) -> Option<bool> {
        let node = self.nodes.get_mut(id)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Expand every node that has at least one child. Leaves keep their flag.
    pub fn expand_all(&mut self) {
        for node in self.nodes.values_mut() {
            if node.has_children() {
                node.expanded = true;
            }
        }
    }

    pub fn collapse_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.expanded = false;
        }
    }

    /// Set view of the expansion flags, derived on demand.
    pub fn expanded_ids(&self) -> BTreeSet<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.expanded)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    pub fn get(&self, id: &str) -> Option<&TopicNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TopicNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a TopicNode> + 'a {
        let mut next = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        std::iter::from_fn(move || {
            let node = self.nodes.get(next?)?;
            next = node.parent_id.as_deref();
            Some(node)
        })
    }
}

fn insert_sorted(keys: &mut Vec<NodeId>, key: NodeId) {
    if let Err(pos) = keys.binary_search(&key) {
        keys.insert(pos, key);
    }
}
