use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use explorer_api::{MessageId, MessageRecord};

// ═══════════════════════════════════════════════════════════════
//  RetentionPolicy
// ═══════════════════════════════════════════════════════════════

fn default_max_messages() -> usize {
    50_000
}

/// Global cap on stored messages. Eviction drops the oldest by arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct RetentionPolicy {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl RetentionPolicy {
    /// A zero cap is raised to 1.
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(default_max_messages())
    }
}

// ═══════════════════════════════════════════════════════════════
//  MessageStore
// ═══════════════════════════════════════════════════════════════

/// Bounded message map plus per-topic newest-first id histories.
///
/// Every id in a topic history is present in the map; eviction scrubs
/// the histories in the same step that removes the records.
#[derive(Debug)]
pub struct MessageStore {
    messages: HashMap<MessageId, Arc<MessageRecord>>,
    /// Global insertion order, oldest at the front.
    order: VecDeque<MessageId>,
    /// Per-topic ids, newest at the front.
    by_topic: HashMap<String, VecDeque<MessageId>>,
    policy: RetentionPolicy,
}

impl MessageStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            messages: HashMap::new(),
            order: VecDeque::with_capacity(policy.max_messages.min(65536)),
            by_topic: HashMap::new(),
            policy,
        }
    }

    /// Store a record without applying retention. A record whose id is
    /// already stored replaces the old one and counts as a new arrival.
    pub fn insert(&mut self, record: Arc<MessageRecord>) {
        if self.messages.contains_key(&record.id) {
            self.remove_ids(&HashSet::from([record.id]));
        }
        self.order.push_back(record.id);
        self.by_topic
            .entry(record.topic.clone())
            .or_default()
            .push_front(record.id);
        self.messages.insert(record.id, record);
    }

    /// Drop the oldest records until the store is within the cap.
    /// Returns the evicted ids, oldest first.
    pub fn evict(&mut self) -> Vec<MessageId> {
        let excess = self.order.len().saturating_sub(self.policy.max_messages);
        if excess == 0 {
            return Vec::new();
        }
        let evicted: Vec<MessageId> = self.order.drain(..excess).collect();

        let mut topics = HashSet::new();
        for id in &evicted {
            if let Some(record) = self.messages.remove(id) {
                topics.insert(record.topic.clone());
            }
        }
        for topic in topics {
            self.trim_topic(&topic);
        }

        evicted
    }

    fn remove_ids(&mut self, ids: &HashSet<MessageId>) {
        self.order.retain(|id| !ids.contains(id));
        let mut topics = HashSet::new();
        for id in ids {
            if let Some(record) = self.messages.remove(id) {
                topics.insert(record.topic.clone());
            }
        }
        for topic in topics {
            self.scrub_topic(&topic, ids);
        }
    }

    /// Evicted ids are the oldest of their topic, so they sit at the back
    /// of its history. Pop them until the tail is a live record.
    fn trim_topic(&mut self, topic: &str) {
        if let Some(history) = self.by_topic.get_mut(topic) {
            while history.back().is_some_and(|id| !self.messages.contains_key(id)) {
                history.pop_back();
            }
            if history.is_empty() {
                self.by_topic.remove(topic);
            }
        }
    }

    fn scrub_topic(&mut self, topic: &str, ids: &HashSet<MessageId>) {
        if let Some(history) = self.by_topic.get_mut(topic) {
            history.retain(|id| !ids.contains(id));
            if history.is_empty() {
                self.by_topic.remove(topic);
            }
        }
    }

    pub fn get(&self, id: MessageId) -> Option<&Arc<MessageRecord>> {
        self.messages.get(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    /// Ids stored for `topic`, newest first.
    pub fn history_ids(&self, topic: &str) -> impl Iterator<Item = MessageId> + '_ {
        self.by_topic.get(topic).into_iter().flatten().copied()
    }

    /// Records stored for `topic`, newest first.
    pub fn history(&self, topic: &str) -> impl Iterator<Item = &Arc<MessageRecord>> + '_ {
        self.history_ids(topic).filter_map(|id| self.messages.get(&id))
    }

    pub fn history_len(&self, topic: &str) -> usize {
        self.by_topic.get(topic).map_or(0, VecDeque::len)
    }

    /// Topics that currently have at least one stored message.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.by_topic.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.order.clear();
        self.by_topic.clear();
    }
}
