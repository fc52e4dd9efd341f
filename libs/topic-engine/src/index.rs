use std::sync::Arc;

use serde::Serialize;

use explorer_api::MessageRecord;

use crate::store::{MessageStore, RetentionPolicy};
use crate::tree::TopicTree;

/// Result of applying one upsert or batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub applied: usize,
    pub evicted: usize,
    /// Store size after eviction.
    pub stored: usize,
    pub nodes_created: usize,
}

/// Topic trie plus bounded message store, mutated as one unit.
///
/// Not synchronized; [`crate::TopicEngine`] wraps it in a single-writer lock.
#[derive(Debug)]
pub struct TopicIndex {
    pub(crate) tree: TopicTree,
    pub(crate) store: MessageStore,
}

impl TopicIndex {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            tree: TopicTree::new(),
            store: MessageStore::new(policy),
        }
    }

    /// Index one record and evict immediately.
    pub fn upsert(&mut self, record: MessageRecord) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        self.apply(record, &mut outcome);
        self.finish(outcome)
    }

    /// Index a batch in order, evicting once at the end.
    pub fn batch_upsert(&mut self, records: impl IntoIterator<Item = MessageRecord>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for record in records {
            self.apply(record, &mut outcome);
        }
        self.finish(outcome)
    }

    fn apply(&mut self, record: MessageRecord, outcome: &mut BatchOutcome) {
        outcome.nodes_created += self.tree.ensure_path(&record.topic);
        self.tree.refresh_summary(&record);
        self.store.insert(Arc::new(record));
        outcome.applied += 1;
    }

    fn finish(&mut self, mut outcome: BatchOutcome) -> BatchOutcome {
        outcome.evicted = self.store.evict().len();
        outcome.stored = self.store.len();
        outcome
    }

    /// Drop every node, message, history and expansion flag.
    pub fn clear_all(&mut self) {
        self.tree.clear();
        self.store.clear();
    }

    pub fn tree(&self) -> &TopicTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TopicTree {
        &mut self.tree
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }
}
