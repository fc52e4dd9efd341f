use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;

use explorer_api::{MessageId, MessageRecord, Qos};

use crate::error::TopicError;
use crate::filter::{TreeFilter, display_list};
use crate::index::{BatchOutcome, TopicIndex};
use crate::store::RetentionPolicy;
use crate::tree::{NodeId, TopicNode};

const NOTIFY_CAPACITY: usize = 64;

/// Display row: a flattened node joined with its summary fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub id: NodeId,
    pub depth: usize,
    pub name: String,
    pub has_children: bool,
    pub expanded: bool,
    pub retained: bool,
    pub qos: Option<Qos>,
    pub last_timestamp: Option<i64>,
    /// Stored messages on this exact topic.
    pub message_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub nodes: usize,
    pub messages: usize,
    pub max_messages: usize,
}

/// Thread-safe owner of the topic index.
///
/// Every mutation takes the write lock for its whole duration, so a batch
/// is applied as one state transition. Reads take the read lock and return
/// owned copies.
pub struct TopicEngine {
    state: RwLock<TopicIndex>,
    /// Signal on every applied batch.
    notify_tx: broadcast::Sender<BatchOutcome>,
}

impl TopicEngine {
    pub fn new(policy: RetentionPolicy) -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            state: RwLock::new(TopicIndex::new(policy)),
            notify_tx,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TopicIndex>, TopicError> {
        Ok(self.state.read()?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TopicIndex>, TopicError> {
        Ok(self.state.write()?)
    }

    /// Subscribe to batch notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchOutcome> {
        self.notify_tx.subscribe()
    }

    pub fn upsert(&self, record: MessageRecord) -> Result<BatchOutcome, TopicError> {
        let outcome = self.write()?.upsert(record);
        self.notify(outcome);
        Ok(outcome)
    }

    pub fn batch_upsert(&self, records: Vec<MessageRecord>) -> Result<BatchOutcome, TopicError> {
        let outcome = self.write()?.batch_upsert(records);
        tracing::debug!(
            applied = outcome.applied,
            evicted = outcome.evicted,
            stored = outcome.stored,
            "batch applied"
        );
        self.notify(outcome);
        Ok(outcome)
    }

    fn notify(&self, outcome: BatchOutcome) {
        // No receivers is fine.
        let _ = self.notify_tx.send(outcome);
    }

    pub fn toggle_expanded(&self, id: &str) -> Result<Option<bool>, TopicError> {
        Ok(self.write()?.tree_mut().toggle_expanded(id))
    }

    pub fn expand_all(&self) -> Result<(), TopicError> {
        self.write()?.tree_mut().expand_all();
        Ok(())
    }

    pub fn collapse_all(&self) -> Result<(), TopicError> {
        self.write()?.tree_mut().collapse_all();
        Ok(())
    }

    pub fn clear_all(&self) -> Result<(), TopicError> {
        self.write()?.clear_all();
        tracing::info!("topic index cleared");
        Ok(())
    }

    /// Filtered, flattened display list.
    pub fn display_list(&self, filter: &TreeFilter, now_ms: i64) -> Result<Vec<DisplayRow>, TopicError> {
        let index = self.read()?;
        let rows = display_list(index.tree(), filter, now_ms)
            .into_iter()
            .filter_map(|item| {
                let node = index.tree().get(&item.id)?;
                Some(DisplayRow {
                    depth: item.depth,
                    name: node.name.clone(),
                    has_children: node.has_children(),
                    expanded: node.expanded,
                    retained: node.retained,
                    qos: node.qos,
                    last_timestamp: node.last_timestamp,
                    message_count: index.store().history_len(&node.id),
                    id: item.id,
                })
            })
            .collect();
        Ok(rows)
    }

    /// Up to `limit` stored records for `topic`, newest first.
    pub fn history(&self, topic: &str, limit: Option<usize>) -> Result<Vec<Arc<MessageRecord>>, TopicError> {
        let index = self.read()?;
        Ok(index
            .store()
            .history(topic)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    pub fn message(&self, id: MessageId) -> Result<Option<Arc<MessageRecord>>, TopicError> {
        Ok(self.read()?.store().get(id).cloned())
    }

    pub fn node(&self, id: &str) -> Result<Option<TopicNode>, TopicError> {
        Ok(self.read()?.tree().get(id).cloned())
    }

    pub fn stats(&self) -> Result<EngineStats, TopicError> {
        let index = self.read()?;
        Ok(EngineStats {
            nodes: index.tree().len(),
            messages: index.store().len(),
            max_messages: index.store().policy().max_messages,
        })
    }

    /// Run `f` against a consistent snapshot under the read lock.
    pub fn with_index<R>(&self, f: impl FnOnce(&TopicIndex) -> R) -> Result<R, TopicError> {
        let index = self.read()?;
        Ok(f(&index))
    }
}
