//! Hierarchical topic index with a bounded message store.
//!
//! [`TopicTree`] is the prefix trie, [`MessageStore`] keeps the records
//! under a [`RetentionPolicy`], [`TopicIndex`] mutates both as one unit and
//! [`TopicEngine`] puts the index behind a single-writer lock.

pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod store;
pub mod tree;

pub use engine::{DisplayRow, EngineStats, TopicEngine};
pub use error::TopicError;
pub use filter::{FlatItem, TreeFilter, display_list, filter_tree, flatten_tree};
pub use index::{BatchOutcome, TopicIndex};
pub use store::{MessageStore, RetentionPolicy};
pub use tree::{NodeId, TopicNode, TopicTree};
