//! Ingest path between the protocol client and the topic engine:
//! a time-windowed [`MessageBatcher`] and the task that stamps, decodes
//! and batches inbound messages.

pub mod batcher;
pub mod config;
pub mod error;
mod ingest;

pub use batcher::{BatchBuffer, BatchSink, MessageBatcher};
pub use config::BatchConfig;
pub use error::PipelineError;
pub use ingest::{IngestHandle, IngestStats, spawn_ingest};
