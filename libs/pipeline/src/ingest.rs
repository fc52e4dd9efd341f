use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use explorer_api::{InboundMessage, MessageIdGenerator, MessageRecord, now_ms};
use topic_engine::TopicEngine;

use crate::PipelineError;
use crate::batcher::{BatchSink, MessageBatcher};
use crate::config::BatchConfig;

// ═══════════════════════════════════════════════════════════════
//  Statistics
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct IngestCounters {
    received: AtomicU64,
    dropped_while_paused: AtomicU64,
    batches_applied: AtomicU64,
    /// 0 until the first arrival.
    last_arrival_ms: AtomicI64,
    /// Gap between the last two arrivals, 0 if unknown.
    last_gap_ms: AtomicI64,
}

impl IngestCounters {
    fn record_arrival(&self, ts: i64) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let prev = self.last_arrival_ms.swap(ts, Ordering::Relaxed);
        if prev > 0 {
            self.last_gap_ms.store((ts - prev).max(0), Ordering::Relaxed);
        }
    }
}

/// Point-in-time view of ingest activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestStats {
    pub received: u64,
    pub dropped_while_paused: u64,
    pub batches_applied: u64,
    pub last_arrival_ms: Option<i64>,
    /// Messages per second derived from the last inter-arrival gap.
    pub rate_per_sec: f64,
    pub paused: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Engine sink
// ═══════════════════════════════════════════════════════════════

struct EngineSink {
    engine: Arc<TopicEngine>,
    counters: Arc<IngestCounters>,
}

impl BatchSink<MessageRecord> for EngineSink {
    fn deliver(&self, batch: Vec<MessageRecord>) {
        let len = batch.len();
        match self.engine.batch_upsert(batch) {
            Ok(_) => {
                self.counters.batches_applied.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!(error = %e, records = len, "batch apply failed");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  IngestHandle
// ═══════════════════════════════════════════════════════════════

/// Control surface of a running ingest task.
#[derive(Clone)]
pub struct IngestHandle {
    engine: Arc<TopicEngine>,
    batcher: MessageBatcher<MessageRecord>,
    paused: Arc<AtomicBool>,
    counters: Arc<IngestCounters>,
}

impl IngestHandle {
    /// Drop arriving messages until `resume`.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
        tracing::info!("ingest paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
        tracing::info!("ingest resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> IngestStats {
        let c = &self.counters;
        let last = c.last_arrival_ms.load(Ordering::Relaxed);
        let gap = c.last_gap_ms.load(Ordering::Relaxed);
        IngestStats {
            received: c.received.load(Ordering::Relaxed),
            dropped_while_paused: c.dropped_while_paused.load(Ordering::Relaxed),
            batches_applied: c.batches_applied.load(Ordering::Relaxed),
            last_arrival_ms: (last > 0).then_some(last),
            rate_per_sec: if gap > 0 { 1000.0 / gap as f64 } else { 0.0 },
            paused: self.is_paused(),
        }
    }

    /// Apply everything buffered now. Returns the number of records.
    pub async fn flush(&self) -> Result<usize, PipelineError> {
        self.batcher.flush_and_wait().await
    }

    /// Discard in-flight records, then clear the engine.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        let dropped = self.batcher.clear_and_wait().await?;
        self.engine.clear_all()?;
        tracing::info!(dropped, "ingest reset");
        Ok(())
    }

    pub fn engine(&self) -> &Arc<TopicEngine> {
        &self.engine
    }
}

// ═══════════════════════════════════════════════════════════════
//  Ingest task: inbound → stamp → decode → batch → engine
// ═══════════════════════════════════════════════════════════════

/// Start the ingest task. It runs until `token` is cancelled or the
/// sender side of `rx` closes, then flushes the batcher before exiting.
pub fn spawn_ingest(
    mut rx: mpsc::Receiver<InboundMessage>,
    engine: Arc<TopicEngine>,
    config: &BatchConfig,
    token: CancellationToken,
) -> (IngestHandle, JoinHandle<()>) {
    let counters = Arc::new(IngestCounters::default());
    let sink = Arc::new(EngineSink {
        engine: engine.clone(),
        counters: counters.clone(),
    });

    // Stopped by this task after the final flush, not by the caller.
    let batcher_token = CancellationToken::new();
    let (batcher, batcher_task) = MessageBatcher::spawn(config.interval(), sink, batcher_token.clone());

    let handle = IngestHandle {
        engine,
        batcher: batcher.clone(),
        paused: Arc::new(AtomicBool::new(false)),
        counters: counters.clone(),
    };
    let paused = handle.paused.clone();
    let ids = MessageIdGenerator::new();
    let interval_ms = config.interval_ms;

    let task = tokio::spawn(async move {
        tracing::info!(interval_ms, "ingest started");
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if paused.load(Ordering::Relaxed) {
                        counters.dropped_while_paused.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    let ts = now_ms();
                    counters.record_arrival(ts);
                    let record = MessageRecord::from_inbound(ids.next_id(), ts, msg);
                    if batcher.add(record).is_err() {
                        tracing::error!("batcher stopped, ingest exiting");
                        break;
                    }
                }
                _ = token.cancelled() => break,
            }
        }

        match batcher.flush_and_wait().await {
            Ok(n) => tracing::info!(flushed = n, "ingest finished"),
            Err(e) => tracing::warn!(error = %e, "final flush failed"),
        }
        batcher_token.cancel();
        let _ = batcher_task.await;
    });

    (handle, task)
}
