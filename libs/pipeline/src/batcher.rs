use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::PipelineError;

// ═══════════════════════════════════════════════════════════════
//  BatchSink
// ═══════════════════════════════════════════════════════════════

/// Consumer of flushed batches. Called on the batcher task, one batch at
/// a time, in arrival order.
pub trait BatchSink<T>: Send + Sync {
    fn deliver(&self, batch: Vec<T>);
}

impl<T, F> BatchSink<T> for F
where
    F: Fn(Vec<T>) + Send + Sync,
{
    fn deliver(&self, batch: Vec<T>) {
        self(batch)
    }
}

// ═══════════════════════════════════════════════════════════════
//  BatchBuffer: timer bookkeeping without a runtime
// ═══════════════════════════════════════════════════════════════

/// Buffer plus a single optional deadline.
///
/// The deadline is armed by the first `add` into an empty buffer and
/// disarmed by `take` or `clear`; further adds never move it.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    items: Vec<T>,
    deadline: Option<Instant>,
    interval: Duration,
}

impl<T> BatchBuffer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            items: Vec::new(),
            deadline: None,
            interval,
        }
    }

    /// Returns `true` when this add armed the deadline.
    pub fn add(&mut self, item: T, now: Instant) -> bool {
        self.items.push(item);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
            return true;
        }
        false
    }

    /// Take the buffered items and disarm. `None` when empty.
    pub fn take(&mut self) -> Option<Vec<T>> {
        self.deadline = None;
        if self.items.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.items))
    }

    /// Discard the buffered items and disarm. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        self.deadline = None;
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
//  MessageBatcher: coalescing task
// ═══════════════════════════════════════════════════════════════

enum Command<T> {
    Add(T),
    Flush(Option<oneshot::Sender<usize>>),
    Clear(Option<oneshot::Sender<usize>>),
}

/// Handle to a coalescing task. Cheap to clone; `add` never blocks.
pub struct MessageBatcher<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
}

impl<T> Clone for MessageBatcher<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Send + 'static> MessageBatcher<T> {
    /// Spawn the batcher task. It flushes whatever is buffered and exits
    /// when `token` is cancelled or every handle is dropped.
    pub fn spawn(
        interval: Duration,
        sink: Arc<dyn BatchSink<T>>,
        token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(BatchBuffer::new(interval), rx, sink, token));
        (Self { tx }, task)
    }

    pub fn add(&self, item: T) -> Result<(), PipelineError> {
        self.send(Command::Add(item))
    }

    /// Request a flush without waiting for it.
    pub fn flush(&self) -> Result<(), PipelineError> {
        self.send(Command::Flush(None))
    }

    /// Flush and wait until the sink has received the batch.
    /// Returns the number of records delivered.
    pub async fn flush_and_wait(&self) -> Result<usize, PipelineError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Flush(Some(ack)))?;
        done.await.map_err(|_| PipelineError::BatcherClosed)
    }

    /// Discard buffered records without delivering them.
    pub fn clear(&self) -> Result<(), PipelineError> {
        self.send(Command::Clear(None))
    }

    /// Clear and wait. Returns the number of records discarded.
    pub async fn clear_and_wait(&self) -> Result<usize, PipelineError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Clear(Some(ack)))?;
        done.await.map_err(|_| PipelineError::BatcherClosed)
    }

    fn send(&self, cmd: Command<T>) -> Result<(), PipelineError> {
        self.tx.send(cmd).map_err(|_| PipelineError::BatcherClosed)
    }
}

async fn run<T>(
    mut buffer: BatchBuffer<T>,
    mut rx: mpsc::UnboundedReceiver<Command<T>>,
    sink: Arc<dyn BatchSink<T>>,
    token: CancellationToken,
) {
    loop {
        let deadline = buffer.deadline();
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            // Timer first so a steady stream of adds cannot starve it;
            // queued commands before cancellation so nothing sent is lost.
            biased;
            _ = timer => {
                deliver(&mut buffer, &*sink);
            }
            cmd = rx.recv() => match cmd {
                Some(Command::Add(item)) => {
                    buffer.add(item, Instant::now());
                }
                Some(Command::Flush(ack)) => {
                    let n = deliver(&mut buffer, &*sink);
                    if let Some(ack) = ack {
                        let _ = ack.send(n);
                    }
                }
                Some(Command::Clear(ack)) => {
                    let dropped = buffer.clear();
                    if dropped > 0 {
                        tracing::debug!(dropped, "batch discarded");
                    }
                    if let Some(ack) = ack {
                        let _ = ack.send(dropped);
                    }
                }
                None => break,
            },
            _ = token.cancelled() => break,
        }
    }

    let n = deliver(&mut buffer, &*sink);
    tracing::debug!(flushed = n, "batcher stopped");
}

fn deliver<T>(buffer: &mut BatchBuffer<T>, sink: &dyn BatchSink<T>) -> usize {
    match buffer.take() {
        Some(batch) => {
            let n = batch.len();
            sink.deliver(batch);
            n
        }
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collector() -> (Arc<Mutex<Vec<Vec<u32>>>>, Arc<dyn BatchSink<u32>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let sink: Arc<dyn BatchSink<u32>> = Arc::new(move |batch: Vec<u32>| {
            sink_seen.lock().unwrap().push(batch);
        });
        (seen, sink)
    }

    #[test]
    fn buffer_arms_once_until_taken() {
        let start = Instant::now();
        let mut buffer = BatchBuffer::new(Duration::from_millis(100));

        assert!(buffer.add(1, start));
        assert!(!buffer.add(2, start + Duration::from_millis(50)));
        assert_eq!(buffer.deadline(), Some(start + Duration::from_millis(100)));

        assert_eq!(buffer.take(), Some(vec![1, 2]));
        assert_eq!(buffer.deadline(), None);
        assert_eq!(buffer.take(), None);

        assert!(buffer.add(3, start));
        assert_eq!(buffer.clear(), 1);
        assert_eq!(buffer.deadline(), None);
        assert_eq!(buffer.clear(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_delivered_as_one_batch_after_the_window() {
        let (seen, sink) = collector();
        let (batcher, _task) = MessageBatcher::spawn(Duration::from_millis(120), sink, CancellationToken::new());

        for i in 0..5 {
            batcher.add(i).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(seen.lock().unwrap().is_empty());

        batcher.add(5).unwrap();
        tokio::time::sleep(Duration::from_millis(61)).await;
        assert_eq!(*seen.lock().unwrap(), vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_flush_delivers_immediately() {
        let (seen, sink) = collector();
        let (batcher, _task) = MessageBatcher::spawn(Duration::from_secs(60), sink, CancellationToken::new());

        batcher.add(1).unwrap();
        batcher.add(2).unwrap();
        assert_eq!(batcher.flush_and_wait().await.unwrap(), 2);
        assert_eq!(batcher.flush_and_wait().await.unwrap(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_and_disarms() {
        let (seen, sink) = collector();
        let (batcher, _task) = MessageBatcher::spawn(Duration::from_millis(100), sink, CancellationToken::new());

        batcher.add(1).unwrap();
        assert_eq!(batcher.clear_and_wait().await.unwrap(), 1);
        assert_eq!(batcher.clear_and_wait().await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_flushes_pending_records() {
        let (seen, sink) = collector();
        let token = CancellationToken::new();
        let (batcher, task) = MessageBatcher::spawn(Duration::from_secs(60), sink, token.clone());

        batcher.add(7).unwrap();
        token.cancel();
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![vec![7]]);
        assert!(matches!(batcher.add(8), Err(PipelineError::BatcherClosed)));
    }
}
