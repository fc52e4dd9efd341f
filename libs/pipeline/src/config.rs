use std::time::Duration;

use serde::Deserialize;

use crate::PipelineError;

// ═══════════════════════════════════════════════════════════════
//  Batch Config
// ═══════════════════════════════════════════════════════════════

/// Coalescing window of the ingest batcher.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Milliseconds between the first buffered message and its flush.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Capacity of the source → ingest channel.
    #[serde(default = "default_ingest_buffer")]
    pub buffer: usize,
}

impl BatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.interval_ms == 0 {
            return Err(PipelineError::InvalidConfig("interval_ms must be > 0".into()));
        }
        if self.buffer == 0 {
            return Err(PipelineError::InvalidConfig("buffer must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            buffer: default_ingest_buffer(),
        }
    }
}

fn default_interval_ms() -> u64 {
    120
}
fn default_ingest_buffer() -> usize {
    8192
}
