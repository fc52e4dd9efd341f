use std::time::Duration;

const INITIAL_MS: u64 = 100;
const MAX_MS: u64 = 30_000;

/// Reconnect delay: starts at 100 ms and doubles up to 30 s.
#[derive(Debug)]
pub struct Backoff {
    current_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            current_ms: INITIAL_MS,
            attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms;
        self.current_ms = (self.current_ms * 2).min(MAX_MS);
        self.attempt += 1;
        Duration::from_millis(delay)
    }

    /// Attempts since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.current_ms = INITIAL_MS;
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
