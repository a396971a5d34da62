use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upper bound on the default worker count.
const DEFAULT_MAX_WORKERS: usize = 8;

/// Background worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Dispatch", inline)]
#[serde(default)]
pub struct DispatchOptions {
    /// Number of background workers. Zero is treated as one.
    #[schemars(title = "Workers", range(min = 1, max = 64))]
    pub worker_count: usize,
    /// Quiet period after which an idle worker retires.
    #[schemars(skip)]
    pub idle_timeout_ms: u64,
    /// Intervals per message sent to a worker.
    #[schemars(skip)]
    pub chunk_size: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get);
        Self {
            worker_count: available.clamp(1, DEFAULT_MAX_WORKERS),
            idle_timeout_ms: 2000,
            chunk_size: 256,
        }
    }
}

impl DispatchOptions {
    /// Worker count, at least one.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.worker_count.max(1)
    }

    /// Idle retirement timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.max(1))
    }

    /// Chunk size, at least one.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
