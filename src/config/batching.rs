//! Executor batching settings

use serde::{Deserialize, Serialize};

/// How the executor groups queued requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum requests handed to the engine in one call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Requests allowed to wait in the queue before submissions are refused
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_max_batch_size() -> usize {
    16
}

fn default_max_queue_size() -> usize {
    1024
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_queue_size: default_max_queue_size(),
        }
    }
}
