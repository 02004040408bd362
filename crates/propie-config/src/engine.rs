//! Orchestrator behaviour knobs.

use serde::{Deserialize, Serialize};

/// Default number of processed event ids remembered per project.
const fn default_dedup_window() -> usize {
    1024
}

/// Default coordination window for automatically raised requests.
const fn default_coordination_window_days() -> u32 {
    14
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Processed event ids remembered per project for idempotency.
    #[serde(default = "default_dedup_window")]
    pub dedup_window: usize,

    /// Days between start and target completion of automatic coordination
    /// requests.
    #[serde(default = "default_coordination_window_days")]
    pub coordination_window_days: u32,

    /// Cap on `upcoming_deadlines` in progress responses. Unlimited when unset.
    #[serde(default)]
    pub deadline_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedup_window: default_dedup_window(),
            coordination_window_days: default_coordination_window_days(),
            deadline_limit: None,
        }
    }
}
