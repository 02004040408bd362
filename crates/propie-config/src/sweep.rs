//! Periodic expiry sweep.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_enabled() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    /// Spawn a per-project sweep task while the project is in a sweeping phase.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl SweepConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
