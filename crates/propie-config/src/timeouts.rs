//! Per-call timeouts for the persistence and notification collaborators.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_persistence_ms() -> u64 {
    5000
}

const fn default_notification_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_persistence_ms")]
    pub persistence_ms: u64,

    #[serde(default = "default_notification_ms")]
    pub notification_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            persistence_ms: default_persistence_ms(),
            notification_ms: default_notification_ms(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub const fn persistence(&self) -> Duration {
        Duration::from_millis(self.persistence_ms)
    }

    #[must_use]
    pub const fn notification(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}
