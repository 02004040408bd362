//! Per-project expiry sweep task.
//!
//! One task per project while its phase runs the sweep. The task holds a
//! weak reference to the engine, so dropping the orchestrator ends it; the
//! cancellation token ends it on phase change, archival or shutdown.

use std::sync::Weak;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::Inner;

pub(super) fn spawn(
    inner: Weak<Inner>,
    project_id: String,
    period: Duration,
    token: CancellationToken,
) {
    tokio::spawn(run(inner, project_id, period, token));
}

async fn run(inner: Weak<Inner>, project_id: String, period: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = interval.tick() => {
                let Some(engine) = inner.upgrade() else { break };
                if let Err(e) = engine.sweep(&project_id, Utc::now()).await {
                    tracing::warn!(project_id = %project_id, error = %e, "Expiry sweep failed");
                }
            }
        }
    }
    tracing::debug!(project_id = %project_id, "Expiry sweep stopped");
}
