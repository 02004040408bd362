//! Background delivery of domain events.
//!
//! The orchestrator never awaits the emitter while holding a project lock:
//! events go onto an unbounded channel and a single task delivers them in
//! order, each under the notification timeout. Failures are logged and
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use propie_core::events::DomainEvent;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::EmitError;
use crate::ports::EventEmitter;

pub(crate) enum PumpMessage {
    Event(DomainEvent),
    /// Answered once every earlier message has been handled.
    Flush(oneshot::Sender<()>),
}

/// Spawn the delivery task. Must be called inside a tokio runtime.
pub(crate) fn spawn(
    emitter: Arc<dyn EventEmitter>,
    timeout: Duration,
    token: CancellationToken,
) -> mpsc::UnboundedSender<PumpMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(emitter, rx, timeout, token));
    tx
}

async fn run(
    emitter: Arc<dyn EventEmitter>,
    mut rx: mpsc::UnboundedReceiver<PumpMessage>,
    timeout: Duration,
    token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = token.cancelled() => break,
            message = rx.recv() => message,
        };
        match message {
            Some(PumpMessage::Event(event)) => deliver(emitter.as_ref(), &event, timeout).await,
            Some(PumpMessage::Flush(done)) => {
                // The flusher may have given up waiting.
                let _ = done.send(());
            }
            None => break,
        }
    }
    tracing::debug!("Event pump stopped");
}

async fn deliver(emitter: &dyn EventEmitter, event: &DomainEvent, timeout: Duration) {
    let outcome = match tokio::time::timeout(timeout, emitter.emit(event)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(EmitError::Timeout(timeout)),
    };
    if let Err(e) = outcome {
        tracing::warn!(
            project_id = %event.project_id,
            event_type = event.event_type(),
            error = %e,
            "Failed to deliver domain event"
        );
    }
}
