//! Transaction orchestrator.
//!
//! Owns the per-project pipeline: answer duplicates from the dedup window,
//! resolve the actor, validate and apply the event to a draft, persist the
//! touched rows with bounded retry, then publish the new progress snapshot
//! and hand domain events to the emitter.
//!
//! ## Concurrency
//!
//! Each loaded project has a [`ProjectCell`]: a fair `tokio::sync::Mutex`
//! around its mutable state, so events for one project apply one at a time in
//! receipt order while other projects proceed in parallel. Reads
//! ([`Orchestrator::get_progress`], [`Orchestrator::project_report`]) never
//! take the lock; they use the last committed snapshot from a `watch`
//! channel.
//!
//! ## Degraded writes
//!
//! When persistence keeps failing transiently, the accepted decision stays
//! in memory and its change set is queued. The queue drains, in order,
//! before every later write, on every sweep tick and on
//! [`Orchestrator::replay_pending`]. If the store rejects the head of the
//! queue as stale, the whole queue is dropped, its event ids leave the dedup
//! window so they can be resubmitted, and a `queued_writes_dropped` event
//! names them.

mod apply;
mod pump;
mod sweep;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use propie_config::PropieConfig;
use propie_core::entities::{
    CoordinationRequest, CoordinationResult, Professional, ProfessionalAppointment, Project,
    Timeline,
};
use propie_core::enums::{PartyRole, Priority, ProfessionalRole, ProjectPhase};
use propie_core::errors::{CoreError, Invariant, RejectionReason};
use propie_core::events::{DomainEvent, DomainEventKind, EngineEvent, EventEnvelope};
use propie_core::identity::Actor;
use propie_core::ids::{PREFIX_COORDINATION, PREFIX_EVENT, generate_id};
use propie_core::responses::{ProjectProgress, ProjectReport};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::aggregator;
use crate::error::{EngineError, IdentityError, StoreError};
use crate::ports::{ChangeSet, EventEmitter, IdentityResolver, ProfessionalDirectory, ProjectStore};
use crate::retry::with_retry;
use crate::scheduler::{self, Scheduler};

use apply::{Applied, apply_event};
use pump::PumpMessage;

/// External systems the orchestrator depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ProjectStore>,
    pub identity: Arc<dyn IdentityResolver>,
    pub directory: Arc<dyn ProfessionalDirectory>,
    pub emitter: Arc<dyn EventEmitter>,
}

/// Last committed state of one project.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub project: Arc<Project>,
    pub progress: ProjectProgress,
}

/// Outcome of draining a project's replay queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub replayed: usize,
    pub remaining: usize,
    /// Queued writes discarded because the stored rows moved on.
    pub dropped: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Drained {
    replayed: usize,
    dropped: usize,
}

// ---------------------------------------------------------------------------
// Per-project state
// ---------------------------------------------------------------------------

/// Bounded memory of accepted event ids and the progress each produced.
struct DedupWindow {
    capacity: usize,
    order: VecDeque<String>,
    results: HashMap<String, ProjectProgress>,
}

impl DedupWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            results: HashMap::with_capacity(capacity),
        }
    }

    fn get(&self, event_id: &str) -> Option<&ProjectProgress> {
        self.results.get(event_id)
    }

    fn record(&mut self, event_id: String, progress: ProjectProgress) {
        if self.capacity == 0 || self.results.contains_key(&event_id) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.results.remove(&oldest);
            }
        }
        self.order.push_back(event_id.clone());
        self.results.insert(event_id, progress);
    }

    fn forget(&mut self, event_id: &str) {
        if self.results.remove(event_id).is_some() {
            self.order.retain(|id| id != event_id);
        }
    }
}

struct QueuedWrite {
    event_id: Option<String>,
    changes: ChangeSet,
}

struct CellState {
    project: Project,
    processed: DedupWindow,
    pending: VecDeque<QueuedWrite>,
    /// Ids of this project's coordination requests that are still open.
    open_coordinations: Vec<String>,
    sweep: Option<CancellationToken>,
}

struct ProjectCell {
    state: Mutex<CellState>,
    snapshot: watch::Sender<Arc<Snapshot>>,
}

impl ProjectCell {
    fn new(project: Project, progress: ProjectProgress, dedup_window: usize) -> Self {
        let snapshot = Arc::new(Snapshot {
            project: Arc::new(project.clone()),
            progress,
        });
        let (snapshot, _) = watch::channel(snapshot);
        Self {
            state: Mutex::new(CellState {
                project,
                processed: DedupWindow::new(dedup_window),
                pending: VecDeque::new(),
                open_coordinations: Vec::new(),
                sweep: None,
            }),
            snapshot,
        }
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.borrow())
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// The engine's public face. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn ProjectStore>,
    identity: Arc<dyn IdentityResolver>,
    directory: Arc<dyn ProfessionalDirectory>,
    scheduler: Scheduler,
    config: PropieConfig,
    cells: DashMap<String, Arc<ProjectCell>>,
    /// Every coordination result by request id. Written only under the
    /// owning project's lock.
    coordinations: DashMap<String, CoordinationResult>,
    pump: mpsc::UnboundedSender<PumpMessage>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Orchestrator {
    /// Build an orchestrator with the least-loaded selection policy.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime (the event pump is spawned
    /// here).
    #[must_use]
    pub fn new(collaborators: Collaborators, config: PropieConfig) -> Self {
        Self::with_scheduler(collaborators, Scheduler::default(), config)
    }

    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn with_scheduler(
        collaborators: Collaborators,
        scheduler: Scheduler,
        config: PropieConfig,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let pump = pump::spawn(
            collaborators.emitter,
            config.timeouts.notification(),
            shutdown.child_token(),
        );
        tracing::debug!(policy = scheduler.policy_name(), "Orchestrator started");
        Self {
            inner: Arc::new(Inner {
                store: collaborators.store,
                identity: collaborators.identity,
                directory: collaborators.directory,
                scheduler,
                config,
                cells: DashMap::new(),
                coordinations: DashMap::new(),
                pump,
                shutdown,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PropieConfig {
        &self.inner.config
    }

    /// Validate and apply one event.
    ///
    /// Resubmitting an accepted `event_id` returns the progress recorded the
    /// first time and changes nothing.
    ///
    /// # Errors
    ///
    /// `EngineError::Rejected` when the event breaks an invariant (state is
    /// unchanged), `ProjectNotFound`, or a non-transient `Store` failure.
    pub async fn submit_event(
        &self,
        project_id: &str,
        envelope: EventEnvelope,
    ) -> Result<ProjectProgress, EngineError> {
        self.inner.submit_event(project_id, envelope).await
    }

    /// Run the expiry sweep for `project_id` as of `at`.
    ///
    /// The background task calls this on every interval; it is public so a
    /// caller with sweeping disabled can drive time explicitly.
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_event`].
    pub async fn sweep(
        &self,
        project_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ProjectProgress, EngineError> {
        self.inner.sweep(project_id, at).await
    }

    /// Progress over the last committed state, evaluated now.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` if the store has no such project.
    pub async fn get_progress(&self, project_id: &str) -> Result<ProjectProgress, EngineError> {
        let cell = self.inner.cell(project_id).await?;
        let snapshot = cell.current();
        Ok(aggregator::aggregate(
            &snapshot.project,
            Utc::now(),
            self.inner.config.engine.deadline_limit,
        ))
    }

    /// The last committed project state.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` if the store has no such project.
    pub async fn project(&self, project_id: &str) -> Result<Arc<Project>, EngineError> {
        let cell = self.inner.cell(project_id).await?;
        Ok(Arc::clone(&cell.current().project))
    }

    /// Subscribe to snapshots published after each accepted change.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` if the store has no such project.
    pub async fn watch_progress(
        &self,
        project_id: &str,
    ) -> Result<watch::Receiver<Arc<Snapshot>>, EngineError> {
        let cell = self.inner.cell(project_id).await?;
        Ok(cell.snapshot.subscribe())
    }

    /// Resolve a coordination request now and return its id.
    ///
    /// Unfulfilled roles are part of the result, not an error.
    ///
    /// # Errors
    ///
    /// `Core(Validation)` for an empty role list, `Rejected` for an archived
    /// project, `ProjectNotFound`, or a non-transient `Store` failure.
    pub async fn request_coordination(
        &self,
        project_id: &str,
        roles: Vec<ProfessionalRole>,
        timeline: Timeline,
        priority: Priority,
    ) -> Result<String, EngineError> {
        self.inner
            .request_coordination(project_id, roles, timeline, priority)
            .await
    }

    /// # Errors
    ///
    /// `CoordinationNotFound` for an unknown id.
    pub fn get_coordination_status(
        &self,
        coordination_id: &str,
    ) -> Result<CoordinationResult, EngineError> {
        self.inner
            .coordinations
            .get(coordination_id)
            .map(|r| r.clone())
            .ok_or_else(|| EngineError::CoordinationNotFound(coordination_id.to_string()))
    }

    /// Soft-delete a project: stop its sweep and refuse further events.
    ///
    /// The project's coordination results are discarded, and its in-memory
    /// state too once nothing is left to replay; later calls reload the
    /// archived row from the store.
    ///
    /// # Errors
    ///
    /// `Rejected` if the actor is not on the developer side or the project
    /// is already archived.
    pub async fn archive_project(
        &self,
        project_id: &str,
        actor_token: &str,
    ) -> Result<ProjectProgress, EngineError> {
        self.inner.archive_project(project_id, actor_token).await
    }

    /// Progress, appointments by role and open coordination requests.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` if the store has no such project.
    pub async fn project_report(&self, project_id: &str) -> Result<ProjectReport, EngineError> {
        let cell = self.inner.cell(project_id).await?;
        Ok(self.inner.report(project_id, &cell.current(), Utc::now()))
    }

    /// Build the project report and send a `report_generated` event.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` if the store has no such project.
    pub async fn emit_report(&self, project_id: &str) -> Result<ProjectReport, EngineError> {
        let report = self.project_report(project_id).await?;
        self.inner.emit(DomainEvent::new(
            project_id,
            report.generated_at,
            DomainEventKind::ReportGenerated {
                completion_percentage: report.progress.completion_percentage,
                compliance_rate: report.progress.compliance_rate,
                open_coordinations: report.open_coordinations.len(),
            },
        ));
        Ok(report)
    }

    /// Try to persist every queued change set, oldest first.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound`, or a store failure while reloading after a
    /// conflict.
    pub async fn replay_pending(&self, project_id: &str) -> Result<ReplayReport, EngineError> {
        let cell = self.inner.cell(project_id).await?;
        let mut state = cell.state.lock().await;
        let drained = self.inner.drain_pending(&cell, &mut state).await?;
        Ok(ReplayReport {
            replayed: drained.replayed,
            remaining: state.pending.len(),
            dropped: drained.dropped,
        })
    }

    /// Number of change sets waiting for replay.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` if the store has no such project.
    pub async fn pending_writes(&self, project_id: &str) -> Result<usize, EngineError> {
        let cell = self.inner.cell(project_id).await?;
        let state = cell.state.lock().await;
        Ok(state.pending.len())
    }

    /// Whether a background sweep task is running for `project_id`.
    pub async fn sweep_active(&self, project_id: &str) -> bool {
        let cell = self
            .inner
            .cells
            .get(project_id)
            .map(|c| Arc::clone(c.value()));
        match cell {
            Some(cell) => cell.state.lock().await.sweep.is_some(),
            None => false,
        }
    }

    /// Wait until every domain event emitted so far has been handed to the
    /// emitter.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.pump.send(PumpMessage::Flush(tx)).is_ok() {
            // An error means the pump already stopped.
            let _ = rx.await;
        }
    }

    /// Flush pending notifications, then stop the event pump and every
    /// sweep task.
    pub async fn shutdown(&self) {
        self.flush().await;
        self.inner.shutdown.cancel();
        tracing::debug!("Orchestrator shut down");
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

impl Inner {
    #[tracing::instrument(
        skip_all,
        fields(
            project_id = %project_id,
            event_id = %envelope.event_id,
            event_type = envelope.event.event_type(),
        )
    )]
    async fn submit_event(
        self: &Arc<Self>,
        project_id: &str,
        envelope: EventEnvelope,
    ) -> Result<ProjectProgress, EngineError> {
        let cell = self.cell(project_id).await?;
        let mut state = cell.state.lock().await;
        if let Some(progress) = state.processed.get(&envelope.event_id) {
            tracing::debug!("Duplicate event, returning recorded progress");
            return Ok(progress.clone());
        }
        let actor = self.resolve(&envelope.actor_token).await?;
        let now = match envelope.event {
            EngineEvent::TimerTick { at } => at,
            _ => Utc::now(),
        };
        let progress = self
            .process(&cell, &mut state, &envelope.event_id, &actor, &envelope.event, now)
            .await?;
        state
            .processed
            .record(envelope.event_id.clone(), progress.clone());
        Ok(progress)
    }

    #[tracing::instrument(skip(self))]
    async fn sweep(
        self: &Arc<Self>,
        project_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ProjectProgress, EngineError> {
        let cell = self.cell(project_id).await?;
        let event_id = generate_id(PREFIX_EVENT)?;
        let mut state = cell.state.lock().await;
        self.process(
            &cell,
            &mut state,
            &event_id,
            &Actor::system(),
            &EngineEvent::TimerTick { at },
            at,
        )
        .await
    }

    async fn process(
        self: &Arc<Self>,
        cell: &ProjectCell,
        state: &mut CellState,
        event_id: &str,
        actor: &Actor,
        event: &EngineEvent,
        now: DateTime<Utc>,
    ) -> Result<ProjectProgress, EngineError> {
        if state.project.is_archived() {
            return Err(RejectionReason::archived(&state.project.id).into());
        }
        self.drain_pending(cell, state).await?;

        let mut draft = state.project.clone();
        let applied = match apply_event(&mut draft, actor, event_id, event, now) {
            Ok(applied) => applied,
            Err(reason) => {
                tracing::info!(
                    code = %reason.code,
                    invariant = %reason.invariant,
                    detail = %reason.detail,
                    "Event rejected"
                );
                return Err(reason.into());
            }
        };
        let progress = self
            .finish(cell, state, draft, applied, Some(event_id), now)
            .await?;
        tracing::debug!(
            actor_id = %actor.actor_id,
            completion = progress.completion_percentage,
            "Event accepted"
        );
        Ok(progress)
    }

    /// Coordinate, persist, install and publish an accepted draft.
    async fn finish(
        self: &Arc<Self>,
        cell: &ProjectCell,
        state: &mut CellState,
        mut draft: Project,
        mut applied: Applied,
        event_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ProjectProgress, EngineError> {
        self.reevaluate_coordinations(state, &draft, now, &mut applied);
        if draft.phase == ProjectPhase::ActiveSale && !draft.is_archived() {
            self.auto_coordinate(state, &mut draft, now, &mut applied)
                .await?;
        }

        let changes = stage(&mut draft, &applied);
        if !changes.is_empty() {
            self.persist(cell, state, changes, event_id).await?;
        }

        let project_id = draft.id.clone();
        state.project = draft;
        for result in applied.coordinations {
            self.record_coordination(state, result);
        }
        let progress = self.publish(cell, state, now);
        self.sync_sweep(state);
        for kind in applied.events {
            self.emit(DomainEvent::new(project_id.clone(), now, kind));
        }
        Ok(progress)
    }

    async fn persist(
        &self,
        cell: &ProjectCell,
        state: &mut CellState,
        changes: ChangeSet,
        event_id: Option<&str>,
    ) -> Result<(), EngineError> {
        if !state.pending.is_empty() {
            self.queue(state, changes, event_id, 0, "earlier writes are still queued".into());
            return Ok(());
        }
        let attempted = with_retry(
            &self.config.retry,
            self.config.timeouts.persistence(),
            "commit",
            || self.store.commit(&changes),
        )
        .await;
        match attempted.result {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => {
                self.queue(state, changes, event_id, attempted.attempts, e.to_string());
                Ok(())
            }
            Err(e @ StoreError::VersionConflict { .. }) => {
                tracing::warn!(error = %e, "Stored rows changed underneath the engine, reloading");
                self.reload(cell, state).await?;
                Err(RejectionReason::concurrent_modification(e.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn queue(
        &self,
        state: &mut CellState,
        changes: ChangeSet,
        event_id: Option<&str>,
        attempts: u32,
        detail: String,
    ) {
        let project_id = changes.project_id.clone();
        state.pending.push_back(QueuedWrite {
            event_id: event_id.map(str::to_string),
            changes,
        });
        let queued = state.pending.len();
        tracing::warn!(
            project_id = %project_id,
            event_id = ?event_id,
            attempts,
            queued,
            detail = %detail,
            "Write degraded, change queued for replay"
        );
        self.emit(DomainEvent::new(
            project_id,
            Utc::now(),
            DomainEventKind::DegradedWrite {
                event_id: event_id.map(str::to_string),
                attempts,
                detail,
                queued,
            },
        ));
    }

    /// Commit queued change sets in order until one fails.
    ///
    /// A conflict means the queue no longer applies to the stored rows: it
    /// is dropped and the project reloaded.
    async fn drain_pending(
        &self,
        cell: &ProjectCell,
        state: &mut CellState,
    ) -> Result<Drained, EngineError> {
        let mut drained = Drained::default();
        while let Some(head) = state.pending.front() {
            let attempted = with_retry(
                &self.config.retry,
                self.config.timeouts.persistence(),
                "replay",
                || self.store.commit(&head.changes),
            )
            .await;
            match attempted.result {
                Ok(()) => {
                    if let Some(write) = state.pending.pop_front() {
                        tracing::debug!(
                            event_id = ?write.event_id,
                            rows = write.changes.len(),
                            "Replayed queued write"
                        );
                    }
                    drained.replayed += 1;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        queued = state.pending.len(),
                        error = %e,
                        "Replay queue still blocked"
                    );
                    break;
                }
                Err(e) => {
                    drained.dropped = self.drop_pending(state, &e);
                    self.reload(cell, state).await?;
                    break;
                }
            }
        }
        Ok(drained)
    }

    /// Discard the replay queue and make its events resubmittable.
    fn drop_pending(&self, state: &mut CellState, error: &StoreError) -> usize {
        let dropped: Vec<QueuedWrite> = state.pending.drain(..).collect();
        let event_ids: Vec<String> = dropped
            .iter()
            .filter_map(|write| write.event_id.clone())
            .collect();
        for event_id in &event_ids {
            state.processed.forget(event_id);
        }
        tracing::error!(
            project_id = %state.project.id,
            dropped = dropped.len(),
            event_ids = ?event_ids,
            error = %error,
            "Replay queue cannot drain, reloading project from store"
        );
        self.emit(DomainEvent::new(
            state.project.id.clone(),
            Utc::now(),
            DomainEventKind::QueuedWritesDropped {
                event_ids,
                dropped: dropped.len(),
                detail: error.to_string(),
            },
        ));
        dropped.len()
    }

    // -- coordination -------------------------------------------------------

    fn reevaluate_coordinations(
        &self,
        state: &CellState,
        draft: &Project,
        now: DateTime<Utc>,
        applied: &mut Applied,
    ) {
        for id in &state.open_coordinations {
            let Some(current) = self.coordinations.get(id).map(|r| r.clone()) else {
                continue;
            };
            let roles = scheduler::requested_roles(&current);
            let status = scheduler::evaluate(&current, &roles, draft, now);
            if status == current.status {
                continue;
            }
            let mut updated = current;
            updated.status = status;
            if status.is_closed() {
                updated.closed_at = Some(now);
                let unfulfilled_roles = roles
                    .iter()
                    .copied()
                    .filter(|role| draft.active_appointment(*role).is_none())
                    .collect();
                tracing::info!(coordination_id = %id, status = %status, "Coordination closed");
                applied.events.push(DomainEventKind::CoordinationClosed {
                    coordination_id: id.clone(),
                    status,
                    unfulfilled_roles,
                });
            }
            applied.coordinations.push(updated);
        }
    }

    /// Open an automatic request for required roles that have no active
    /// appointment and no open request covering them.
    async fn auto_coordinate(
        &self,
        state: &CellState,
        draft: &mut Project,
        now: DateTime<Utc>,
        applied: &mut Applied,
    ) -> Result<(), EngineError> {
        let mut open: Vec<CoordinationResult> = applied.coordinations.clone();
        for id in &state.open_coordinations {
            if open.iter().any(|r| &r.request_id == id) {
                continue;
            }
            if let Some(result) = self.coordinations.get(id) {
                open.push(result.clone());
            }
        }
        let covered: Vec<ProfessionalRole> = open
            .iter()
            .filter(|r| !r.is_closed())
            .flat_map(scheduler::requested_roles)
            .collect();
        let roles: Vec<ProfessionalRole> = draft
            .uncovered_roles()
            .into_iter()
            .filter(|role| !covered.contains(role))
            .collect();
        if roles.is_empty() {
            return Ok(());
        }

        let window = chrono::Duration::days(i64::from(self.config.engine.coordination_window_days));
        let request = CoordinationRequest {
            id: generate_id(PREFIX_COORDINATION)?,
            project_id: draft.id.clone(),
            required_roles: roles,
            priority: Priority::High,
            timeline: Timeline::new(now, now + window)?,
            location: Some(draft.location.clone()),
            created_at: now,
            automatic: true,
        };
        self.coordinate(draft, &request, now, applied).await
    }

    async fn coordinate(
        &self,
        draft: &mut Project,
        request: &CoordinationRequest,
        now: DateTime<Utc>,
        applied: &mut Applied,
    ) -> Result<(), EngineError> {
        let candidates = self.candidates(&request.required_roles).await;
        let result = self.scheduler.resolve(request, draft, &candidates, now)?;

        applied.events.push(DomainEventKind::CoordinationRequested {
            coordination_id: request.id.clone(),
            roles: request.required_roles.clone(),
            priority: request.priority,
            automatic: request.automatic,
        });
        for appointment in &result.proposed_appointments {
            if draft.appointment(&appointment.id).is_some() {
                continue;
            }
            applied.touch_appointment(&appointment.id);
            applied.events.push(DomainEventKind::AppointmentProposed {
                appointment_id: appointment.id.clone(),
                professional_id: appointment.professional_id.clone(),
                role: appointment.role,
                coordination_id: Some(request.id.clone()),
            });
            draft.appointments.push(appointment.clone());
        }
        if result.is_closed() {
            applied.events.push(DomainEventKind::CoordinationClosed {
                coordination_id: request.id.clone(),
                status: result.status,
                unfulfilled_roles: result.unfulfilled_roles.clone(),
            });
        }
        tracing::info!(
            coordination_id = %request.id,
            automatic = request.automatic,
            proposed = result.proposed_appointments.len(),
            unfulfilled = ?result.unfulfilled_roles,
            status = %result.status,
            "Coordination resolved"
        );
        applied.coordinations.push(result);
        Ok(())
    }

    /// Directory lookup; a failing directory yields no candidates.
    async fn candidates(&self, roles: &[ProfessionalRole]) -> Vec<Professional> {
        let timeout = self.config.timeouts.persistence();
        match tokio::time::timeout(timeout, self.directory.candidates(roles)).await {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Professional directory lookup failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(?timeout, "Professional directory lookup timed out");
                Vec::new()
            }
        }
    }

    fn record_coordination(&self, state: &mut CellState, result: CoordinationResult) {
        let id = result.request_id.clone();
        if result.is_closed() {
            state.open_coordinations.retain(|open| open != &id);
        } else if !state.open_coordinations.contains(&id) {
            state.open_coordinations.push(id.clone());
        }
        self.coordinations.insert(id, result);
    }

    async fn request_coordination(
        self: &Arc<Self>,
        project_id: &str,
        roles: Vec<ProfessionalRole>,
        timeline: Timeline,
        priority: Priority,
    ) -> Result<String, EngineError> {
        if roles.is_empty() {
            return Err(CoreError::Validation(
                "a coordination request needs at least one role".into(),
            )
            .into());
        }
        let cell = self.cell(project_id).await?;
        let mut state = cell.state.lock().await;
        if state.project.is_archived() {
            return Err(RejectionReason::archived(project_id).into());
        }
        self.drain_pending(&cell, &mut state).await?;

        let now = Utc::now();
        let request = CoordinationRequest {
            id: generate_id(PREFIX_COORDINATION)?,
            project_id: project_id.to_string(),
            required_roles: roles,
            priority,
            timeline,
            location: Some(state.project.location.clone()),
            created_at: now,
            automatic: false,
        };
        let mut draft = state.project.clone();
        let mut applied = Applied::default();
        self.coordinate(&mut draft, &request, now, &mut applied)
            .await?;
        self.finish(&cell, &mut state, draft, applied, None, now)
            .await?;
        Ok(request.id)
    }

    async fn archive_project(
        self: &Arc<Self>,
        project_id: &str,
        actor_token: &str,
    ) -> Result<ProjectProgress, EngineError> {
        let actor = self.resolve(actor_token).await?;
        if !matches!(actor.role, PartyRole::Developer | PartyRole::ProjectManager) {
            return Err(RejectionReason::unauthorized(
                Invariant::EdgeAuthorization,
                format!("{} may not archive a project", actor.role),
            )
            .into());
        }
        let cell = self.cell(project_id).await?;
        let mut state = cell.state.lock().await;
        if state.project.is_archived() {
            return Err(RejectionReason::archived(project_id).into());
        }
        self.drain_pending(&cell, &mut state).await?;

        let now = Utc::now();
        let mut draft = state.project.clone();
        draft.archived_at = Some(now);
        let mut applied = Applied {
            header: true,
            ..Applied::default()
        };
        applied.events.push(DomainEventKind::ProjectArchived);
        let progress = self
            .finish(&cell, &mut state, draft, applied, None, now)
            .await?;

        self.coordinations.retain(|_, result| result.project_id != project_id);
        state.open_coordinations.clear();
        if state.pending.is_empty() {
            self.cells.remove(project_id);
        }
        tracing::info!(project_id, actor_id = %actor.actor_id, "Project archived");
        Ok(progress)
    }

    // -- plumbing -----------------------------------------------------------

    async fn resolve(&self, actor_token: &str) -> Result<Actor, EngineError> {
        let timeout = self.config.timeouts.persistence();
        match tokio::time::timeout(timeout, self.identity.resolve(actor_token)).await {
            Ok(Ok(actor)) => Ok(actor),
            Ok(Err(IdentityError::UnknownToken)) => Err(RejectionReason::unauthorized(
                Invariant::ActorIdentity,
                "actor token does not resolve to a known party",
            )
            .into()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(IdentityError::Unavailable(format!("timed out after {timeout:?}")).into()),
        }
    }

    /// The loaded cell for `project_id`, loading it on first use.
    async fn cell(self: &Arc<Self>, project_id: &str) -> Result<Arc<ProjectCell>, EngineError> {
        if let Some(cell) = self.cells.get(project_id) {
            return Ok(Arc::clone(cell.value()));
        }
        let project = self.load(project_id).await?;
        let progress =
            aggregator::aggregate(&project, Utc::now(), self.config.engine.deadline_limit);
        let loaded = Arc::new(ProjectCell::new(
            project,
            progress,
            self.config.engine.dedup_window,
        ));
        // A concurrent load may have won; keep whichever landed first.
        let cell = Arc::clone(
            self.cells
                .entry(project_id.to_string())
                .or_insert(loaded)
                .value(),
        );
        {
            let mut state = cell.state.lock().await;
            self.sync_sweep(&mut state);
        }
        tracing::debug!(project_id, "Project loaded");
        Ok(cell)
    }

    async fn load(&self, project_id: &str) -> Result<Project, EngineError> {
        let attempted = with_retry(
            &self.config.retry,
            self.config.timeouts.persistence(),
            "load_project",
            || self.store.load_project(project_id),
        )
        .await;
        match attempted.result {
            Ok(project) => {
                for component in &project.components {
                    component.check_shape()?;
                }
                Ok(project)
            }
            Err(StoreError::NotFound(_)) => Err(EngineError::ProjectNotFound(project_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn reload(&self, cell: &ProjectCell, state: &mut CellState) -> Result<(), EngineError> {
        state.project = self.load(&state.project.id).await?;
        self.publish(cell, state, Utc::now());
        Ok(())
    }

    fn publish(&self, cell: &ProjectCell, state: &CellState, now: DateTime<Utc>) -> ProjectProgress {
        let progress =
            aggregator::aggregate(&state.project, now, self.config.engine.deadline_limit);
        cell.snapshot.send_replace(Arc::new(Snapshot {
            project: Arc::new(state.project.clone()),
            progress: progress.clone(),
        }));
        progress
    }

    /// Start or stop the sweep task to match the project's phase.
    fn sync_sweep(self: &Arc<Self>, state: &mut CellState) {
        let project = &state.project;
        let wanted =
            self.config.sweep.enabled && !project.is_archived() && project.phase.runs_sweep();
        match (wanted, state.sweep.take()) {
            (true, None) => {
                let token = self.shutdown.child_token();
                sweep::spawn(
                    Arc::downgrade(self),
                    project.id.clone(),
                    self.config.sweep.interval(),
                    token.clone(),
                );
                tracing::debug!(project_id = %project.id, "Expiry sweep started");
                state.sweep = Some(token);
            }
            (false, Some(token)) => {
                token.cancel();
                tracing::debug!(project_id = %project.id, phase = %project.phase, "Expiry sweep cancelled");
            }
            (_, running) => state.sweep = running,
        }
    }

    fn emit(&self, event: DomainEvent) {
        if self.pump.send(PumpMessage::Event(event)).is_err() {
            tracing::warn!("Event pump stopped, dropping domain event");
        }
    }

    fn report(&self, project_id: &str, snapshot: &Snapshot, now: DateTime<Utc>) -> ProjectReport {
        let project = &snapshot.project;
        let mut appointments: BTreeMap<ProfessionalRole, Vec<ProfessionalAppointment>> =
            BTreeMap::new();
        for appointment in project.appointments.iter().filter(|a| !a.status.is_terminal()) {
            appointments
                .entry(appointment.role)
                .or_default()
                .push(appointment.clone());
        }
        let mut open_coordinations: Vec<CoordinationResult> = self
            .coordinations
            .iter()
            .filter(|r| r.project_id == project_id && !r.is_closed())
            .map(|r| r.value().clone())
            .collect();
        open_coordinations.sort_by(|a, b| {
            a.resolved_at
                .cmp(&b.resolved_at)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        ProjectReport {
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            progress: aggregator::aggregate(project, now, self.config.engine.deadline_limit),
            appointments,
            open_coordinations,
            generated_at: now,
        }
    }
}

/// Collect the touched rows at their observed versions, then advance the
/// draft to the versions the store will hold after the commit.
fn stage(draft: &mut Project, applied: &Applied) -> ChangeSet {
    let mut changes = ChangeSet::new(draft.id.clone());
    if applied.header {
        changes.header = Some(draft.header());
        draft.version += 1;
    }
    for id in &applied.components {
        if let Some(component) = draft.component_mut(id) {
            changes.components.push(component.clone());
            component.version += 1;
        }
    }
    for id in &applied.appointments {
        if let Some(appointment) = draft.appointment_mut(id) {
            changes.appointments.push(appointment.clone());
            appointment.version += 1;
        }
    }
    changes
}
