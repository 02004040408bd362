//! In-memory implementations of the collaborator traits.
//!
//! Suitable for development, the CLI replay command and tests. The store can
//! inject transient failures to exercise the retry and replay paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use propie_core::entities::{Professional, Project};
use propie_core::enums::ProfessionalRole;
use propie_core::events::DomainEvent;
use propie_core::identity::Actor;
use tokio::sync::Mutex;

use crate::error::{EmitError, IdentityError, StoreError};
use crate::ports::{ChangeSet, EventEmitter, IdentityResolver, ProfessionalDirectory, ProjectStore};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Project store backed by a `DashMap`.
#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: DashMap<String, Project>,
    fail_next: AtomicU32,
    unavailable: AtomicBool,
    commits: AtomicU64,
}

impl InMemoryProjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a project as-is, versions included.
    pub fn insert(&self, project: Project) {
        self.projects.insert(project.id.clone(), project);
    }

    #[must_use]
    pub fn get(&self, project_id: &str) -> Option<Project> {
        self.projects.get(project_id).map(|p| p.clone())
    }

    /// Fail the next `n` commits with a transient error.
    pub fn fail_next_commits(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every call with a transient error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Successful commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Simulate a write by another system: bump a component's stored version.
    pub fn touch_component(&self, project_id: &str, component_id: &str) {
        if let Some(mut project) = self.projects.get_mut(project_id) {
            if let Some(component) = project.component_mut(component_id) {
                component.version += 1;
            }
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("store unavailable".into()));
        }
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Transient("injected failure".into()));
        }
        Ok(())
    }
}

fn check_version(
    entity: &'static str,
    id: &str,
    expected: u64,
    stored: Option<u64>,
) -> Result<(), StoreError> {
    let found = stored.unwrap_or(0);
    if found == expected {
        Ok(())
    } else {
        Err(StoreError::VersionConflict {
            entity,
            id: id.to_string(),
            expected,
            found,
        })
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn load_project(&self, project_id: &str) -> Result<Project, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("store unavailable".into()));
        }
        self.get(project_id)
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        self.check_available()?;
        let mut project = self
            .projects
            .get_mut(&changes.project_id)
            .ok_or_else(|| StoreError::NotFound(changes.project_id.clone()))?;

        // Check every row before touching any.
        if let Some(header) = &changes.header {
            check_version("project", &header.id, header.version, Some(project.version))?;
        }
        for row in &changes.components {
            let stored = project.component(&row.id).map(|c| c.version);
            check_version("component", &row.id, row.version, stored)?;
        }
        for row in &changes.appointments {
            let stored = project.appointment(&row.id).map(|a| a.version);
            check_version("appointment", &row.id, row.version, stored)?;
        }

        if let Some(header) = &changes.header {
            let mut header = header.clone();
            header.version += 1;
            project.apply_header(header);
        }
        for row in &changes.components {
            let mut row = row.clone();
            row.version += 1;
            match project.component_mut(&row.id) {
                Some(existing) => *existing = row,
                None => project.components.push(row),
            }
        }
        for row in &changes.appointments {
            let mut row = row.clone();
            row.version += 1;
            match project.appointment_mut(&row.id) {
                Some(existing) => *existing = row,
                None => project.appointments.push(row),
            }
        }
        drop(project);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Fixed token → actor table.
#[derive(Default)]
pub struct StaticIdentityResolver {
    actors: DashMap<String, Actor>,
}

impl StaticIdentityResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(self, token: impl Into<String>, actor: Actor) -> Self {
        self.actors.insert(token.into(), actor);
        self
    }

    pub fn insert(&self, token: impl Into<String>, actor: Actor) {
        self.actors.insert(token.into(), actor);
    }

    pub fn revoke(&self, token: &str) {
        self.actors.remove(token);
    }
}

impl From<HashMap<String, Actor>> for StaticIdentityResolver {
    fn from(map: HashMap<String, Actor>) -> Self {
        Self {
            actors: map.into_iter().collect(),
        }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, actor_token: &str) -> Result<Actor, IdentityError> {
        self.actors
            .get(actor_token)
            .map(|a| a.clone())
            .ok_or(IdentityError::UnknownToken)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryDirectory {
    professionals: DashMap<String, Professional>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, professional: Professional) {
        self.professionals
            .insert(professional.id.clone(), professional);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.professionals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.professionals.is_empty()
    }
}

impl FromIterator<Professional> for InMemoryDirectory {
    fn from_iter<I: IntoIterator<Item = Professional>>(iter: I) -> Self {
        let directory = Self::new();
        for professional in iter {
            directory.insert(professional);
        }
        directory
    }
}

#[async_trait]
impl ProfessionalDirectory for InMemoryDirectory {
    async fn candidates(
        &self,
        roles: &[ProfessionalRole],
    ) -> Result<Vec<Professional>, StoreError> {
        let mut out: Vec<Professional> = self
            .professionals
            .iter()
            .filter(|p| roles.contains(&p.role))
            .map(|p| p.value().clone())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Emitters
// ---------------------------------------------------------------------------

/// Keeps every emitted event for inspection.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<DomainEvent>>,
    failing: AtomicBool,
}

impl RecordingEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent emit fail (events are not recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }

    /// Recorded event type names, in emission order.
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .await
            .iter()
            .map(DomainEvent::event_type)
            .collect()
    }
}

#[async_trait]
impl EventEmitter for RecordingEmitter {
    async fn emit(&self, event: &DomainEvent) -> Result<(), EmitError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmitError::Unavailable("recording emitter set to fail".into()));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Writes each event to the tracing log at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

#[async_trait]
impl EventEmitter for LogEmitter {
    async fn emit(&self, event: &DomainEvent) -> Result<(), EmitError> {
        tracing::info!(
            project_id = %event.project_id,
            event_type = event.event_type(),
            "domain event"
        );
        Ok(())
    }
}
