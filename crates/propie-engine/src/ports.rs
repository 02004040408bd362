//! Collaborator interfaces consumed by the orchestrator.
//!
//! Persistence, identity, the professional directory and notification are
//! external systems. The orchestrator receives them as trait objects at
//! construction time; `memory` provides in-process implementations.

use async_trait::async_trait;
use propie_core::entities::{Component, Professional, ProfessionalAppointment, Project, ProjectHeader};
use propie_core::enums::ProfessionalRole;
use propie_core::events::DomainEvent;
use propie_core::identity::Actor;

use crate::error::{EmitError, IdentityError, StoreError};

/// Rows written by one accepted decision.
///
/// Every row carries the version the engine last observed. A store accepts
/// the set only if every stored row still has that version (absent rows
/// must carry version 0), and then stores each row at `version + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub project_id: String,
    pub header: Option<ProjectHeader>,
    pub components: Vec<Component>,
    pub appointments: Vec<ProfessionalAppointment>,
}

impl ChangeSet {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            header: None,
            components: Vec::new(),
            appointments: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.components.is_empty() && self.appointments.is_empty()
    }

    /// Total rows in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.header.is_some()) + self.components.len() + self.appointments.len()
    }
}

/// Persistence collaborator.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project with all of its components and appointments.
    async fn load_project(&self, project_id: &str) -> Result<Project, StoreError>;

    /// Apply every row of `changes` atomically, or none of them.
    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError>;

    async fn save_component(
        &self,
        project_id: &str,
        component: &Component,
    ) -> Result<(), StoreError> {
        let mut changes = ChangeSet::new(project_id);
        changes.components.push(component.clone());
        self.commit(&changes).await
    }

    async fn save_appointment(
        &self,
        project_id: &str,
        appointment: &ProfessionalAppointment,
    ) -> Result<(), StoreError> {
        let mut changes = ChangeSet::new(project_id);
        changes.appointments.push(appointment.clone());
        self.commit(&changes).await
    }
}

/// Identity collaborator: opaque token to `{ actor_id, role }`.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, actor_token: &str) -> Result<Actor, IdentityError>;
}

/// Source of professionals available for appointment.
#[async_trait]
pub trait ProfessionalDirectory: Send + Sync {
    /// Professionals practising any of `roles`. Eligibility filtering is the
    /// scheduler's job.
    async fn candidates(&self, roles: &[ProfessionalRole])
    -> Result<Vec<Professional>, StoreError>;
}

/// Notification collaborator. Fire-and-forget from the orchestrator's side.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit(&self, event: &DomainEvent) -> Result<(), EmitError>;
}
