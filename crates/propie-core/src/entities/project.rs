use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Component, ProfessionalAppointment};
use crate::enums::{ProfessionalRole, ProjectPhase, SaleStatus};

/// A development under sale. Owns its components and appointments.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub location: String,
    pub total_units: u32,
    pub sale_status: SaleStatus,
    pub phase: ProjectPhase,
    /// Phase the project was in when it was put on hold.
    #[serde(default)]
    pub held_from: Option<ProjectPhase>,
    /// Disciplines that must each have an active appointment.
    #[serde(default)]
    pub required_roles: Vec<ProfessionalRole>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub appointments: Vec<ProfessionalAppointment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version of the project row itself.
    #[serde(default)]
    pub version: u64,
}

/// The project row without its owned collections.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProjectHeader {
    pub id: String,
    pub name: String,
    pub location: String,
    pub total_units: u32,
    pub sale_status: SaleStatus,
    pub phase: ProjectPhase,
    pub held_from: Option<ProjectPhase>,
    pub required_roles: Vec<ProfessionalRole>,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Project {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
        total_units: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            total_units,
            sale_status: SaleStatus::Planning,
            phase: ProjectPhase::Planning,
            held_from: None,
            required_roles: Vec::new(),
            components: Vec::new(),
            appointments: Vec::new(),
            created_at,
            archived_at: None,
            version: 0,
        }
    }

    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    #[must_use]
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id == id)
    }

    #[must_use]
    pub fn appointment(&self, id: &str) -> Option<&ProfessionalAppointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn appointment_mut(&mut self, id: &str) -> Option<&mut ProfessionalAppointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    /// The active appointment for `role`, if any.
    #[must_use]
    pub fn active_appointment(&self, role: ProfessionalRole) -> Option<&ProfessionalAppointment> {
        self.appointments
            .iter()
            .find(|a| a.role == role && a.is_active())
    }

    /// Required roles that currently have no active appointment, in
    /// declaration order.
    #[must_use]
    pub fn uncovered_roles(&self) -> Vec<ProfessionalRole> {
        self.required_roles
            .iter()
            .copied()
            .filter(|role| self.active_appointment(*role).is_none())
            .collect()
    }

    #[must_use]
    pub fn header(&self) -> ProjectHeader {
        ProjectHeader {
            id: self.id.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            total_units: self.total_units,
            sale_status: self.sale_status,
            phase: self.phase,
            held_from: self.held_from,
            required_roles: self.required_roles.clone(),
            created_at: self.created_at,
            archived_at: self.archived_at,
            version: self.version,
        }
    }

    /// Overwrite the row fields from `header`, keeping the owned collections.
    pub fn apply_header(&mut self, header: ProjectHeader) {
        self.name = header.name;
        self.location = header.location;
        self.total_units = header.total_units;
        self.sale_status = header.sale_status;
        self.phase = header.phase;
        self.held_from = header.held_from;
        self.required_roles = header.required_roles;
        self.archived_at = header.archived_at;
        self.version = header.version;
    }
}
