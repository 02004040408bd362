use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{AppointmentStatus, PartyRole, ProfessionalRole};

/// Professional licence or registration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct License {
    pub number: String,
    pub issuer: String,
    /// `None` = does not lapse.
    pub expires_at: Option<DateTime<Utc>>,
}

impl License {
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > at)
    }
}

/// A professional available for appointment. Owned by the external directory.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Professional {
    pub id: String,
    pub name: String,
    pub company: String,
    pub role: ProfessionalRole,
    pub license: License,
    pub location: Option<String>,
    /// Maximum concurrent active appointments.
    pub capacity: u32,
    /// Active appointments across all projects.
    pub active_appointments: u32,
}

impl Professional {
    #[must_use]
    pub const fn has_capacity(&self) -> bool {
        self.active_appointments < self.capacity
    }
}

/// One recorded appointment status change.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AppointmentTransition {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub actor_id: String,
    pub actor_role: PartyRole,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Binds a professional to a project for a role.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProfessionalAppointment {
    pub id: String,
    pub project_id: String,
    pub professional_id: String,
    pub professional_name: String,
    pub company: String,
    pub role: ProfessionalRole,
    /// Role label, e.g. "Lead Architect".
    pub title: String,
    pub status: AppointmentStatus,
    pub responsibilities: Vec<String>,
    /// Coordination request that proposed this appointment.
    pub coordination_id: Option<String>,
    pub proposed_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    /// Engagement end; an active appointment lapses once this passes.
    pub ends_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub transitions: Vec<AppointmentTransition>,
    /// Optimistic-concurrency row version.
    pub version: u64,
}

impl ProfessionalAppointment {
    /// Build a `proposed` appointment for `professional`.
    #[must_use]
    pub fn propose(
        id: impl Into<String>,
        project_id: impl Into<String>,
        professional: &Professional,
        coordination_id: Option<String>,
        proposed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            professional_id: professional.id.clone(),
            professional_name: professional.name.clone(),
            company: professional.company.clone(),
            role: professional.role,
            title: professional.role.default_title().to_string(),
            status: AppointmentStatus::Proposed,
            responsibilities: default_responsibilities(professional.role),
            coordination_id,
            proposed_at,
            activated_at: None,
            ends_at: None,
            closed_at: None,
            transitions: Vec::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Active
    }

    /// Active and past its engagement end.
    #[must_use]
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.ends_at.is_some_and(|ends| ends <= now)
    }
}

fn default_responsibilities(role: ProfessionalRole) -> Vec<String> {
    let items: &[&str] = match role {
        ProfessionalRole::Architect => &["design sign-off", "opinion on compliance"],
        ProfessionalRole::Solicitor => &["contract issue", "title review", "closing"],
        ProfessionalRole::StructuralEngineer => &["structural certification"],
        ProfessionalRole::QuantitySurveyor => &["cost plan", "stage valuations"],
        ProfessionalRole::BuildingSurveyor => &["snag inspection"],
        ProfessionalRole::BerAssessor => &["BER certificate"],
        ProfessionalRole::MortgageBroker => &["mortgage approval in principle"],
        ProfessionalRole::ProjectManager => &["programme", "handover coordination"],
        ProfessionalRole::EstateAgent => &["booking deposits", "buyer liaison"],
    };
    items.iter().map(|s| (*s).to_string()).collect()
}
