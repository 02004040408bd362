//! Response types returned by the engine's query operations.
//!
//! `ProjectProgress` is recomputed from scratch after every accepted event;
//! `ProjectReport` bundles it with the appointment and coordination picture.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{CoordinationResult, ProfessionalAppointment};
use crate::enums::{ComponentCategory, ProfessionalRole, ProjectPhase};
use crate::status::ComponentStatus;

/// Counts for one component category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CategoryProgress {
    pub total: u32,
    pub required: u32,
    /// Required components in a success status.
    pub completed: u32,
    pub completion_percentage: f64,
}

/// A non-terminal component with a due date.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Deadline {
    pub component_id: String,
    pub name: String,
    pub category: ComponentCategory,
    pub status: ComponentStatus,
    pub due_at: DateTime<Utc>,
    /// Whole days until `due_at`; negative once overdue.
    pub days_remaining: i64,
}

/// Aggregate progress of one project at one committed version.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProjectProgress {
    pub project_id: String,
    pub phase: ProjectPhase,
    pub version: u64,
    /// In `[0, 100]`; 100 when no component is required.
    pub completion_percentage: f64,
    /// Completion over the compliance category only.
    pub compliance_rate: f64,
    pub total_components: u32,
    pub required_components: u32,
    pub completed_components: u32,
    pub by_category: BTreeMap<ComponentCategory, CategoryProgress>,
    /// Component count per `kind:status`.
    pub by_status: BTreeMap<String, u32>,
    /// Sorted ascending by due date.
    pub upcoming_deadlines: Vec<Deadline>,
    /// Required roles with no active appointment.
    pub uncovered_roles: Vec<ProfessionalRole>,
    pub computed_at: DateTime<Utc>,
}

/// Point-in-time project report for the emitter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProjectReport {
    pub project_id: String,
    pub project_name: String,
    pub progress: ProjectProgress,
    /// Non-terminal appointments grouped by role.
    pub appointments: BTreeMap<ProfessionalRole, Vec<ProfessionalAppointment>>,
    pub open_coordinations: Vec<CoordinationResult>,
    pub generated_at: DateTime<Utc>,
}
