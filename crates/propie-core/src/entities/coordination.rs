use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::ProfessionalAppointment;
use crate::enums::{CoordinationStatus, Priority, ProfessionalRole};
use crate::errors::CoreError;

/// Window in which the required roles should be onboarded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Timeline {
    pub start: DateTime<Utc>,
    pub target_completion: DateTime<Utc>,
}

impl Timeline {
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the target precedes the start.
    pub fn new(start: DateTime<Utc>, target_completion: DateTime<Utc>) -> Result<Self, CoreError> {
        if target_completion < start {
            return Err(CoreError::Validation(format!(
                "timeline target {target_completion} precedes start {start}"
            )));
        }
        Ok(Self {
            start,
            target_completion,
        })
    }

    #[must_use]
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        self.target_completion <= now
    }
}

/// Request to onboard a set of professional roles onto a project.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CoordinationRequest {
    pub id: String,
    pub project_id: String,
    pub required_roles: Vec<ProfessionalRole>,
    pub priority: Priority,
    pub timeline: Timeline,
    /// Preferred location for geography-matched selection.
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Raised by the engine rather than by a caller.
    pub automatic: bool,
}

/// Outcome of resolving a coordination request.
///
/// An unfulfilled role is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CoordinationResult {
    pub request_id: String,
    pub project_id: String,
    pub status: CoordinationStatus,
    pub priority: Priority,
    pub timeline: Timeline,
    pub proposed_appointments: Vec<ProfessionalAppointment>,
    pub unfulfilled_roles: Vec<ProfessionalRole>,
    /// Roles that were already covered when the request was resolved.
    pub already_active: Vec<ProfessionalRole>,
    pub resolved_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl CoordinationResult {
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_closed()
    }
}
