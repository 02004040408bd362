//! Cross-cutting error types for PropIE.
//!
//! `CoreError` covers failures that can originate in any crate (bad input,
//! missing entity). `RejectionReason` is the caller-facing answer to a refused
//! event: a machine-readable code plus the exact invariant that was violated,
//! so a UI can render precise guidance. Engine-level failures (persistence,
//! identity, degraded writes) live in `propie-engine`.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can be raised by any PropIE crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (shape, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Machine-readable rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    InvalidTransition,
    Unauthorized,
    NotFound,
    InvalidPhase,
    ProjectArchived,
    ConcurrentModification,
}

impl ReasonCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTransition => "invalid_transition",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InvalidPhase => "invalid_phase",
            Self::ProjectArchived => "project_archived",
            Self::ConcurrentModification => "concurrent_modification",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specific rule a rejected event would have broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    /// The edge is not in the kind's transition table.
    TransitionTable,
    /// Current and proposed statuses belong to different kinds.
    StatusKindMatch,
    /// `expired` is applied by the sweep, never requested.
    ExpiryIsTimeDriven,
    /// The edge is restricted to other party roles.
    EdgeAuthorization,
    /// The actor token could not be resolved.
    ActorIdentity,
    /// `approved_amount <= requested_amount`.
    ApprovedAmountWithinRequested,
    /// Approving a claim must state the approved amount.
    ApprovedAmountRequired,
    /// `funds_received` requires a prior `approved`.
    FundsRequireApproval,
    /// An `htb_claim` component must carry its claim terms.
    ClaimTermsPresent,
    /// The event names a component or appointment the project does not own.
    EventTargetExists,
    /// The event targets the wrong kind of component.
    EventTargetKind,
    /// The project phase transition is not in the phase table.
    PhaseTransitionTable,
    /// `on_hold` must resume to the phase it was entered from.
    ResumeToPriorPhase,
    /// Archived projects accept no events.
    ProjectNotArchived,
    /// The stored row changed underneath the engine.
    RowVersion,
}

impl Invariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransitionTable => "transition_table",
            Self::StatusKindMatch => "status_kind_match",
            Self::ExpiryIsTimeDriven => "expiry_is_time_driven",
            Self::EdgeAuthorization => "edge_authorization",
            Self::ActorIdentity => "actor_identity",
            Self::ApprovedAmountWithinRequested => "approved_amount_within_requested",
            Self::ApprovedAmountRequired => "approved_amount_required",
            Self::FundsRequireApproval => "funds_require_approval",
            Self::ClaimTermsPresent => "claim_terms_present",
            Self::EventTargetExists => "event_target_exists",
            Self::EventTargetKind => "event_target_kind",
            Self::PhaseTransitionTable => "phase_transition_table",
            Self::ResumeToPriorPhase => "resume_to_prior_phase",
            Self::ProjectNotArchived => "project_not_archived",
            Self::RowVersion => "row_version",
        }
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an event was refused. Rejections never mutate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Error)]
#[error("{code}: {detail} (invariant: {invariant})")]
pub struct RejectionReason {
    pub code: ReasonCode,
    pub invariant: Invariant,
    pub detail: String,
}

impl RejectionReason {
    #[must_use]
    pub fn new(code: ReasonCode, invariant: Invariant, detail: impl Into<String>) -> Self {
        Self {
            code,
            invariant,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn invalid_transition(invariant: Invariant, detail: impl Into<String>) -> Self {
        Self::new(ReasonCode::InvalidTransition, invariant, detail)
    }

    #[must_use]
    pub fn unauthorized(invariant: Invariant, detail: impl Into<String>) -> Self {
        Self::new(ReasonCode::Unauthorized, invariant, detail)
    }

    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ReasonCode::NotFound, Invariant::EventTargetExists, detail)
    }

    #[must_use]
    pub fn invalid_phase(invariant: Invariant, detail: impl Into<String>) -> Self {
        Self::new(ReasonCode::InvalidPhase, invariant, detail)
    }

    #[must_use]
    pub fn concurrent_modification(detail: impl Into<String>) -> Self {
        Self::new(ReasonCode::ConcurrentModification, Invariant::RowVersion, detail)
    }

    #[must_use]
    pub fn archived(project_id: &str) -> Self {
        Self::new(
            ReasonCode::ProjectArchived,
            Invariant::ProjectNotArchived,
            format!("project {project_id} is archived"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_display_names_code_and_invariant() {
        let reason = RejectionReason::invalid_transition(
            Invariant::ApprovedAmountWithinRequested,
            "approved 35000 exceeds requested 30000",
        );
        assert_eq!(
            reason.to_string(),
            "invalid_transition: approved 35000 exceeds requested 30000 \
             (invariant: approved_amount_within_requested)"
        );
    }

    #[test]
    fn rejection_serializes_machine_readable() {
        let reason = RejectionReason::unauthorized(Invariant::EdgeAuthorization, "buyer");
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["code"], "unauthorized");
        assert_eq!(json["invariant"], "edge_authorization");
    }
}
