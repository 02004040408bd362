//! Inbound engine events and outbound domain events.
//!
//! Inbound events arrive wrapped in an [`EventEnvelope`] that carries the
//! idempotency key and the opaque actor token. Outbound [`DomainEvent`]s are
//! handed to the notification emitter after a change commits.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{
    ComponentCategory, CoordinationStatus, Priority, ProfessionalRole, ProjectPhase,
};
use crate::status::ComponentStatus;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// How an active appointment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentOutcome {
    Completed,
    Terminated,
}

/// An external event submitted against one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Move a component to `to`. `approved_amount` is required when approving
    /// an HTB claim.
    ComponentStatusChangeRequested {
        component_id: String,
        to: ComponentStatus,
        #[serde(default)]
        approved_amount: Option<u64>,
        #[serde(default)]
        note: Option<String>,
    },
    /// A document was stored; moves a pending or rejected document to `uploaded`.
    DocumentUploaded {
        component_id: String,
        document_ref: String,
    },
    /// Submit an in-progress HTB claim to the issuing authority.
    HtbClaimSubmitted { component_id: String },
    /// Activate a proposed appointment.
    AppointmentConfirmed {
        appointment_id: String,
        #[serde(default)]
        ends_at: Option<DateTime<Utc>>,
    },
    AppointmentEnded {
        appointment_id: String,
        outcome: AppointmentOutcome,
        #[serde(default)]
        reason: Option<String>,
    },
    PhaseChangeRequested { to: ProjectPhase },
    HoldRequested {
        #[serde(default)]
        reason: Option<String>,
    },
    ResumeRequested,
    /// Expiry sweep at instant `at`.
    TimerTick { at: DateTime<Utc> },
}

impl EngineEvent {
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ComponentStatusChangeRequested { .. } => "component_status_change_requested",
            Self::DocumentUploaded { .. } => "document_uploaded",
            Self::HtbClaimSubmitted { .. } => "htb_claim_submitted",
            Self::AppointmentConfirmed { .. } => "appointment_confirmed",
            Self::AppointmentEnded { .. } => "appointment_ended",
            Self::PhaseChangeRequested { .. } => "phase_change_requested",
            Self::HoldRequested { .. } => "hold_requested",
            Self::ResumeRequested => "resume_requested",
            Self::TimerTick { .. } => "timer_tick",
        }
    }
}

/// An inbound event plus its idempotency key and submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventEnvelope {
    pub event_id: String,
    /// Opaque token, resolved by the identity collaborator.
    pub actor_token: String,
    #[serde(flatten)]
    pub event: EngineEvent,
}

impl EventEnvelope {
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        actor_token: impl Into<String>,
        event: EngineEvent,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            actor_token: actor_token.into(),
            event,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Notification emitted after a change commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DomainEvent {
    pub project_id: String,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: DomainEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEventKind {
    ComponentTransitioned {
        component_id: String,
        category: ComponentCategory,
        from: ComponentStatus,
        to: ComponentStatus,
        actor_id: String,
        event_id: String,
    },
    ComponentExpired {
        component_id: String,
        category: ComponentCategory,
        from: ComponentStatus,
        to: ComponentStatus,
    },
    AppointmentProposed {
        appointment_id: String,
        professional_id: String,
        role: ProfessionalRole,
        coordination_id: Option<String>,
    },
    AppointmentActivated {
        appointment_id: String,
        professional_id: String,
        role: ProfessionalRole,
        /// Prior active appointment for the role, terminated by this activation.
        superseded: Option<String>,
    },
    AppointmentTerminated {
        appointment_id: String,
        role: ProfessionalRole,
        reason: String,
    },
    AppointmentCompleted {
        appointment_id: String,
        role: ProfessionalRole,
    },
    CoordinationRequested {
        coordination_id: String,
        roles: Vec<ProfessionalRole>,
        priority: Priority,
        automatic: bool,
    },
    CoordinationClosed {
        coordination_id: String,
        status: CoordinationStatus,
        unfulfilled_roles: Vec<ProfessionalRole>,
    },
    PhaseChanged {
        from: ProjectPhase,
        to: ProjectPhase,
        /// Stated reason for a hold.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ProjectArchived,
    /// Persistence failed after every retry; the change is queued for replay.
    DegradedWrite {
        event_id: Option<String>,
        attempts: u32,
        detail: String,
        queued: usize,
    },
    /// The replay queue no longer matched the stored rows and was discarded.
    /// The listed events may be resubmitted.
    QueuedWritesDropped {
        event_ids: Vec<String>,
        dropped: usize,
        detail: String,
    },
    ReportGenerated {
        completion_percentage: f64,
        compliance_rate: f64,
        open_coordinations: usize,
    },
}

impl DomainEvent {
    #[must_use]
    pub fn new(project_id: impl Into<String>, at: DateTime<Utc>, kind: DomainEventKind) -> Self {
        Self {
            project_id: project_id.into(),
            at,
            kind,
        }
    }

    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match &self.kind {
            DomainEventKind::ComponentTransitioned { .. } => "component_transitioned",
            DomainEventKind::ComponentExpired { .. } => "component_expired",
            DomainEventKind::AppointmentProposed { .. } => "appointment_proposed",
            DomainEventKind::AppointmentActivated { .. } => "appointment_activated",
            DomainEventKind::AppointmentTerminated { .. } => "appointment_terminated",
            DomainEventKind::AppointmentCompleted { .. } => "appointment_completed",
            DomainEventKind::CoordinationRequested { .. } => "coordination_requested",
            DomainEventKind::CoordinationClosed { .. } => "coordination_closed",
            DomainEventKind::PhaseChanged { .. } => "phase_changed",
            DomainEventKind::ProjectArchived => "project_archived",
            DomainEventKind::DegradedWrite { .. } => "degraded_write",
            DomainEventKind::QueuedWritesDropped { .. } => "queued_writes_dropped",
            DomainEventKind::ReportGenerated { .. } => "report_generated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::HtbClaimStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn envelope_is_flat_on_the_wire() {
        let json = serde_json::json!({
            "event_id": "evt-1",
            "actor_token": "tok-authority",
            "type": "component_status_change_requested",
            "component_id": "cmp-1",
            "to": { "kind": "htb_claim", "status": "approved" },
            "approved_amount": 28000
        });
        let envelope: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(
            envelope.event,
            EngineEvent::ComponentStatusChangeRequested {
                component_id: "cmp-1".into(),
                to: ComponentStatus::HtbClaim(HtbClaimStatus::Approved),
                approved_amount: Some(28_000),
                note: None,
            }
        );
    }

    #[test]
    fn unit_events_parse() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "event_id": "evt-2",
            "actor_token": "tok-dev",
            "type": "resume_requested"
        }))
        .unwrap();
        assert_eq!(envelope.event, EngineEvent::ResumeRequested);
        assert_eq!(envelope.event.event_type(), "resume_requested");
    }

    #[test]
    fn htb_submission_uses_snake_case_tag() {
        let event = EngineEvent::HtbClaimSubmitted {
            component_id: "cmp-1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "htb_claim_submitted");
        assert_eq!(event.event_type(), "htb_claim_submitted");
    }

    #[test]
    fn domain_event_type_matches_tag() {
        let event = DomainEvent::new(
            "prj-1",
            Utc::now(),
            DomainEventKind::PhaseChanged {
                from: ProjectPhase::Planning,
                to: ProjectPhase::ActiveSale,
                reason: None,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["project_id"], "prj-1");
    }
}
