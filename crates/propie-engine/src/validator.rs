//! Status transition validator.
//!
//! Pure functions over the transition tables in `propie_core`. Nothing here
//! performs I/O or reads the clock: the caller supplies `now`.

use chrono::{DateTime, Utc};
use propie_core::entities::Component;
use propie_core::enums::{AppointmentStatus, ComponentKind, HtbClaimStatus, PartyRole, ProjectPhase};
use propie_core::errors::{Invariant, RejectionReason};
use propie_core::registry;
use propie_core::status::ComponentStatus;

/// A transition the validator allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub from: ComponentStatus,
    pub to: ComponentStatus,
}

/// Check one requested transition of a component of `kind`.
///
/// Checks, in order: both statuses belong to `kind`, `proposed` is not
/// `expired`, the edge is in the table, and `actor_role` may take it.
///
/// # Errors
///
/// `invalid_transition` for the first three checks, `unauthorized` for the last.
pub fn validate(
    kind: ComponentKind,
    current: ComponentStatus,
    proposed: ComponentStatus,
    actor_role: PartyRole,
) -> Result<Accepted, RejectionReason> {
    if current.kind() != kind || proposed.kind() != kind {
        return Err(RejectionReason::invalid_transition(
            Invariant::StatusKindMatch,
            format!("{kind} component cannot move from {current} to {proposed}"),
        ));
    }
    if proposed.is_expired() {
        return Err(RejectionReason::invalid_transition(
            Invariant::ExpiryIsTimeDriven,
            format!("{proposed} is applied by the expiry sweep, not on request"),
        ));
    }
    if !current.can_transition_to(proposed) {
        return Err(RejectionReason::invalid_transition(
            Invariant::TransitionTable,
            format!("{current} -> {proposed} is not an edge"),
        ));
    }
    if let Some(roles) = registry::authorised_roles(current, proposed) {
        if !roles.contains(&actor_role) {
            return Err(RejectionReason::unauthorized(
                Invariant::EdgeAuthorization,
                format!(
                    "{actor_role} may not move {current} -> {proposed}; allowed: {}",
                    join_roles(roles)
                ),
            ));
        }
    }
    Ok(Accepted {
        from: current,
        to: proposed,
    })
}

/// [`validate`] plus the Help-to-Buy amount rules.
///
/// `approved_amount` is only consulted when approving a claim.
///
/// # Errors
///
/// Any rejection from [`validate`], or `invalid_transition` when an HTB
/// claim has no terms, when an approval omits or exceeds the requested
/// amount, or when funds are recorded without an approved amount.
pub fn validate_component(
    component: &Component,
    proposed: ComponentStatus,
    actor_role: PartyRole,
    approved_amount: Option<u64>,
) -> Result<Accepted, RejectionReason> {
    let accepted = validate(component.kind(), component.status, proposed, actor_role)?;
    if component.kind() != ComponentKind::HtbClaim {
        return Ok(accepted);
    }
    let Some(claim) = component.claim.as_ref() else {
        return Err(RejectionReason::invalid_transition(
            Invariant::ClaimTermsPresent,
            format!("claim {} carries no claim terms", component.id),
        ));
    };
    match proposed {
        ComponentStatus::HtbClaim(HtbClaimStatus::Approved) => {
            let Some(approved) = approved_amount else {
                return Err(RejectionReason::invalid_transition(
                    Invariant::ApprovedAmountRequired,
                    format!("approving claim {} requires an approved amount", component.id),
                ));
            };
            if approved > claim.requested_amount {
                return Err(RejectionReason::invalid_transition(
                    Invariant::ApprovedAmountWithinRequested,
                    format!(
                        "approved {approved} exceeds requested {}",
                        claim.requested_amount
                    ),
                ));
            }
        }
        ComponentStatus::HtbClaim(HtbClaimStatus::FundsReceived) => {
            if claim.approved_amount.is_none() {
                return Err(RejectionReason::invalid_transition(
                    Invariant::FundsRequireApproval,
                    format!("claim {} has no approved amount", component.id),
                ));
            }
        }
        _ => {}
    }
    Ok(accepted)
}

/// Whether `component` is past due and still open at `now`.
///
/// Independent of the transition table: terminal components never expire.
#[must_use]
pub fn is_expired(component: &Component, now: DateTime<Utc>) -> bool {
    !component.status.is_terminal() && component.due_at.is_some_and(|due| due < now)
}

/// The sweep's transition for `component` at `now`.
///
/// # Errors
///
/// `invalid_transition` if the component is terminal or not yet due.
pub fn validate_expiry(
    component: &Component,
    now: DateTime<Utc>,
) -> Result<Accepted, RejectionReason> {
    if component.status.is_terminal() {
        return Err(RejectionReason::invalid_transition(
            Invariant::TransitionTable,
            format!("{} is terminal", component.status),
        ));
    }
    if !is_expired(component, now) {
        return Err(RejectionReason::invalid_transition(
            Invariant::ExpiryIsTimeDriven,
            format!("component {} is not past due", component.id),
        ));
    }
    Ok(Accepted {
        from: component.status,
        to: ComponentStatus::expired_of(component.kind()),
    })
}

/// Check an appointment status change requested by `actor_role`.
///
/// # Errors
///
/// `invalid_transition` for a missing edge, `unauthorized` for a party
/// outside the appointing roles.
pub fn validate_appointment(
    current: AppointmentStatus,
    proposed: AppointmentStatus,
    actor_role: PartyRole,
) -> Result<(), RejectionReason> {
    if !current.can_transition_to(proposed) {
        return Err(RejectionReason::invalid_transition(
            Invariant::TransitionTable,
            format!("appointment {current} -> {proposed} is not an edge"),
        ));
    }
    let roles = registry::appointment_authorised_roles(current, proposed);
    if !roles.contains(&actor_role) {
        return Err(RejectionReason::unauthorized(
            Invariant::EdgeAuthorization,
            format!(
                "{actor_role} may not move an appointment {current} -> {proposed}; allowed: {}",
                join_roles(roles)
            ),
        ));
    }
    Ok(())
}

/// Check a project phase change.
///
/// Leaving `on_hold` must return to `held_from`.
///
/// # Errors
///
/// `invalid_phase` for an edge outside the phase table or a resume to the
/// wrong phase, `unauthorized` for a party other than the developer side.
pub fn validate_phase(
    current: ProjectPhase,
    held_from: Option<ProjectPhase>,
    proposed: ProjectPhase,
    actor_role: PartyRole,
) -> Result<(), RejectionReason> {
    if !matches!(actor_role, PartyRole::Developer | PartyRole::ProjectManager) {
        return Err(RejectionReason::unauthorized(
            Invariant::EdgeAuthorization,
            format!("{actor_role} may not change the project phase"),
        ));
    }
    if !current.can_transition_to(proposed) {
        return Err(RejectionReason::invalid_phase(
            Invariant::PhaseTransitionTable,
            format!("project phase {current} -> {proposed} is not an edge"),
        ));
    }
    if current == ProjectPhase::OnHold && held_from != Some(proposed) {
        let expected = held_from.map_or_else(|| "unknown".to_string(), |p| p.to_string());
        return Err(RejectionReason::invalid_phase(
            Invariant::ResumeToPriorPhase,
            format!("project was held from {expected}; cannot resume to {proposed}"),
        ));
    }
    Ok(())
}

fn join_roles(roles: &[PartyRole]) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
