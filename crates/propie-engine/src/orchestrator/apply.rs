//! Applying one inbound event to a draft project.
//!
//! Pure and synchronous: the orchestrator clones the committed project,
//! applies the event here, and either persists the draft or discards it.
//! A rejection leaves the draft half-written, so callers must drop it.

use chrono::{DateTime, Utc};
use propie_core::entities::{
    AppointmentTransition, Component, CoordinationResult, HistoryEntry, ProfessionalAppointment,
    Project,
};
use propie_core::enums::{
    AppointmentStatus, ComponentKind, DocumentStatus, HtbClaimStatus, PartyRole, ProjectPhase,
    SaleStatus,
};
use propie_core::errors::{Invariant, RejectionReason};
use propie_core::events::{AppointmentOutcome, DomainEventKind, EngineEvent};
use propie_core::identity::Actor;
use propie_core::status::ComponentStatus;

use crate::validator::{self, Accepted};

/// What an accepted event changed in the draft.
#[derive(Debug, Default)]
pub(crate) struct Applied {
    pub components: Vec<String>,
    pub appointments: Vec<String>,
    pub header: bool,
    pub events: Vec<DomainEventKind>,
    /// Coordination results created or re-evaluated by this decision.
    pub coordinations: Vec<CoordinationResult>,
}

impl Applied {
    pub fn touch_component(&mut self, id: &str) {
        if !self.components.iter().any(|c| c == id) {
            self.components.push(id.to_string());
        }
    }

    pub fn touch_appointment(&mut self, id: &str) {
        if !self.appointments.iter().any(|a| a == id) {
            self.appointments.push(id.to_string());
        }
    }
}

/// Apply `event` from `actor` to `project` at `now`.
pub(crate) fn apply_event(
    project: &mut Project,
    actor: &Actor,
    event_id: &str,
    event: &EngineEvent,
    now: DateTime<Utc>,
) -> Result<Applied, RejectionReason> {
    let mut applied = Applied::default();
    match event {
        EngineEvent::ComponentStatusChangeRequested {
            component_id,
            to,
            approved_amount,
            note,
        } => {
            let component = find_component(project, component_id)?;
            let accepted =
                validator::validate_component(component, *to, actor.role, *approved_amount)?;
            if let (ComponentStatus::HtbClaim(HtbClaimStatus::Approved), Some(claim)) =
                (accepted.to, component.claim.as_mut())
            {
                claim.approved_amount = *approved_amount;
            }
            record(component, accepted, actor, event_id, now, note.clone());
            applied.touch_component(component_id);
            applied.events.push(transitioned(component, accepted, actor, event_id));
        }
        EngineEvent::DocumentUploaded {
            component_id,
            document_ref,
        } => {
            let component = find_component(project, component_id)?;
            expect_kind(component, ComponentKind::Document)?;
            let accepted = validator::validate_component(
                component,
                ComponentStatus::Document(DocumentStatus::Uploaded),
                actor.role,
                None,
            )?;
            component.document_ref = Some(document_ref.clone());
            record(component, accepted, actor, event_id, now, None);
            applied.touch_component(component_id);
            applied.events.push(transitioned(component, accepted, actor, event_id));
        }
        EngineEvent::HtbClaimSubmitted { component_id } => {
            let component = find_component(project, component_id)?;
            expect_kind(component, ComponentKind::HtbClaim)?;
            let accepted = validator::validate_component(
                component,
                ComponentStatus::HtbClaim(HtbClaimStatus::Submitted),
                actor.role,
                None,
            )?;
            record(component, accepted, actor, event_id, now, None);
            applied.touch_component(component_id);
            applied.events.push(transitioned(component, accepted, actor, event_id));
        }
        EngineEvent::AppointmentConfirmed {
            appointment_id,
            ends_at,
        } => confirm_appointment(project, actor, appointment_id, *ends_at, now, &mut applied)?,
        EngineEvent::AppointmentEnded {
            appointment_id,
            outcome,
            reason,
        } => end_appointment(
            project,
            actor,
            appointment_id,
            *outcome,
            reason.as_deref(),
            now,
            &mut applied,
        )?,
        EngineEvent::PhaseChangeRequested { to } => {
            change_phase(project, actor, *to, None, &mut applied)?;
        }
        EngineEvent::HoldRequested { reason } => {
            change_phase(project, actor, ProjectPhase::OnHold, reason.clone(), &mut applied)?;
        }
        EngineEvent::ResumeRequested => {
            let Some(target) = project.held_from else {
                return Err(RejectionReason::invalid_phase(
                    Invariant::ResumeToPriorPhase,
                    format!("project {} is not on hold", project.id),
                ));
            };
            change_phase(project, actor, target, None, &mut applied)?;
        }
        EngineEvent::TimerTick { at } => {
            if actor.role != PartyRole::System {
                return Err(RejectionReason::unauthorized(
                    Invariant::EdgeAuthorization,
                    format!("timer ticks are issued by the system, not {}", actor.role),
                ));
            }
            expire_overdue(project, event_id, *at, &mut applied);
        }
    }
    Ok(applied)
}

/// Expire overdue components and terminate lapsed appointments.
///
/// No-op outside the phases that run the sweep.
fn expire_overdue(project: &mut Project, event_id: &str, at: DateTime<Utc>, applied: &mut Applied) {
    if !project.phase.runs_sweep() {
        return;
    }
    let system = Actor::system();
    for component in &mut project.components {
        let Ok(accepted) = validator::validate_expiry(component, at) else {
            continue;
        };
        record(component, accepted, &system, event_id, at, None);
        applied.touch_component(&component.id);
        applied.events.push(DomainEventKind::ComponentExpired {
            component_id: component.id.clone(),
            category: component.category,
            from: accepted.from,
            to: accepted.to,
        });
        tracing::debug!(
            component_id = %component.id,
            from = %accepted.from,
            "Component expired"
        );
    }

    let lapsed: Vec<String> = project
        .appointments
        .iter()
        .filter(|a| a.has_lapsed(at))
        .map(|a| a.id.clone())
        .collect();
    for id in lapsed {
        if let Some(appointment) = project.appointment_mut(&id) {
            close_appointment(
                appointment,
                AppointmentStatus::Terminated,
                &system,
                at,
                Some("engagement ended".to_string()),
            );
            applied.touch_appointment(&id);
            applied.events.push(DomainEventKind::AppointmentTerminated {
                appointment_id: id.clone(),
                role: appointment.role,
                reason: "engagement ended".to_string(),
            });
        }
    }
}

fn find_component<'a>(
    project: &'a mut Project,
    component_id: &str,
) -> Result<&'a mut Component, RejectionReason> {
    let project_id = project.id.clone();
    project.component_mut(component_id).ok_or_else(|| {
        RejectionReason::not_found(format!(
            "component {component_id} is not part of project {project_id}"
        ))
    })
}

fn expect_kind(component: &Component, kind: ComponentKind) -> Result<(), RejectionReason> {
    if component.kind() == kind {
        Ok(())
    } else {
        Err(RejectionReason::invalid_transition(
            Invariant::EventTargetKind,
            format!(
                "component {} is a {} component, not {kind}",
                component.id,
                component.kind()
            ),
        ))
    }
}

fn record(
    component: &mut Component,
    accepted: Accepted,
    actor: &Actor,
    event_id: &str,
    at: DateTime<Utc>,
    note: Option<String>,
) {
    component.status = accepted.to;
    component.last_transition_at = at;
    component.history.append(HistoryEntry {
        from: accepted.from,
        to: accepted.to,
        actor_id: actor.actor_id.clone(),
        actor_role: actor.role,
        event_id: event_id.to_string(),
        at,
        note,
    });
}

fn transitioned(
    component: &Component,
    accepted: Accepted,
    actor: &Actor,
    event_id: &str,
) -> DomainEventKind {
    DomainEventKind::ComponentTransitioned {
        component_id: component.id.clone(),
        category: component.category,
        from: accepted.from,
        to: accepted.to,
        actor_id: actor.actor_id.clone(),
        event_id: event_id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

fn confirm_appointment(
    project: &mut Project,
    actor: &Actor,
    appointment_id: &str,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    applied: &mut Applied,
) -> Result<(), RejectionReason> {
    let (role, status, professional_id) = {
        let appointment = project.appointment(appointment_id).ok_or_else(|| {
            RejectionReason::not_found(format!(
                "appointment {appointment_id} is not part of project {}",
                project.id
            ))
        })?;
        (
            appointment.role,
            appointment.status,
            appointment.professional_id.clone(),
        )
    };
    validator::validate_appointment(status, AppointmentStatus::Active, actor.role)?;

    // At most one active appointment per role: the newcomer supersedes.
    let superseded = project
        .active_appointment(role)
        .map(|a| a.id.clone())
        .filter(|id| id != appointment_id);
    if let Some(previous_id) = &superseded {
        if let Some(previous) = project.appointment_mut(previous_id) {
            let reason = format!("superseded by {appointment_id}");
            close_appointment(
                previous,
                AppointmentStatus::Terminated,
                actor,
                now,
                Some(reason.clone()),
            );
            applied.touch_appointment(previous_id);
            applied.events.push(DomainEventKind::AppointmentTerminated {
                appointment_id: previous_id.clone(),
                role,
                reason,
            });
        }
    }

    if let Some(appointment) = project.appointment_mut(appointment_id) {
        appointment.transitions.push(AppointmentTransition {
            from: appointment.status,
            to: AppointmentStatus::Active,
            actor_id: actor.actor_id.clone(),
            actor_role: actor.role,
            at: now,
            note: None,
        });
        appointment.status = AppointmentStatus::Active;
        appointment.activated_at = Some(now);
        if ends_at.is_some() {
            appointment.ends_at = ends_at;
        }
    }
    applied.touch_appointment(appointment_id);
    applied.events.push(DomainEventKind::AppointmentActivated {
        appointment_id: appointment_id.to_string(),
        professional_id,
        role,
        superseded,
    });
    Ok(())
}

fn end_appointment(
    project: &mut Project,
    actor: &Actor,
    appointment_id: &str,
    outcome: AppointmentOutcome,
    reason: Option<&str>,
    now: DateTime<Utc>,
    applied: &mut Applied,
) -> Result<(), RejectionReason> {
    let project_id = project.id.clone();
    let appointment = project.appointment_mut(appointment_id).ok_or_else(|| {
        RejectionReason::not_found(format!(
            "appointment {appointment_id} is not part of project {project_id}"
        ))
    })?;
    let target = match outcome {
        AppointmentOutcome::Completed => AppointmentStatus::Completed,
        AppointmentOutcome::Terminated => AppointmentStatus::Terminated,
    };
    validator::validate_appointment(appointment.status, target, actor.role)?;
    close_appointment(appointment, target, actor, now, reason.map(str::to_string));
    applied.touch_appointment(appointment_id);
    applied.events.push(match outcome {
        AppointmentOutcome::Completed => DomainEventKind::AppointmentCompleted {
            appointment_id: appointment_id.to_string(),
            role: appointment.role,
        },
        AppointmentOutcome::Terminated => DomainEventKind::AppointmentTerminated {
            appointment_id: appointment_id.to_string(),
            role: appointment.role,
            reason: reason.unwrap_or("terminated").to_string(),
        },
    });
    Ok(())
}

fn close_appointment(
    appointment: &mut ProfessionalAppointment,
    to: AppointmentStatus,
    actor: &Actor,
    at: DateTime<Utc>,
    note: Option<String>,
) {
    appointment.transitions.push(AppointmentTransition {
        from: appointment.status,
        to,
        actor_id: actor.actor_id.clone(),
        actor_role: actor.role,
        at,
        note,
    });
    appointment.status = to;
    appointment.closed_at = Some(at);
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

fn change_phase(
    project: &mut Project,
    actor: &Actor,
    to: ProjectPhase,
    reason: Option<String>,
    applied: &mut Applied,
) -> Result<(), RejectionReason> {
    let from = project.phase;
    validator::validate_phase(from, project.held_from, to, actor.role)?;
    project.held_from = if to == ProjectPhase::OnHold {
        Some(from)
    } else {
        None
    };
    project.phase = to;
    match to {
        ProjectPhase::ActiveSale => project.sale_status = SaleStatus::Selling,
        ProjectPhase::Complete => project.sale_status = SaleStatus::SoldOut,
        _ => {}
    }
    applied.header = true;
    applied.events.push(DomainEventKind::PhaseChanged { from, to, reason });
    Ok(())
}
