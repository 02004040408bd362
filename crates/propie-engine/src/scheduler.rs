//! Coordination scheduler.
//!
//! Resolves a coordination request into `proposed` appointments. It never
//! activates an appointment: that takes an `appointment_confirmed` event.
//!
//! Eligibility is fixed (role, licence valid at the timeline start, spare
//! capacity); choosing among eligible candidates is delegated to a
//! [`SelectionPolicy`].

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use propie_core::entities::{
    CoordinationRequest, CoordinationResult, Professional, ProfessionalAppointment, Project,
};
use propie_core::enums::{AppointmentStatus, CoordinationStatus, ProfessionalRole};
use propie_core::errors::CoreError;
use propie_core::ids::{PREFIX_APPOINTMENT, generate_id};

/// Picks one professional for a role from the eligible candidates.
pub trait SelectionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `eligible` is non-empty and contains only candidates for `role`.
    fn select<'a>(
        &self,
        request: &CoordinationRequest,
        role: ProfessionalRole,
        eligible: &[&'a Professional],
    ) -> Option<&'a Professional>;
}

/// Fewest active appointments, then lowest id.
#[must_use]
pub fn tie_break(a: &Professional, b: &Professional) -> Ordering {
    a.active_appointments
        .cmp(&b.active_appointments)
        .then_with(|| a.id.cmp(&b.id))
}

/// Default policy: the least-loaded eligible candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastLoaded;

impl SelectionPolicy for LeastLoaded {
    fn name(&self) -> &'static str {
        "least_loaded"
    }

    fn select<'a>(
        &self,
        _request: &CoordinationRequest,
        _role: ProfessionalRole,
        eligible: &[&'a Professional],
    ) -> Option<&'a Professional> {
        eligible.iter().copied().min_by(|a, b| tie_break(a, b))
    }
}

/// Prefer candidates located where the request asks, then least-loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeographyMatch;

impl SelectionPolicy for GeographyMatch {
    fn name(&self) -> &'static str {
        "geography_match"
    }

    fn select<'a>(
        &self,
        request: &CoordinationRequest,
        _role: ProfessionalRole,
        eligible: &[&'a Professional],
    ) -> Option<&'a Professional> {
        let wanted = request.location.as_deref();
        let is_local = |p: &Professional| match (wanted, p.location.as_deref()) {
            (Some(w), Some(l)) => w.eq_ignore_ascii_case(l),
            _ => false,
        };
        eligible
            .iter()
            .copied()
            .min_by(|a, b| {
                is_local(*b)
                    .cmp(&is_local(*a))
                    .then_with(|| tie_break(a, b))
            })
    }
}

/// Whether `professional` can be proposed for `role` under `request`.
#[must_use]
pub fn is_eligible(
    professional: &Professional,
    role: ProfessionalRole,
    request: &CoordinationRequest,
) -> bool {
    professional.role == role
        && professional.license.is_valid_at(request.timeline.start)
        && professional.has_capacity()
}

pub struct Scheduler {
    policy: Arc<dyn SelectionPolicy>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(LeastLoaded))
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(policy: Arc<dyn SelectionPolicy>) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Resolve `request` against `project` and the `available` professionals.
    ///
    /// Per required role, in order: an active appointment counts as already
    /// covered; an existing `proposed` appointment is reused; otherwise the
    /// policy picks a candidate, or the role is reported unfulfilled.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` only if an appointment id cannot be generated.
    pub fn resolve(
        &self,
        request: &CoordinationRequest,
        project: &Project,
        available: &[Professional],
        now: DateTime<Utc>,
    ) -> Result<CoordinationResult, CoreError> {
        let mut proposed = Vec::new();
        let mut unfulfilled = Vec::new();
        let mut already_active = Vec::new();

        for role in distinct(&request.required_roles) {
            if project.active_appointment(role).is_some() {
                already_active.push(role);
                continue;
            }
            if let Some(existing) = project
                .appointments
                .iter()
                .find(|a| a.role == role && a.status == AppointmentStatus::Proposed)
            {
                proposed.push(existing.clone());
                continue;
            }
            let eligible: Vec<&Professional> = available
                .iter()
                .filter(|p| is_eligible(p, role, request))
                .collect();
            let chosen = if eligible.is_empty() {
                None
            } else {
                self.policy.select(request, role, &eligible)
            };
            match chosen {
                Some(professional) => proposed.push(ProfessionalAppointment::propose(
                    generate_id(PREFIX_APPOINTMENT)?,
                    project.id.clone(),
                    professional,
                    Some(request.id.clone()),
                    now,
                )),
                None => unfulfilled.push(role),
            }
        }

        let mut result = CoordinationResult {
            request_id: request.id.clone(),
            project_id: project.id.clone(),
            status: CoordinationStatus::Open,
            priority: request.priority,
            timeline: request.timeline,
            proposed_appointments: proposed,
            unfulfilled_roles: unfulfilled,
            already_active,
            resolved_at: now,
            closed_at: None,
        };
        result.status = evaluate(&result, &request.required_roles, project, now);
        if result.status.is_closed() {
            result.closed_at = Some(now);
        }
        Ok(result)
    }
}

/// Current status of a coordination over `roles`.
///
/// `fulfilled` once every role is active; after the target date,
/// `partially_fulfilled` if some are and `expired` if none are.
/// A closed result keeps its status.
#[must_use]
pub fn evaluate(
    result: &CoordinationResult,
    roles: &[ProfessionalRole],
    project: &Project,
    now: DateTime<Utc>,
) -> CoordinationStatus {
    if result.status.is_closed() {
        return result.status;
    }
    let roles = distinct(roles);
    let active = roles
        .iter()
        .filter(|role| project.active_appointment(**role).is_some())
        .count();
    if active == roles.len() {
        CoordinationStatus::Fulfilled
    } else if result.timeline.has_passed(now) {
        if active > 0 {
            CoordinationStatus::PartiallyFulfilled
        } else {
            CoordinationStatus::Expired
        }
    } else {
        CoordinationStatus::Open
    }
}

/// Every role a coordination result covers: already active, then proposed,
/// then unfulfilled.
#[must_use]
pub fn requested_roles(result: &CoordinationResult) -> Vec<ProfessionalRole> {
    let mut roles = result.already_active.clone();
    roles.extend(result.proposed_appointments.iter().map(|a| a.role));
    roles.extend(result.unfulfilled_roles.iter().copied());
    distinct(&roles)
}

fn distinct(roles: &[ProfessionalRole]) -> Vec<ProfessionalRole> {
    let mut out: Vec<ProfessionalRole> = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(role) {
            out.push(*role);
        }
    }
    out
}
