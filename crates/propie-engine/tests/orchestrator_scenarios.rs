//! End-to-end orchestrator scenarios against in-memory collaborators.
//!
//! - Idempotent resubmission
//! - Progress after a mix of transitions
//! - HTB approval amount rule
//! - Coordination with an unfulfilled role, automatic coordination
//! - One active appointment per role
//! - Expiry sweep and appointment lapse
//! - Phase changes, hold/resume, archival
//! - Serialization within a project, parallelism across projects

mod common;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use propie_core::entities::Timeline;
use propie_core::enums::{
    AppointmentStatus, ComponentCategory, CoordinationStatus, DocumentStatus, HtbClaimStatus,
    Priority, ProfessionalRole, ProjectPhase, RequirementStatus, SaleStatus,
};
use propie_core::errors::{CoreError, Invariant, ReasonCode};
use propie_core::events::{DomainEventKind, EngineEvent};
use propie_core::status::ComponentStatus;
use propie_engine::EngineError;

use common::{
    Harness, PROJECT, change, document, envelope, htb_claim, professional, project, proposed,
    requirement,
};

const IN_PROGRESS: ComponentStatus = ComponentStatus::Requirement(RequirementStatus::InProgress);
const COMPLETED: ComponentStatus = ComponentStatus::Requirement(RequirementStatus::Completed);

fn four_requirements(phase: ProjectPhase) -> propie_core::entities::Project {
    let mut p = project(PROJECT, phase);
    p.components = vec![
        requirement(PROJECT, "cmp-00000001", ComponentCategory::Compliance),
        requirement(PROJECT, "cmp-00000002", ComponentCategory::Compliance),
        requirement(PROJECT, "cmp-00000003", ComponentCategory::Technical),
        requirement(PROJECT, "cmp-00000004", ComponentCategory::Legal),
    ];
    p
}

fn rejection(result: Result<impl std::fmt::Debug, EngineError>) -> (ReasonCode, Invariant) {
    match result {
        Err(EngineError::Rejected(reason)) => (reason.code, reason.invariant),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Idempotence and progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_event_is_a_no_op() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);
    let event = envelope("evt-00000001", "tok-dev", change("cmp-00000001", IN_PROGRESS));

    let first = h
        .orchestrator
        .submit_event(PROJECT, event.clone())
        .await
        .unwrap();
    let second = h.orchestrator.submit_event(PROJECT, event).await.unwrap();

    assert_eq!(first, second);
    let stored = h.store.get(PROJECT).unwrap();
    assert_eq!(stored.component("cmp-00000001").unwrap().history.len(), 1);
    assert_eq!(h.store.commit_count(), 1);
    assert_eq!(h.event_types().await, vec!["component_transitioned"]);
}

#[tokio::test]
async fn redelivery_after_token_revoked_is_a_no_op() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);
    let event = envelope("evt-00000001", "tok-dev", change("cmp-00000001", IN_PROGRESS));

    let first = h
        .orchestrator
        .submit_event(PROJECT, event.clone())
        .await
        .unwrap();
    let commits = h.store.commit_count();
    h.identity.revoke("tok-dev");

    let second = h.orchestrator.submit_event(PROJECT, event).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.store.commit_count(), commits);

    // New events with the revoked token are still refused.
    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000002", "tok-dev", change("cmp-00000002", IN_PROGRESS)),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::Unauthorized, Invariant::ActorIdentity)
    );
}

#[tokio::test]
async fn two_of_four_completed_is_fifty_percent() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);
    let steps = [
        ("cmp-00000001", IN_PROGRESS),
        ("cmp-00000001", COMPLETED),
        ("cmp-00000002", IN_PROGRESS),
        ("cmp-00000002", COMPLETED),
        ("cmp-00000003", IN_PROGRESS),
    ];
    let mut last = None;
    for (i, (component, to)) in steps.into_iter().enumerate() {
        let event = envelope(&format!("evt-{i:08x}"), "tok-dev", change(component, to));
        last = Some(h.orchestrator.submit_event(PROJECT, event).await.unwrap());
    }

    let progress = last.unwrap();
    assert!((progress.completion_percentage - 50.0).abs() < f64::EPSILON);
    assert!((progress.compliance_rate - 100.0).abs() < f64::EPSILON);
    assert_eq!(progress.by_status["requirement:not_started"], 1);

    let read = h.orchestrator.get_progress(PROJECT).await.unwrap();
    assert!((read.completion_percentage - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn rejected_edge_leaves_state_untouched() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);
    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000001", "tok-dev", change("cmp-00000001", COMPLETED)),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::InvalidTransition, Invariant::TransitionTable)
    );
    assert_eq!(h.store.commit_count(), 0);
    assert!(h.event_types().await.is_empty());

    let expired = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000002",
                "tok-dev",
                change(
                    "cmp-00000001",
                    ComponentStatus::Requirement(RequirementStatus::Expired),
                ),
            ),
        )
        .await;
    assert_eq!(
        rejection(expired),
        (ReasonCode::InvalidTransition, Invariant::ExpiryIsTimeDriven)
    );
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);
    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000001", "tok-stranger", change("cmp-00000001", IN_PROGRESS)),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::Unauthorized, Invariant::ActorIdentity)
    );
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let h = Harness::new(vec![], vec![]);
    let result = h.orchestrator.get_progress("prj-deadbeef").await;
    assert!(matches!(result, Err(EngineError::ProjectNotFound(id)) if id == "prj-deadbeef"));
}

// ---------------------------------------------------------------------------
// Help-to-Buy and documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stored_claim_without_terms_is_refused_on_load() {
    let mut p = project(PROJECT, ProjectPhase::ActiveSale);
    let mut claim = htb_claim(PROJECT, "cmp-0000000a", HtbClaimStatus::Submitted, 30_000);
    claim.claim = None;
    p.components.push(claim);
    let h = Harness::new(vec![p], vec![]);

    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000001",
                "tok-authority",
                EngineEvent::ComponentStatusChangeRequested {
                    component_id: "cmp-0000000a".into(),
                    to: ComponentStatus::HtbClaim(HtbClaimStatus::Approved),
                    approved_amount: Some(35_000),
                    note: None,
                },
            ),
        )
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Core(CoreError::Validation(_)))
    ));
    assert_eq!(h.store.commit_count(), 0);
    assert!(h.event_types().await.is_empty());
}

#[tokio::test]
async fn htb_approval_above_requested_is_rejected() {
    let mut p = project(PROJECT, ProjectPhase::ActiveSale);
    p.components
        .push(htb_claim(PROJECT, "cmp-0000000a", HtbClaimStatus::Submitted, 30_000));
    let h = Harness::new(vec![p], vec![]);

    let approve = |amount| EngineEvent::ComponentStatusChangeRequested {
        component_id: "cmp-0000000a".into(),
        to: ComponentStatus::HtbClaim(HtbClaimStatus::Approved),
        approved_amount: Some(amount),
        note: None,
    };

    let result = h
        .orchestrator
        .submit_event(PROJECT, envelope("evt-00000001", "tok-authority", approve(35_000)))
        .await;
    assert_eq!(
        rejection(result),
        (
            ReasonCode::InvalidTransition,
            Invariant::ApprovedAmountWithinRequested
        )
    );

    let result = h
        .orchestrator
        .submit_event(PROJECT, envelope("evt-00000002", "tok-dev", approve(28_000)))
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::Unauthorized, Invariant::EdgeAuthorization)
    );

    h.orchestrator
        .submit_event(PROJECT, envelope("evt-00000003", "tok-authority", approve(28_000)))
        .await
        .unwrap();
    let claim = h
        .orchestrator
        .project(PROJECT)
        .await
        .unwrap()
        .component("cmp-0000000a")
        .unwrap()
        .claim
        .clone()
        .unwrap();
    assert_eq!(claim.approved_amount, Some(28_000));
}

#[tokio::test]
async fn htb_claim_submission_and_document_upload() {
    let mut p = project(PROJECT, ProjectPhase::ActiveSale);
    p.components
        .push(htb_claim(PROJECT, "cmp-0000000a", HtbClaimStatus::InProgress, 30_000));
    p.components.push(document(PROJECT, "cmp-0000000b"));
    let h = Harness::new(vec![p], vec![]);

    h.orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000001",
                "tok-buyer",
                EngineEvent::HtbClaimSubmitted {
                    component_id: "cmp-0000000a".into(),
                },
            ),
        )
        .await
        .unwrap();
    h.orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000002",
                "tok-solicitor",
                EngineEvent::DocumentUploaded {
                    component_id: "cmp-0000000b".into(),
                    document_ref: "docs/title-deeds.pdf".into(),
                },
            ),
        )
        .await
        .unwrap();

    let stored = h.store.get(PROJECT).unwrap();
    assert_eq!(
        stored.component("cmp-0000000a").unwrap().status,
        ComponentStatus::HtbClaim(HtbClaimStatus::Submitted)
    );
    let doc = stored.component("cmp-0000000b").unwrap();
    assert_eq!(doc.status, ComponentStatus::Document(DocumentStatus::Uploaded));
    assert_eq!(doc.document_ref.as_deref(), Some("docs/title-deeds.pdf"));
    assert_eq!(doc.version, 1);
}

// ---------------------------------------------------------------------------
// Coordination and appointments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn coordination_reports_unfulfilled_role() {
    let h = Harness::new(
        vec![project(PROJECT, ProjectPhase::Planning)],
        vec![professional("pro-00000001", ProfessionalRole::Architect, 0)],
    );
    let now = Utc::now();
    let id = h
        .orchestrator
        .request_coordination(
            PROJECT,
            vec![ProfessionalRole::Architect, ProfessionalRole::Solicitor],
            Timeline::new(now, now + Duration::days(7)).unwrap(),
            Priority::Medium,
        )
        .await
        .unwrap();

    let result = h.orchestrator.get_coordination_status(&id).unwrap();
    let roles: Vec<ProfessionalRole> =
        result.proposed_appointments.iter().map(|a| a.role).collect();
    assert_eq!(roles, vec![ProfessionalRole::Architect]);
    assert_eq!(result.unfulfilled_roles, vec![ProfessionalRole::Solicitor]);
    assert_eq!(result.status, CoordinationStatus::Open);

    let stored = h.store.get(PROJECT).unwrap();
    assert_eq!(stored.appointments.len(), 1);
    assert_eq!(stored.appointments[0].status, AppointmentStatus::Proposed);
    assert_eq!(
        h.event_types().await,
        vec!["coordination_requested", "appointment_proposed"]
    );

    assert!(matches!(
        h.orchestrator.get_coordination_status("crd-deadbeef"),
        Err(EngineError::CoordinationNotFound(_))
    ));
}

#[tokio::test]
async fn confirming_second_appointment_terminates_first() {
    let now = Utc::now();
    let first = professional("pro-00000001", ProfessionalRole::Architect, 0);
    let second = professional("pro-00000002", ProfessionalRole::Architect, 0);
    let mut p = project(PROJECT, ProjectPhase::Planning);
    p.appointments.push(proposed(PROJECT, "apt-00000001", &first, now));
    p.appointments.push(proposed(PROJECT, "apt-00000002", &second, now));
    let h = Harness::new(vec![p], vec![]);

    for (i, id) in ["apt-00000001", "apt-00000002"].into_iter().enumerate() {
        h.orchestrator
            .submit_event(
                PROJECT,
                envelope(
                    &format!("evt-{i:08x}"),
                    "tok-dev",
                    EngineEvent::AppointmentConfirmed {
                        appointment_id: id.into(),
                        ends_at: None,
                    },
                ),
            )
            .await
            .unwrap();
    }

    let stored = h.store.get(PROJECT).unwrap();
    let active: Vec<&str> = stored
        .appointments
        .iter()
        .filter(|a| a.role == ProfessionalRole::Architect && a.is_active())
        .map(|a| a.id.as_str())
        .collect();
    assert_eq!(active, vec!["apt-00000002"]);
    assert_eq!(
        stored.appointment("apt-00000001").unwrap().status,
        AppointmentStatus::Terminated
    );
}

#[tokio::test]
async fn professionals_cannot_confirm_their_own_appointment() {
    let now = Utc::now();
    let architect = professional("pro-00000001", ProfessionalRole::Architect, 0);
    let mut p = project(PROJECT, ProjectPhase::Planning);
    p.appointments.push(proposed(PROJECT, "apt-00000001", &architect, now));
    let h = Harness::new(vec![p], vec![]);

    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000001",
                "tok-solicitor",
                EngineEvent::AppointmentConfirmed {
                    appointment_id: "apt-00000001".into(),
                    ends_at: None,
                },
            ),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::Unauthorized, Invariant::EdgeAuthorization)
    );
}

#[tokio::test]
async fn uncovered_role_in_active_sale_triggers_one_automatic_request() {
    let mut p = four_requirements(ProjectPhase::ActiveSale);
    p.required_roles = vec![ProfessionalRole::Architect];
    let h = Harness::new(
        vec![p],
        vec![professional("pro-00000001", ProfessionalRole::Architect, 0)],
    );

    h.orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000001", "tok-dev", change("cmp-00000001", IN_PROGRESS)),
        )
        .await
        .unwrap();
    h.orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000002", "tok-dev", change("cmp-00000002", IN_PROGRESS)),
        )
        .await
        .unwrap();

    let report = h.orchestrator.project_report(PROJECT).await.unwrap();
    assert_eq!(report.open_coordinations.len(), 1);
    let request = &report.open_coordinations[0];
    assert_eq!(request.priority, Priority::High);
    let appointment_id = request.proposed_appointments[0].id.clone();

    let requested = h
        .events()
        .await
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                DomainEventKind::CoordinationRequested { automatic: true, .. }
            )
        })
        .count();
    assert_eq!(requested, 1);

    let progress = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000003",
                "tok-dev",
                EngineEvent::AppointmentConfirmed {
                    appointment_id,
                    ends_at: None,
                },
            ),
        )
        .await
        .unwrap();
    assert!(progress.uncovered_roles.is_empty());

    let closed = h.orchestrator.get_coordination_status(&request.request_id).unwrap();
    assert_eq!(closed.status, CoordinationStatus::Fulfilled);
    assert!(closed.closed_at.is_some());
    assert!(h.event_types().await.contains(&"coordination_closed"));
}

// ---------------------------------------------------------------------------
// Expiry sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_expires_overdue_component_once() {
    let now = Utc::now();
    let mut p = four_requirements(ProjectPhase::ActiveSale);
    p.components[0].status = IN_PROGRESS;
    p.components[0].due_at = Some(now - Duration::days(1));
    let h = Harness::new(vec![p], vec![]);

    h.orchestrator.sweep(PROJECT, now).await.unwrap();
    h.orchestrator.sweep(PROJECT, now + Duration::minutes(1)).await.unwrap();

    let stored = h.store.get(PROJECT).unwrap();
    let component = stored.component("cmp-00000001").unwrap();
    assert_eq!(
        component.status,
        ComponentStatus::Requirement(RequirementStatus::Expired)
    );
    assert_eq!(component.history.len(), 1);
    assert_eq!(component.history.last().unwrap().actor_id, "system");
    assert_eq!(h.event_types().await, vec!["component_expired"]);
}

#[tokio::test]
async fn sweep_is_a_no_op_outside_sale_phases() {
    let now = Utc::now();
    let mut p = four_requirements(ProjectPhase::Planning);
    p.components[0].due_at = Some(now - Duration::days(1));
    let h = Harness::new(vec![p], vec![]);

    h.orchestrator.sweep(PROJECT, now).await.unwrap();
    let stored = h.store.get(PROJECT).unwrap();
    assert!(!stored.components[0].status.is_expired());
    assert_eq!(h.store.commit_count(), 0);
}

#[tokio::test]
async fn timer_tick_requires_system_identity() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);
    let tick = EngineEvent::TimerTick { at: Utc::now() };

    let result = h
        .orchestrator
        .submit_event(PROJECT, envelope("evt-00000001", "tok-dev", tick.clone()))
        .await;
    assert_eq!(rejection(result).0, ReasonCode::Unauthorized);

    h.orchestrator
        .submit_event(PROJECT, envelope("evt-00000002", "tok-system", tick))
        .await
        .unwrap();
}

#[tokio::test]
async fn lapsed_appointment_is_replaced_automatically() {
    let now = Utc::now();
    let incumbent = professional("pro-00000001", ProfessionalRole::Architect, 1);
    let mut p = project(PROJECT, ProjectPhase::ActiveSale);
    p.required_roles = vec![ProfessionalRole::Architect];
    let mut active = proposed(PROJECT, "apt-00000001", &incumbent, now - Duration::days(30));
    active.status = AppointmentStatus::Active;
    active.ends_at = Some(now - Duration::hours(1));
    p.appointments.push(active);
    let h = Harness::new(
        vec![p],
        vec![professional("pro-00000002", ProfessionalRole::Architect, 0)],
    );

    h.orchestrator.sweep(PROJECT, now).await.unwrap();

    let stored = h.store.get(PROJECT).unwrap();
    assert_eq!(
        stored.appointment("apt-00000001").unwrap().status,
        AppointmentStatus::Terminated
    );
    let replacement: Vec<&str> = stored
        .appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Proposed)
        .map(|a| a.professional_id.as_str())
        .collect();
    assert_eq!(replacement, vec!["pro-00000002"]);
    assert_eq!(
        h.event_types().await,
        vec![
            "appointment_terminated",
            "coordination_requested",
            "appointment_proposed"
        ]
    );
}

// ---------------------------------------------------------------------------
// Phases and archival
// ---------------------------------------------------------------------------

#[tokio::test]
async fn phase_changes_drive_the_sweep_task() {
    let mut config = common::test_config();
    config.sweep.enabled = true;
    config.sweep.interval_secs = 3600;
    let h = Harness::with_config(
        vec![four_requirements(ProjectPhase::Planning)],
        vec![],
        config,
    );

    h.orchestrator.get_progress(PROJECT).await.unwrap();
    assert!(!h.orchestrator.sweep_active(PROJECT).await);

    let progress = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000001",
                "tok-dev",
                EngineEvent::PhaseChangeRequested {
                    to: ProjectPhase::ActiveSale,
                },
            ),
        )
        .await
        .unwrap();
    assert_eq!(progress.phase, ProjectPhase::ActiveSale);
    assert!(h.orchestrator.sweep_active(PROJECT).await);
    assert_eq!(h.store.get(PROJECT).unwrap().sale_status, SaleStatus::Selling);

    h.orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000002",
                "tok-pm",
                EngineEvent::HoldRequested {
                    reason: Some("planning appeal".into()),
                },
            ),
        )
        .await
        .unwrap();
    assert!(!h.orchestrator.sweep_active(PROJECT).await);
    let stored = h.store.get(PROJECT).unwrap();
    assert_eq!(stored.phase, ProjectPhase::OnHold);
    assert_eq!(stored.held_from, Some(ProjectPhase::ActiveSale));

    h.orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000003", "tok-pm", EngineEvent::ResumeRequested),
        )
        .await
        .unwrap();
    assert!(h.orchestrator.sweep_active(PROJECT).await);
    assert_eq!(h.store.get(PROJECT).unwrap().phase, ProjectPhase::ActiveSale);

    h.orchestrator.archive_project(PROJECT, "tok-dev").await.unwrap();
    assert!(!h.orchestrator.sweep_active(PROJECT).await);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn invalid_phase_edge_is_rejected() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::Planning)], vec![]);
    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope(
                "evt-00000001",
                "tok-dev",
                EngineEvent::PhaseChangeRequested {
                    to: ProjectPhase::Complete,
                },
            ),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::InvalidPhase, Invariant::PhaseTransitionTable)
    );

    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000002", "tok-dev", EngineEvent::ResumeRequested),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::InvalidPhase, Invariant::ResumeToPriorPhase)
    );
}

#[tokio::test]
async fn archived_project_rejects_events() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);

    let result = h.orchestrator.archive_project(PROJECT, "tok-buyer").await;
    assert_eq!(rejection(result).0, ReasonCode::Unauthorized);

    h.orchestrator.archive_project(PROJECT, "tok-dev").await.unwrap();
    assert!(h.store.get(PROJECT).unwrap().is_archived());

    let result = h
        .orchestrator
        .submit_event(
            PROJECT,
            envelope("evt-00000001", "tok-dev", change("cmp-00000001", IN_PROGRESS)),
        )
        .await;
    assert_eq!(
        rejection(result),
        (ReasonCode::ProjectArchived, Invariant::ProjectNotArchived)
    );
    assert_eq!(h.event_types().await, vec!["project_archived"]);
}

#[tokio::test]
async fn archiving_releases_coordination_results() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::Planning)], vec![]);
    let now = Utc::now();
    let coordination_id = h
        .orchestrator
        .request_coordination(
            PROJECT,
            vec![ProfessionalRole::Architect],
            Timeline::new(now, now + Duration::days(14)).unwrap(),
            Priority::Medium,
        )
        .await
        .unwrap();
    h.orchestrator
        .get_coordination_status(&coordination_id)
        .unwrap();

    h.orchestrator.archive_project(PROJECT, "tok-dev").await.unwrap();
    assert!(matches!(
        h.orchestrator.get_coordination_status(&coordination_id),
        Err(EngineError::CoordinationNotFound(id)) if id == coordination_id
    ));
    assert!(h.orchestrator.project_report(PROJECT).await.unwrap().open_coordinations.is_empty());

    // Reloaded from the store, the project is still archived.
    let project = h.orchestrator.project(PROJECT).await.unwrap();
    assert!(project.is_archived());
    let result = h.orchestrator.archive_project(PROJECT, "tok-dev").await;
    assert_eq!(
        rejection(result),
        (ReasonCode::ProjectArchived, Invariant::ProjectNotArchived)
    );
}

#[tokio::test]
async fn report_groups_appointments_and_emits() {
    let now = Utc::now();
    let architect = professional("pro-00000001", ProfessionalRole::Architect, 0);
    let solicitor = professional("pro-00000002", ProfessionalRole::Solicitor, 0);
    let mut p = four_requirements(ProjectPhase::Planning);
    p.appointments.push(proposed(PROJECT, "apt-00000001", &architect, now));
    p.appointments.push(proposed(PROJECT, "apt-00000002", &solicitor, now));
    let h = Harness::new(vec![p], vec![]);

    let report = h.orchestrator.emit_report(PROJECT).await.unwrap();
    assert_eq!(report.appointments.len(), 2);
    assert_eq!(report.appointments[&ProfessionalRole::Architect].len(), 1);
    assert!(report.progress.completion_percentage.abs() < f64::EPSILON);
    assert_eq!(h.event_types().await, vec!["report_generated"]);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_events_on_one_component_apply_once() {
    let h = Harness::new(vec![four_requirements(ProjectPhase::ActiveSale)], vec![]);

    let mut handles = Vec::new();
    for i in 0..8 {
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .submit_event(
                    PROJECT,
                    envelope(&format!("evt-{i:08x}"), "tok-dev", change("cmp-00000001", IN_PROGRESS)),
                )
                .await
        }));
    }
    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
    let stored = h.store.get(PROJECT).unwrap();
    assert_eq!(stored.component("cmp-00000001").unwrap().history.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn projects_progress_independently() {
    let other = "prj-00000002";
    let mut second = project(other, ProjectPhase::ActiveSale);
    second.components = (1..=4)
        .map(|i| requirement(other, &format!("cmp-1000000{i}"), ComponentCategory::Technical))
        .collect();
    let h = Harness::new(
        vec![four_requirements(ProjectPhase::ActiveSale), second],
        vec![],
    );

    let mut handles = Vec::new();
    for (project_id, prefix) in [(PROJECT, "cmp-0000000"), (other, "cmp-1000000")] {
        for i in 1..=4 {
            let orchestrator = h.orchestrator.clone();
            let component = format!("{prefix}{i}");
            let event_id = format!("evt-{project_id}-{i}");
            handles.push(tokio::spawn(async move {
                orchestrator
                    .submit_event(
                        project_id,
                        envelope(&event_id, "tok-dev", change(&component, IN_PROGRESS)),
                    )
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for project_id in [PROJECT, other] {
        let progress = h.orchestrator.get_progress(project_id).await.unwrap();
        assert_eq!(progress.by_status["requirement:in_progress"], 4);
        assert_eq!(progress.version, 0);
    }
    assert_eq!(h.store.commit_count(), 8);
}
