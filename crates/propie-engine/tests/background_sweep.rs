//! Background expiry sweep driven by the tokio clock.

mod common;

use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use propie_core::enums::{ComponentCategory, ProjectPhase, RequirementStatus};
use propie_core::status::ComponentStatus;

use common::{Harness, PROJECT, project, requirement, test_config};

fn overdue_project(phase: ProjectPhase) -> propie_core::entities::Project {
    let mut p = project(PROJECT, phase);
    p.components = vec![
        requirement(PROJECT, "cmp-00000001", ComponentCategory::Compliance)
            .with_due(Utc::now() - chrono::Duration::days(2)),
    ];
    p
}

fn sweeping_harness(phase: ProjectPhase) -> Harness {
    let mut config = test_config();
    config.sweep.enabled = true;
    config.sweep.interval_secs = 60;
    Harness::with_config(vec![overdue_project(phase)], vec![], config)
}

fn stored_status(h: &Harness) -> ComponentStatus {
    h.store
        .get(PROJECT)
        .unwrap()
        .component("cmp-00000001")
        .unwrap()
        .status
}

#[tokio::test(start_paused = true)]
async fn interval_tick_expires_overdue_component() {
    let h = sweeping_harness(ProjectPhase::ActiveSale);
    h.orchestrator.get_progress(PROJECT).await.unwrap();
    assert!(h.orchestrator.sweep_active(PROJECT).await);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        stored_status(&h),
        ComponentStatus::Requirement(RequirementStatus::NotStarted)
    );

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(
        stored_status(&h),
        ComponentStatus::Requirement(RequirementStatus::Expired)
    );
    assert_eq!(h.event_types().await, vec!["component_expired"]);

    // Later ticks find nothing left to expire.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.event_types().await, vec!["component_expired"]);
    h.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn planning_projects_are_not_swept() {
    let h = sweeping_harness(ProjectPhase::Planning);
    h.orchestrator.get_progress(PROJECT).await.unwrap();
    assert!(!h.orchestrator.sweep_active(PROJECT).await);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(
        stored_status(&h),
        ComponentStatus::Requirement(RequirementStatus::NotStarted)
    );
    assert_eq!(h.store.commit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_sweep() {
    let h = sweeping_harness(ProjectPhase::ActiveSale);
    h.orchestrator.get_progress(PROJECT).await.unwrap();
    h.orchestrator.shutdown().await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(
        stored_status(&h),
        ComponentStatus::Requirement(RequirementStatus::NotStarted)
    );
}
