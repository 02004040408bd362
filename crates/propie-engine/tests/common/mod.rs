//! Shared fixtures for the orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use propie_config::{PropieConfig, RetryConfig};
use propie_core::entities::{
    Component, HtbClaim, License, Owner, Professional, ProfessionalAppointment, Project,
};
use propie_core::enums::{
    ComponentCategory, ComponentKind, HtbClaimStatus, PartyRole, ProfessionalRole, ProjectPhase,
};
use propie_core::events::{DomainEvent, EngineEvent, EventEnvelope};
use propie_core::identity::Actor;
use propie_core::status::ComponentStatus;
use propie_engine::memory::{
    InMemoryDirectory, InMemoryProjectStore, RecordingEmitter, StaticIdentityResolver,
};
use propie_engine::orchestrator::{Collaborators, Orchestrator};

pub const PROJECT: &str = "prj-00000001";

pub struct Harness {
    pub store: Arc<InMemoryProjectStore>,
    pub identity: Arc<StaticIdentityResolver>,
    pub directory: Arc<InMemoryDirectory>,
    pub emitter: Arc<RecordingEmitter>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(projects: Vec<Project>, professionals: Vec<Professional>) -> Self {
        Self::with_config(projects, professionals, test_config())
    }

    pub fn with_config(
        projects: Vec<Project>,
        professionals: Vec<Professional>,
        config: PropieConfig,
    ) -> Self {
        let store = Arc::new(InMemoryProjectStore::new());
        for project in projects {
            store.insert(project);
        }
        let directory = Arc::new(professionals.into_iter().collect::<InMemoryDirectory>());
        let emitter = Arc::new(RecordingEmitter::new());
        let identity = Arc::new(
            StaticIdentityResolver::new()
                .with("tok-dev", Actor::new("dev-1", PartyRole::Developer))
                .with("tok-pm", Actor::new("pm-1", PartyRole::ProjectManager))
                .with("tok-buyer", Actor::new("buyer-1", PartyRole::Buyer))
                .with("tok-solicitor", Actor::new("sol-1", PartyRole::Solicitor))
                .with(
                    "tok-authority",
                    Actor::new("hta-1", PartyRole::IssuingAuthority),
                )
                .with("tok-system", Actor::system()),
        );

        let orchestrator = Orchestrator::new(
            Collaborators {
                store: Arc::clone(&store) as _,
                identity: Arc::clone(&identity) as _,
                directory: Arc::clone(&directory) as _,
                emitter: Arc::clone(&emitter) as _,
            },
            config,
        );
        Self {
            store,
            identity,
            directory,
            emitter,
            orchestrator,
        }
    }

    /// Domain event types delivered so far.
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.orchestrator.flush().await;
        self.emitter.event_types().await
    }

    pub async fn events(&self) -> Vec<DomainEvent> {
        self.orchestrator.flush().await;
        self.emitter.events().await
    }
}

/// Background sweep off, fast retries.
pub fn test_config() -> PropieConfig {
    let mut config = PropieConfig::default();
    config.sweep.enabled = false;
    config.retry = RetryConfig {
        max_attempts: 2,
        base_delay_ms: 1,
        max_delay_ms: 2,
    };
    config
}

pub fn project(id: &str, phase: ProjectPhase) -> Project {
    let mut p = Project::new(id, "Oak Park", "Dublin", 24, Utc::now());
    p.phase = phase;
    p
}

pub fn requirement(project_id: &str, id: &str, category: ComponentCategory) -> Component {
    Component::new(
        id,
        project_id,
        format!("Requirement {id}"),
        category,
        ComponentKind::Requirement,
        Owner {
            party_id: "dev-1".into(),
            role: PartyRole::Developer,
        },
        Utc::now(),
    )
    .unwrap()
}

pub fn document(project_id: &str, id: &str) -> Component {
    Component::new(
        id,
        project_id,
        format!("Document {id}"),
        ComponentCategory::Legal,
        ComponentKind::Document,
        Owner {
            party_id: "sol-1".into(),
            role: PartyRole::Solicitor,
        },
        Utc::now(),
    )
    .unwrap()
}

pub fn htb_claim(project_id: &str, id: &str, status: HtbClaimStatus, requested: u64) -> Component {
    let mut c = Component::new_htb_claim(
        id,
        project_id,
        "Help-to-Buy claim",
        Owner {
            party_id: "buyer-1".into(),
            role: PartyRole::Buyer,
        },
        HtbClaim {
            buyer_id: "buyer-1".into(),
            property_id: "unit-12".into(),
            requested_amount: requested,
            approved_amount: None,
        },
        Utc::now(),
    )
    .unwrap();
    c.status = ComponentStatus::HtbClaim(status);
    c
}

pub fn professional(id: &str, role: ProfessionalRole, active: u32) -> Professional {
    Professional {
        id: id.into(),
        name: format!("{role} {id}"),
        company: "Acme Partners".into(),
        role,
        license: License {
            number: format!("LIC-{id}"),
            issuer: "Registrar".into(),
            expires_at: None,
        },
        location: Some("Dublin".into()),
        capacity: role.default_capacity(),
        active_appointments: active,
    }
}

pub fn proposed(
    project_id: &str,
    id: &str,
    professional: &Professional,
    at: DateTime<Utc>,
) -> ProfessionalAppointment {
    ProfessionalAppointment::propose(id, project_id, professional, None, at)
}

pub fn envelope(event_id: &str, token: &str, event: EngineEvent) -> EventEnvelope {
    EventEnvelope::new(event_id, token, event)
}

pub fn change(component_id: &str, to: ComponentStatus) -> EngineEvent {
    EngineEvent::ComponentStatusChangeRequested {
        component_id: component_id.into(),
        to,
        approved_amount: None,
        note: None,
    }
}
