use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use propie_core::entities::{Professional, Project};
use propie_core::enums::PartyRole;
use propie_core::errors::RejectionReason;
use propie_core::events::EventEnvelope;
use propie_core::identity::Actor;
use propie_core::responses::ProjectProgress;
use propie_engine::EngineError;
use propie_engine::error::IdentityError;
use propie_engine::memory::{
    InMemoryDirectory, InMemoryProjectStore, LogEmitter, StaticIdentityResolver,
};
use propie_engine::orchestrator::{Collaborators, Orchestrator};
use propie_engine::ports::{EventEmitter, IdentityResolver};
use propie_engine::trail::JsonlEmitter;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::bootstrap;
use crate::cli::root_commands::ReplayArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::commands::shared::parse::parse_enum;
use crate::output::{output, to_ndjson};

#[derive(Debug, Serialize)]
pub struct EventOutcome {
    pub event_id: String,
    pub event_type: &'static str,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionReason>,
}

#[derive(Debug, Serialize)]
pub struct ReplaySummary {
    pub project_id: String,
    pub accepted: usize,
    pub rejected: usize,
    pub pending_writes: usize,
    pub progress: ProjectProgress,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<EventOutcome>,
}

/// Handle `propie replay`.
pub async fn handle(args: &ReplayArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let mut summary = run(args, flags).await?;
    match flags.format {
        OutputFormat::Json => output(&summary, flags.format),
        OutputFormat::Raw => {
            print!("{}", to_ndjson(&summary.outcomes)?);
            summary.outcomes.clear();
            output(&summary, flags.format)
        }
    }
}

pub async fn run(args: &ReplayArgs, flags: &GlobalFlags) -> anyhow::Result<ReplaySummary> {
    let mut config = bootstrap::load_config(flags)?;
    // Timer ticks in the stream drive expiry.
    config.sweep.enabled = false;

    let project: Project = read_json(&args.project)?;
    for component in &project.components {
        component
            .check_shape()
            .with_context(|| format!("{} is not a valid project", args.project.display()))?;
    }
    let project_id = project.id.clone();
    let envelopes = read_envelopes(&args.events)?;

    let identity: Arc<dyn IdentityResolver> = match &args.identities {
        Some(path) => {
            let table: HashMap<String, Actor> = read_json(path)?;
            Arc::new(StaticIdentityResolver::from(table))
        }
        None => Arc::new(RoleTokenResolver),
    };
    let directory = match &args.professionals {
        Some(path) => read_json::<Vec<Professional>>(path)?
            .into_iter()
            .collect::<InMemoryDirectory>(),
        None => InMemoryDirectory::new(),
    };
    let emitter: Arc<dyn EventEmitter> = match &args.trail_dir {
        Some(dir) => Arc::new(
            JsonlEmitter::new(dir)
                .with_context(|| format!("failed to open trail directory {}", dir.display()))?,
        ),
        None => Arc::new(LogEmitter),
    };
    let store = Arc::new(InMemoryProjectStore::new());
    store.insert(project);

    let orchestrator = Orchestrator::new(
        Collaborators {
            store,
            identity,
            directory: Arc::new(directory),
            emitter,
        },
        config,
    );

    let mut outcomes = Vec::with_capacity(envelopes.len());
    for envelope in envelopes {
        let event_id = envelope.event_id.clone();
        let event_type = envelope.event.event_type();
        let outcome = match orchestrator.submit_event(&project_id, envelope).await {
            Ok(progress) => EventOutcome {
                event_id,
                event_type,
                accepted: true,
                completion_percentage: Some(progress.completion_percentage),
                rejection: None,
            },
            Err(EngineError::Rejected(reason)) => EventOutcome {
                event_id,
                event_type,
                accepted: false,
                completion_percentage: None,
                rejection: Some(reason),
            },
            Err(error) => {
                return Err(error).with_context(|| format!("event {event_id} could not be applied"));
            }
        };
        outcomes.push(outcome);
    }

    let progress = orchestrator.get_progress(&project_id).await?;
    let pending_writes = orchestrator.pending_writes(&project_id).await?;
    orchestrator.shutdown().await;

    let accepted = outcomes.iter().filter(|o| o.accepted).count();
    tracing::info!(
        project_id = %project_id,
        accepted,
        rejected = outcomes.len() - accepted,
        "Replay finished"
    );
    Ok(ReplaySummary {
        project_id,
        accepted,
        rejected: outcomes.len() - accepted,
        pending_writes,
        progress,
        outcomes,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_envelopes(path: &Path) -> anyhow::Result<Vec<EventEnvelope>> {
    serde_jsonlines::json_lines::<EventEnvelope, _>(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .enumerate()
        .map(|(i, line)| {
            line.with_context(|| format!("{}: line {} is not an event envelope", path.display(), i + 1))
        })
        .collect()
}

/// Resolves `<role>:<actor_id>` tokens without a lookup table.
struct RoleTokenResolver;

#[async_trait]
impl IdentityResolver for RoleTokenResolver {
    async fn resolve(&self, actor_token: &str) -> Result<Actor, IdentityError> {
        let (role, actor_id) = actor_token
            .split_once(':')
            .ok_or(IdentityError::UnknownToken)?;
        if actor_id.is_empty() {
            return Err(IdentityError::UnknownToken);
        }
        let role: PartyRole =
            parse_enum(role, "role").map_err(|_| IdentityError::UnknownToken)?;
        Ok(Actor::new(actor_id, role))
    }
}
