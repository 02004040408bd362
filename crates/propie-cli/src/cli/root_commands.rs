use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSONL event stream against a project fixture.
    Replay(ReplayArgs),
    /// Check a single component transition without any project state.
    Validate(ValidateArgs),
    /// Print the component registry: kinds, statuses, edges and restricted edges.
    Registry,
    /// Print the JSON schema of a public type.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ReplayArgs {
    /// Project fixture (JSON).
    #[arg(long)]
    pub project: PathBuf,

    /// Event envelopes, one JSON object per line.
    #[arg(long)]
    pub events: PathBuf,

    /// Token to actor map (JSON object). Without it, tokens of the form
    /// `<role>:<actor_id>` are accepted as-is.
    #[arg(long)]
    pub identities: Option<PathBuf>,

    /// Professional directory (JSON array) used for coordination.
    #[arg(long)]
    pub professionals: Option<PathBuf>,

    /// Append every domain event to `<dir>/<project_id>.jsonl`.
    #[arg(long)]
    pub trail_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct ValidateArgs {
    /// Current status, `<kind>:<status>` (e.g. `requirement:in_progress`).
    #[arg(long)]
    pub from: String,

    /// Requested status, `<kind>:<status>`.
    #[arg(long)]
    pub to: String,

    /// Party requesting the change (e.g. `developer`, `issuing-authority`).
    #[arg(long)]
    pub role: String,

    /// Amount approved, for an HTB claim approval.
    #[arg(long, requires = "requested_amount")]
    pub approved_amount: Option<u64>,

    /// Amount requested on the claim being approved.
    #[arg(long, requires = "approved_amount")]
    pub requested_amount: Option<u64>,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Type name: project, component, progress, report, coordination-result,
    /// domain-event, engine-event, event-envelope.
    pub type_name: String,
}
