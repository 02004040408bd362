//! # propie-engine
//!
//! The PropIE sale-progress engine.
//!
//! - [`validator`]: pure status-transition and amount checks
//! - [`aggregator`]: completion and compliance percentages, upcoming deadlines
//! - [`scheduler`]: resolves coordination requests into proposed appointments
//! - [`orchestrator`]: per-project serialized event pipeline over the
//!   collaborator [`ports`]
//! - [`memory`] and [`trail`]: in-process collaborators and the JSONL event trail
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use propie_config::PropieConfig;
//! use propie_engine::memory::{
//!     InMemoryDirectory, InMemoryProjectStore, LogEmitter, StaticIdentityResolver,
//! };
//! use propie_engine::orchestrator::{Collaborators, Orchestrator};
//!
//! # async fn run() -> Result<(), propie_engine::error::EngineError> {
//! let orchestrator = Orchestrator::new(
//!     Collaborators {
//!         store: Arc::new(InMemoryProjectStore::new()),
//!         identity: Arc::new(StaticIdentityResolver::new()),
//!         directory: Arc::new(InMemoryDirectory::new()),
//!         emitter: Arc::new(LogEmitter),
//!     },
//!     PropieConfig::default(),
//! );
//! let progress = orchestrator.get_progress("prj-a3f8b2c1").await?;
//! println!("{:.1}% complete", progress.completion_percentage);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod ports;
pub mod retry;
pub mod scheduler;
pub mod trail;
pub mod validator;

pub use error::EngineError;
pub use orchestrator::{Collaborators, Orchestrator};
