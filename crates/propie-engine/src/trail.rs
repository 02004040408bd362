//! Append-only JSONL event trail.
//!
//! One file per project, `{dir}/{project_id}.jsonl`, one `DomainEvent` per
//! line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use propie_core::events::DomainEvent;

use crate::error::EmitError;
use crate::ports::EventEmitter;

/// Emitter that appends every event to a per-project JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlEmitter {
    dir: PathBuf,
}

impl JsonlEmitter {
    /// Create the emitter, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns `EmitError::Other` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, EmitError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| EmitError::Other(anyhow::anyhow!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn trail_path(&self, project_id: &str) -> PathBuf {
        self.dir.join(format!("{project_id}.jsonl"))
    }

    /// Read back every event recorded for `project_id`, oldest first.
    ///
    /// A project with no trail file yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `EmitError::Other` if the file cannot be read or a line does
    /// not parse.
    pub fn read_trail(&self, project_id: &str) -> Result<Vec<DomainEvent>, EmitError> {
        let path = self.trail_path(project_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let lines = serde_jsonlines::json_lines(&path)
            .map_err(|e| EmitError::Other(anyhow::anyhow!("open {}: {e}", path.display())))?;
        lines
            .collect::<std::io::Result<Vec<DomainEvent>>>()
            .map_err(|e| EmitError::Other(anyhow::anyhow!("read {}: {e}", path.display())))
    }
}

#[async_trait]
impl EventEmitter for JsonlEmitter {
    async fn emit(&self, event: &DomainEvent) -> Result<(), EmitError> {
        let path = self.trail_path(&event.project_id);
        serde_jsonlines::append_json_lines(&path, [event])
            .map_err(|e| EmitError::Other(anyhow::anyhow!("append {}: {e}", path.display())))?;
        tracing::debug!(
            path = %path.display(),
            event_type = event.event_type(),
            "Appended domain event to trail"
        );
        Ok(())
    }
}
