//! Engine error types.
//!
//! Collaborator failures (`StoreError`, `IdentityError`, `EmitError`) are kept
//! apart from `EngineError`, the type returned by the orchestrator's public
//! operations. A refused event is `EngineError::Rejected` and never mutates
//! state.

use std::time::Duration;

use propie_core::errors::{CoreError, RejectionReason};
use thiserror::Error;

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The project does not exist in the store.
    #[error("Project not found in store: {0}")]
    NotFound(String),

    /// A row changed since the engine last read it.
    #[error("Version conflict on {entity} {id}: expected {expected}, found {found}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    /// The backend is temporarily unavailable; the call may be retried.
    #[error("Transient persistence failure: {0}")]
    Transient(String),

    /// The call did not complete within the configured timeout.
    #[error("Persistence call timed out after {0:?}")]
    Timeout(Duration),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether the failure should be retried with backoff.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Errors from the identity collaborator.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token does not map to any known actor.
    #[error("Unknown actor token")]
    UnknownToken,

    /// The identity service could not be reached.
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the notification collaborator. Logged, never propagated.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Emitter unavailable: {0}")]
    Unavailable(String),

    #[error("Emit timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors returned by the orchestrator's public operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The event violated an invariant; state is unchanged.
    #[error("Rejected: {0}")]
    Rejected(#[from] RejectionReason),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Coordination request not found: {0}")]
    CoordinationNotFound(String),

    /// Non-transient persistence failure; state is unchanged.
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("Identity resolution failed: {0}")]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// The rejection, if this error is one.
    #[must_use]
    pub const fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propie_core::errors::{Invariant, ReasonCode};

    #[test]
    fn only_transient_and_timeout_retry() {
        assert!(StoreError::Transient("blip".into()).is_transient());
        assert!(StoreError::Timeout(Duration::from_millis(5)).is_transient());
        assert!(!StoreError::NotFound("prj-1".into()).is_transient());
        assert!(
            !StoreError::VersionConflict {
                entity: "component",
                id: "cmp-1".into(),
                expected: 1,
                found: 2,
            }
            .is_transient()
        );
    }

    #[test]
    fn rejection_accessor() {
        let err = EngineError::from(RejectionReason::unauthorized(
            Invariant::EdgeAuthorization,
            "buyer may not approve",
        ));
        assert_eq!(err.rejection().map(|r| r.code), Some(ReasonCode::Unauthorized));
        assert!(EngineError::ProjectNotFound("prj-1".into()).rejection().is_none());
    }
}
