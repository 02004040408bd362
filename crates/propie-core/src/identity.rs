use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::PartyRole;

/// Resolved identity of whoever submitted an event.
///
/// Produced by the identity collaborator from an opaque actor token.
/// Contains only data fields, no auth logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Actor {
    pub actor_id: String,
    pub role: PartyRole,
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    #[must_use]
    pub fn new(actor_id: impl Into<String>, role: PartyRole) -> Self {
        Self {
            actor_id: actor_id.into(),
            role,
        }
    }

    /// The engine's own identity, used for sweep-driven transitions.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ID, PartyRole::System)
    }
}
