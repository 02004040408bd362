//! `ComponentStatus`: a status tagged with the state machine it belongs to.
//!
//! A component's status is a sum type over the per-kind status enums, so a
//! status that is not a member of its kind's set cannot be constructed.
//! Serialized as `{"kind": "htb_claim", "status": "submitted"}`.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{
    ComponentKind, ContractStatus, DocumentStatus, HtbClaimStatus, RequirementStatus,
};
use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum ComponentStatus {
    Contract(ContractStatus),
    Document(DocumentStatus),
    HtbClaim(HtbClaimStatus),
    Requirement(RequirementStatus),
}

impl ComponentStatus {
    /// The state a freshly created component of `kind` starts in.
    #[must_use]
    pub const fn initial(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Contract => Self::Contract(ContractStatus::Draft),
            ComponentKind::Document => Self::Document(DocumentStatus::Pending),
            ComponentKind::HtbClaim => Self::HtbClaim(HtbClaimStatus::NotStarted),
            ComponentKind::Requirement => Self::Requirement(RequirementStatus::NotStarted),
        }
    }

    /// The `expired` member of this status's kind.
    #[must_use]
    pub const fn expired_of(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Contract => Self::Contract(ContractStatus::Expired),
            ComponentKind::Document => Self::Document(DocumentStatus::Expired),
            ComponentKind::HtbClaim => Self::HtbClaim(HtbClaimStatus::Expired),
            ComponentKind::Requirement => Self::Requirement(RequirementStatus::Expired),
        }
    }

    /// Every legal status of `kind`, in declaration order.
    #[must_use]
    pub fn all_of(kind: ComponentKind) -> Vec<Self> {
        match kind {
            ComponentKind::Contract => ContractStatus::ALL.into_iter().map(Self::Contract).collect(),
            ComponentKind::Document => DocumentStatus::ALL.into_iter().map(Self::Document).collect(),
            ComponentKind::HtbClaim => HtbClaimStatus::ALL.into_iter().map(Self::HtbClaim).collect(),
            ComponentKind::Requirement => RequirementStatus::ALL
                .into_iter()
                .map(Self::Requirement)
                .collect(),
        }
    }

    #[must_use]
    pub const fn kind(self) -> ComponentKind {
        match self {
            Self::Contract(_) => ComponentKind::Contract,
            Self::Document(_) => ComponentKind::Document,
            Self::HtbClaim(_) => ComponentKind::HtbClaim,
            Self::Requirement(_) => ComponentKind::Requirement,
        }
    }

    /// Outgoing edges of the transition table. Never contains `expired`.
    #[must_use]
    pub fn allowed_next_states(self) -> Vec<Self> {
        match self {
            Self::Contract(s) => s.allowed_next_states().iter().copied().map(Self::Contract).collect(),
            Self::Document(s) => s.allowed_next_states().iter().copied().map(Self::Document).collect(),
            Self::HtbClaim(s) => s.allowed_next_states().iter().copied().map(Self::HtbClaim).collect(),
            Self::Requirement(s) => s
                .allowed_next_states()
                .iter()
                .copied()
                .map(Self::Requirement)
                .collect(),
        }
    }

    /// Whether `next` is an edge of the table. Cross-kind pairs are never edges.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Contract(a), Self::Contract(b)) => a.can_transition_to(b),
            (Self::Document(a), Self::Document(b)) => a.can_transition_to(b),
            (Self::HtbClaim(a), Self::HtbClaim(b)) => a.can_transition_to(b),
            (Self::Requirement(a), Self::Requirement(b)) => a.can_transition_to(b),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::Contract(s) => s.is_terminal(),
            Self::Document(s) => s.is_terminal(),
            Self::HtbClaim(s) => s.is_terminal(),
            Self::Requirement(s) => s.is_terminal(),
        }
    }

    /// Terminal and counted as done by the progress aggregator.
    #[must_use]
    pub const fn is_success(self) -> bool {
        match self {
            Self::Contract(s) => s.is_success(),
            Self::Document(s) => s.is_success(),
            Self::HtbClaim(s) => s.is_success(),
            Self::Requirement(s) => s.is_success(),
        }
    }

    #[must_use]
    pub const fn is_expired(self) -> bool {
        matches!(
            self,
            Self::Contract(ContractStatus::Expired)
                | Self::Document(DocumentStatus::Expired)
                | Self::HtbClaim(HtbClaimStatus::Expired)
                | Self::Requirement(RequirementStatus::Expired)
        )
    }

    /// Status name without the kind, e.g. `"in_progress"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contract(s) => s.as_str(),
            Self::Document(s) => s.as_str(),
            Self::HtbClaim(s) => s.as_str(),
            Self::Requirement(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.as_str())
    }
}

/// Parses the `Display` form, `"<kind>:<status>"`.
impl FromStr for ComponentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, status) = s.split_once(':').ok_or_else(|| {
            CoreError::Validation(format!("expected '<kind>:<status>', got '{s}'"))
        })?;
        let value = serde_json::json!({ "kind": kind.trim(), "status": status.trim() });
        serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("unknown component status '{s}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cross_kind_pairs_are_never_edges() {
        let from = ComponentStatus::Requirement(RequirementStatus::NotStarted);
        let to = ComponentStatus::HtbClaim(HtbClaimStatus::InProgress);
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn display_and_parse_agree() {
        for kind in ComponentKind::ALL {
            for status in ComponentStatus::all_of(kind) {
                let parsed: ComponentStatus = status.to_string().parse().unwrap();
                assert_eq!(parsed, status);
            }
        }
    }

    #[test]
    fn parse_rejects_unknown_status() {
        assert!("htb_claim:signed".parse::<ComponentStatus>().is_err());
        assert!("completed".parse::<ComponentStatus>().is_err());
    }

    #[test]
    fn serializes_adjacently_tagged() {
        let status = ComponentStatus::HtbClaim(HtbClaimStatus::Submitted);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "htb_claim", "status": "submitted" })
        );
    }

    #[test]
    fn initial_and_expired_share_kind() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentStatus::initial(kind).kind(), kind);
            let expired = ComponentStatus::expired_of(kind);
            assert_eq!(expired.kind(), kind);
            assert!(expired.is_expired());
            assert!(expired.is_terminal());
            assert!(!expired.is_success());
        }
    }
}
