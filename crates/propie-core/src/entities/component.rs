use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ComponentCategory, ComponentKind, PartyRole};
use crate::errors::CoreError;
use crate::registry;
use crate::status::ComponentStatus;

/// The party responsible for moving a component forward.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Owner {
    pub party_id: String,
    pub role: PartyRole,
}

/// One recorded status change.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HistoryEntry {
    pub from: ComponentStatus,
    pub to: ComponentStatus,
    pub actor_id: String,
    pub actor_role: PartyRole,
    /// Inbound event that caused the change.
    pub event_id: String,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Append-only transition history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.0.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Help-to-Buy claim terms carried by an `htb_claim` component.
///
/// Amounts are whole euros.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HtbClaim {
    pub buyer_id: String,
    pub property_id: String,
    pub requested_amount: u64,
    pub approved_amount: Option<u64>,
}

/// A unit of required work within a project or a specific sale.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub category: ComponentCategory,
    pub status: ComponentStatus,
    pub owner: Owner,
    pub required: bool,
    pub due_at: Option<DateTime<Utc>>,
    pub last_transition_at: DateTime<Utc>,
    pub history: History,
    /// Present exactly when `status` is an `htb_claim` status.
    pub claim: Option<HtbClaim>,
    /// Storage reference of the latest uploaded document, if any.
    pub document_ref: Option<String>,
    /// Optimistic-concurrency row version.
    pub version: u64,
}

impl Component {
    /// Create a component in the initial state of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if `kind` is not legal for `category`,
    /// or if `kind` is `htb_claim` (use [`Component::new_htb_claim`]).
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        category: ComponentCategory,
        kind: ComponentKind,
        owner: Owner,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if kind == ComponentKind::HtbClaim {
            return Err(CoreError::Validation(
                "htb_claim components carry claim terms; use new_htb_claim".into(),
            ));
        }
        let component = Self {
            id: id.into(),
            project_id: project_id.into(),
            name: name.into(),
            category,
            status: ComponentStatus::initial(kind),
            owner,
            required: true,
            due_at: None,
            last_transition_at: created_at,
            history: History::new(),
            claim: None,
            document_ref: None,
            version: 0,
        };
        component.check_shape()?;
        Ok(component)
    }

    /// Create a Help-to-Buy claim component (category `financial`).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the requested amount is zero.
    pub fn new_htb_claim(
        id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        owner: Owner,
        claim: HtbClaim,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let component = Self {
            id: id.into(),
            project_id: project_id.into(),
            name: name.into(),
            category: ComponentCategory::Financial,
            status: ComponentStatus::initial(ComponentKind::HtbClaim),
            owner,
            required: true,
            due_at: None,
            last_transition_at: created_at,
            history: History::new(),
            claim: Some(claim),
            document_ref: None,
            version: 0,
        };
        component.check_shape()?;
        Ok(component)
    }

    #[must_use]
    pub const fn with_due(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        self.status.kind()
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Verify the structural invariants that do not depend on a transition.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` describing the first violated rule.
    pub fn check_shape(&self) -> Result<(), CoreError> {
        if !registry::is_legal(self.category, self.kind()) {
            return Err(CoreError::Validation(format!(
                "component {}: kind {} is not legal for category {}",
                self.id,
                self.kind(),
                self.category
            )));
        }
        match (self.kind(), &self.claim) {
            (ComponentKind::HtbClaim, None) => Err(CoreError::Validation(format!(
                "component {}: htb_claim without claim terms",
                self.id
            ))),
            (ComponentKind::HtbClaim, Some(claim)) => {
                if claim.requested_amount == 0 {
                    return Err(CoreError::Validation(format!(
                        "component {}: requested amount must be positive",
                        self.id
                    )));
                }
                match claim.approved_amount {
                    Some(approved) if approved > claim.requested_amount => {
                        Err(CoreError::Validation(format!(
                            "component {}: approved {approved} exceeds requested {}",
                            self.id, claim.requested_amount
                        )))
                    }
                    _ => Ok(()),
                }
            }
            (_, Some(_)) => Err(CoreError::Validation(format!(
                "component {}: claim terms on a non-claim component",
                self.id
            ))),
            (_, None) => Ok(()),
        }
    }
}
