//! Status enums, roles, and categories for PropIE.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! Status enums with state machines provide `allowed_next_states()` to enforce
//! valid transitions. `Expired` never appears in a transition table: expiry is
//! time-driven and applied by the sweep, not requested by an actor.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ComponentCategory
// ---------------------------------------------------------------------------

/// Business category of a component. Drives `by_category` and the compliance rate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Legal,
    Financial,
    Technical,
    Compliance,
    Contract,
}

impl ComponentCategory {
    pub const ALL: [Self; 5] = [
        Self::Legal,
        Self::Financial,
        Self::Technical,
        Self::Compliance,
        Self::Contract,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Financial => "financial",
            Self::Technical => "technical",
            Self::Compliance => "compliance",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Which state machine a component follows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Contract,
    Document,
    HtbClaim,
    Requirement,
}

impl ComponentKind {
    pub const ALL: [Self; 4] = [
        Self::Contract,
        Self::Document,
        Self::HtbClaim,
        Self::Requirement,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Document => "document",
            Self::HtbClaim => "htb_claim",
            Self::Requirement => "requirement",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequirementStatus
// ---------------------------------------------------------------------------

/// Status of a generic required work item.
///
/// ```text
/// not_started → in_progress → completed
///                           → blocked → in_progress
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    NotStarted,
    InProgress,
    Blocked,
    Completed,
    Expired,
}

impl RequirementStatus {
    pub const ALL: [Self; 5] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Blocked,
        Self::Completed,
        Self::Expired,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::NotStarted => &[Self::InProgress],
            Self::InProgress => &[Self::Blocked, Self::Completed],
            Self::Blocked => &[Self::InProgress],
            Self::Completed | Self::Expired => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DocumentStatus
// ---------------------------------------------------------------------------

/// Status of a document that must be supplied and reviewed.
///
/// ```text
/// pending → uploaded → under_review → approved
///              ↑                    → rejected
///              └──────────────────────┘ (resubmission)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Uploaded,
    UnderReview,
    Approved,
    Rejected,
    Expired,
}

impl DocumentStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Uploaded,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::Expired,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending | Self::Rejected => &[Self::Uploaded],
            Self::Uploaded => &[Self::UnderReview],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Expired => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Expired)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Approved)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploaded => "uploaded",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ContractStatus
// ---------------------------------------------------------------------------

/// Status of a sale contract.
///
/// ```text
/// draft → issued → signed → exchanged → completed
///           ↓        ↓
///        cancelled cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Issued,
    Signed,
    Exchanged,
    Completed,
    Cancelled,
    Expired,
}

impl ContractStatus {
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Issued,
        Self::Signed,
        Self::Exchanged,
        Self::Completed,
        Self::Cancelled,
        Self::Expired,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Issued],
            Self::Issued => &[Self::Signed, Self::Cancelled],
            Self::Signed => &[Self::Exchanged, Self::Cancelled],
            Self::Exchanged => &[Self::Completed],
            Self::Completed | Self::Cancelled | Self::Expired => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Signed => "signed",
            Self::Exchanged => "exchanged",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HtbClaimStatus
// ---------------------------------------------------------------------------

/// Canonical status set of a Help-to-Buy claim.
///
/// ```text
/// not_started → in_progress → submitted → approved → funds_received → completed
///                    ↑                  → rejected
///                    └──────────────────────┘ (resubmission)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HtbClaimStatus {
    NotStarted,
    InProgress,
    Submitted,
    Approved,
    Rejected,
    FundsReceived,
    Completed,
    Expired,
}

impl HtbClaimStatus {
    pub const ALL: [Self; 8] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Submitted,
        Self::Approved,
        Self::Rejected,
        Self::FundsReceived,
        Self::Completed,
        Self::Expired,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::NotStarted | Self::Rejected => &[Self::InProgress],
            Self::InProgress => &[Self::Submitted],
            Self::Submitted => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::FundsReceived],
            Self::FundsReceived => &[Self::Completed],
            Self::Completed | Self::Expired => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::FundsReceived => "funds_received",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for HtbClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AppointmentStatus
// ---------------------------------------------------------------------------

/// Status of a professional appointment on a project.
///
/// ```text
/// proposed → active → completed
///          ↘        ↘ terminated
///           terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Proposed,
    Active,
    Completed,
    Terminated,
}

impl AppointmentStatus {
    pub const ALL: [Self; 4] = [
        Self::Proposed,
        Self::Active,
        Self::Completed,
        Self::Terminated,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Proposed => &[Self::Active, Self::Terminated],
            Self::Active => &[Self::Completed, Self::Terminated],
            Self::Completed | Self::Terminated => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProjectPhase
// ---------------------------------------------------------------------------

/// Orchestrator-level state of a project.
///
/// ```text
/// planning → active_sale → closing → complete
///                 ↕           ↕
///              on_hold     on_hold   (resume returns to the held-from phase)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    Planning,
    ActiveSale,
    Closing,
    Complete,
    OnHold,
}

impl ProjectPhase {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Planning => &[Self::ActiveSale],
            Self::ActiveSale => &[Self::Closing, Self::OnHold],
            Self::Closing => &[Self::Complete, Self::OnHold],
            Self::OnHold => &[Self::ActiveSale, Self::Closing],
            Self::Complete => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Phases during which the periodic expiry sweep runs.
    #[must_use]
    pub const fn runs_sweep(self) -> bool {
        matches!(self, Self::ActiveSale | Self::Closing)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::ActiveSale => "active_sale",
            Self::Closing => "closing",
            Self::Complete => "complete",
            Self::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SaleStatus
// ---------------------------------------------------------------------------

/// Commercial lifecycle of the development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Planning,
    Selling,
    SoldOut,
}

impl SaleStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Selling => "selling",
            Self::SoldOut => "sold_out",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PartyRole
// ---------------------------------------------------------------------------

/// Role of an authenticated actor, used for edge authorization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Developer,
    Solicitor,
    Buyer,
    Architect,
    Engineer,
    FinancialInstitution,
    IssuingAuthority,
    ProjectManager,
    /// The engine itself (expiry sweep, appointment lapse).
    System,
}

impl PartyRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Solicitor => "solicitor",
            Self::Buyer => "buyer",
            Self::Architect => "architect",
            Self::Engineer => "engineer",
            Self::FinancialInstitution => "financial_institution",
            Self::IssuingAuthority => "issuing_authority",
            Self::ProjectManager => "project_manager",
            Self::System => "system",
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProfessionalRole
// ---------------------------------------------------------------------------

/// Discipline a project may require an appointment for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalRole {
    Architect,
    Solicitor,
    StructuralEngineer,
    QuantitySurveyor,
    BuildingSurveyor,
    BerAssessor,
    MortgageBroker,
    ProjectManager,
    EstateAgent,
}

impl ProfessionalRole {
    /// Default number of concurrent active appointments a professional of this
    /// discipline can carry.
    #[must_use]
    pub const fn default_capacity(self) -> u32 {
        match self {
            Self::Architect | Self::ProjectManager => 2,
            Self::StructuralEngineer => 3,
            Self::Solicitor | Self::QuantitySurveyor => 4,
            Self::BuildingSurveyor => 5,
            Self::MortgageBroker => 6,
            Self::BerAssessor | Self::EstateAgent => 8,
        }
    }

    /// Human-readable appointment title used when none is supplied.
    #[must_use]
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Architect => "Lead Architect",
            Self::Solicitor => "Conveyancing Solicitor",
            Self::StructuralEngineer => "Structural Engineer",
            Self::QuantitySurveyor => "Quantity Surveyor",
            Self::BuildingSurveyor => "Building Surveyor",
            Self::BerAssessor => "BER Assessor",
            Self::MortgageBroker => "Mortgage Broker",
            Self::ProjectManager => "Development Project Manager",
            Self::EstateAgent => "Selling Agent",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Solicitor => "solicitor",
            Self::StructuralEngineer => "structural_engineer",
            Self::QuantitySurveyor => "quantity_surveyor",
            Self::BuildingSurveyor => "building_surveyor",
            Self::BerAssessor => "ber_assessor",
            Self::MortgageBroker => "mortgage_broker",
            Self::ProjectManager => "project_manager",
            Self::EstateAgent => "estate_agent",
        }
    }
}

impl fmt::Display for ProfessionalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Urgency of a coordination request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CoordinationStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a coordination request.
///
/// ```text
/// open → fulfilled
///      → partially_fulfilled   (target passed, some roles active)
///      → expired               (target passed, no role active)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStatus {
    Open,
    Fulfilled,
    PartiallyFulfilled,
    Expired,
}

impl CoordinationStatus {
    #[must_use]
    pub const fn is_closed(self) -> bool {
        !matches!(self, Self::Open)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fulfilled => "fulfilled",
            Self::PartiallyFulfilled => "partially_fulfilled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for CoordinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
