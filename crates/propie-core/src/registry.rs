//! Component registry: the typed catalogue of component kinds.
//!
//! Answers three questions for the validator and for tooling:
//! - which state machines a category may use (`legal_kinds`)
//! - which edges are restricted to particular parties (`authorised_roles`)
//! - what the whole catalogue looks like (`describe`)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{
    AppointmentStatus, ComponentCategory, ComponentKind, ContractStatus, DocumentStatus,
    HtbClaimStatus, PartyRole,
};
use crate::status::ComponentStatus;

const REVIEWERS: &[PartyRole] = &[
    PartyRole::Developer,
    PartyRole::Solicitor,
    PartyRole::Architect,
    PartyRole::Engineer,
    PartyRole::FinancialInstitution,
    PartyRole::IssuingAuthority,
];
const CONTRACT_ISSUERS: &[PartyRole] = &[PartyRole::Developer, PartyRole::Solicitor];
const APPOINTING_PARTIES: &[PartyRole] = &[PartyRole::Developer, PartyRole::ProjectManager];

/// State machines a component of `category` may follow.
#[must_use]
pub const fn legal_kinds(category: ComponentCategory) -> &'static [ComponentKind] {
    match category {
        ComponentCategory::Contract => &[ComponentKind::Contract],
        ComponentCategory::Financial => &[
            ComponentKind::HtbClaim,
            ComponentKind::Document,
            ComponentKind::Requirement,
        ],
        ComponentCategory::Legal | ComponentCategory::Technical | ComponentCategory::Compliance => {
            &[ComponentKind::Document, ComponentKind::Requirement]
        }
    }
}

#[must_use]
pub fn is_legal(category: ComponentCategory, kind: ComponentKind) -> bool {
    legal_kinds(category).contains(&kind)
}

/// Parties allowed to take the edge `from → to`.
///
/// `None` means the edge is open to any resolved actor. The caller is
/// expected to have checked that the edge exists in the transition table.
#[must_use]
pub const fn authorised_roles(
    from: ComponentStatus,
    to: ComponentStatus,
) -> Option<&'static [PartyRole]> {
    match (from, to) {
        (
            ComponentStatus::HtbClaim(HtbClaimStatus::InProgress),
            ComponentStatus::HtbClaim(HtbClaimStatus::Submitted),
        ) => Some(&[PartyRole::Buyer, PartyRole::Solicitor]),
        (
            ComponentStatus::HtbClaim(HtbClaimStatus::Submitted),
            ComponentStatus::HtbClaim(HtbClaimStatus::Approved | HtbClaimStatus::Rejected),
        ) => Some(&[PartyRole::IssuingAuthority]),
        (
            ComponentStatus::HtbClaim(HtbClaimStatus::Approved),
            ComponentStatus::HtbClaim(HtbClaimStatus::FundsReceived),
        ) => Some(&[PartyRole::Developer, PartyRole::FinancialInstitution]),
        (
            ComponentStatus::HtbClaim(HtbClaimStatus::FundsReceived),
            ComponentStatus::HtbClaim(HtbClaimStatus::Completed),
        ) => Some(&[PartyRole::Developer]),
        (
            ComponentStatus::Contract(ContractStatus::Draft),
            ComponentStatus::Contract(ContractStatus::Issued),
        )
        | (_, ComponentStatus::Contract(ContractStatus::Cancelled)) => Some(CONTRACT_ISSUERS),
        (
            ComponentStatus::Contract(ContractStatus::Issued),
            ComponentStatus::Contract(ContractStatus::Signed),
        ) => Some(&[PartyRole::Buyer]),
        (
            ComponentStatus::Contract(ContractStatus::Signed),
            ComponentStatus::Contract(ContractStatus::Exchanged),
        )
        | (
            ComponentStatus::Contract(ContractStatus::Exchanged),
            ComponentStatus::Contract(ContractStatus::Completed),
        ) => Some(&[PartyRole::Solicitor]),
        (
            ComponentStatus::Document(DocumentStatus::UnderReview),
            ComponentStatus::Document(DocumentStatus::Approved | DocumentStatus::Rejected),
        ) => Some(REVIEWERS),
        _ => None,
    }
}

/// Parties allowed to move an appointment from `from` to `to`.
///
/// Every appointment edge is restricted: appointments are committed by the
/// developer side, never by the professional being appointed.
#[must_use]
pub const fn appointment_authorised_roles(
    _from: AppointmentStatus,
    _to: AppointmentStatus,
) -> &'static [PartyRole] {
    APPOINTING_PARTIES
}

/// One edge of a transition table, as exposed by `describe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EdgeDescriptor {
    pub from: String,
    pub to: String,
    /// `None` when any resolved actor may take the edge.
    pub authorised_roles: Option<Vec<PartyRole>>,
}

/// Full description of one component kind's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KindDescriptor {
    pub kind: ComponentKind,
    pub initial: String,
    pub statuses: Vec<String>,
    pub terminal: Vec<String>,
    pub success: Vec<String>,
    pub edges: Vec<EdgeDescriptor>,
    pub categories: Vec<ComponentCategory>,
}

/// The whole catalogue, for tooling and documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryDescriptor {
    pub kinds: Vec<KindDescriptor>,
    pub appointment: KindLifecycle,
}

/// Appointment lifecycle (not a component kind, but catalogued alongside).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KindLifecycle {
    pub statuses: Vec<String>,
    pub edges: Vec<EdgeDescriptor>,
}

#[must_use]
pub fn describe() -> RegistryDescriptor {
    let kinds = ComponentKind::ALL
        .into_iter()
        .map(|kind| {
            let all = ComponentStatus::all_of(kind);
            let edges = all
                .iter()
                .flat_map(|from| {
                    from.allowed_next_states()
                        .into_iter()
                        .map(move |to| EdgeDescriptor {
                            from: from.as_str().to_string(),
                            to: to.as_str().to_string(),
                            authorised_roles: authorised_roles(*from, to).map(<[_]>::to_vec),
                        })
                })
                .collect();
            KindDescriptor {
                kind,
                initial: ComponentStatus::initial(kind).as_str().to_string(),
                statuses: all.iter().map(|s| s.as_str().to_string()).collect(),
                terminal: all
                    .iter()
                    .filter(|s| s.is_terminal())
                    .map(|s| s.as_str().to_string())
                    .collect(),
                success: all
                    .iter()
                    .filter(|s| s.is_success())
                    .map(|s| s.as_str().to_string())
                    .collect(),
                edges,
                categories: ComponentCategory::ALL
                    .into_iter()
                    .filter(|c| is_legal(*c, kind))
                    .collect(),
            }
        })
        .collect();

    let appointment = KindLifecycle {
        statuses: AppointmentStatus::ALL
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        edges: AppointmentStatus::ALL
            .iter()
            .flat_map(|from| {
                from.allowed_next_states().iter().map(move |to| EdgeDescriptor {
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                    authorised_roles: Some(appointment_authorised_roles(*from, *to).to_vec()),
                })
            })
            .collect(),
    };

    RegistryDescriptor { kinds, appointment }
}
