use anyhow::Context;
use chrono::Utc;
use propie_core::entities::{Component, HtbClaim, Owner};
use propie_core::enums::{ComponentKind, PartyRole};
use propie_core::errors::RejectionReason;
use propie_core::status::ComponentStatus;
use propie_engine::validator;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ValidateArgs;
use crate::commands::shared::parse::parse_enum;
use crate::output::output;

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub from: ComponentStatus,
    pub to: ComponentStatus,
    pub role: PartyRole,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionReason>,
}

/// Handle `propie validate`.
pub fn handle(args: &ValidateArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = check(args)?;
    output(&report, flags.format)
}

pub fn check(args: &ValidateArgs) -> anyhow::Result<ValidationReport> {
    let from: ComponentStatus = args
        .from
        .parse()
        .with_context(|| format!("invalid --from '{}'", args.from))?;
    let to: ComponentStatus = args
        .to
        .parse()
        .with_context(|| format!("invalid --to '{}'", args.to))?;
    let role: PartyRole = parse_enum(&args.role, "role")?;

    // HTB claims carry amount rules, so they are checked against a claim
    // built from the given amounts.
    let outcome = if from.kind() == ComponentKind::HtbClaim {
        let claim = claim_in(from, args)?;
        validator::validate_component(&claim, to, role, args.approved_amount)
    } else {
        validator::validate(from.kind(), from, to, role)
    };

    let rejection = outcome.err();
    Ok(ValidationReport {
        from,
        to,
        role,
        accepted: rejection.is_none(),
        rejection,
    })
}

fn claim_in(status: ComponentStatus, args: &ValidateArgs) -> anyhow::Result<Component> {
    let mut component = Component::new_htb_claim(
        "cmp-00000000",
        "prj-00000000",
        "Help-to-Buy claim",
        Owner {
            party_id: "buyer".into(),
            role: PartyRole::Buyer,
        },
        HtbClaim {
            buyer_id: "buyer".into(),
            property_id: "unit".into(),
            // No requested amount given: no cap.
            requested_amount: args.requested_amount.unwrap_or(u64::MAX),
            approved_amount: None,
        },
        Utc::now(),
    )?;
    component.status = status;
    if let Some(claim) = component.claim.as_mut() {
        claim.approved_amount = args.approved_amount;
    }
    Ok(component)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use propie_core::errors::{Invariant, ReasonCode};

    use super::check;
    use crate::cli::root_commands::ValidateArgs;

    fn args(from: &str, to: &str, role: &str) -> ValidateArgs {
        ValidateArgs {
            from: from.into(),
            to: to.into(),
            role: role.into(),
            approved_amount: None,
            requested_amount: None,
        }
    }

    #[test]
    fn open_edge_is_accepted() {
        let report = check(&args(
            "requirement:not_started",
            "requirement:in_progress",
            "buyer",
        ))
        .expect("check should run");
        assert!(report.accepted);
        assert!(report.rejection.is_none());
    }

    #[test]
    fn missing_edge_is_rejected() {
        let report = check(&args("document:pending", "document:approved", "developer"))
            .expect("check should run");
        let rejection = report.rejection.expect("should be rejected");
        assert_eq!(rejection.code, ReasonCode::InvalidTransition);
        assert_eq!(rejection.invariant, Invariant::TransitionTable);
    }

    #[test]
    fn approval_above_requested_is_rejected() {
        let mut a = args("htb_claim:submitted", "htb_claim:approved", "issuing-authority");
        a.approved_amount = Some(35_000);
        a.requested_amount = Some(30_000);
        let report = check(&a).expect("check should run");
        assert_eq!(
            report.rejection.map(|r| r.invariant),
            Some(Invariant::ApprovedAmountWithinRequested)
        );

        a.approved_amount = Some(28_000);
        assert!(check(&a).expect("check should run").accepted);
    }

    #[test]
    fn approval_without_amount_is_rejected() {
        let report = check(&args(
            "htb_claim:submitted",
            "htb_claim:approved",
            "issuing_authority",
        ))
        .expect("check should run");
        assert_eq!(
            report.rejection.map(|r| r.invariant),
            Some(Invariant::ApprovedAmountRequired)
        );
    }

    #[test]
    fn malformed_status_is_an_error() {
        let err = check(&args("requirement", "requirement:in_progress", "buyer"))
            .expect_err("should fail");
        assert!(err.to_string().contains("invalid --from"));
    }
}
