//! Prefixed entity IDs.
//!
//! Every ID is `"{prefix}-{8 hex chars}"`, e.g. `"cmp-a3f8b2c1"`.

use crate::errors::CoreError;

pub const PREFIX_PROJECT: &str = "prj";
pub const PREFIX_COMPONENT: &str = "cmp";
pub const PREFIX_APPOINTMENT: &str = "apt";
pub const PREFIX_COORDINATION: &str = "crd";
pub const PREFIX_PROFESSIONAL: &str = "pro";
pub const PREFIX_EVENT: &str = "evt";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_PROJECT,
    PREFIX_COMPONENT,
    PREFIX_APPOINTMENT,
    PREFIX_COORDINATION,
    PREFIX_PROFESSIONAL,
    PREFIX_EVENT,
];

/// Generate a random prefixed ID.
///
/// # Errors
///
/// Returns `CoreError::Other` if the OS random source is unavailable.
pub fn generate_id(prefix: &str) -> Result<String, CoreError> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes)
        .map_err(|e| CoreError::Other(anyhow::anyhow!("failed to generate id: {e}")))?;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{prefix}-{hex}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generate_id_correct_format() {
        let id = generate_id(PREFIX_COMPONENT).unwrap();
        assert!(id.starts_with("cmp-"), "{id}");
        assert_eq!(id.len(), 12, "{id}");
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_id_all_prefixes() {
        for prefix in ALL_PREFIXES {
            let id = generate_id(prefix).unwrap();
            assert!(id.starts_with(&format!("{prefix}-")));
        }
    }

    #[test]
    fn generate_id_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = generate_id("tst").unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }
}
