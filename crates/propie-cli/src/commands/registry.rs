use propie_core::registry;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `propie registry`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&registry::describe(), flags.format)
}
