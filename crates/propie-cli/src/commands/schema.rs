use anyhow::bail;
use propie_core::entities::{Component, CoordinationResult, Project};
use propie_core::events::{DomainEvent, EngineEvent, EventEnvelope};
use propie_core::responses::{ProjectProgress, ProjectReport};
use schemars::schema_for;
use serde_json::Value;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

pub const TYPE_NAMES: &[&str] = &[
    "project",
    "component",
    "progress",
    "report",
    "coordination-result",
    "domain-event",
    "engine-event",
    "event-envelope",
];

/// Handle `propie schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = schema_for_name(&args.type_name)?;
    output(&schema, flags.format)
}

pub fn schema_for_name(name: &str) -> anyhow::Result<Value> {
    let schema = match name.replace('_', "-").as_str() {
        "project" => schema_for!(Project),
        "component" => schema_for!(Component),
        "progress" => schema_for!(ProjectProgress),
        "report" => schema_for!(ProjectReport),
        "coordination-result" => schema_for!(CoordinationResult),
        "domain-event" => schema_for!(DomainEvent),
        "engine-event" => schema_for!(EngineEvent),
        "event-envelope" => schema_for!(EventEnvelope),
        _ => bail!(
            "unknown schema type '{name}'; expected one of: {}",
            TYPE_NAMES.join(", ")
        ),
    };
    Ok(serde_json::to_value(schema)?)
}

#[cfg(test)]
mod tests {
    use super::{TYPE_NAMES, schema_for_name};

    #[test]
    fn every_listed_name_has_a_schema() {
        for name in TYPE_NAMES {
            let schema = schema_for_name(name).expect("schema should generate");
            assert!(schema.is_object(), "{name} schema is not an object");
        }
    }

    #[test]
    fn underscores_are_accepted() {
        let schema = schema_for_name("coordination_result").expect("schema should generate");
        assert_eq!(schema["title"], "CoordinationResult");
    }

    #[test]
    fn unknown_name_lists_choices() {
        let err = schema_for_name("invoice").expect_err("should fail");
        assert!(err.to_string().contains("engine-event"));
    }
}
