//! Entity structs for all PropIE domain objects.
//!
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON
//! roundtrip and schema validation.

mod appointment;
mod component;
mod coordination;
mod project;

pub use appointment::{AppointmentTransition, License, Professional, ProfessionalAppointment};
pub use component::{Component, History, HistoryEntry, HtbClaim, Owner};
pub use coordination::{CoordinationRequest, CoordinationResult, Timeline};
pub use project::{Project, ProjectHeader};
