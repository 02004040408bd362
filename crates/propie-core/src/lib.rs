//! # propie-core
//!
//! Core types, ID generation, and error types for the PropIE sale-progress engine.
//!
//! This crate provides the foundational types shared across all PropIE crates:
//! - Entity structs for projects, components, HTB claims, appointments and
//!   coordination requests
//! - Status enums with state machine transitions
//! - The component registry (which status machines each category may use,
//!   and which edges are restricted to specific parties)
//! - Inbound engine events and outbound domain events
//! - Progress and report response types
//! - Rejection reasons and cross-cutting error types
//!
//! Nothing in this crate performs I/O.

pub mod entities;
pub mod enums;
pub mod errors;
pub mod events;
pub mod identity;
pub mod ids;
pub mod registry;
pub mod responses;
pub mod status;
