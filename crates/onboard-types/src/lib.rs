//! Shared domain types for the Onboard process engine.
//!
//! This crate contains the domain types used across the engine: processes and
//! their steps, application checklists, company invitations, configuration,
//! and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror and anyhow.

pub mod checklist;
pub mod config;
pub mod error;
pub mod invitation;
pub mod process;
