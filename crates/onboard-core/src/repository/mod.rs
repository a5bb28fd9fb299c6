//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (onboard-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod checklist;
pub mod invitation;
pub mod process;
