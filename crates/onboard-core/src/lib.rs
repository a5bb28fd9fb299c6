//! Process step engine and repository trait definitions for Onboard.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the engine that dispatches process steps. It
//! depends only on `onboard-types` -- never on `onboard-infra` or any
//! storage crate.

pub mod process;
pub mod repository;
