//! Infrastructure layer for Onboard.
//!
//! Contains implementations of the repository traits defined in `onboard-core`
//! (DashMap-backed in-memory storage) and the engine configuration loader.

pub mod config;
pub mod memory;
