//! In-memory storage layer.
//!
//! DashMap-backed repository implementations. Clones share the same maps,
//! so a handle kept by a caller sees everything an executor persists.

pub mod checklist;
pub mod invitation;
pub mod process;

#[cfg(test)]
mod scenarios;
