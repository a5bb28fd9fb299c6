//! Process step engine.
//!
//! - `step` -- the step function contract (context, outcome, boxed functions).
//! - `registry` -- immutable step type -> execution table.
//! - `classifier` -- turns non-fatal step faults into outcomes.
//! - `consistency` -- seeds missing checklist entries before steps run.
//! - `executor` -- the `ProcessTypeExecutor` contract shared by all executors.
//! - `checklist_executor` -- registry-driven executor for checklist processes.
//! - `invitation` -- linear-dispatch executor for invitation processes.
//! - `application_checklist` -- the application checklist's step table.

pub mod application_checklist;
pub mod checklist_executor;
pub mod classifier;
pub mod consistency;
pub mod executor;
pub mod invitation;
pub mod registry;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;
