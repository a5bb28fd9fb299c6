//! Fault classification.
//!
//! Turns non-fatal step faults into step outcomes:
//! - `default_outcome` -- the checklist executor's policy when a step has no
//!   error function of its own.
//! - `retrigger_on_failure` -- a ready-made error function that additionally
//!   schedules a retrigger step on permanent failure.
//! - `classify_transport_aware` -- the linear executor's recoverability test,
//!   which also treats transient HTTP status codes as recoverable.

use onboard_types::checklist::{ChecklistEntryStatus, ChecklistMutation};
use onboard_types::config::EngineConfig;
use onboard_types::error::StepFault;
use onboard_types::process::{ProcessStepStatus, ProcessStepTypeId};

use super::step::{ErrorFn, StepOutcome, error_fn};

/// Recoverability of a non-fatal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Retry the same step later.
    Recoverable,
    /// Fail the step.
    Permanent,
}

/// Default classification for a checklist step fault.
///
/// - recoverable: step stays `Todo`, the category keeps its status and the
///   fault message is appended to its comment.
/// - otherwise: step `Failed`, category forced to `Failed` with the message
///   as comment.
///
/// Neither branch schedules or skips steps. Both leave a comment, so an
/// unclassified fault always shows up on the checklist.
pub fn default_outcome(fault: &StepFault) -> StepOutcome {
    let message = fault.to_string();
    if fault.is_recoverable() {
        StepOutcome::todo()
            .with_mutation(ChecklistMutation::append_comment(message.clone()))
            .with_message(message)
    } else {
        StepOutcome::failed()
            .with_mutation(
                ChecklistMutation::set_status(ChecklistEntryStatus::Failed)
                    .with_comment(message.clone()),
            )
            .with_message(message)
    }
}

/// Error function for steps with a retrigger counterpart.
///
/// Behaves like [`default_outcome`], but a permanent failure schedules
/// `retrigger` so an operator (or a later activation) can re-attempt the step.
pub fn retrigger_on_failure(retrigger: ProcessStepTypeId) -> ErrorFn {
    error_fn(move |fault: StepFault, _ctx, _cancel| async move {
        let mut outcome = default_outcome(&fault);
        if outcome.status == ProcessStepStatus::Failed {
            outcome = outcome.with_next(vec![retrigger]);
        }
        Ok::<_, StepFault>(outcome)
    })
}

/// Recoverability test used by the linear-dispatch executor.
///
/// A fault is recoverable if it is flagged so, or if it is a transport fault
/// whose status code is one of `config.transient_status_codes`.
pub fn classify_transport_aware(fault: &StepFault, config: &EngineConfig) -> FaultClass {
    if fault.is_recoverable() {
        return FaultClass::Recoverable;
    }
    match fault.status_code() {
        Some(code) if config.is_transient_status(code) => FaultClass::Recoverable,
        _ => FaultClass::Permanent,
    }
}
