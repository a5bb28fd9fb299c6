//! Process type executor contract.
//!
//! A `ProcessTypeExecutor` drives one process type. The external driver
//! (poller/worker pool) calls it in a fixed shape:
//!
//! 1. `initialize_process` once per activation of a process; the returned
//!    `Activation` carries the per-activation state.
//! 2. `is_lock_requested` before dispatching a step; when `true` the driver
//!    holds the process lock for the whole invocation.
//! 3. `execute_process_step` for each due step, persisting the returned
//!    status, creating `next_step_types` as new `Todo` steps and marking
//!    `skip_step_types` as `Skipped`.
//!
//! Executors hold no per-activation state of their own and are shared
//! across concurrent activations of different processes.

use onboard_types::error::ProcessError;
use onboard_types::process::{ProcessStepStatus, ProcessStepTypeId, ProcessTypeId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::step::StepOutcome;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of initializing a process activation.
#[derive(Debug, Clone)]
pub struct InitializationResult<A> {
    /// Whether initialization changed persisted state.
    pub modified: bool,
    /// Step types the driver should create as new `Todo` steps.
    pub schedule_step_types: Vec<ProcessStepTypeId>,
    /// State carried into every `execute_process_step` call of this activation.
    pub activation: A,
}

/// Aggregated result of one step invocation, handed back to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepExecutionResult {
    pub modified: bool,
    pub status: ProcessStepStatus,
    pub next_step_types: Option<Vec<ProcessStepTypeId>>,
    pub skip_step_types: Option<Vec<ProcessStepTypeId>>,
    pub message: Option<String>,
}

impl StepExecutionResult {
    /// Build the result from a step outcome and the observed checklist change.
    ///
    /// Empty step lists are normalized to `None`. `modified` is true when the
    /// checklist changed, the step left `Todo`, steps were scheduled or
    /// skipped, or a message is to be recorded.
    pub fn from_outcome(outcome: StepOutcome, checklist_changed: bool) -> Self {
        Self::derive(
            outcome.status,
            outcome.next_step_types,
            outcome.skip_step_types,
            outcome.message,
            checklist_changed,
        )
    }

    pub(crate) fn derive(
        status: ProcessStepStatus,
        next_step_types: Option<Vec<ProcessStepTypeId>>,
        skip_step_types: Option<Vec<ProcessStepTypeId>>,
        message: Option<String>,
        checklist_changed: bool,
    ) -> Self {
        let next_step_types = next_step_types.filter(|v| !v.is_empty());
        let skip_step_types = skip_step_types.filter(|v| !v.is_empty());
        let modified = checklist_changed
            || status != ProcessStepStatus::Todo
            || next_step_types.is_some()
            || skip_step_types.is_some()
            || message.is_some();

        Self {
            modified,
            status,
            next_step_types,
            skip_step_types,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessTypeExecutor trait
// ---------------------------------------------------------------------------

/// Trait for process type executors.
///
/// Uses RPITIT (return-position `impl Trait` in traits) for async methods,
/// consistent with the repository traits.
pub trait ProcessTypeExecutor: Send + Sync {
    /// Per-activation state returned by `initialize_process`.
    type Activation: Send;

    fn process_type_id(&self) -> ProcessTypeId;

    fn is_executable_step_type(&self, step_type: ProcessStepTypeId) -> bool;

    fn executable_step_types(&self) -> Vec<ProcessStepTypeId>;

    /// Whether the driver must hold the process lock while running `step_type`.
    fn is_lock_requested(&self, step_type: ProcessStepTypeId) -> Result<bool, ProcessError>;

    /// Prepare an activation of `process_id`.
    ///
    /// `pending_step_types` are the step types already due in the process;
    /// they are never scheduled again.
    fn initialize_process(
        &self,
        process_id: Uuid,
        pending_step_types: &[ProcessStepTypeId],
    ) -> impl std::future::Future<
        Output = Result<InitializationResult<Self::Activation>, ProcessError>,
    > + Send;

    /// Run one due step.
    ///
    /// Business faults come back as a well-formed result; only configuration,
    /// cancellation, storage and system faults are returned as errors.
    fn execute_process_step(
        &self,
        activation: &mut Self::Activation,
        step_type: ProcessStepTypeId,
        sibling_step_types: &[ProcessStepTypeId],
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<StepExecutionResult, ProcessError>> + Send;
}
