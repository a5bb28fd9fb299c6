//! The step function contract.
//!
//! Business services implement checklist steps as plain async closures over
//! a `ChecklistStepContext`. The engine stores them type-erased (`StepFn`,
//! `ErrorFn`) in the step handler registry and calls them once per
//! invocation with a fresh context and the caller's cancellation token.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use onboard_types::checklist::{ChecklistCategory, ChecklistEntryStatus, ChecklistMutation};
use onboard_types::error::StepFault;
use onboard_types::process::{ProcessStepStatus, ProcessStepTypeId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Read-only view handed to a checklist step function.
///
/// Built fresh before every call from the activation's checklist snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistStepContext {
    pub process_id: Uuid,
    /// Correlation id of the business object the process runs on.
    pub application_id: Uuid,
    pub step_type: ProcessStepTypeId,
    pub checklist: BTreeMap<ChecklistCategory, ChecklistEntryStatus>,
    /// Other step types currently due in the same process.
    pub sibling_step_types: Vec<ProcessStepTypeId>,
}

impl ChecklistStepContext {
    pub fn status_of(&self, category: ChecklistCategory) -> Option<ChecklistEntryStatus> {
        self.checklist.get(&category).copied()
    }

    /// Whether every given category is `Done`.
    pub fn all_done(&self, categories: &[ChecklistCategory]) -> bool {
        categories
            .iter()
            .all(|c| self.status_of(*c) == Some(ChecklistEntryStatus::Done))
    }
}

// ---------------------------------------------------------------------------
// StepOutcome
// ---------------------------------------------------------------------------

/// What a step function (or error function) decided.
///
/// Every field except `status` is independently optional. Whether the
/// invocation modified anything is derived by the engine from these fields
/// and the observed checklist change, never declared by the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: ProcessStepStatus,
    pub checklist_mutation: Option<ChecklistMutation>,
    pub next_step_types: Option<Vec<ProcessStepTypeId>>,
    pub skip_step_types: Option<Vec<ProcessStepTypeId>>,
    pub message: Option<String>,
}

impl StepOutcome {
    pub fn new(status: ProcessStepStatus) -> Self {
        Self {
            status,
            checklist_mutation: None,
            next_step_types: None,
            skip_step_types: None,
            message: None,
        }
    }

    pub fn done() -> Self {
        Self::new(ProcessStepStatus::Done)
    }

    /// Leave the step due; the driver runs it again later.
    pub fn todo() -> Self {
        Self::new(ProcessStepStatus::Todo)
    }

    pub fn failed() -> Self {
        Self::new(ProcessStepStatus::Failed)
    }

    pub fn skipped() -> Self {
        Self::new(ProcessStepStatus::Skipped)
    }

    pub fn with_mutation(mut self, mutation: ChecklistMutation) -> Self {
        self.checklist_mutation = Some(mutation);
        self
    }

    pub fn with_next(mut self, next: Vec<ProcessStepTypeId>) -> Self {
        self.next_step_types = Some(next);
        self
    }

    pub fn with_skip(mut self, skip: Vec<ProcessStepTypeId>) -> Self {
        self.skip_step_types = Some(skip);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Type-erased step functions
// ---------------------------------------------------------------------------

/// Boxed future returned by step and error functions.
pub type StepFuture = BoxFuture<'static, Result<StepOutcome, StepFault>>;

/// A checklist step's process function.
pub type StepFn = Arc<dyn Fn(ChecklistStepContext, CancellationToken) -> StepFuture + Send + Sync>;

/// A checklist step's error function: turns a non-fatal fault into an outcome.
pub type ErrorFn =
    Arc<dyn Fn(StepFault, ChecklistStepContext, CancellationToken) -> StepFuture + Send + Sync>;

/// Wrap an async closure as a [`StepFn`].
pub fn step_fn<F, Fut>(f: F) -> StepFn
where
    F: Fn(ChecklistStepContext, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepOutcome, StepFault>> + Send + 'static,
{
    Arc::new(move |ctx: ChecklistStepContext, cancel: CancellationToken| f(ctx, cancel).boxed())
}

/// Wrap an async closure as an [`ErrorFn`].
pub fn error_fn<F, Fut>(f: F) -> ErrorFn
where
    F: Fn(StepFault, ChecklistStepContext, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepOutcome, StepFault>> + Send + 'static,
{
    Arc::new(
        move |fault: StepFault, ctx: ChecklistStepContext, cancel: CancellationToken| {
            f(fault, ctx, cancel).boxed()
        },
    )
}
