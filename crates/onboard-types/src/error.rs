use thiserror::Error;
use uuid::Uuid;

use crate::checklist::ChecklistCategory;
use crate::process::{ProcessStepTypeId, ProcessTypeId};

/// Errors from repository operations (used by trait definitions in onboard-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Drift between the step handler registry and the data it runs against.
///
/// Always fatal: a configuration fault is never turned into a step result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationFault {
    #[error("step type {step_type} is not configured for process type {process_type}")]
    UnconfiguredStep {
        step_type: ProcessStepTypeId,
        process_type: ProcessTypeId,
    },

    #[error("checklist of application {application_id} has no {category} entry")]
    MissingChecklistCategory {
        application_id: Uuid,
        category: ChecklistCategory,
    },

    #[error("no process function registered for step type {0}")]
    MissingHandler(ProcessStepTypeId),

    #[error("step type {0} is registered more than once")]
    DuplicateStep(ProcessStepTypeId),

    #[error("step type {step_type} schedules {successor}, which is not executable")]
    UnexecutableSuccessor {
        step_type: ProcessStepTypeId,
        successor: ProcessStepTypeId,
    },
}

/// A fault raised by a step function.
///
/// Service and transport faults are business faults: the engine classifies
/// them into a step result. Configuration, cancellation and system faults are
/// fatal and propagate to the driver unchanged.
#[derive(Debug, Error)]
pub enum StepFault {
    /// A downstream business service rejected or failed the request.
    #[error("{message}")]
    Service { message: String, recoverable: bool },

    /// An HTTP call failed; `status_code` is set when a response was received.
    #[error("{message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
        recoverable: bool,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationFault),

    #[error("step cancelled")]
    Cancelled,

    #[error(transparent)]
    System(#[from] anyhow::Error),
}

impl StepFault {
    /// A permanent business fault.
    pub fn service(message: impl Into<String>) -> Self {
        StepFault::Service {
            message: message.into(),
            recoverable: false,
        }
    }

    /// A transient business fault; the step should be retried later.
    pub fn recoverable(message: impl Into<String>) -> Self {
        StepFault::Service {
            message: message.into(),
            recoverable: true,
        }
    }

    /// A transport fault carrying the HTTP status of the failed call.
    pub fn transport(status_code: u16, message: impl Into<String>) -> Self {
        StepFault::Transport {
            message: message.into(),
            status_code: Some(status_code),
            recoverable: false,
        }
    }

    /// Whether the fault was explicitly flagged as transient.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StepFault::Service { recoverable, .. } | StepFault::Transport { recoverable, .. } => {
                *recoverable
            }
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            StepFault::Transport { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Fatal faults are never classified into a step result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StepFault::Configuration(_) | StepFault::Cancelled | StepFault::System(_)
        )
    }
}

/// Errors surfaced by process type executors to the driver.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration fault: {0}")]
    Configuration(#[from] ConfigurationFault),

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("step {0} cancelled")]
    Cancelled(ProcessStepTypeId),

    #[error("system fault in step {step_type}: {source}")]
    System {
        step_type: ProcessStepTypeId,
        #[source]
        source: anyhow::Error,
    },
}

impl ProcessError {
    /// Convert a fatal step fault into the error reported to the driver.
    ///
    /// Business faults should have been classified before reaching here; if
    /// one slips through it is reported as a system fault so it cannot vanish.
    pub fn from_fatal_fault(step_type: ProcessStepTypeId, fault: StepFault) -> Self {
        match fault {
            StepFault::Configuration(fault) => ProcessError::Configuration(fault),
            StepFault::Cancelled => ProcessError::Cancelled(step_type),
            StepFault::System(source) => ProcessError::System { step_type, source },
            other => ProcessError::System {
                step_type,
                source: anyhow::anyhow!("unclassified step fault: {other}"),
            },
        }
    }
}
