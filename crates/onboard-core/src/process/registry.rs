//! Step handler registry.
//!
//! An immutable, name-indexed table mapping each step type of one process
//! type to its checklist category, lock requirement, process function and
//! error handling. Built once when the executor is constructed; new steps
//! are added by inserting one row.

use std::collections::HashMap;
use std::fmt;

use onboard_types::checklist::ChecklistCategory;
use onboard_types::error::ConfigurationFault;
use onboard_types::process::{ProcessStepTypeId, ProcessTypeId};

use super::step::{ErrorFn, StepFn};

// ---------------------------------------------------------------------------
// StepExecution
// ---------------------------------------------------------------------------

/// How a step's non-fatal faults are turned into an outcome.
#[derive(Clone)]
pub enum ErrorHandling {
    /// Use the engine's default classification policy.
    Default,
    /// Delegate to a step-specific error function.
    Handler(ErrorFn),
}

impl fmt::Debug for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandling::Default => f.write_str("Default"),
            ErrorHandling::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// One registry row.
#[derive(Clone)]
pub struct StepExecution {
    pub category: ChecklistCategory,
    pub requires_lock: bool,
    pub process: StepFn,
    pub error_handling: ErrorHandling,
}

impl StepExecution {
    /// A row using the default error policy.
    pub fn new(category: ChecklistCategory, requires_lock: bool, process: StepFn) -> Self {
        Self {
            category,
            requires_lock,
            process,
            error_handling: ErrorHandling::Default,
        }
    }

    pub fn with_error_handler(mut self, handler: ErrorFn) -> Self {
        self.error_handling = ErrorHandling::Handler(handler);
        self
    }
}

impl fmt::Debug for StepExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepExecution")
            .field("category", &self.category)
            .field("requires_lock", &self.requires_lock)
            .field("error_handling", &self.error_handling)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StepHandlerRegistry
// ---------------------------------------------------------------------------

/// Registry of executable step types for one process type.
#[derive(Debug)]
pub struct StepHandlerRegistry {
    process_type: ProcessTypeId,
    executions: HashMap<ProcessStepTypeId, StepExecution>,
}

impl StepHandlerRegistry {
    /// Build the registry from its rows.
    ///
    /// A step type listed twice is a configuration fault.
    pub fn new(
        process_type: ProcessTypeId,
        rows: impl IntoIterator<Item = (ProcessStepTypeId, StepExecution)>,
    ) -> Result<Self, ConfigurationFault> {
        let mut executions = HashMap::new();
        for (step_type, execution) in rows {
            if executions.insert(step_type, execution).is_some() {
                return Err(ConfigurationFault::DuplicateStep(step_type));
            }
        }
        Ok(Self {
            process_type,
            executions,
        })
    }

    pub fn process_type_id(&self) -> ProcessTypeId {
        self.process_type
    }

    /// Look up a step's row, failing with an "unconfigured step" fault.
    pub fn get_execution(
        &self,
        step_type: ProcessStepTypeId,
    ) -> Result<&StepExecution, ConfigurationFault> {
        self.executions
            .get(&step_type)
            .ok_or(ConfigurationFault::UnconfiguredStep {
                step_type,
                process_type: self.process_type,
            })
    }

    pub fn is_executable(&self, step_type: ProcessStepTypeId) -> bool {
        self.executions.contains_key(&step_type)
    }

    /// All registered step types, sorted for stable output.
    pub fn executable_step_types(&self) -> Vec<ProcessStepTypeId> {
        let mut step_types: Vec<_> = self.executions.keys().copied().collect();
        step_types.sort();
        step_types
    }

    pub fn requires_lock(&self, step_type: ProcessStepTypeId) -> Result<bool, ConfigurationFault> {
        self.get_execution(step_type).map(|e| e.requires_lock)
    }

    /// Check that `successor`, scheduled by `step_type`, can be executed.
    pub fn ensure_executable(
        &self,
        step_type: ProcessStepTypeId,
        successor: ProcessStepTypeId,
    ) -> Result<(), ConfigurationFault> {
        if self.is_executable(successor) {
            Ok(())
        } else {
            Err(ConfigurationFault::UnexecutableSuccessor {
                step_type,
                successor,
            })
        }
    }
}
