//! Checklist-driven process executor.
//!
//! Runs checklist process steps through the step handler registry: the
//! step's process function decides, a non-fatal fault is classified by the
//! step's error handling, and the resulting checklist mutation is persisted
//! before the result goes back to the driver.

use std::collections::BTreeMap;

use onboard_types::checklist::{ChecklistCategory, ChecklistEntryStatus, ChecklistMutation};
use onboard_types::config::EngineConfig;
use onboard_types::error::{ConfigurationFault, ProcessError, StepFault};
use onboard_types::process::{ProcessStepTypeId, ProcessTypeId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::classifier::default_outcome;
use super::consistency::ChecklistConsistencyService;
use super::executor::{InitializationResult, ProcessTypeExecutor, StepExecutionResult};
use super::registry::{ErrorHandling, StepExecution, StepHandlerRegistry};
use super::step::{ChecklistStepContext, StepOutcome};
use crate::repository::checklist::ChecklistRepository;
use crate::repository::process::ProcessRepository;

/// Per-activation state of a checklist process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistActivation {
    pub process_id: Uuid,
    pub application_id: Uuid,
    /// Checklist snapshot, kept in sync with every applied mutation.
    pub checklist: BTreeMap<ChecklistCategory, ChecklistEntryStatus>,
}

/// Executor for checklist-driven process types.
pub struct ChecklistProcessExecutor<P: ProcessRepository, C: ChecklistRepository> {
    registry: StepHandlerRegistry,
    consistency: ChecklistConsistencyService<P, C>,
    config: EngineConfig,
}

impl<P: ProcessRepository, C: ChecklistRepository> ChecklistProcessExecutor<P, C> {
    pub fn new(
        registry: StepHandlerRegistry,
        consistency: ChecklistConsistencyService<P, C>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            consistency,
            config,
        }
    }

    pub fn registry(&self) -> &StepHandlerRegistry {
        &self.registry
    }

    /// Turn a non-fatal fault into an outcome using the step's error handling.
    async fn classify_fault(
        &self,
        execution: &StepExecution,
        fault: StepFault,
        ctx: ChecklistStepContext,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, ProcessError> {
        let step_type = ctx.step_type;
        tracing::warn!(
            process_id = %ctx.process_id,
            step_type = %step_type,
            recoverable = fault.is_recoverable(),
            error = %fault,
            "checklist step failed"
        );

        match &execution.error_handling {
            ErrorHandling::Default => Ok(default_outcome(&fault)),
            ErrorHandling::Handler(handler) => match handler(fault, ctx, cancel.clone()).await {
                Ok(outcome) => Ok(outcome),
                Err(err) if err.is_fatal() => Err(ProcessError::from_fatal_fault(step_type, err)),
                Err(err) => {
                    tracing::warn!(
                        step_type = %step_type,
                        error = %err,
                        "error handler failed, applying default classification"
                    );
                    Ok(default_outcome(&err))
                }
            },
        }
    }

    /// Persist `mutation` on the activation's entry for `category`.
    ///
    /// Returns whether the stored entry changed.
    async fn apply_mutation(
        &self,
        activation: &mut ChecklistActivation,
        category: ChecklistCategory,
        mutation: &ChecklistMutation,
    ) -> Result<bool, ProcessError> {
        let max_comment_length = self.config.max_comment_length;
        let mut changed = false;
        let updated = self
            .consistency
            .checklists()
            .modify_entry(&activation.application_id, category, |entry| {
                changed = mutation.apply(entry, max_comment_length);
            })
            .await?;

        let entry = updated.ok_or(ConfigurationFault::MissingChecklistCategory {
            application_id: activation.application_id,
            category,
        })?;
        activation.checklist.insert(category, entry.status);
        Ok(changed)
    }
}

impl<P: ProcessRepository, C: ChecklistRepository> ProcessTypeExecutor
    for ChecklistProcessExecutor<P, C>
{
    type Activation = ChecklistActivation;

    fn process_type_id(&self) -> ProcessTypeId {
        self.registry.process_type_id()
    }

    fn is_executable_step_type(&self, step_type: ProcessStepTypeId) -> bool {
        self.registry.is_executable(step_type)
    }

    fn executable_step_types(&self) -> Vec<ProcessStepTypeId> {
        self.registry.executable_step_types()
    }

    fn is_lock_requested(&self, step_type: ProcessStepTypeId) -> Result<bool, ProcessError> {
        Ok(self.registry.requires_lock(step_type)?)
    }

    async fn initialize_process(
        &self,
        process_id: Uuid,
        pending_step_types: &[ProcessStepTypeId],
    ) -> Result<InitializationResult<ChecklistActivation>, ProcessError> {
        let init = self
            .consistency
            .initialize(process_id, pending_step_types)
            .await?;

        Ok(InitializationResult {
            modified: init.modified,
            schedule_step_types: init.schedule_step_types,
            activation: ChecklistActivation {
                process_id,
                application_id: init.application_id,
                checklist: init.checklist,
            },
        })
    }

    async fn execute_process_step(
        &self,
        activation: &mut ChecklistActivation,
        step_type: ProcessStepTypeId,
        sibling_step_types: &[ProcessStepTypeId],
        cancel: &CancellationToken,
    ) -> Result<StepExecutionResult, ProcessError> {
        let execution = self.registry.get_execution(step_type)?;

        if !activation.checklist.contains_key(&execution.category) {
            return Err(ConfigurationFault::MissingChecklistCategory {
                application_id: activation.application_id,
                category: execution.category,
            }
            .into());
        }

        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled(step_type));
        }

        let ctx = ChecklistStepContext {
            process_id: activation.process_id,
            application_id: activation.application_id,
            step_type,
            checklist: activation.checklist.clone(),
            sibling_step_types: sibling_step_types.to_vec(),
        };

        tracing::debug!(
            process_id = %activation.process_id,
            step_type = %step_type,
            category = %execution.category,
            "executing checklist step"
        );

        let outcome = match (execution.process)(ctx.clone(), cancel.clone()).await {
            Ok(outcome) => outcome,
            Err(fault) if fault.is_fatal() => {
                return Err(ProcessError::from_fatal_fault(step_type, fault));
            }
            Err(fault) => self.classify_fault(execution, fault, ctx, cancel).await?,
        };

        for next in outcome.next_step_types.iter().flatten() {
            self.registry.ensure_executable(step_type, *next)?;
        }

        let checklist_changed = match &outcome.checklist_mutation {
            Some(mutation) => {
                self.apply_mutation(activation, execution.category, mutation)
                    .await?
            }
            None => false,
        };

        let result = StepExecutionResult::from_outcome(outcome, checklist_changed);
        tracing::debug!(
            process_id = %activation.process_id,
            step_type = %step_type,
            status = %result.status,
            modified = result.modified,
            "checklist step finished"
        );
        Ok(result)
    }
}
