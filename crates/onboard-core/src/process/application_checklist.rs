//! Application checklist composition.
//!
//! The step table of the company application validation process. Business
//! services inject one process function per step type through
//! [`ApplicationChecklistBuilder`]; retrigger steps are built in.

use std::collections::HashMap;

use onboard_types::checklist::{ChecklistCategory, ChecklistEntryStatus, ChecklistMutation};
use onboard_types::config::EngineConfig;
use onboard_types::error::{ConfigurationFault, StepFault};
use onboard_types::process::{ProcessStepTypeId, ProcessTypeId};

use super::checklist_executor::ChecklistProcessExecutor;
use super::classifier::retrigger_on_failure;
use super::consistency::{ChecklistConsistencyService, ChecklistLayout};
use super::registry::{StepExecution, StepHandlerRegistry};
use super::step::{ChecklistStepContext, ErrorFn, StepFn, StepOutcome, step_fn};
use crate::repository::checklist::ChecklistRepository;
use crate::repository::process::ProcessRepository;

/// One row of the application checklist step table.
#[derive(Debug, Clone, Copy)]
struct StepRow {
    step_type: ProcessStepTypeId,
    category: ChecklistCategory,
    requires_lock: bool,
    retrigger: Option<ProcessStepTypeId>,
}

const fn row(
    step_type: ProcessStepTypeId,
    category: ChecklistCategory,
    requires_lock: bool,
    retrigger: Option<ProcessStepTypeId>,
) -> StepRow {
    StepRow {
        step_type,
        category,
        requires_lock,
        retrigger,
    }
}

const STEP_TABLE: [StepRow; 8] = [
    row(
        ProcessStepTypeId::VerifyRegistration,
        ChecklistCategory::RegistrationVerification,
        false,
        None,
    ),
    row(
        ProcessStepTypeId::CreateBusinessPartnerNumberPush,
        ChecklistCategory::BusinessPartnerNumber,
        false,
        Some(ProcessStepTypeId::RetriggerBusinessPartnerNumberPush),
    ),
    row(
        ProcessStepTypeId::CreateIdentityWallet,
        ChecklistCategory::IdentityWallet,
        false,
        Some(ProcessStepTypeId::RetriggerIdentityWallet),
    ),
    row(
        ProcessStepTypeId::RequestBpnlCredential,
        ChecklistCategory::BpnlCredential,
        false,
        Some(ProcessStepTypeId::RetriggerRequestBpnlCredential),
    ),
    row(
        ProcessStepTypeId::RequestMembershipCredential,
        ChecklistCategory::MembershipCredential,
        false,
        Some(ProcessStepTypeId::RetriggerRequestMembershipCredential),
    ),
    row(
        ProcessStepTypeId::StartClearingHouse,
        ChecklistCategory::ClearingHouse,
        true,
        Some(ProcessStepTypeId::RetriggerClearingHouse),
    ),
    row(
        ProcessStepTypeId::StartSelfDescriptionLp,
        ChecklistCategory::SelfDescriptionLp,
        false,
        Some(ProcessStepTypeId::RetriggerSelfDescriptionLp),
    ),
    row(
        ProcessStepTypeId::ActivateApplication,
        ChecklistCategory::ApplicationActivation,
        true,
        None,
    ),
];

/// Checklist layout of a submitted application.
///
/// Every category is seeded; registration verification and the business
/// partner number push start right away.
pub fn application_checklist_layout() -> ChecklistLayout {
    ChecklistCategory::ALL.into_iter().fold(
        ChecklistLayout::new(ProcessTypeId::ApplicationChecklist),
        |layout, category| {
            let initial = match category {
                ChecklistCategory::RegistrationVerification => {
                    vec![ProcessStepTypeId::VerifyRegistration]
                }
                ChecklistCategory::BusinessPartnerNumber => {
                    vec![ProcessStepTypeId::CreateBusinessPartnerNumberPush]
                }
                _ => Vec::new(),
            };
            layout.with_category(category, initial)
        },
    )
}

/// Built-in retrigger step: reset a failed category and schedule the
/// original step again.
fn retrigger_step(category: ChecklistCategory, original: ProcessStepTypeId) -> StepFn {
    step_fn(move |ctx: ChecklistStepContext, _cancel| async move {
        if ctx.status_of(category) == Some(ChecklistEntryStatus::Failed) {
            Ok::<_, StepFault>(
                StepOutcome::done()
                    .with_mutation(ChecklistMutation::set_status(ChecklistEntryStatus::ToDo))
                    .with_next(vec![original]),
            )
        } else {
            Ok(StepOutcome::skipped()
                .with_message(format!("{category} is not FAILED, nothing to retrigger")))
        }
    })
}

// ---------------------------------------------------------------------------
// ApplicationChecklistBuilder
// ---------------------------------------------------------------------------

/// Assembles the application checklist executor from injected step functions.
#[derive(Default)]
pub struct ApplicationChecklistBuilder {
    process_fns: HashMap<ProcessStepTypeId, StepFn>,
    error_fns: HashMap<ProcessStepTypeId, ErrorFn>,
}

impl ApplicationChecklistBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject the process function of `step_type`.
    pub fn with_step(mut self, step_type: ProcessStepTypeId, process: StepFn) -> Self {
        self.process_fns.insert(step_type, process);
        self
    }

    /// Override the error handling of `step_type`.
    pub fn with_error_handler(mut self, step_type: ProcessStepTypeId, handler: ErrorFn) -> Self {
        self.error_fns.insert(step_type, handler);
        self
    }

    /// Build the executor.
    ///
    /// Every table step needs an injected process function. Retrigger steps
    /// fall back to the built-in reset unless a function is injected for
    /// them. A function or error handler for a step that is neither a table
    /// step nor one of their retrigger steps is rejected.
    pub fn build<P: ProcessRepository, C: ChecklistRepository>(
        mut self,
        processes: P,
        checklists: C,
        config: EngineConfig,
    ) -> Result<ChecklistProcessExecutor<P, C>, ConfigurationFault> {
        let mut rows = Vec::with_capacity(STEP_TABLE.len() * 2);

        for StepRow {
            step_type,
            category,
            requires_lock,
            retrigger,
        } in STEP_TABLE
        {
            let process = self
                .process_fns
                .remove(&step_type)
                .ok_or(ConfigurationFault::MissingHandler(step_type))?;
            let mut execution = StepExecution::new(category, requires_lock, process);

            if let Some(retrigger) = retrigger {
                execution = execution.with_error_handler(retrigger_on_failure(retrigger));
                let reset = self
                    .process_fns
                    .remove(&retrigger)
                    .unwrap_or_else(|| retrigger_step(category, step_type));
                let mut retrigger_execution = StepExecution::new(category, requires_lock, reset);
                if let Some(handler) = self.error_fns.remove(&retrigger) {
                    retrigger_execution = retrigger_execution.with_error_handler(handler);
                }
                rows.push((retrigger, retrigger_execution));
            }
            if let Some(handler) = self.error_fns.remove(&step_type) {
                execution = execution.with_error_handler(handler);
            }
            rows.push((step_type, execution));
        }

        if let Some(step_type) = self
            .process_fns
            .keys()
            .chain(self.error_fns.keys())
            .min()
            .copied()
        {
            return Err(ConfigurationFault::UnconfiguredStep {
                step_type,
                process_type: ProcessTypeId::ApplicationChecklist,
            });
        }

        let registry = StepHandlerRegistry::new(ProcessTypeId::ApplicationChecklist, rows)?;
        let layout = application_checklist_layout();
        if let Some(step_type) = layout
            .all_initial_steps()
            .find(|step_type| !registry.is_executable(*step_type))
        {
            return Err(ConfigurationFault::UnconfiguredStep {
                step_type,
                process_type: ProcessTypeId::ApplicationChecklist,
            });
        }

        tracing::debug!(
            step_types = registry.executable_step_types().len(),
            "application checklist executor built"
        );

        let consistency = ChecklistConsistencyService::new(processes, checklists, layout);
        Ok(ChecklistProcessExecutor::new(registry, consistency, config))
    }
}
