//! Linear-dispatch executor for invitation processes.
//!
//! Invitation processes have no checklist: each step maps directly onto one
//! `InvitationProcessService` call and names at most one successor. A
//! permanently failed step schedules its retrigger counterpart; running the
//! retrigger step schedules the original step again.

use onboard_types::config::EngineConfig;
use onboard_types::error::{ConfigurationFault, ProcessError, StepFault};
use onboard_types::invitation::CompanyInvitation;
use onboard_types::process::{ProcessStepStatus, ProcessStepTypeId, ProcessTypeId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::classifier::{FaultClass, classify_transport_aware};
use super::executor::{InitializationResult, ProcessTypeExecutor, StepExecutionResult};
use crate::repository::invitation::InvitationRepository;

/// Each invitation step with the retrigger step scheduled when it fails.
const INVITATION_STEPS: [(ProcessStepTypeId, ProcessStepTypeId); 7] = [
    (
        ProcessStepTypeId::InvitationCreateCentralIdp,
        ProcessStepTypeId::RetriggerInvitationCreateCentralIdp,
    ),
    (
        ProcessStepTypeId::InvitationCreateSharedIdpServiceAccount,
        ProcessStepTypeId::RetriggerInvitationCreateSharedIdpServiceAccount,
    ),
    (
        ProcessStepTypeId::InvitationCreateSharedRealm,
        ProcessStepTypeId::RetriggerInvitationCreateSharedRealm,
    ),
    (
        ProcessStepTypeId::InvitationAddRealmRole,
        ProcessStepTypeId::RetriggerInvitationAddRealmRole,
    ),
    (
        ProcessStepTypeId::InvitationCreateCentralIdpOrgMapper,
        ProcessStepTypeId::RetriggerInvitationCreateCentralIdpOrgMapper,
    ),
    (
        ProcessStepTypeId::InvitationCreateDatabaseIdp,
        ProcessStepTypeId::RetriggerInvitationCreateDatabaseIdp,
    ),
    (
        ProcessStepTypeId::InvitationCreateUser,
        ProcessStepTypeId::RetriggerInvitationCreateUser,
    ),
];

fn retrigger_step_for(step_type: ProcessStepTypeId) -> Option<ProcessStepTypeId> {
    INVITATION_STEPS
        .iter()
        .find(|(step, _)| *step == step_type)
        .map(|(_, retrigger)| *retrigger)
}

fn original_step_for(retrigger: ProcessStepTypeId) -> Option<ProcessStepTypeId> {
    INVITATION_STEPS
        .iter()
        .find(|(_, r)| *r == retrigger)
        .map(|(step, _)| *step)
}

// ---------------------------------------------------------------------------
// LinearStepOutcome
// ---------------------------------------------------------------------------

/// What an invitation service call decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearStepOutcome {
    pub status: ProcessStepStatus,
    pub next_step: Option<ProcessStepTypeId>,
    pub message: Option<String>,
}

impl LinearStepOutcome {
    pub fn done() -> Self {
        Self {
            status: ProcessStepStatus::Done,
            next_step: None,
            message: None,
        }
    }

    /// Done, continuing with `next`.
    pub fn done_then(next: ProcessStepTypeId) -> Self {
        Self {
            next_step: Some(next),
            ..Self::done()
        }
    }

    pub fn todo() -> Self {
        Self {
            status: ProcessStepStatus::Todo,
            next_step: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ---------------------------------------------------------------------------
// InvitationProcessService trait
// ---------------------------------------------------------------------------

/// Business operations behind the invitation steps.
///
/// Implementations talk to the identity provider; they return business
/// faults as `StepFault::Service`/`StepFault::Transport` and leave
/// classification to the executor.
pub trait InvitationProcessService: Send + Sync {
    fn create_central_idp(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;

    fn create_shared_idp_service_account(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;

    fn create_shared_realm(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;

    fn add_realm_role(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;

    fn create_central_idp_org_mapper(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;

    fn create_database_idp(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;

    fn create_user(
        &self,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<LinearStepOutcome, StepFault>> + Send;
}

// ---------------------------------------------------------------------------
// InvitationProcessExecutor
// ---------------------------------------------------------------------------

/// Per-activation state of an invitation process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationActivation {
    pub process_id: Uuid,
    pub invitation: CompanyInvitation,
}

/// Executor for the invitation process type.
pub struct InvitationProcessExecutor<I: InvitationRepository, S: InvitationProcessService> {
    invitations: I,
    service: S,
    config: EngineConfig,
}

impl<I: InvitationRepository, S: InvitationProcessService> InvitationProcessExecutor<I, S> {
    pub fn new(invitations: I, service: S, config: EngineConfig) -> Self {
        Self {
            invitations,
            service,
            config,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    async fn dispatch(
        &self,
        step_type: ProcessStepTypeId,
        invitation: &CompanyInvitation,
        cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        use ProcessStepTypeId::*;
        match step_type {
            InvitationCreateCentralIdp => self.service.create_central_idp(invitation, cancel).await,
            InvitationCreateSharedIdpServiceAccount => {
                self.service
                    .create_shared_idp_service_account(invitation, cancel)
                    .await
            }
            InvitationCreateSharedRealm => {
                self.service.create_shared_realm(invitation, cancel).await
            }
            InvitationAddRealmRole => self.service.add_realm_role(invitation, cancel).await,
            InvitationCreateCentralIdpOrgMapper => {
                self.service
                    .create_central_idp_org_mapper(invitation, cancel)
                    .await
            }
            InvitationCreateDatabaseIdp => {
                self.service.create_database_idp(invitation, cancel).await
            }
            InvitationCreateUser => self.service.create_user(invitation, cancel).await,
            other => Err(ConfigurationFault::UnconfiguredStep {
                step_type: other,
                process_type: ProcessTypeId::Invitation,
            }
            .into()),
        }
    }
}

impl<I: InvitationRepository, S: InvitationProcessService> ProcessTypeExecutor
    for InvitationProcessExecutor<I, S>
{
    type Activation = InvitationActivation;

    fn process_type_id(&self) -> ProcessTypeId {
        ProcessTypeId::Invitation
    }

    fn is_executable_step_type(&self, step_type: ProcessStepTypeId) -> bool {
        retrigger_step_for(step_type).is_some() || original_step_for(step_type).is_some()
    }

    fn executable_step_types(&self) -> Vec<ProcessStepTypeId> {
        let mut step_types: Vec<_> = INVITATION_STEPS
            .iter()
            .flat_map(|(step, retrigger)| [*step, *retrigger])
            .collect();
        step_types.sort();
        step_types
    }

    fn is_lock_requested(&self, step_type: ProcessStepTypeId) -> Result<bool, ProcessError> {
        if self.is_executable_step_type(step_type) {
            Ok(false)
        } else {
            Err(ConfigurationFault::UnconfiguredStep {
                step_type,
                process_type: ProcessTypeId::Invitation,
            }
            .into())
        }
    }

    async fn initialize_process(
        &self,
        process_id: Uuid,
        _pending_step_types: &[ProcessStepTypeId],
    ) -> Result<InitializationResult<InvitationActivation>, ProcessError> {
        let invitation = self
            .invitations
            .get_invitation_for_process(&process_id)
            .await?
            .ok_or_else(|| {
                ProcessError::NotFound(format!("no company invitation for process {process_id}"))
            })?;

        Ok(InitializationResult {
            modified: false,
            schedule_step_types: Vec::new(),
            activation: InvitationActivation {
                process_id,
                invitation,
            },
        })
    }

    async fn execute_process_step(
        &self,
        activation: &mut InvitationActivation,
        step_type: ProcessStepTypeId,
        _sibling_step_types: &[ProcessStepTypeId],
        cancel: &CancellationToken,
    ) -> Result<StepExecutionResult, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled(step_type));
        }

        if let Some(original) = original_step_for(step_type) {
            tracing::info!(
                process_id = %activation.process_id,
                step_type = %step_type,
                retriggered = %original,
                "retriggering invitation step"
            );
            return Ok(StepExecutionResult::derive(
                ProcessStepStatus::Done,
                Some(vec![original]),
                None,
                None,
                false,
            ));
        }

        tracing::debug!(
            process_id = %activation.process_id,
            invitation_id = %activation.invitation.id,
            step_type = %step_type,
            "executing invitation step"
        );

        let (status, next_step, message) =
            match self.dispatch(step_type, &activation.invitation, cancel).await {
                Ok(outcome) => (outcome.status, outcome.next_step, outcome.message),
                Err(fault) if fault.is_fatal() => {
                    return Err(ProcessError::from_fatal_fault(step_type, fault));
                }
                Err(fault) => match classify_transport_aware(&fault, &self.config) {
                    FaultClass::Recoverable => {
                        tracing::warn!(
                            process_id = %activation.process_id,
                            step_type = %step_type,
                            error = %fault,
                            "invitation step failed, will retry"
                        );
                        (ProcessStepStatus::Todo, None, Some(fault.to_string()))
                    }
                    FaultClass::Permanent => {
                        tracing::warn!(
                            process_id = %activation.process_id,
                            step_type = %step_type,
                            error = %fault,
                            "invitation step failed permanently"
                        );
                        (
                            ProcessStepStatus::Failed,
                            retrigger_step_for(step_type),
                            Some(fault.to_string()),
                        )
                    }
                },
            };

        if let Some(next) = next_step {
            if !self.is_executable_step_type(next) {
                return Err(ConfigurationFault::UnexecutableSuccessor {
                    step_type,
                    successor: next,
                }
                .into());
            }
        }

        Ok(StepExecutionResult::derive(
            status,
            next_step.map(|next| vec![next]),
            None,
            message,
            false,
        ))
    }
}
