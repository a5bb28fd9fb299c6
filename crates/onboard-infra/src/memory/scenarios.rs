//! End-to-end runs of both executors against the in-memory repositories.
//!
//! `run_pass` plays the external driver: it activates the process once and
//! executes every step that was due at the start of the pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use onboard_core::process::application_checklist::ApplicationChecklistBuilder;
use onboard_core::process::executor::ProcessTypeExecutor;
use onboard_core::process::invitation::{
    InvitationProcessExecutor, InvitationProcessService, LinearStepOutcome,
};
use onboard_core::process::step::{ChecklistStepContext, StepFn, StepOutcome, step_fn};
use onboard_core::repository::process::ProcessRepository;
use onboard_types::checklist::{
    Application, ApplicationStatus, ChecklistCategory, ChecklistEntryStatus, ChecklistMutation,
};
use onboard_types::config::EngineConfig;
use onboard_types::error::StepFault;
use onboard_types::invitation::CompanyInvitation;
use onboard_types::process::{Process, ProcessStepStatus, ProcessStepTypeId, ProcessTypeId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::checklist::InMemoryChecklistRepository;
use super::invitation::InMemoryInvitationRepository;
use super::process::InMemoryProcessRepository;

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

fn init_logging() {
    // Another test may already have installed the subscriber.
    let _ = onboard_observe::tracing_setup::init_tracing(false);
}

/// Execute one activation of `process_id`. Returns the step types executed.
async fn run_pass<E: ProcessTypeExecutor>(
    executor: &E,
    processes: &InMemoryProcessRepository,
    process_id: Uuid,
    config: &EngineConfig,
) -> Vec<ProcessStepTypeId> {
    let due: Vec<_> = processes
        .list_steps(&process_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|step| step.status == ProcessStepStatus::Todo)
        .collect();
    let pending: Vec<_> = due.iter().map(|step| step.step_type_id).collect();

    let init = executor
        .initialize_process(process_id, &pending)
        .await
        .unwrap();
    let mut activation = init.activation;
    processes
        .create_steps(&process_id, &init.schedule_step_types)
        .await
        .unwrap();

    let mut executed = Vec::new();
    for step in due {
        let current = processes.list_steps(&process_id).await.unwrap();
        if current
            .iter()
            .any(|s| s.id == step.id && s.status != ProcessStepStatus::Todo)
        {
            continue;
        }

        let locked = executor.is_lock_requested(step.step_type_id).unwrap();
        if locked {
            let now = Utc::now();
            let acquired = processes
                .try_lock_process(&process_id, config.lock_expiry_at(now), now)
                .await
                .unwrap();
            if !acquired {
                continue;
            }
        }

        let siblings: Vec<_> = pending
            .iter()
            .copied()
            .filter(|t| *t != step.step_type_id)
            .collect();
        let result = executor
            .execute_process_step(
                &mut activation,
                step.step_type_id,
                &siblings,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        processes
            .update_step_status(&step.id, result.status, result.message.as_deref())
            .await
            .unwrap();
        if let Some(next) = &result.next_step_types {
            processes.create_steps(&process_id, next).await.unwrap();
        }
        if let Some(skip) = &result.skip_step_types {
            for s in processes.list_steps(&process_id).await.unwrap() {
                if skip.contains(&s.step_type_id) && s.status == ProcessStepStatus::Todo {
                    processes
                        .update_step_status(&s.id, ProcessStepStatus::Skipped, None)
                        .await
                        .unwrap();
                }
            }
        }
        if locked {
            processes.release_lock(&process_id).await.unwrap();
        }
        executed.push(step.step_type_id);
    }
    executed
}

async fn step_statuses(
    processes: &InMemoryProcessRepository,
    process_id: Uuid,
) -> Vec<(ProcessStepTypeId, ProcessStepStatus)> {
    processes
        .list_steps(&process_id)
        .await
        .unwrap()
        .into_iter()
        .map(|step| (step.step_type_id, step.status))
        .collect()
}

// ---------------------------------------------------------------------------
// Application checklist
// ---------------------------------------------------------------------------

fn complete(next: Vec<ProcessStepTypeId>) -> StepFn {
    step_fn(move |_ctx, _cancel| {
        let next = next.clone();
        async move {
            Ok::<_, StepFault>(
                StepOutcome::done()
                    .with_mutation(ChecklistMutation::set_status(ChecklistEntryStatus::Done))
                    .with_next(next),
            )
        }
    })
}

fn activate_when_ready() -> StepFn {
    step_fn(|ctx: ChecklistStepContext, _cancel| async move {
        let prerequisites = [
            ChecklistCategory::RegistrationVerification,
            ChecklistCategory::BusinessPartnerNumber,
            ChecklistCategory::IdentityWallet,
            ChecklistCategory::ClearingHouse,
        ];
        if ctx.all_done(&prerequisites) {
            Ok::<_, StepFault>(
                StepOutcome::done()
                    .with_mutation(ChecklistMutation::set_status(ChecklistEntryStatus::Done)),
            )
        } else {
            Ok(StepOutcome::todo())
        }
    })
}

fn application_builder() -> ApplicationChecklistBuilder {
    use ProcessStepTypeId::*;
    ApplicationChecklistBuilder::new()
        .with_step(VerifyRegistration, complete(vec![]))
        .with_step(CreateBusinessPartnerNumberPush, complete(vec![CreateIdentityWallet]))
        .with_step(CreateIdentityWallet, complete(vec![StartClearingHouse]))
        .with_step(RequestBpnlCredential, complete(vec![]))
        .with_step(RequestMembershipCredential, complete(vec![]))
        .with_step(StartClearingHouse, complete(vec![ActivateApplication]))
        .with_step(StartSelfDescriptionLp, complete(vec![]))
        .with_step(ActivateApplication, activate_when_ready())
}

struct ChecklistWorld {
    processes: InMemoryProcessRepository,
    checklists: InMemoryChecklistRepository,
    process_id: Uuid,
    application_id: Uuid,
    config: EngineConfig,
}

async fn checklist_world() -> ChecklistWorld {
    init_logging();
    let processes = InMemoryProcessRepository::new();
    let checklists = InMemoryChecklistRepository::new();
    let process = Process::new(ProcessTypeId::ApplicationChecklist);
    processes.create_process(&process).await.unwrap();
    let application = Application {
        id: Uuid::now_v7(),
        status: ApplicationStatus::Submitted,
        process_id: Some(process.id),
    };
    checklists.save_application(application.clone());

    ChecklistWorld {
        processes,
        checklists,
        process_id: process.id,
        application_id: application.id,
        config: EngineConfig::default(),
    }
}

#[tokio::test]
async fn test_application_checklist_runs_to_activation() {
    let world = checklist_world().await;
    let executor = application_builder()
        .build(
            world.processes.clone(),
            world.checklists.clone(),
            world.config.clone(),
        )
        .unwrap();

    // First pass only seeds and schedules the initial steps.
    let executed = run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    assert!(executed.is_empty());

    for _ in 0..5 {
        run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    }

    for category in [
        ChecklistCategory::RegistrationVerification,
        ChecklistCategory::BusinessPartnerNumber,
        ChecklistCategory::IdentityWallet,
        ChecklistCategory::ClearingHouse,
        ChecklistCategory::ApplicationActivation,
    ] {
        let entry = world
            .checklists
            .get_entry(&world.application_id, category)
            .unwrap();
        assert_eq!(entry.status, ChecklistEntryStatus::Done, "{category}");
    }
    let untouched = world
        .checklists
        .get_entry(&world.application_id, ChecklistCategory::MembershipCredential)
        .unwrap();
    assert_eq!(untouched.status, ChecklistEntryStatus::ToDo);

    let statuses = step_statuses(&world.processes, world.process_id).await;
    assert_eq!(statuses.len(), 5);
    assert!(statuses.iter().all(|(_, s)| *s == ProcessStepStatus::Done));
}

#[tokio::test]
async fn test_lock_requiring_step_waits_for_lock() {
    let world = checklist_world().await;
    let executor = application_builder()
        .build(
            world.processes.clone(),
            world.checklists.clone(),
            world.config.clone(),
        )
        .unwrap();
    run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    world
        .processes
        .create_steps(
            &world.process_id,
            &[ProcessStepTypeId::StartClearingHouse],
        )
        .await
        .unwrap();

    // Another worker holds the process lock.
    let now = Utc::now();
    assert!(
        world
            .processes
            .try_lock_process(&world.process_id, world.config.lock_expiry_at(now), now)
            .await
            .unwrap()
    );

    let executed = run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    assert!(executed.contains(&ProcessStepTypeId::VerifyRegistration));
    assert!(!executed.contains(&ProcessStepTypeId::StartClearingHouse));

    world.processes.release_lock(&world.process_id).await.unwrap();
    let executed = run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    assert!(executed.contains(&ProcessStepTypeId::StartClearingHouse));
}

#[tokio::test]
async fn test_failed_checklist_step_recovers_through_retrigger() {
    let world = checklist_world().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let executor = application_builder()
        .with_step(
            ProcessStepTypeId::CreateBusinessPartnerNumberPush,
            step_fn(move |_ctx, _cancel| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(StepFault::service("bpn push rejected"))
                    } else {
                        Ok(StepOutcome::done().with_mutation(ChecklistMutation::set_status(
                            ChecklistEntryStatus::Done,
                        )))
                    }
                }
            }),
        )
        .build(
            world.processes.clone(),
            world.checklists.clone(),
            world.config.clone(),
        )
        .unwrap();

    run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    run_pass(&executor, &world.processes, world.process_id, &world.config).await;

    let entry = world
        .checklists
        .get_entry(&world.application_id, ChecklistCategory::BusinessPartnerNumber)
        .unwrap();
    assert_eq!(entry.status, ChecklistEntryStatus::Failed);
    assert_eq!(entry.comment.as_deref(), Some("bpn push rejected"));

    // Retrigger resets the category, then the push runs again.
    run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    let entry = world
        .checklists
        .get_entry(&world.application_id, ChecklistCategory::BusinessPartnerNumber)
        .unwrap();
    assert_eq!(entry.status, ChecklistEntryStatus::ToDo);

    run_pass(&executor, &world.processes, world.process_id, &world.config).await;
    let entry = world
        .checklists
        .get_entry(&world.application_id, ChecklistCategory::BusinessPartnerNumber)
        .unwrap();
    assert_eq!(entry.status, ChecklistEntryStatus::Done);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    let statuses = step_statuses(&world.processes, world.process_id).await;
    assert!(statuses.contains(&(
        ProcessStepTypeId::CreateBusinessPartnerNumberPush,
        ProcessStepStatus::Failed
    )));
    assert!(statuses.contains(&(
        ProcessStepTypeId::RetriggerBusinessPartnerNumberPush,
        ProcessStepStatus::Done
    )));
}

// ---------------------------------------------------------------------------
// Invitation
// ---------------------------------------------------------------------------

/// Fails `create_shared_realm` with the given status codes, in order, then
/// succeeds. Every other step just continues the chain.
struct RealmTroubleService {
    realm_failures: Vec<u16>,
    realm_calls: AtomicUsize,
}

impl RealmTroubleService {
    fn new(realm_failures: Vec<u16>) -> Self {
        Self {
            realm_failures,
            realm_calls: AtomicUsize::new(0),
        }
    }
}

impl InvitationProcessService for RealmTroubleService {
    async fn create_central_idp(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        Ok(LinearStepOutcome::done_then(
            ProcessStepTypeId::InvitationCreateSharedRealm,
        ))
    }

    async fn create_shared_idp_service_account(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        Ok(LinearStepOutcome::done())
    }

    async fn create_shared_realm(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        let call = self.realm_calls.fetch_add(1, Ordering::SeqCst);
        match self.realm_failures.get(call) {
            Some(code) => Err(StepFault::transport(
                *code,
                format!("realm creation failed: {code}"),
            )),
            None => Ok(LinearStepOutcome::done_then(
                ProcessStepTypeId::InvitationCreateUser,
            )),
        }
    }

    async fn add_realm_role(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        Ok(LinearStepOutcome::done())
    }

    async fn create_central_idp_org_mapper(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        Ok(LinearStepOutcome::done())
    }

    async fn create_database_idp(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        Ok(LinearStepOutcome::done())
    }

    async fn create_user(
        &self,
        _invitation: &CompanyInvitation,
        _cancel: &CancellationToken,
    ) -> Result<LinearStepOutcome, StepFault> {
        Ok(LinearStepOutcome::done().with_message("user invited"))
    }
}

async fn invitation_world(
    service: RealmTroubleService,
) -> (
    InvitationProcessExecutor<InMemoryInvitationRepository, RealmTroubleService>,
    InMemoryProcessRepository,
    Uuid,
) {
    init_logging();
    let processes = InMemoryProcessRepository::new();
    let invitations = InMemoryInvitationRepository::new();
    let process = Process::new(ProcessTypeId::Invitation);
    processes.create_process(&process).await.unwrap();
    processes
        .create_steps(&process.id, &[ProcessStepTypeId::InvitationCreateCentralIdp])
        .await
        .unwrap();
    invitations.save_invitation(CompanyInvitation {
        id: Uuid::now_v7(),
        process_id: process.id,
        organisation_name: "Acme".to_string(),
        user_email: "admin@acme.example".to_string(),
        idp_name: None,
    });

    (
        InvitationProcessExecutor::new(invitations, service, EngineConfig::default()),
        processes,
        process.id,
    )
}

#[tokio::test]
async fn test_transient_realm_failure_is_retried_in_place() {
    let (executor, processes, process_id) =
        invitation_world(RealmTroubleService::new(vec![503])).await;
    let config = EngineConfig::default();

    run_pass(&executor, &processes, process_id, &config).await;
    run_pass(&executor, &processes, process_id, &config).await;

    let steps = processes.list_steps(&process_id).await.unwrap();
    let realm = steps
        .iter()
        .find(|s| s.step_type_id == ProcessStepTypeId::InvitationCreateSharedRealm)
        .unwrap();
    assert_eq!(realm.status, ProcessStepStatus::Todo);
    assert_eq!(realm.message.as_deref(), Some("realm creation failed: 503"));

    run_pass(&executor, &processes, process_id, &config).await;
    run_pass(&executor, &processes, process_id, &config).await;

    let statuses = step_statuses(&processes, process_id).await;
    assert_eq!(
        statuses,
        vec![
            (ProcessStepTypeId::InvitationCreateCentralIdp, ProcessStepStatus::Done),
            (ProcessStepTypeId::InvitationCreateSharedRealm, ProcessStepStatus::Done),
            (ProcessStepTypeId::InvitationCreateUser, ProcessStepStatus::Done),
        ]
    );
}

#[tokio::test]
async fn test_permanent_realm_failure_goes_through_retrigger() {
    let (executor, processes, process_id) =
        invitation_world(RealmTroubleService::new(vec![400])).await;
    let config = EngineConfig::default();

    for _ in 0..5 {
        run_pass(&executor, &processes, process_id, &config).await;
    }

    let statuses = step_statuses(&processes, process_id).await;
    assert_eq!(
        statuses,
        vec![
            (ProcessStepTypeId::InvitationCreateCentralIdp, ProcessStepStatus::Done),
            (ProcessStepTypeId::InvitationCreateSharedRealm, ProcessStepStatus::Failed),
            (
                ProcessStepTypeId::RetriggerInvitationCreateSharedRealm,
                ProcessStepStatus::Done
            ),
            (ProcessStepTypeId::InvitationCreateSharedRealm, ProcessStepStatus::Done),
            (ProcessStepTypeId::InvitationCreateUser, ProcessStepStatus::Done),
        ]
    );
}
