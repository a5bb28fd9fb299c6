//! In-memory process repository implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use onboard_core::repository::process::ProcessRepository;
use onboard_types::error::RepositoryError;
use onboard_types::process::{Process, ProcessStep, ProcessStepStatus, ProcessStepTypeId};
use uuid::Uuid;

/// DashMap-backed implementation of `ProcessRepository`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessRepository {
    processes: Arc<DashMap<Uuid, Process>>,
    steps: Arc<DashMap<Uuid, ProcessStep>>,
}

impl InMemoryProcessRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessRepository for InMemoryProcessRepository {
    async fn create_process(&self, process: &Process) -> Result<(), RepositoryError> {
        match self.processes.entry(process.id) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "process {} already exists",
                process.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(process.clone());
                Ok(())
            }
        }
    }

    async fn get_process(&self, process_id: &Uuid) -> Result<Option<Process>, RepositoryError> {
        Ok(self.processes.get(process_id).map(|p| p.value().clone()))
    }

    async fn try_lock_process(
        &self,
        process_id: &Uuid,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // The shard write guard makes check-and-set atomic per process.
        let mut process = self
            .processes
            .get_mut(process_id)
            .ok_or(RepositoryError::NotFound)?;
        if process.is_locked_at(now) {
            tracing::debug!(process_id = %process_id, "process lock held by another worker");
            return Ok(false);
        }
        process.lock_expiry = Some(expiry);
        Ok(true)
    }

    async fn release_lock(&self, process_id: &Uuid) -> Result<(), RepositoryError> {
        let mut process = self
            .processes
            .get_mut(process_id)
            .ok_or(RepositoryError::NotFound)?;
        process.lock_expiry = None;
        Ok(())
    }

    async fn create_steps(
        &self,
        process_id: &Uuid,
        step_types: &[ProcessStepTypeId],
    ) -> Result<Vec<ProcessStep>, RepositoryError> {
        if !self.processes.contains_key(process_id) {
            return Err(RepositoryError::NotFound);
        }

        let created: Vec<ProcessStep> = step_types
            .iter()
            .map(|step_type| ProcessStep::new(*process_id, *step_type))
            .collect();
        for step in &created {
            self.steps.insert(step.id, step.clone());
        }

        tracing::debug!(process_id = %process_id, count = created.len(), "created process steps");
        Ok(created)
    }

    async fn list_steps(&self, process_id: &Uuid) -> Result<Vec<ProcessStep>, RepositoryError> {
        let mut steps: Vec<ProcessStep> = self
            .steps
            .iter()
            .filter(|step| step.process_id == *process_id)
            .map(|step| step.value().clone())
            .collect();
        steps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(steps)
    }

    async fn update_step_status(
        &self,
        step_id: &Uuid,
        status: ProcessStepStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut step = self.steps.get_mut(step_id).ok_or(RepositoryError::NotFound)?;
        if !step.status.can_transition_to(status) {
            return Err(RepositoryError::Conflict(format!(
                "step {step_id} cannot move from {} to {status}",
                step.status
            )));
        }
        step.status = status;
        step.message = message.map(str::to_string);
        Ok(())
    }
}
