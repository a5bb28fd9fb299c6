//! In-memory repository mocks shared by the engine's unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use onboard_types::checklist::{Application, ChecklistCategory, ChecklistEntry};
use onboard_types::error::RepositoryError;
use onboard_types::invitation::CompanyInvitation;
use onboard_types::process::{Process, ProcessStep, ProcessStepStatus, ProcessStepTypeId};
use uuid::Uuid;

use crate::repository::checklist::ChecklistRepository;
use crate::repository::invitation::InvitationRepository;
use crate::repository::process::ProcessRepository;

// ---------------------------------------------------------------------------
// Processes
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockProcessRepository {
    processes: Arc<Mutex<HashMap<Uuid, Process>>>,
    steps: Arc<Mutex<Vec<ProcessStep>>>,
}

impl MockProcessRepository {
    pub fn insert_process(&self, process: Process) {
        self.processes.lock().unwrap().insert(process.id, process);
    }
}

impl ProcessRepository for MockProcessRepository {
    async fn create_process(&self, process: &Process) -> Result<(), RepositoryError> {
        self.insert_process(process.clone());
        Ok(())
    }

    async fn get_process(&self, process_id: &Uuid) -> Result<Option<Process>, RepositoryError> {
        Ok(self.processes.lock().unwrap().get(process_id).cloned())
    }

    async fn try_lock_process(
        &self,
        process_id: &Uuid,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut processes = self.processes.lock().unwrap();
        let process = processes.get_mut(process_id).ok_or(RepositoryError::NotFound)?;
        if process.is_locked_at(now) {
            return Ok(false);
        }
        process.lock_expiry = Some(expiry);
        Ok(true)
    }

    async fn release_lock(&self, process_id: &Uuid) -> Result<(), RepositoryError> {
        let mut processes = self.processes.lock().unwrap();
        let process = processes.get_mut(process_id).ok_or(RepositoryError::NotFound)?;
        process.lock_expiry = None;
        Ok(())
    }

    async fn create_steps(
        &self,
        process_id: &Uuid,
        step_types: &[ProcessStepTypeId],
    ) -> Result<Vec<ProcessStep>, RepositoryError> {
        let created: Vec<_> = step_types
            .iter()
            .map(|t| ProcessStep::new(*process_id, *t))
            .collect();
        self.steps.lock().unwrap().extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_steps(&self, process_id: &Uuid) -> Result<Vec<ProcessStep>, RepositoryError> {
        Ok(self
            .steps
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.process_id == *process_id)
            .cloned()
            .collect())
    }

    async fn update_step_status(
        &self,
        step_id: &Uuid,
        status: ProcessStepStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut steps = self.steps.lock().unwrap();
        let step = steps
            .iter_mut()
            .find(|s| s.id == *step_id)
            .ok_or(RepositoryError::NotFound)?;
        if !step.status.can_transition_to(status) {
            return Err(RepositoryError::Conflict(format!(
                "{} -> {status}",
                step.status
            )));
        }
        step.status = status;
        step.message = message.map(str::to_string);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Checklists
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockChecklistRepository {
    applications: Arc<Mutex<HashMap<Uuid, Application>>>,
    entries: Arc<Mutex<HashMap<(Uuid, ChecklistCategory), ChecklistEntry>>>,
}

impl MockChecklistRepository {
    pub fn insert_application(&self, application: Application) {
        self.applications
            .lock()
            .unwrap()
            .insert(application.id, application);
    }

    pub fn insert_entry(&self, entry: ChecklistEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert((entry.application_id, entry.category), entry);
    }

    pub fn entry(
        &self,
        application_id: Uuid,
        category: ChecklistCategory,
    ) -> Option<ChecklistEntry> {
        self.entries
            .lock()
            .unwrap()
            .get(&(application_id, category))
            .cloned()
    }

    pub fn entries_for(&self, application_id: Uuid) -> Vec<ChecklistEntry> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.application_id == application_id)
            .cloned()
            .collect()
    }

    /// Drop an entry to simulate registry/data drift.
    pub fn remove_entry(&self, application_id: Uuid, category: ChecklistCategory) {
        self.entries.lock().unwrap().remove(&(application_id, category));
    }
}

impl ChecklistRepository for MockChecklistRepository {
    async fn get_application_for_process(
        &self,
        process_id: &Uuid,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .applications
            .lock()
            .unwrap()
            .values()
            .find(|a| a.process_id == Some(*process_id))
            .cloned())
    }

    async fn list_entries(
        &self,
        application_id: &Uuid,
    ) -> Result<Vec<ChecklistEntry>, RepositoryError> {
        Ok(self.entries_for(*application_id))
    }

    async fn create_entries(
        &self,
        entries: Vec<ChecklistEntry>,
    ) -> Result<Vec<ChecklistEntry>, RepositoryError> {
        let mut stored = self.entries.lock().unwrap();
        let mut created = Vec::new();
        for entry in entries {
            let key = (entry.application_id, entry.category);
            if !stored.contains_key(&key) {
                stored.insert(key, entry.clone());
                created.push(entry);
            }
        }
        Ok(created)
    }

    async fn modify_entry<F>(
        &self,
        application_id: &Uuid,
        category: ChecklistCategory,
        modify: F,
    ) -> Result<Option<ChecklistEntry>, RepositoryError>
    where
        F: FnOnce(&mut ChecklistEntry) + Send,
    {
        let mut stored = self.entries.lock().unwrap();
        Ok(stored.get_mut(&(*application_id, category)).map(|entry| {
            modify(entry);
            entry.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockInvitationRepository {
    invitations: Arc<Mutex<HashMap<Uuid, CompanyInvitation>>>,
}

impl MockInvitationRepository {
    pub fn insert(&self, invitation: CompanyInvitation) {
        self.invitations
            .lock()
            .unwrap()
            .insert(invitation.process_id, invitation);
    }
}

impl InvitationRepository for MockInvitationRepository {
    async fn get_invitation_for_process(
        &self,
        process_id: &Uuid,
    ) -> Result<Option<CompanyInvitation>, RepositoryError> {
        Ok(self.invitations.lock().unwrap().get(process_id).cloned())
    }
}
