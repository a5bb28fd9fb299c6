//! Checklist consistency service.
//!
//! Makes sure every category a checklist process needs has exactly one entry
//! before any step runs. Missing categories are seeded as `ToDo` together
//! with their initial step types; existing entries are never touched, so
//! initialization is idempotent.

use std::collections::BTreeMap;

use onboard_types::checklist::{
    ApplicationStatus, ChecklistCategory, ChecklistEntry, ChecklistEntryStatus,
};
use onboard_types::error::ProcessError;
use onboard_types::process::{ProcessStepTypeId, ProcessTypeId};
use uuid::Uuid;

use crate::repository::checklist::ChecklistRepository;
use crate::repository::process::ProcessRepository;

// ---------------------------------------------------------------------------
// ChecklistLayout
// ---------------------------------------------------------------------------

/// The categories a checklist needs, each with the step types to schedule
/// when its entry is first created, for processes of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLayout {
    process_type: ProcessTypeId,
    categories: Vec<(ChecklistCategory, Vec<ProcessStepTypeId>)>,
}

impl ChecklistLayout {
    pub fn new(process_type: ProcessTypeId) -> Self {
        Self {
            process_type,
            categories: Vec::new(),
        }
    }

    /// Process type whose checklist this layout describes.
    pub fn process_type(&self) -> ProcessTypeId {
        self.process_type
    }

    pub fn with_category(
        mut self,
        category: ChecklistCategory,
        initial_steps: Vec<ProcessStepTypeId>,
    ) -> Self {
        self.categories.push((category, initial_steps));
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = ChecklistCategory> + '_ {
        self.categories.iter().map(|(c, _)| *c)
    }

    pub fn initial_steps(&self, category: ChecklistCategory) -> &[ProcessStepTypeId] {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, steps)| steps.as_slice())
            .unwrap_or(&[])
    }

    /// Every initial step type across all categories.
    pub fn all_initial_steps(&self) -> impl Iterator<Item = ProcessStepTypeId> + '_ {
        self.categories.iter().flat_map(|(_, steps)| steps.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// ChecklistInitialization
// ---------------------------------------------------------------------------

/// Outcome of [`ChecklistConsistencyService::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistInitialization {
    pub application_id: Uuid,
    /// Category -> status snapshot after seeding.
    pub checklist: BTreeMap<ChecklistCategory, ChecklistEntryStatus>,
    /// True if any entry was created.
    pub modified: bool,
    /// Initial steps of newly seeded categories that are not already pending.
    pub schedule_step_types: Vec<ProcessStepTypeId>,
}

// ---------------------------------------------------------------------------
// ChecklistConsistencyService
// ---------------------------------------------------------------------------

/// Seeds and loads the checklist of the application bound to a process.
///
/// Generic over repository traits to maintain clean architecture --
/// onboard-core never depends on onboard-infra.
pub struct ChecklistConsistencyService<P: ProcessRepository, C: ChecklistRepository> {
    processes: P,
    checklists: C,
    layout: ChecklistLayout,
}

impl<P: ProcessRepository, C: ChecklistRepository> ChecklistConsistencyService<P, C> {
    pub fn new(processes: P, checklists: C, layout: ChecklistLayout) -> Self {
        Self {
            processes,
            checklists,
            layout,
        }
    }

    /// Access the underlying checklist repository.
    pub fn checklists(&self) -> &C {
        &self.checklists
    }

    /// Load the checklist of the application bound to `process_id`, creating
    /// any missing category entries.
    ///
    /// Fails with `NotFound` for an unknown process and with `Conflict` when
    /// the process is not of the layout's type, has no application, or the
    /// application is not `Submitted`.
    pub async fn initialize(
        &self,
        process_id: Uuid,
        pending_step_types: &[ProcessStepTypeId],
    ) -> Result<ChecklistInitialization, ProcessError> {
        let process = self
            .processes
            .get_process(&process_id)
            .await?
            .ok_or_else(|| ProcessError::NotFound(format!("process {process_id} does not exist")))?;

        let expected = self.layout.process_type();
        if process.process_type_id != expected {
            return Err(ProcessError::Conflict(format!(
                "process {process_id} is of type {}, not {expected}",
                process.process_type_id
            )));
        }

        let application = self
            .checklists
            .get_application_for_process(&process_id)
            .await?
            .ok_or_else(|| {
                ProcessError::Conflict(format!(
                    "process {process_id} is not associated with an application"
                ))
            })?;

        if application.status != ApplicationStatus::Submitted {
            return Err(ProcessError::Conflict(format!(
                "application {} is not in status {}",
                application.id,
                ApplicationStatus::Submitted
            )));
        }

        let mut checklist: BTreeMap<ChecklistCategory, ChecklistEntryStatus> = self
            .checklists
            .list_entries(&application.id)
            .await?
            .into_iter()
            .map(|entry| (entry.category, entry.status))
            .collect();

        let missing: Vec<ChecklistEntry> = self
            .layout
            .categories()
            .filter(|category| !checklist.contains_key(category))
            .map(|category| ChecklistEntry::new(application.id, category))
            .collect();

        if missing.is_empty() {
            tracing::debug!(
                process_id = %process_id,
                application_id = %application.id,
                "checklist complete, nothing to seed"
            );
            return Ok(ChecklistInitialization {
                application_id: application.id,
                checklist,
                modified: false,
                schedule_step_types: Vec::new(),
            });
        }

        // Another worker may have seeded some of these concurrently; only
        // the entries actually inserted here schedule their initial steps.
        let created = self.checklists.create_entries(missing).await?;

        let mut schedule_step_types = Vec::new();
        for entry in &created {
            checklist.insert(entry.category, entry.status);
            for step_type in self.layout.initial_steps(entry.category) {
                if !pending_step_types.contains(step_type)
                    && !schedule_step_types.contains(step_type)
                {
                    schedule_step_types.push(*step_type);
                }
            }
        }

        // Concurrently inserted entries still belong in the snapshot.
        if checklist.len() < self.layout.categories().count() {
            for entry in self.checklists.list_entries(&application.id).await? {
                checklist.entry(entry.category).or_insert(entry.status);
            }
        }

        tracing::info!(
            process_id = %process_id,
            application_id = %application.id,
            seeded = created.len(),
            scheduled = ?schedule_step_types,
            "seeded missing checklist entries"
        );

        Ok(ChecklistInitialization {
            application_id: application.id,
            checklist,
            modified: !created.is_empty(),
            schedule_step_types,
        })
    }
}
