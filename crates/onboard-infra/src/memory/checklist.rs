//! In-memory checklist repository implementation.
//!
//! Entries are keyed by (application, category), so at most one entry per
//! category can ever exist. Creation goes through the map's entry API and
//! never overwrites.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use onboard_core::repository::checklist::ChecklistRepository;
use onboard_types::checklist::{Application, ChecklistCategory, ChecklistEntry};
use onboard_types::error::RepositoryError;
use uuid::Uuid;

/// DashMap-backed implementation of `ChecklistRepository`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChecklistRepository {
    applications: Arc<DashMap<Uuid, Application>>,
    entries: Arc<DashMap<(Uuid, ChecklistCategory), ChecklistEntry>>,
}

impl InMemoryChecklistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) an application.
    pub fn save_application(&self, application: Application) {
        self.applications.insert(application.id, application);
    }

    /// Read a single entry.
    pub fn get_entry(
        &self,
        application_id: &Uuid,
        category: ChecklistCategory,
    ) -> Option<ChecklistEntry> {
        self.entries
            .get(&(*application_id, category))
            .map(|entry| entry.value().clone())
    }
}

impl ChecklistRepository for InMemoryChecklistRepository {
    async fn get_application_for_process(
        &self,
        process_id: &Uuid,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .applications
            .iter()
            .find(|application| application.process_id == Some(*process_id))
            .map(|application| application.value().clone()))
    }

    async fn list_entries(
        &self,
        application_id: &Uuid,
    ) -> Result<Vec<ChecklistEntry>, RepositoryError> {
        let mut entries: Vec<ChecklistEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.application_id == *application_id)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.category);
        Ok(entries)
    }

    async fn create_entries(
        &self,
        entries: Vec<ChecklistEntry>,
    ) -> Result<Vec<ChecklistEntry>, RepositoryError> {
        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.entries.entry((entry.application_id, entry.category)) {
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(entry.clone());
                    created.push(entry);
                }
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
        Ok(self
            .entries
            .get_mut(&(*application_id, category))
            .map(|mut entry| {
                modify(entry.value_mut());
                entry.value().clone()
            }))
    }
}
