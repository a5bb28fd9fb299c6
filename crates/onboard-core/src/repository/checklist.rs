//! Checklist repository trait definition.
//!
//! Defines the storage interface for applications and their checklist
//! entries. Entries are created lazily and only ever changed through the
//! `modify_entry` callback; there is no delete.

use onboard_types::checklist::{Application, ChecklistCategory, ChecklistEntry};
use onboard_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for application checklists.
pub trait ChecklistRepository: Send + Sync {
    /// Get the application bound to a checklist process, if any.
    fn get_application_for_process(
        &self,
        process_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Application>, RepositoryError>> + Send;

    /// List all checklist entries of an application.
    fn list_entries(
        &self,
        application_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChecklistEntry>, RepositoryError>> + Send;

    /// Insert entries that do not exist yet.
    ///
    /// Existing (application, category) pairs are left untouched. Returns the
    /// entries actually inserted.
    fn create_entries(
        &self,
        entries: Vec<ChecklistEntry>,
    ) -> impl std::future::Future<Output = Result<Vec<ChecklistEntry>, RepositoryError>> + Send;

    /// Apply `modify` to the stored entry and persist the result.
    ///
    /// Returns the updated entry, or `None` if the entry does not exist (in
    /// which case `modify` is not called).
    fn modify_entry<F>(
        &self,
        application_id: &Uuid,
        category: ChecklistCategory,
        modify: F,
    ) -> impl std::future::Future<Output = Result<Option<ChecklistEntry>, RepositoryError>> + Send
    where
        F: FnOnce(&mut ChecklistEntry) + Send;
}
