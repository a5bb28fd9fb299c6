//! Process repository trait definition.
//!
//! Defines the storage interface for processes and their steps. The engine
//! itself only reads processes; step persistence and locking are used by the
//! external driver that calls into the engine.

use chrono::{DateTime, Utc};
use onboard_types::error::RepositoryError;
use onboard_types::process::{Process, ProcessStep, ProcessStepStatus, ProcessStepTypeId};
use uuid::Uuid;

/// Repository trait for process persistence.
///
/// Covers two entity families:
/// - **Processes:** create/query workflow instances and their lock.
/// - **Steps:** create/update/query individual process steps.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ProcessRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Processes
    // -----------------------------------------------------------------------

    /// Create a new process record.
    fn create_process(
        &self,
        process: &Process,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a process by its UUID.
    fn get_process(
        &self,
        process_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Process>, RepositoryError>> + Send;

    /// Take the process lock until `expiry` unless a live lock exists at `now`.
    ///
    /// Returns `true` when the lock was acquired. Locks are optimistic and
    /// time-bounded: an expired lock is overwritten.
    fn try_lock_process(
        &self,
        process_id: &Uuid,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Clear the process lock.
    fn release_lock(
        &self,
        process_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    /// Create new `Todo` steps for a process. Returns the created steps.
    fn create_steps(
        &self,
        process_id: &Uuid,
        step_types: &[ProcessStepTypeId],
    ) -> impl std::future::Future<Output = Result<Vec<ProcessStep>, RepositoryError>> + Send;

    /// List all steps of a process, ordered by creation time.
    fn list_steps(
        &self,
        process_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ProcessStep>, RepositoryError>> + Send;

    /// Move a step to `status`, recording `message`.
    ///
    /// Fails with `RepositoryError::Conflict` if the transition would move the
    /// step backwards.
    fn update_step_status(
        &self,
        step_id: &Uuid,
        status: ProcessStepStatus,
        message: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
