//! In-memory invitation repository implementation.

use std::sync::Arc;

use dashmap::DashMap;
use onboard_core::repository::invitation::InvitationRepository;
use onboard_types::error::RepositoryError;
use onboard_types::invitation::CompanyInvitation;
use uuid::Uuid;

/// DashMap-backed implementation of `InvitationRepository`, keyed by process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInvitationRepository {
    invitations: Arc<DashMap<Uuid, CompanyInvitation>>,
}

impl InMemoryInvitationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the invitation bound to its process.
    pub fn save_invitation(&self, invitation: CompanyInvitation) {
        self.invitations.insert(invitation.process_id, invitation);
    }
}

impl InvitationRepository for InMemoryInvitationRepository {
    async fn get_invitation_for_process(
        &self,
        process_id: &Uuid,
    ) -> Result<Option<CompanyInvitation>, RepositoryError> {
        Ok(self.invitations.get(process_id).map(|i| i.value().clone()))
    }
}
