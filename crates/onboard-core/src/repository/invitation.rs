//! Invitation repository trait definition.

use onboard_types::error::RepositoryError;
use onboard_types::invitation::CompanyInvitation;
use uuid::Uuid;

/// Repository trait for company invitations.
pub trait InvitationRepository: Send + Sync {
    /// Get the invitation bound to an invitation process, if any.
    fn get_invitation_for_process(
        &self,
        process_id: &Uuid,
    ) -> impl std::future::Future<
        Output = Result<Option<CompanyInvitation>, RepositoryError>,
    > + Send;
}
