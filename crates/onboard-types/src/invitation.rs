//! Company invitation types.
//!
//! An invitation process provisions the identity infrastructure for an
//! invited organisation. Unlike the application checklist it has no
//! per-category tracker; the invitation record is the only business object.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An invitation of a new organisation, bound to one invitation process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInvitation {
    pub id: Uuid,
    pub process_id: Uuid,
    pub organisation_name: String,
    pub user_email: String,
    /// Name of the central identity provider, once one has been created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_name: Option<String>,
}
