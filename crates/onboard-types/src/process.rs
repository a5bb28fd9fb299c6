//! Process domain types.
//!
//! A `Process` is one running instance of a multi-step workflow. It owns an
//! ordered set of `ProcessStep`s, each naming a `ProcessStepTypeId` and a
//! forward-only `ProcessStepStatus`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// The kind of workflow a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessTypeId {
    /// Validation of a submitted company application, tracked per checklist category.
    ApplicationChecklist,
    /// Provisioning of an invited tenant's identity infrastructure.
    Invitation,
}

impl ProcessTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessTypeId::ApplicationChecklist => "APPLICATION_CHECKLIST",
            ProcessTypeId::Invitation => "INVITATION",
        }
    }
}

impl fmt::Display for ProcessTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One workflow instance.
///
/// `lock_expiry` is written by the external driver before it dispatches a
/// lock-requiring step. A lock in the future blocks other workers from
/// dispatching lock-requiring steps of the same process; an expired lock is
/// simply ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: Uuid,
    pub process_type_id: ProcessTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_expiry: Option<DateTime<Utc>>,
}

impl Process {
    /// Create an unlocked process with a fresh UUIDv7.
    pub fn new(process_type_id: ProcessTypeId) -> Self {
        Self {
            id: Uuid::now_v7(),
            process_type_id,
            lock_expiry: None,
        }
    }

    /// Whether a lock is held at `now` (expiry strictly in the future).
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_expiry.is_some_and(|expiry| expiry > now)
    }
}

// ---------------------------------------------------------------------------
// Process steps
// ---------------------------------------------------------------------------

/// Status of a single process step.
///
/// Transitions only move forward: `Todo` may become anything, the other
/// states are terminal. A failed step is re-attempted by scheduling a
/// separate retrigger step, never by reopening the failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStepStatus {
    Todo,
    Done,
    Failed,
    Skipped,
}

impl ProcessStepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStepStatus::Todo)
    }

    /// Whether a step currently in `self` may be moved to `next`.
    pub fn can_transition_to(&self, next: ProcessStepStatus) -> bool {
        !self.is_terminal() || *self == next
    }
}

impl fmt::Display for ProcessStepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStepStatus::Todo => "TODO",
            ProcessStepStatus::Done => "DONE",
            ProcessStepStatus::Failed => "FAILED",
            ProcessStepStatus::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// Every step type known to the engine, across all process types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStepTypeId {
    // -- Application checklist --
    VerifyRegistration,
    CreateBusinessPartnerNumberPush,
    RetriggerBusinessPartnerNumberPush,
    CreateIdentityWallet,
    RetriggerIdentityWallet,
    RequestBpnlCredential,
    RetriggerRequestBpnlCredential,
    RequestMembershipCredential,
    RetriggerRequestMembershipCredential,
    StartClearingHouse,
    RetriggerClearingHouse,
    StartSelfDescriptionLp,
    RetriggerSelfDescriptionLp,
    ActivateApplication,

    // -- Invitation --
    InvitationCreateCentralIdp,
    RetriggerInvitationCreateCentralIdp,
    InvitationCreateSharedIdpServiceAccount,
    RetriggerInvitationCreateSharedIdpServiceAccount,
    InvitationCreateSharedRealm,
    RetriggerInvitationCreateSharedRealm,
    InvitationAddRealmRole,
    RetriggerInvitationAddRealmRole,
    InvitationCreateCentralIdpOrgMapper,
    RetriggerInvitationCreateCentralIdpOrgMapper,
    InvitationCreateDatabaseIdp,
    RetriggerInvitationCreateDatabaseIdp,
    InvitationCreateUser,
    RetriggerInvitationCreateUser,
}

impl ProcessStepTypeId {
    pub fn as_str(&self) -> &'static str {
        use ProcessStepTypeId::*;
        match self {
            VerifyRegistration => "VERIFY_REGISTRATION",
            CreateBusinessPartnerNumberPush => "CREATE_BUSINESS_PARTNER_NUMBER_PUSH",
            RetriggerBusinessPartnerNumberPush => "RETRIGGER_BUSINESS_PARTNER_NUMBER_PUSH",
            CreateIdentityWallet => "CREATE_IDENTITY_WALLET",
            RetriggerIdentityWallet => "RETRIGGER_IDENTITY_WALLET",
            RequestBpnlCredential => "REQUEST_BPNL_CREDENTIAL",
            RetriggerRequestBpnlCredential => "RETRIGGER_REQUEST_BPNL_CREDENTIAL",
            RequestMembershipCredential => "REQUEST_MEMBERSHIP_CREDENTIAL",
            RetriggerRequestMembershipCredential => "RETRIGGER_REQUEST_MEMBERSHIP_CREDENTIAL",
            StartClearingHouse => "START_CLEARING_HOUSE",
            RetriggerClearingHouse => "RETRIGGER_CLEARING_HOUSE",
            StartSelfDescriptionLp => "START_SELF_DESCRIPTION_LP",
            RetriggerSelfDescriptionLp => "RETRIGGER_SELF_DESCRIPTION_LP",
            ActivateApplication => "ACTIVATE_APPLICATION",
            InvitationCreateCentralIdp => "INVITATION_CREATE_CENTRAL_IDP",
            RetriggerInvitationCreateCentralIdp => "RETRIGGER_INVITATION_CREATE_CENTRAL_IDP",
            InvitationCreateSharedIdpServiceAccount => {
                "INVITATION_CREATE_SHARED_IDP_SERVICE_ACCOUNT"
            }
            RetriggerInvitationCreateSharedIdpServiceAccount => {
                "RETRIGGER_INVITATION_CREATE_SHARED_IDP_SERVICE_ACCOUNT"
            }
            InvitationCreateSharedRealm => "INVITATION_CREATE_SHARED_REALM",
            RetriggerInvitationCreateSharedRealm => "RETRIGGER_INVITATION_CREATE_SHARED_REALM",
            InvitationAddRealmRole => "INVITATION_ADD_REALM_ROLE",
            RetriggerInvitationAddRealmRole => "RETRIGGER_INVITATION_ADD_REALM_ROLE",
            InvitationCreateCentralIdpOrgMapper => "INVITATION_CREATE_CENTRAL_IDP_ORG_MAPPER",
            RetriggerInvitationCreateCentralIdpOrgMapper => {
                "RETRIGGER_INVITATION_CREATE_CENTRAL_IDP_ORG_MAPPER"
            }
            InvitationCreateDatabaseIdp => "INVITATION_CREATE_DATABASE_IDP",
            RetriggerInvitationCreateDatabaseIdp => "RETRIGGER_INVITATION_CREATE_DATABASE_IDP",
            InvitationCreateUser => "INVITATION_CREATE_USER",
            RetriggerInvitationCreateUser => "RETRIGGER_INVITATION_CREATE_USER",
        }
    }
}

impl fmt::Display for ProcessStepTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled or executed unit of work within a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub id: Uuid,
    pub step_type_id: ProcessStepTypeId,
    pub status: ProcessStepStatus,
    pub process_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Last message recorded by the engine for this step (e.g. a fault message).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProcessStep {
    /// Create a new `Todo` step for the given process.
    pub fn new(process_id: Uuid, step_type_id: ProcessStepTypeId) -> Self {
        Self {
            id: Uuid::now_v7(),
            step_type_id,
            status: ProcessStepStatus::Todo,
            process_id,
            created_at: Utc::now(),
            message: None,
        }
    }
}
