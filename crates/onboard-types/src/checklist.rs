//! Application checklist domain types.
//!
//! A submitted company application carries one `ChecklistEntry` per
//! `ChecklistCategory`. Entries are created lazily when the checklist process
//! is first initialized and are only ever changed through a
//! `ChecklistMutation` supplied by a step handler.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

/// Lifecycle state of a company application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Created,
    Submitted,
    Confirmed,
    Declined,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplicationStatus::Created => "CREATED",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::Confirmed => "CONFIRMED",
            ApplicationStatus::Declined => "DECLINED",
        };
        f.write_str(s)
    }
}

/// A company application, the business object the checklist process runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub status: ApplicationStatus,
    /// Checklist process bound to this application (set on submission).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Checklist categories and entries
// ---------------------------------------------------------------------------

/// A tracked area of progress on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistCategory {
    RegistrationVerification,
    BusinessPartnerNumber,
    IdentityWallet,
    BpnlCredential,
    MembershipCredential,
    ClearingHouse,
    SelfDescriptionLp,
    ApplicationActivation,
}

impl ChecklistCategory {
    /// All categories in checklist order.
    pub const ALL: [ChecklistCategory; 8] = [
        ChecklistCategory::RegistrationVerification,
        ChecklistCategory::BusinessPartnerNumber,
        ChecklistCategory::IdentityWallet,
        ChecklistCategory::BpnlCredential,
        ChecklistCategory::MembershipCredential,
        ChecklistCategory::ClearingHouse,
        ChecklistCategory::SelfDescriptionLp,
        ChecklistCategory::ApplicationActivation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistCategory::RegistrationVerification => "REGISTRATION_VERIFICATION",
            ChecklistCategory::BusinessPartnerNumber => "BUSINESS_PARTNER_NUMBER",
            ChecklistCategory::IdentityWallet => "IDENTITY_WALLET",
            ChecklistCategory::BpnlCredential => "BPNL_CREDENTIAL",
            ChecklistCategory::MembershipCredential => "MEMBERSHIP_CREDENTIAL",
            ChecklistCategory::ClearingHouse => "CLEARING_HOUSE",
            ChecklistCategory::SelfDescriptionLp => "SELF_DESCRIPTION_LP",
            ChecklistCategory::ApplicationActivation => "APPLICATION_ACTIVATION",
        }
    }
}

impl fmt::Display for ChecklistCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one checklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistEntryStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    Failed,
    Skipped,
}

impl fmt::Display for ChecklistEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChecklistEntryStatus::ToDo => "TO_DO",
            ChecklistEntryStatus::InProgress => "IN_PROGRESS",
            ChecklistEntryStatus::Done => "DONE",
            ChecklistEntryStatus::Failed => "FAILED",
            ChecklistEntryStatus::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// Progress tracker for one (application, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub application_id: Uuid,
    pub category: ChecklistCategory,
    pub status: ChecklistEntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub last_changed: DateTime<Utc>,
}

impl ChecklistEntry {
    /// Create a fresh `ToDo` entry.
    pub fn new(application_id: Uuid, category: ChecklistCategory) -> Self {
        Self {
            application_id,
            category,
            status: ChecklistEntryStatus::ToDo,
            comment: None,
            last_changed: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChecklistMutation
// ---------------------------------------------------------------------------

/// Separator placed between an existing comment and an appended one.
pub const COMMENT_SEPARATOR: &str = "\n";

/// How a mutation's comment combines with the entry's current comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentMode {
    #[default]
    Replace,
    /// Keep the existing comment and add the new one after it.
    Append,
}

/// A change a step handler wants applied to its category's entry.
///
/// Both fields are independently optional; an empty mutation changes
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistMutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChecklistEntryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub comment_mode: CommentMode,
}

impl ChecklistMutation {
    /// Set the entry status.
    pub fn set_status(status: ChecklistEntryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Only record a comment, leaving the status alone.
    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Self::default()
        }
    }

    /// Add `comment` after the entry's existing comment, leaving the status
    /// alone.
    pub fn append_comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            comment_mode: CommentMode::Append,
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Apply this mutation to `entry`, returning whether anything changed.
    ///
    /// A `Done` entry never changes status again. An appended comment is
    /// joined to the existing one with [`COMMENT_SEPARATOR`]. The stored
    /// comment is truncated to `max_comment_length` characters.
    pub fn apply(&self, entry: &mut ChecklistEntry, max_comment_length: usize) -> bool {
        let mut changed = false;

        if let Some(status) = self.status {
            if entry.status == ChecklistEntryStatus::Done && status != ChecklistEntryStatus::Done {
                // forward-only: DONE sticks
            } else if entry.status != status {
                entry.status = status;
                changed = true;
            }
        }

        if let Some(comment) = &self.comment {
            let combined = match (self.comment_mode, entry.comment.as_deref()) {
                (CommentMode::Append, Some(existing)) if !existing.is_empty() => {
                    format!("{existing}{COMMENT_SEPARATOR}{comment}")
                }
                _ => comment.clone(),
            };
            let comment = truncate_chars(&combined, max_comment_length);
            if entry.comment.as_deref() != Some(comment.as_str()) {
                entry.comment = Some(comment);
                changed = true;
            }
        }

        if changed {
            entry.last_changed = Utc::now();
        }
        changed
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
