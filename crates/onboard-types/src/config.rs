//! Engine configuration types.
//!
//! `EngineConfig` is the top-level `engine.toml` controlling error
//! classification, lock duration and comment storage.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the process engine.
///
/// All fields have sensible defaults, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// HTTP status codes treated as transient by the linear-dispatch executor.
    #[serde(default = "default_transient_status_codes")]
    pub transient_status_codes: Vec<u16>,

    /// How long a driver-held process lock stays valid, in seconds.
    #[serde(default = "default_lock_expiry_secs")]
    pub lock_expiry_secs: u64,

    /// Maximum stored length (in characters) of a checklist comment.
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
}

fn default_transient_status_codes() -> Vec<u16> {
    vec![502, 503, 504]
}

fn default_lock_expiry_secs() -> u64 {
    300
}

fn default_max_comment_length() -> usize {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transient_status_codes: default_transient_status_codes(),
            lock_expiry_secs: default_lock_expiry_secs(),
            max_comment_length: default_max_comment_length(),
        }
    }
}

impl EngineConfig {
    /// Lock lifetime for computing a process's `lock_expiry`.
    ///
    /// Values beyond what `TimeDelta` can hold saturate at `TimeDelta::MAX`.
    pub fn lock_expiry(&self) -> TimeDelta {
        i64::try_from(self.lock_expiry_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Expiry instant of a lock taken at `now`, saturating at the latest
    /// representable time.
    pub fn lock_expiry_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.lock_expiry())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_transient_status(&self, status_code: u16) -> bool {
        self.transient_status_codes.contains(&status_code)
    }
}
