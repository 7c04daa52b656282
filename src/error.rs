//! Error taxonomy for reconciliation passes
//!
//! A pass is not transactional: only `CapabilityUnavailable` aborts it, and
//! only before any mutation. Everything else degrades locally. A denied
//! settings write falls back to the privileged path for that one category,
//! an unreadable probe substitutes its documented default, and an absent
//! hardware control file silently turns its category into a no-op.

use crate::types::SettingDomain;
use thiserror::Error;

/// Fatal pass-level failures
#[derive(Debug, Error)]
pub enum PassError {
    /// No privileged execution path is available. Raised before any
    /// mutation; the previous profile identity is preserved.
    #[error("privileged execution is unavailable")]
    CapabilityUnavailable,

    #[error("no profile named `{0}`")]
    UnknownProfile(String),

    #[error("no profile is currently active")]
    NotActive,

    #[error("invalid quick action: {0}")]
    InvalidQuickAction(String),

    /// The requested resolution/density pair is on the unsafe-combination
    /// table for this panel
    #[error("refusing unsafe combination: size {size}, density {density}")]
    UnsafeCombination { size: String, density: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Failures of a single settings read or write
#[derive(Debug, Error)]
pub enum SettingError {
    /// The platform rejected an unprivileged write. The engine degrades
    /// the affected category to the privileged command path.
    #[error("write to {domain} setting `{key}` denied")]
    WriteDenied { domain: SettingDomain, key: String },

    /// The key does not exist on this platform
    #[error("{domain} setting `{key}` not present")]
    Absent { domain: SettingDomain, key: String },

    #[error("settings surface I/O: {0}")]
    Io(#[from] std::io::Error),
}
