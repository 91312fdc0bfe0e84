//! Error types for the archive configuration core

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single field-level validation failure.
///
/// Validation errors are collected into a list and rendered together so an
/// edit batch reports every bad field at once instead of failing on the
/// first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the offending field (e.g. "archiveAge", "expirationDate")
    pub field: String,

    /// Human-readable description of the problem
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur in the archive configuration core
#[derive(Error, Debug)]
pub enum Error {
    /// One or more field-level validation failures. The edit batch is
    /// never submitted to the managed server while this list is non-empty.
    #[error("validation failed: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    /// A criteria collides with one already configured on the server.
    /// Carries the conflicting criteria label and owning policy so the
    /// message is actionable.
    #[error("criteria duplicates '{criteria_label}' of policy '{policy_name}'")]
    DuplicateCriteria {
        criteria_label: String,
        policy_name: String,
    },

    /// The managed server rejected the update with one or more independent
    /// messages. Rendered as a bulleted list, never collapsed into one line.
    #[error("server rejected the update:{}", format_bullets(.messages))]
    RemoteRejected { messages: Vec<String> },

    /// Fatal remote failure (e.g. the policy was deleted by another admin,
    /// error codes -2000/-2006). The edit screen is no longer valid.
    #[error("fatal server error {code}: {message}")]
    RemoteFatal { code: i32, message: String },

    /// Named policy does not exist on the managed server
    #[error("policy not found: {0}")]
    PolicyNotFound(String),

    /// Named VSN pool does not exist
    #[error("VSN pool not found: {0}")]
    PoolNotFound(String),

    /// A VSN pool with this name already exists
    #[error("VSN pool already exists: {0}")]
    PoolExists(String),

    /// Pool is still referenced by an archive copy
    #[error("VSN pool '{pool_name}' is in use by copy '{used_by}'")]
    PoolInUse { pool_name: String, used_by: String },

    /// Policy already holds its maximum number of copies
    #[error("policy '{policy_name}' already has {limit} copies")]
    CopyCapacity { policy_name: String, limit: u8 },

    /// Requested copy number is not valid for this policy type
    #[error("copy number {copy_number} is not valid for policy '{policy_name}'")]
    InvalidCopyNumber { policy_name: String, copy_number: u8 },

    /// Removing the last remaining copy is not allowed
    #[error("policy '{0}' must retain at least one copy")]
    LastCopy(String),

    /// Copy with this number does not exist on the policy
    #[error("policy '{policy_name}' has no copy {copy_number}")]
    CopyNotFound { policy_name: String, copy_number: u8 },

    /// DEFAULT-type policies derive their criteria; user-created criteria
    /// are not accepted
    #[error("policy '{0}' derives its criteria automatically")]
    SynthesizedCriteria(String),

    /// Pool or VSN expression references media of the wrong type
    #[error("media type mismatch: expected {expected}, found {found}")]
    MediaTypeMismatch { expected: String, found: String },

    /// Managed server never reported ready after a mutating operation
    #[error("server not ready after {attempts} attempts")]
    NotReady { attempts: u32 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The policy being edited was deleted out from under the session.
    pub const CODE_POLICY_GONE: i32 = -2000;
    /// The pushed configuration failed server-side validation wholesale.
    pub const CODE_CONFIG_INVALID: i32 = -2006;

    /// True if this error means the edit screen itself is stale and the
    /// caller should navigate back to a consistent prior view.
    pub fn is_fatal_remote(&self) -> bool {
        matches!(self, Error::RemoteFatal { .. })
    }

    /// True if the in-memory graph should be kept for re-editing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::DuplicateCriteria { .. } | Error::RemoteRejected { .. }
        )
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_bullets(messages: &[String]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str("\n  - ");
        out.push_str(m);
    }
    out
}
