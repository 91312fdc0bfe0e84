//! Domain Ports
//!
//! This module defines the boundary to the managed archive server. The
//! configuration model never talks to a wire protocol directly; it goes
//! through [`ManagementApi`], and adapters provide concrete
//! implementations (see `crate::adapters`).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Configuration Model                         │
//! │   directives │ policy │ vsn │ dataclass │ session            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ManagementApi (this trait)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Adapters: MemoryManagementApi │ RPC client            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::directives::{BufferDirective, DriveDirective, GlobalArchiveDirective};
use crate::error::Result;
use crate::policy::ArchivePolicy;
use crate::vsn::VsnPool;

// =============================================================================
// Value Objects
// =============================================================================

/// Media type code (value object).
///
/// The managed server identifies media by short codes: `dk` for disk
/// archives, two-letter codes like `li` or `sg` for tape families.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(pub String);

impl MediaType {
    /// Code for disk-backed archive volumes.
    pub const DISK: &'static str = "dk";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for disk archive media; everything else is removable media.
    pub fn is_disk(&self) -> bool {
        self.0 == Self::DISK
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Result of evaluating a VSN expression against the live media inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsnEvaluation {
    /// Free space across the matched volumes, in megabytes
    pub free_space_mb: u64,

    /// Matched tape volume names, inventory order
    #[serde(default)]
    pub tape_vsns: Vec<String>,

    /// Matched disk volume names, inventory order
    #[serde(default)]
    pub disk_vsns: Vec<String>,

    /// Total number of matched volumes. Can exceed the returned name count
    /// when the caller bounded the evaluation with `max_entries`.
    pub total_count: usize,
}

// =============================================================================
// Management API Port
// =============================================================================

/// Port to the managed archive server.
///
/// Every call may fail remotely; the adapter is responsible for translating
/// transport failures into the error taxonomy in `crate::error` - raw
/// transport errors never cross this boundary. Mutating calls return the
/// server's soft warnings as values: a warning set means the change was
/// accepted but something is suspect (e.g. a daemon not yet running).
#[async_trait]
pub trait ManagementApi: Send + Sync {
    // -- Global archive directive -------------------------------------------

    /// Fetch the process-wide archiver settings, whole.
    async fn get_global_directive(&self) -> Result<GlobalArchiveDirective>;

    /// Replace the process-wide archiver settings, whole.
    async fn set_global_directive(&self, directive: &GlobalArchiveDirective)
        -> Result<Vec<String>>;

    // -- Policies -----------------------------------------------------------

    /// Fetch every archive policy currently configured on the server.
    async fn get_all_policies(&self) -> Result<Vec<ArchivePolicy>>;

    /// Fetch one policy by name.
    async fn get_policy(&self, name: &str) -> Result<ArchivePolicy>;

    /// Register a new policy.
    async fn create_policy(&self, policy: &ArchivePolicy) -> Result<Vec<String>>;

    /// Push the entire policy subtree back, atomically. Returns soft
    /// warnings on success.
    async fn update_policy(&self, policy: &ArchivePolicy) -> Result<Vec<String>>;

    /// Remove a policy.
    async fn delete_policy(&self, name: &str) -> Result<()>;

    // -- Stager directives --------------------------------------------------

    /// Fetch stager buffer directives, keyed by media type.
    async fn get_stager_buffer_directives(&self) -> Result<BTreeMap<MediaType, BufferDirective>>;

    /// Replace a single stager buffer directive.
    async fn set_stager_buffer_directive(
        &self,
        media_type: &MediaType,
        directive: &BufferDirective,
    ) -> Result<()>;

    /// Fetch stager drive directives, keyed by library name.
    async fn get_stager_drive_directives(&self) -> Result<BTreeMap<String, DriveDirective>>;

    /// Replace a single stager drive directive.
    async fn set_stager_drive_directive(
        &self,
        library: &str,
        directive: &DriveDirective,
    ) -> Result<()>;

    // -- VSN pools ----------------------------------------------------------

    /// Fetch every VSN pool.
    async fn get_all_vsn_pools(&self) -> Result<Vec<VsnPool>>;

    /// Create a pool. Pool names are globally unique.
    async fn create_vsn_pool(&self, pool: &VsnPool) -> Result<()>;

    /// Replace a pool's media type and member expression.
    async fn modify_vsn_pool(&self, pool: &VsnPool) -> Result<()>;

    /// Delete a pool. Callers must first clear or confirm references
    /// (see [`ManagementApi::is_pool_in_use`]).
    async fn delete_vsn_pool(&self, name: &str) -> Result<()>;

    /// If the pool is referenced by any archive copy, returns the name of
    /// one referencing copy.
    async fn is_pool_in_use(&self, name: &str) -> Result<Option<String>>;

    // -- Media inventory ----------------------------------------------------

    /// Evaluate a raw VSN-name expression against the live inventory.
    /// `max_entries` bounds the number of names returned; `total_count`
    /// in the result is not bounded by it.
    async fn evaluate_vsn_expression(
        &self,
        media_type: &MediaType,
        expression: &str,
        max_entries: usize,
    ) -> Result<VsnEvaluation>;

    // -- Activation and readiness -------------------------------------------

    /// Validate and activate the server-side configuration. Returns soft
    /// warnings (e.g. copies with no usable volumes); hard configuration
    /// errors surface as `Error::RemoteRejected`.
    async fn activate_config(&self) -> Result<Vec<String>>;

    /// Readiness signal, polled after mutating operations that restart a
    /// background daemon.
    async fn is_ready(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_disk() {
        assert!(MediaType::new("dk").is_disk());
        assert!(!MediaType::new("li").is_disk());
        assert_eq!(MediaType::from("sg").as_str(), "sg");
    }

    #[test]
    fn test_media_type_display() {
        assert_eq!(MediaType::new("li").to_string(), "li");
    }

    #[test]
    fn test_vsn_evaluation_serializes() {
        let eval = VsnEvaluation {
            free_space_mb: 2048,
            tape_vsns: vec!["VOL001".to_string()],
            disk_vsns: vec![],
            total_count: 1,
        };
        let json = serde_json::to_string(&eval).unwrap();
        assert!(json.contains("\"freeSpaceMb\":2048"));
        assert!(json.contains("\"totalCount\":1"));
    }
}
