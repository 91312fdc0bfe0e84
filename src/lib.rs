//! archman - Archive Policy Configuration Core
//!
//! The configuration model behind a hierarchical storage manager's
//! archiving subsystem. Archive policies select files by criteria and
//! schedule up to four copies onto tape or disk volumes; this crate owns
//! the policy graph, the directive and data-class models, unit-aware
//! validation, VSN (volume serial number) assignment, and the edit-session
//! pipeline that pushes changes to the managed server atomically.
//!
//! # Architecture
//!
//! ```text
//! Screens / CLI → Session (commit pipeline) → ManagementApi → Server
//!                    │
//!       policy graph │ directives │ vsn │ dataclass │ units
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`dataclass`] - Data-class attribute model and batch edits
//! - [`directives`] - Global archiver and stager directives
//! - [`domain`] - Domain layer with the management port
//! - [`error`] - Error taxonomy
//! - [`policy`] - Policy, criteria, and copy graph
//! - [`session`] - Edit sessions and the commit pipeline
//! - [`units`] - Size and time unit validation
//! - [`vsn`] - VSN expressions, pools, and resolution

pub mod adapters;
pub mod dataclass;
pub mod directives;
pub mod domain;
pub mod error;
pub mod policy;
pub mod session;
pub mod units;
pub mod vsn;

// Re-export commonly used types
pub use domain::ports::{ManagementApi, MediaType, VsnEvaluation};
pub use error::{Error, Result, ValidationError};
pub use policy::{ArchivePolCriteria, ArchivePolicy, ArchiveCopy, PolicyType};
pub use session::{EditSession, SessionConfig, SessionState};
pub use vsn::{ArchiveVsnMap, VsnExpression, VsnPool};
