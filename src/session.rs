//! Edit Sessions
//!
//! Policy editing is screen-oriented: the whole policy graph is fetched
//! once, mutated in memory across nested screens, and pushed back in a
//! single atomic update. [`EditSession`] owns that lifecycle and the
//! commit pipeline: local validation, a strict duplicate re-check against
//! freshly fetched server state, the atomic push, and a bounded readiness
//! poll while the archiver daemon restarts.
//!
//! Recoverable failures (validation, duplicates, server rejection) leave
//! the in-memory graph intact for re-editing. Fatal failures (the policy
//! was deleted by another session) invalidate the session; the caller
//! abandons it and reloads from the server.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::domain::ports::ManagementApi;
use crate::error::{Error, Result};
use crate::policy::{find_duplicate_criteria, ArchivePolicy};
use crate::vsn::{remove_pool_references, VsnPool};

// =============================================================================
// Configuration
// =============================================================================

/// Tuning for the commit pipeline.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How many times to poll readiness after a mutating operation
    pub readiness_attempts: u32,

    /// Delay between readiness polls
    pub readiness_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            readiness_attempts: 10,
            readiness_interval: Duration::from_millis(500),
        }
    }
}

// =============================================================================
// Read-Through Cache
// =============================================================================

/// Session-scoped cache over the expensive whole-set fetches. One admin
/// session reads the policy and pool sets many times while navigating;
/// the cache is invalidated on every mutation so the next read is fresh.
#[derive(Default)]
pub struct SessionCache {
    policies: RwLock<Option<Vec<ArchivePolicy>>>,
    pools: RwLock<Option<Vec<VsnPool>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the policy set, read-through.
    pub async fn policies(&self, api: &dyn ManagementApi) -> Result<Vec<ArchivePolicy>> {
        if let Some(cached) = self.policies.read().clone() {
            return Ok(cached);
        }
        let fresh = api.get_all_policies().await?;
        *self.policies.write() = Some(fresh.clone());
        Ok(fresh)
    }

    /// Fetch the pool set, read-through.
    pub async fn pools(&self, api: &dyn ManagementApi) -> Result<Vec<VsnPool>> {
        if let Some(cached) = self.pools.read().clone() {
            return Ok(cached);
        }
        let fresh = api.get_all_vsn_pools().await?;
        *self.pools.write() = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop everything; the next read refetches.
    pub fn invalidate(&self) {
        *self.policies.write() = None;
        *self.pools.write() = None;
    }
}

// =============================================================================
// Edit Session
// =============================================================================

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Graph fetched, no local changes yet
    Loaded,
    /// Graph mutated in memory
    Editing,
    /// Commit in progress: local checks, duplicate re-check, push
    Validating,
    /// Last commit failed recoverably; the graph is kept for re-editing
    Rejected,
    /// Last commit succeeded; the graph mirrors the server
    Saved,
    /// The server-side policy is gone or unreadable; the session is
    /// terminal and must be abandoned
    Invalidated,
}

/// One policy being edited against the managed server.
pub struct EditSession {
    api: Arc<dyn ManagementApi>,
    config: SessionConfig,

    /// Working copy, mutated by the screens
    policy: ArchivePolicy,

    /// Server-side snapshot at load time, for discard
    pristine: ArchivePolicy,

    /// Whether the policy was on the server when the session opened.
    /// Loaded sessions always push an update, so concurrent deletion
    /// surfaces as a fatal error instead of a silent re-create.
    exists_on_server: bool,

    state: SessionState,
}

impl EditSession {
    /// Fetch a policy and open a session on it.
    pub async fn load(
        api: Arc<dyn ManagementApi>,
        name: &str,
        config: SessionConfig,
    ) -> Result<Self> {
        let policy = api.get_policy(name).await?;
        debug!(policy = %policy.name, "edit session opened");
        Ok(Self {
            api,
            config,
            pristine: policy.clone(),
            policy,
            exists_on_server: true,
            state: SessionState::Loaded,
        })
    }

    /// Open a session on a policy that does not exist on the server yet.
    pub fn create(
        api: Arc<dyn ManagementApi>,
        policy: ArchivePolicy,
        config: SessionConfig,
    ) -> Self {
        Self {
            api,
            config,
            pristine: policy.clone(),
            policy,
            exists_on_server: false,
            state: SessionState::Editing,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy(&self) -> &ArchivePolicy {
        &self.policy
    }

    /// Mutable access to the working copy. Marks the session dirty.
    pub fn policy_mut(&mut self) -> &mut ArchivePolicy {
        if self.state != SessionState::Editing {
            self.state = SessionState::Editing;
        }
        &mut self.policy
    }

    pub fn is_dirty(&self) -> bool {
        self.policy != self.pristine
    }

    /// Throw away local changes and return to the load-time snapshot.
    pub fn discard(&mut self) {
        self.policy = self.pristine.clone();
        self.state = SessionState::Loaded;
    }

    /// Push the working copy to the server.
    ///
    /// Pipeline: local validation, strict duplicate re-check against a
    /// fresh fetch of the server-side policy set, atomic update, readiness
    /// poll. Returns the server's soft warnings on success.
    pub async fn commit(&mut self) -> Result<Vec<String>> {
        self.state = SessionState::Validating;

        let errors = self.policy.validate();
        if !errors.is_empty() {
            self.state = SessionState::Rejected;
            return Err(Error::Validation(errors));
        }

        // The duplicate check must see what the server has NOW, not what
        // this session loaded; another admin may have added a criteria in
        // the meantime.
        let current = self.api.get_all_policies().await?;
        for criteria in &self.policy.criteria {
            if let Some(found) = find_duplicate_criteria(
                criteria,
                &criteria.fs_names,
                true,
                &current,
                Some((&self.policy.name, criteria.index)),
            ) {
                warn!(
                    policy = %self.policy.name,
                    conflict = %found.criteria_label,
                    "duplicate criteria blocked commit"
                );
                self.state = SessionState::Rejected;
                return Err(Error::DuplicateCriteria {
                    criteria_label: found.criteria_label,
                    policy_name: found.policy_name,
                });
            }
        }

        let result = if self.exists_on_server {
            self.api.update_policy(&self.policy).await
        } else {
            self.api.create_policy(&self.policy).await
        };

        let warnings = match result {
            Ok(warnings) => warnings,
            Err(err) => {
                if err.is_recoverable() {
                    self.state = SessionState::Rejected;
                } else {
                    // The screen no longer matches server reality; the
                    // session is terminal and the caller abandons it.
                    warn!(policy = %self.policy.name, error = %err, "commit failed fatally");
                    self.state = SessionState::Invalidated;
                }
                return Err(err);
            }
        };

        // The push is durable once the server accepts it; a slow daemon
        // restart must not leave the session looking uncommitted.
        self.pristine = self.policy.clone();
        self.exists_on_server = true;
        self.state = SessionState::Saved;
        wait_ready(self.api.as_ref(), &self.config).await?;

        info!(policy = %self.policy.name, warnings = warnings.len(), "policy committed");
        Ok(warnings)
    }
}

// =============================================================================
// Standalone Operations
// =============================================================================

/// Poll readiness after a mutating operation that restarts the archiver
/// daemon. Bounded; expiry is an error rather than an indefinite wait.
pub async fn wait_ready(api: &dyn ManagementApi, config: &SessionConfig) -> Result<()> {
    for attempt in 1..=config.readiness_attempts {
        if api.is_ready().await? {
            debug!(attempt, "server ready");
            return Ok(());
        }
        tokio::time::sleep(config.readiness_interval).await;
    }
    Err(Error::NotReady {
        attempts: config.readiness_attempts,
    })
}

/// Replace the global archive directive and wait for the daemon to come
/// back. Returns the server's soft warnings.
pub async fn save_global_directive(
    api: &dyn ManagementApi,
    directive: &crate::directives::GlobalArchiveDirective,
    config: &SessionConfig,
) -> Result<Vec<String>> {
    let warnings = api.set_global_directive(directive).await?;
    wait_ready(api, config).await?;
    info!(warnings = warnings.len(), "global archive directive saved");
    Ok(warnings)
}

/// Delete a VSN pool. A referenced pool cannot be deleted unless `force`
/// is set, in which case every referencing copy is rewritten first and
/// pushed back before the pool itself is removed.
pub async fn delete_pool(
    api: &dyn ManagementApi,
    name: &str,
    force: bool,
    config: &SessionConfig,
) -> Result<()> {
    if let Some(used_by) = api.is_pool_in_use(name).await? {
        if !force {
            return Err(Error::PoolInUse {
                pool_name: name.to_string(),
                used_by,
            });
        }

        let mut policies = api.get_all_policies().await?;
        for policy in &mut policies {
            let references = policy.copies.values().any(|c| {
                c.vsn_map
                    .pool_expression
                    .as_ref()
                    .is_some_and(|e| e.contains(name))
            });
            if !references {
                continue;
            }
            let removed = remove_pool_references(name, std::slice::from_mut(policy));
            info!(pool = name, policy = %policy.name, references = removed, "clearing pool references");
            api.update_policy(policy).await?;
        }
        wait_ready(api, config).await?;
    }

    api.delete_vsn_pool(name).await?;
    info!(pool = name, "pool deleted");
    Ok(())
}

/// Validate and activate the server-side configuration, then wait for the
/// daemon. Soft warnings from activation are returned to the caller.
pub async fn activate(api: &dyn ManagementApi, config: &SessionConfig) -> Result<Vec<String>> {
    let warnings = api.activate_config().await?;
    for w in &warnings {
        warn!(warning = %w, "activation warning");
    }
    wait_ready(api, config).await?;
    Ok(warnings)
}
