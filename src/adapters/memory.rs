//! In-Memory Management API
//!
//! A [`ManagementApi`] implementation holding the whole server state in
//! process memory. It backs the CLI's offline snapshot mode and every
//! test that exercises the commit pipeline, including fault injection for
//! the rejection and concurrent-delete paths.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::directives::{BufferDirective, DriveDirective, GlobalArchiveDirective};
use crate::domain::ports::{ManagementApi, MediaType, VsnEvaluation};
use crate::error::{Error, Result};
use crate::policy::ArchivePolicy;
use crate::vsn::VsnPool;

/// One volume in the simulated media inventory.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub media_type: MediaType,
    pub free_space_mb: u64,
}

#[derive(Default)]
struct ServerState {
    global: GlobalArchiveDirective,
    policies: BTreeMap<String, ArchivePolicy>,
    pools: BTreeMap<String, VsnPool>,
    stager_buffers: BTreeMap<MediaType, BufferDirective>,
    stager_drives: BTreeMap<String, DriveDirective>,
    volumes: Vec<Volume>,

    /// Queued rejection for the next policy mutation
    fail_next_update: Option<Vec<String>>,

    /// Soft warnings the next activation reports
    activation_warnings: Vec<String>,

    /// Number of readiness polls answered false before the server
    /// reports ready
    ready_after: u32,
    ready_calls: u32,
}

/// In-memory archive server.
#[derive(Default)]
pub struct MemoryManagementApi {
    state: RwLock<ServerState>,
}

impl MemoryManagementApi {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Seeding and fault injection ------------------------------------------

    pub fn seed_global(&self, directive: GlobalArchiveDirective) {
        self.state.write().global = directive;
    }

    pub fn seed_policy(&self, policy: ArchivePolicy) {
        self.state.write().policies.insert(policy.name.clone(), policy);
    }

    pub fn seed_pool(&self, pool: VsnPool) {
        self.state.write().pools.insert(pool.name.clone(), pool);
    }

    pub fn seed_volume(&self, volume: Volume) {
        self.state.write().volumes.push(volume);
    }

    pub fn remove_policy(&self, name: &str) {
        self.state.write().policies.remove(name);
    }

    /// Queue a rejection: the next create or update fails with these
    /// messages, then the fault clears.
    pub fn fail_next_update(&self, messages: Vec<String>) {
        self.state.write().fail_next_update = Some(messages);
    }

    pub fn set_activation_warnings(&self, warnings: Vec<String>) {
        self.state.write().activation_warnings = warnings;
    }

    /// The first `n` readiness polls answer false.
    pub fn set_ready_after(&self, n: u32) {
        let mut state = self.state.write();
        state.ready_after = n;
        state.ready_calls = 0;
    }

    fn take_queued_rejection(&self) -> Option<Vec<String>> {
        self.state.write().fail_next_update.take()
    }
}

#[async_trait]
impl ManagementApi for MemoryManagementApi {
    async fn get_global_directive(&self) -> Result<GlobalArchiveDirective> {
        Ok(self.state.read().global.clone())
    }

    async fn set_global_directive(
        &self,
        directive: &GlobalArchiveDirective,
    ) -> Result<Vec<String>> {
        self.state.write().global = directive.clone();
        Ok(Vec::new())
    }

    async fn get_all_policies(&self) -> Result<Vec<ArchivePolicy>> {
        Ok(self.state.read().policies.values().cloned().collect())
    }

    async fn get_policy(&self, name: &str) -> Result<ArchivePolicy> {
        self.state
            .read()
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PolicyNotFound(name.to_string()))
    }

    async fn create_policy(&self, policy: &ArchivePolicy) -> Result<Vec<String>> {
        if let Some(messages) = self.take_queued_rejection() {
            return Err(Error::RemoteRejected { messages });
        }
        let mut state = self.state.write();
        if state.policies.contains_key(&policy.name) {
            return Err(Error::RemoteRejected {
                messages: vec![format!("policy '{}' already exists", policy.name)],
            });
        }
        state.policies.insert(policy.name.clone(), policy.clone());
        debug!(policy = %policy.name, "policy created");
        Ok(Vec::new())
    }

    async fn update_policy(&self, policy: &ArchivePolicy) -> Result<Vec<String>> {
        if let Some(messages) = self.take_queued_rejection() {
            return Err(Error::RemoteRejected { messages });
        }
        let mut state = self.state.write();
        if !state.policies.contains_key(&policy.name) {
            // The policy was deleted underneath the caller's edit screen.
            return Err(Error::RemoteFatal {
                code: Error::CODE_POLICY_GONE,
                message: format!("policy '{}' no longer exists", policy.name),
            });
        }
        state.policies.insert(policy.name.clone(), policy.clone());
        debug!(policy = %policy.name, "policy updated");
        Ok(Vec::new())
    }

    async fn delete_policy(&self, name: &str) -> Result<()> {
        if self.state.write().policies.remove(name).is_none() {
            return Err(Error::PolicyNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn get_stager_buffer_directives(&self) -> Result<BTreeMap<MediaType, BufferDirective>> {
        Ok(self.state.read().stager_buffers.clone())
    }

    async fn set_stager_buffer_directive(
        &self,
        media_type: &MediaType,
        directive: &BufferDirective,
    ) -> Result<()> {
        self.state
            .write()
            .stager_buffers
            .insert(media_type.clone(), directive.clone());
        Ok(())
    }

    async fn get_stager_drive_directives(&self) -> Result<BTreeMap<String, DriveDirective>> {
        Ok(self.state.read().stager_drives.clone())
    }

    async fn set_stager_drive_directive(
        &self,
        library: &str,
        directive: &DriveDirective,
    ) -> Result<()> {
        self.state
            .write()
            .stager_drives
            .insert(library.to_string(), directive.clone());
        Ok(())
    }

    async fn get_all_vsn_pools(&self) -> Result<Vec<VsnPool>> {
        Ok(self.state.read().pools.values().cloned().collect())
    }

    async fn create_vsn_pool(&self, pool: &VsnPool) -> Result<()> {
        let mut state = self.state.write();
        if state.pools.contains_key(&pool.name) {
            return Err(Error::PoolExists(pool.name.clone()));
        }
        state.pools.insert(pool.name.clone(), pool.clone());
        Ok(())
    }

    async fn modify_vsn_pool(&self, pool: &VsnPool) -> Result<()> {
        let mut state = self.state.write();
        if !state.pools.contains_key(&pool.name) {
            return Err(Error::PoolNotFound(pool.name.clone()));
        }
        state.pools.insert(pool.name.clone(), pool.clone());
        Ok(())
    }

    async fn delete_vsn_pool(&self, name: &str) -> Result<()> {
        if self.state.write().pools.remove(name).is_none() {
            return Err(Error::PoolNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn is_pool_in_use(&self, name: &str) -> Result<Option<String>> {
        let state = self.state.read();
        for policy in state.policies.values() {
            for copy in policy.copies.values() {
                let references = copy
                    .vsn_map
                    .pool_expression
                    .as_ref()
                    .is_some_and(|e| e.contains(name));
                if references {
                    return Ok(Some(format!("{} copy {}", policy.name, copy.copy_number)));
                }
            }
        }
        Ok(None)
    }

    async fn evaluate_vsn_expression(
        &self,
        media_type: &MediaType,
        expression: &str,
        max_entries: usize,
    ) -> Result<VsnEvaluation> {
        let state = self.state.read();
        let patterns: Vec<&str> = expression
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let mut eval = VsnEvaluation::default();
        for volume in &state.volumes {
            if &volume.media_type != media_type {
                continue;
            }
            if !patterns.iter().any(|p| glob_match(p, &volume.name)) {
                continue;
            }

            eval.total_count += 1;
            eval.free_space_mb += volume.free_space_mb;
            if eval.tape_vsns.len() + eval.disk_vsns.len() < max_entries {
                if media_type.is_disk() {
                    eval.disk_vsns.push(volume.name.clone());
                } else {
                    eval.tape_vsns.push(volume.name.clone());
                }
            }
        }
        Ok(eval)
    }

    async fn activate_config(&self) -> Result<Vec<String>> {
        if let Some(messages) = self.take_queued_rejection() {
            return Err(Error::RemoteRejected { messages });
        }
        Ok(self.state.read().activation_warnings.clone())
    }

    async fn is_ready(&self) -> Result<bool> {
        let mut state = self.state.write();
        state.ready_calls += 1;
        Ok(state.ready_calls > state.ready_after)
    }
}

/// Shell-style glob over volume names: `*` matches any run, `?` matches
/// one character, everything else is literal.
fn glob_match(pattern: &str, name: &str) -> bool {
    fn matches(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                matches(&p[1..], n) || (!n.is_empty() && matches(p, &n[1..]))
            }
            (Some(b'?'), Some(_)) => matches(&p[1..], &n[1..]),
            (Some(c), Some(d)) if c == d => matches(&p[1..], &n[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), name.as_bytes())
}
