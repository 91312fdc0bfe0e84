//! VSN Assignment Resolver
//!
//! Each archive copy carries a [`ArchiveVsnMap`]: a pool expression (named
//! pools) and a map expression (raw VSN-name globs), both stored as ordered
//! comma-joined lists. This module owns the expression algebra -
//! compose/decompose, set-difference edits, the reset-vs-merge rule when
//! the media type changes - and resolves a map into a concrete volume set
//! against the media inventory. The globbing itself is delegated to the
//! managed server through [`ManagementApi::evaluate_vsn_expression`].

use serde::{Deserialize, Serialize};

use crate::domain::ports::{ManagementApi, MediaType};
use crate::error::{Error, Result};
use crate::policy::ArchivePolicy;

/// Inline display cap: beyond this many volumes the summary truncates.
pub const DISPLAY_VSN_LIMIT: usize = 5;

// =============================================================================
// Expressions
// =============================================================================

/// An ordered, comma-joined list of entries (pool names or raw VSN
/// expressions). The empty expression is a valid value meaning "no
/// mapping" and is distinct from an unset (`None`) expression on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VsnExpression(Vec<String>);

impl VsnExpression {
    pub fn new(entries: Vec<String>) -> Self {
        Self(entries)
    }

    /// Decompose a comma-joined string. Surrounding whitespace is dropped;
    /// empty segments are ignored.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Compose back to the comma-joined wire form.
    pub fn compose(&self) -> String {
        self.0.join(",")
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.iter().any(|e| e == entry)
    }

    /// Append an entry unless already present. Returns true if added.
    pub fn add_entry(&mut self, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        if self.contains(&entry) {
            return false;
        }
        self.0.push(entry);
        true
    }

    /// Set-difference: drop every entry named in `to_remove`, preserving
    /// the original order of the survivors. Removing everything yields the
    /// empty expression, not an unset one.
    pub fn remove_entries(&mut self, to_remove: &[String]) {
        self.0.retain(|e| !to_remove.contains(e));
    }
}

impl std::fmt::Display for VsnExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.compose())
    }
}

// =============================================================================
// VSN Map
// =============================================================================

/// Volume assignment for one archive copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveVsnMap {
    /// Media type every referenced pool and volume must share
    pub media_type: MediaType,

    /// Comma-joined pool names; `None` when never configured
    pub pool_expression: Option<VsnExpression>,

    /// Comma-joined raw VSN-name expressions; `None` when never configured
    pub map_expression: Option<VsnExpression>,
}

impl ArchiveVsnMap {
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            pool_expression: None,
            map_expression: None,
        }
    }

    /// True when neither expression yields any volume.
    pub fn is_unassigned(&self) -> bool {
        self.pool_expression.as_ref().map_or(true, |e| e.is_empty())
            && self.map_expression.as_ref().map_or(true, |e| e.is_empty())
    }

    /// Change the archive media type. Both expressions reference media of
    /// the old type and are cleared, unless the caller opts to merge, which
    /// carries the pool expression forward (pools of the new type may share
    /// names). A same-type change is a no-op.
    pub fn set_media_type(&mut self, media_type: MediaType, merge_pools: bool) {
        if self.media_type == media_type {
            return;
        }
        self.media_type = media_type;
        self.map_expression = Some(VsnExpression::default());
        if !merge_pools {
            self.pool_expression = Some(VsnExpression::default());
        }
    }

    /// Add a pool reference to this map.
    pub fn add_pool(&mut self, pool: &VsnPool) -> Result<()> {
        if pool.media_type != self.media_type {
            return Err(Error::MediaTypeMismatch {
                expected: self.media_type.to_string(),
                found: pool.media_type.to_string(),
            });
        }
        self.pool_expression
            .get_or_insert_with(VsnExpression::default)
            .add_entry(pool.name.clone());
        Ok(())
    }
}

// =============================================================================
// VSN Pools
// =============================================================================

/// A named, reusable group of volumes of one media type. Pool names are
/// globally unique across the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsnPool {
    pub name: String,
    pub media_type: MediaType,
    pub vsn_expression: VsnExpression,
}

/// Strip a deleted pool from every referencing copy across all policies.
/// Returns how many references were removed.
pub fn remove_pool_references(pool_name: &str, policies: &mut [ArchivePolicy]) -> usize {
    let mut removed = 0;
    let to_remove = [pool_name.to_string()];

    for policy in policies {
        for copy in policy.copies.values_mut() {
            if let Some(expr) = copy.vsn_map.pool_expression.as_mut() {
                if expr.contains(pool_name) {
                    expr.remove_entries(&to_remove);
                    removed += 1;
                }
            }
        }
    }

    removed
}

// =============================================================================
// Resolution
// =============================================================================

/// Concrete volume set a map resolves to against the live inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsnResolution {
    /// Member volume names in evaluation order, each volume once
    pub member_vsns: Vec<String>,

    /// Free space across the members, in megabytes
    pub free_space_mb: u64,

    /// Total matched volumes (can exceed `member_vsns.len()` when the
    /// evaluation was bounded)
    pub total_count: usize,
}

/// Resolve a map against the media inventory: compose the referenced
/// pools' expressions and the raw map expression into a single expression
/// and evaluate it in one call, so a volume matched through both a pool
/// and the raw expression is counted once. Pools named in the expression
/// but missing from `pools` are an error; a pool of the wrong media type
/// is an error as well.
pub async fn resolve(
    api: &dyn ManagementApi,
    map: &ArchiveVsnMap,
    pools: &[VsnPool],
    max_entries: usize,
) -> Result<VsnResolution> {
    let mut combined = VsnExpression::default();

    if let Some(pool_expr) = &map.pool_expression {
        for pool_name in pool_expr.entries() {
            let pool = pools
                .iter()
                .find(|p| &p.name == pool_name)
                .ok_or_else(|| Error::PoolNotFound(pool_name.clone()))?;

            if pool.media_type != map.media_type {
                return Err(Error::MediaTypeMismatch {
                    expected: map.media_type.to_string(),
                    found: pool.media_type.to_string(),
                });
            }

            for entry in pool.vsn_expression.entries() {
                combined.add_entry(entry.clone());
            }
        }
    }

    if let Some(map_expr) = &map.map_expression {
        for entry in map_expr.entries() {
            combined.add_entry(entry.clone());
        }
    }

    if combined.is_empty() {
        return Ok(VsnResolution::default());
    }

    let eval = api
        .evaluate_vsn_expression(&map.media_type, &combined.compose(), max_entries)
        .await?;

    Ok(VsnResolution {
        member_vsns: eval.tape_vsns.into_iter().chain(eval.disk_vsns).collect(),
        free_space_mb: eval.free_space_mb,
        total_count: eval.total_count,
    })
}

/// Inline display form: up to [`DISPLAY_VSN_LIMIT`] names joined with
/// commas; beyond that, the first name followed by an ellipsis and the
/// total count.
pub fn display_summary(resolution: &VsnResolution) -> String {
    if resolution.member_vsns.is_empty() {
        return String::new();
    }
    if resolution.member_vsns.len() <= DISPLAY_VSN_LIMIT {
        return resolution.member_vsns.join(", ");
    }
    format!(
        "{}, ... ({})",
        resolution.member_vsns[0], resolution.total_count
    )
}
