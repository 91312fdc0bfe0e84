//! Archive Configuration Checker
//!
//! Loads a JSON snapshot of an archive server's configuration (global
//! directive, policies, pools, media inventory), replays it into the
//! in-memory adapter, and runs the full validation pipeline against it:
//! per-policy validation, cross-policy duplicate analysis, VSN resolution
//! for every copy, and a dry activation. Findings are reported through
//! structured logging.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod adapters;
mod dataclass;
mod directives;
mod domain;
mod error;
mod policy;
mod session;
mod units;
mod vsn;

use crate::adapters::memory::{MemoryManagementApi, Volume};
use crate::directives::GlobalArchiveDirective;
use crate::error::Result;
use crate::policy::{find_duplicate_criteria, ArchivePolicy};
use crate::session::SessionConfig;
use crate::vsn::VsnPool;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Archive policy configuration checker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration snapshot (JSON)
    #[arg(long, env = "ARCHMAN_SNAPSHOT")]
    snapshot: PathBuf,

    /// Maximum volume names to resolve per copy
    #[arg(long, env = "ARCHMAN_MAX_VSN_ENTRIES", default_value = "100")]
    max_vsn_entries: usize,

    /// Readiness poll attempts after activation
    #[arg(long, env = "ARCHMAN_READINESS_ATTEMPTS", default_value = "10")]
    readiness_attempts: u32,

    /// Delay between readiness polls, in milliseconds
    #[arg(long, env = "ARCHMAN_READINESS_INTERVAL_MS", default_value = "500")]
    readiness_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Snapshot Format
// =============================================================================

/// Serialized server configuration accepted by `--snapshot`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigSnapshot {
    #[serde(default)]
    global: GlobalArchiveDirective,

    #[serde(default)]
    policies: Vec<ArchivePolicy>,

    #[serde(default)]
    pools: Vec<VsnPool>,

    #[serde(default)]
    volumes: Vec<Volume>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting archive configuration check");
    info!("  Snapshot: {}", args.snapshot.display());

    let raw = std::fs::read_to_string(&args.snapshot)?;
    let snapshot: ConfigSnapshot = serde_json::from_str(&raw)?;
    info!(
        "  Loaded {} policies, {} pools, {} volumes",
        snapshot.policies.len(),
        snapshot.pools.len(),
        snapshot.volumes.len()
    );

    let api = Arc::new(MemoryManagementApi::new());
    api.seed_global(snapshot.global);
    for policy in &snapshot.policies {
        api.seed_policy(policy.clone());
    }
    for pool in &snapshot.pools {
        api.seed_pool(pool.clone());
    }
    for volume in snapshot.volumes {
        api.seed_volume(volume);
    }

    let findings = run_checks(api.as_ref(), &snapshot.policies, &snapshot.pools, &args).await?;

    let config = SessionConfig {
        readiness_attempts: args.readiness_attempts,
        readiness_interval: Duration::from_millis(args.readiness_interval_ms),
    };
    let warnings = session::activate(api.as_ref(), &config).await?;
    for w in &warnings {
        warn!("activation: {}", w);
    }

    if findings == 0 {
        info!("Configuration check passed");
        Ok(())
    } else {
        error!("Configuration check found {} problem(s)", findings);
        std::process::exit(1);
    }
}

/// Run every local check and return the number of problems found.
async fn run_checks(
    api: &MemoryManagementApi,
    policies: &[ArchivePolicy],
    pools: &[VsnPool],
    args: &Args,
) -> Result<usize> {
    let mut findings = 0usize;

    for policy in policies {
        for err in policy.validate() {
            error!(policy = %policy.name, "{}", err);
            findings += 1;
        }
    }

    // Cross-policy duplicate analysis, lenient: flag every pair of
    // criteria selecting the same files on overlapping filesystems.
    for policy in policies {
        for criteria in &policy.criteria {
            if let Some(found) = find_duplicate_criteria(
                criteria,
                &criteria.fs_names,
                false,
                policies,
                Some((&policy.name, criteria.index)),
            ) {
                // Report each conflicting pair once.
                if (found.policy_name.as_str(), found.criteria_label.as_str())
                    < (policy.name.as_str(), criteria.label().as_str())
                {
                    continue;
                }
                error!(
                    policy = %policy.name,
                    criteria = %criteria.label(),
                    conflicts_with = %found.criteria_label,
                    in_policy = %found.policy_name,
                    "criteria selects the same files as another"
                );
                findings += 1;
            }
        }
    }

    for policy in policies {
        for copy in policy.copies.values() {
            if copy.vsn_map.is_unassigned() {
                warn!(
                    policy = %policy.name,
                    copy = copy.copy_number,
                    "copy has no volume assignment"
                );
                continue;
            }
            match vsn::resolve(api, &copy.vsn_map, pools, args.max_vsn_entries).await {
                Ok(resolution) => {
                    if resolution.member_vsns.is_empty() {
                        error!(
                            policy = %policy.name,
                            copy = copy.copy_number,
                            "volume assignment matches no volumes"
                        );
                        findings += 1;
                    } else {
                        info!(
                            policy = %policy.name,
                            copy = copy.copy_number,
                            volumes = %vsn::display_summary(&resolution),
                            free_mb = resolution.free_space_mb,
                            "copy resolved"
                        );
                    }
                }
                Err(e) => {
                    error!(policy = %policy.name, copy = copy.copy_number, "{}", e);
                    findings += 1;
                }
            }
        }
    }

    Ok(findings)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
