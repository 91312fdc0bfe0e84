//! Archive Policy Graph
//!
//! The entity graph behind every policy screen: a policy owns an ordered
//! list of match criteria and up to four archive copies (five for the
//! allsets pseudo-policy), each copy carrying its own media assignment.
//! The graph is fetched whole from the managed server, mutated in memory
//! across nested screens, validated, and pushed back in one atomic update.
//!
//! Criteria order matters: the archiver evaluates them top-down against
//! each file, so two criteria matching the same files on an overlapping
//! filesystem set are a configuration error. [`find_duplicate_criteria`]
//! performs that check across the whole server-side policy set.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dataclass::DataClassAttributes;
use crate::domain::ports::MediaType;
use crate::error::{Error, Result, ValidationError};
use crate::units::{SizeValue, TimeValue};
use crate::vsn::ArchiveVsnMap;

/// Highest real copy number. Copies 1..=4 hold actual replicas.
pub const MAX_REAL_COPIES: u8 = 4;

/// The pseudo copy slot providing fallback volume assignment; only the
/// allsets pseudo-policy may populate it.
pub const ALLSETS_COPY_NUMBER: u8 = 5;

// =============================================================================
// Policy Types
// =============================================================================

/// What kind of policy this is. The type constrains which operations are
/// legal on the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyType {
    /// Custom, user-created policy
    General,
    /// Per-filesystem default; its criteria is synthesized, not user-built
    Default,
    /// Matched files are never archived
    NoArchive,
    /// Synthetic policy providing fallback VSN assignment (copy 5)
    AllsetsPseudo,
    /// Placeholder for criteria not yet assigned to a policy
    Unassigned,
    /// Explicitly configured default
    ExplicitDefault,
}

impl PolicyType {
    /// Maximum copies a policy of this type may hold.
    pub fn max_copies(&self) -> u8 {
        match self {
            PolicyType::AllsetsPseudo => ALLSETS_COPY_NUMBER,
            _ => MAX_REAL_COPIES,
        }
    }

    /// DEFAULT-type policies skip the match-criteria fields; their single
    /// criteria is synthesized at index 0.
    pub fn has_match_criteria(&self) -> bool {
        !matches!(self, PolicyType::Default | PolicyType::ExplicitDefault)
    }

    /// NO_ARCHIVE policies carry no stage/release attributes.
    pub fn supports_stage_release(&self) -> bool {
        !matches!(self, PolicyType::NoArchive)
    }

    /// NO_ARCHIVE policies never produce copies.
    pub fn requires_copies(&self) -> bool {
        !matches!(self, PolicyType::NoArchive)
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyType::General => write!(f, "general"),
            PolicyType::Default => write!(f, "default"),
            PolicyType::NoArchive => write!(f, "no-archive"),
            PolicyType::AllsetsPseudo => write!(f, "allsets"),
            PolicyType::Unassigned => write!(f, "unassigned"),
            PolicyType::ExplicitDefault => write!(f, "explicit-default"),
        }
    }
}

// =============================================================================
// Match Criteria
// =============================================================================

/// How the name pattern of a criteria is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternType {
    #[default]
    Regexp,
    FileNameContains,
    PathContains,
    FileNameStartsWith,
    EndsWith,
}

/// Match properties of one criteria: which files it selects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaProp {
    /// Directory the criteria applies under, relative to the mount point
    pub starting_dir: String,

    /// File-name pattern, interpreted per `pattern_type`
    pub name_pattern: Option<String>,

    #[serde(default)]
    pub pattern_type: PatternType,

    pub min_size: Option<SizeValue>,
    pub max_size: Option<SizeValue>,

    pub owner: Option<String>,
    pub group: Option<String>,

    /// Minimum age since last access
    pub access_age: Option<TimeValue>,

    /// Only files modified after this date match
    pub after: Option<NaiveDate>,

    /// Data-class name, when the system manages named classes
    pub class_name: Option<String>,
    pub class_description: Option<String>,

    /// Class attribute bundle (expiration, audit, dedup, logging)
    #[serde(default)]
    pub class_attributes: DataClassAttributes,
}

impl CriteriaProp {
    /// True when two criteria select the same files: same directory,
    /// pattern, ownership, and size/age ranges after unit normalization.
    pub fn matches_same_files(&self, other: &CriteriaProp) -> bool {
        self.starting_dir == other.starting_dir
            && self.name_pattern == other.name_pattern
            && self.pattern_type == other.pattern_type
            && self.owner == other.owner
            && self.group == other.group
            && normalized_size(self.min_size) == normalized_size(other.min_size)
            && normalized_size(self.max_size) == normalized_size(other.max_size)
            && normalized_time(self.access_age) == normalized_time(other.access_age)
    }
}

fn normalized_size(v: Option<SizeValue>) -> Option<u128> {
    v.map(|s| s.bytes())
}

fn normalized_time(v: Option<TimeValue>) -> Option<u128> {
    v.map(|t| t.seconds())
}

/// Per-criteria release scheduling for one copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseOption {
    /// Release disk space only when needed
    #[default]
    SpaceRequired,
    /// Release as soon as the copy is made
    Immediately,
    /// Wait until every copy exists before releasing
    WaitForAll,
}

/// Schedule one criteria contributes to one real copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaCopy {
    /// Real copy number, 1..=4
    pub copy_number: u8,

    /// Age at which matched files are archived. Required; the archiver
    /// cannot schedule a copy without it.
    pub archive_age: TimeValue,

    /// Age at which the copy is unarchived, if ever
    pub unarchive_age: Option<TimeValue>,

    #[serde(default)]
    pub release: ReleaseOption,
}

impl CriteriaCopy {
    /// Same schedule after unit normalization.
    fn same_schedule(&self, other: &CriteriaCopy) -> bool {
        self.copy_number == other.copy_number
            && self.archive_age.seconds() == other.archive_age.seconds()
            && normalized_time(self.unarchive_age) == normalized_time(other.unarchive_age)
            && self.release == other.release
    }
}

/// One file-matching rule within a policy. Criteria are evaluated in
/// `index` order against each file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePolCriteria {
    /// Position within the owning policy; order is evaluation order
    pub index: usize,

    pub prop: CriteriaProp,

    /// Applies to every filesystem, not just the associated ones
    #[serde(default)]
    pub is_global: bool,

    /// Filesystems this criteria is associated with
    #[serde(default)]
    pub fs_names: Vec<String>,

    /// Per-copy schedules, keyed by real copy number
    #[serde(default)]
    pub copies: BTreeMap<u8, CriteriaCopy>,
}

impl ArchivePolCriteria {
    /// Label shown in conflict messages: the data-class name when one is
    /// set, otherwise a positional label.
    pub fn label(&self) -> String {
        self.prop
            .class_name
            .clone()
            .unwrap_or_else(|| format!("criteria {}", self.index + 1))
    }

    /// True when this criteria covers any of the given filesystems.
    pub fn overlaps_filesystems(&self, fs_names: &[String]) -> bool {
        if self.is_global || fs_names.is_empty() {
            return true;
        }
        self.fs_names.iter().any(|fs| fs_names.contains(fs))
    }
}

// =============================================================================
// Archive Copies
// =============================================================================

/// Order in which candidate files are written to a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMethod {
    /// Omit the directive; the server applies its default
    #[default]
    NotSet,
    None,
    Age,
    Path,
    Priority,
    Size,
}

/// Whether files from one directory are joined into one archive file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinMethod {
    #[default]
    NotSet,
    None,
    Path,
}

/// How offline files are handled while copying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OfflineCopyMethod {
    #[default]
    NotSet,
    None,
    Direct,
    StageAhead,
    StageAll,
}

/// Which timestamp unarchive ages are measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnarchiveTimeReference {
    #[default]
    Access,
    Modification,
}

/// Recycler tuning for one copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecyclerParams {
    /// Exclude this copy's volumes from recycling
    #[serde(default)]
    pub ignore: bool,

    /// Utilization percentage above which volumes become candidates
    pub high_water_mark: Option<u8>,

    /// Minimum space gain percentage worth recycling for
    pub min_gain: Option<u8>,

    /// Where recycler notices are mailed
    pub notification_email: Option<String>,
}

/// One archival replica slot of a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveCopy {
    /// 1..=4 for real copies, 5 for the allsets pseudo slot
    pub copy_number: u8,

    #[serde(default)]
    pub sort_method: SortMethod,

    #[serde(default)]
    pub unarchive_time_reference: UnarchiveTimeReference,

    #[serde(default)]
    pub join_method: JoinMethod,

    #[serde(default)]
    pub offline_copy_method: OfflineCopyMethod,

    /// Maximum size of one archive file on this copy's media
    pub max_archive_size: Option<SizeValue>,

    /// Copy buffer size in units of the device block size
    pub buffer_size: Option<u32>,

    #[serde(default)]
    pub buffer_locked: bool,

    /// Any of the three start thresholds triggers archiving early
    pub start_age: Option<TimeValue>,
    pub start_count: Option<u32>,
    pub start_size: Option<SizeValue>,

    #[serde(default)]
    pub recycler: RecyclerParams,

    /// Volume assignment for this copy
    pub vsn_map: ArchiveVsnMap,
}

impl ArchiveCopy {
    pub fn new(copy_number: u8, media_type: MediaType) -> Self {
        Self {
            copy_number,
            sort_method: SortMethod::default(),
            unarchive_time_reference: UnarchiveTimeReference::default(),
            join_method: JoinMethod::default(),
            offline_copy_method: OfflineCopyMethod::default(),
            max_archive_size: None,
            buffer_size: None,
            buffer_locked: false,
            start_age: None,
            start_count: None,
            start_size: None,
            recycler: RecyclerParams::default(),
            vsn_map: ArchiveVsnMap::new(media_type),
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// A named archiving rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePolicy {
    pub name: String,

    pub policy_type: PolicyType,

    pub description: Option<String>,

    /// Ordered match criteria, evaluated top-down
    #[serde(default)]
    pub criteria: Vec<ArchivePolCriteria>,

    /// Copies keyed by copy number
    #[serde(default)]
    pub copies: BTreeMap<u8, ArchiveCopy>,
}

impl ArchivePolicy {
    pub fn new(name: impl Into<String>, policy_type: PolicyType) -> Self {
        Self {
            name: name.into(),
            policy_type,
            description: None,
            criteria: Vec::new(),
            copies: BTreeMap::new(),
        }
    }

    fn real_copy_count(&self) -> usize {
        self.copies
            .keys()
            .filter(|n| **n <= MAX_REAL_COPIES)
            .count()
    }

    /// Add a copy slot. Real copy numbers are 1..=4 and capped at four;
    /// copy 5 is the allsets pseudo slot and only valid on the allsets
    /// pseudo-policy.
    pub fn add_copy(&mut self, copy_number: u8, media_type: MediaType) -> Result<&mut ArchiveCopy> {
        if copy_number == 0 || copy_number > ALLSETS_COPY_NUMBER {
            return Err(Error::InvalidCopyNumber {
                policy_name: self.name.clone(),
                copy_number,
            });
        }
        if copy_number == ALLSETS_COPY_NUMBER && self.policy_type != PolicyType::AllsetsPseudo {
            return Err(Error::InvalidCopyNumber {
                policy_name: self.name.clone(),
                copy_number,
            });
        }
        if copy_number <= MAX_REAL_COPIES && self.real_copy_count() >= MAX_REAL_COPIES as usize {
            return Err(Error::CopyCapacity {
                policy_name: self.name.clone(),
                limit: MAX_REAL_COPIES,
            });
        }
        if self.copies.contains_key(&copy_number) {
            return Err(Error::InvalidCopyNumber {
                policy_name: self.name.clone(),
                copy_number,
            });
        }

        let copy = ArchiveCopy::new(copy_number, media_type);
        Ok(self.copies.entry(copy_number).or_insert(copy))
    }

    /// Remove a copy slot. A policy must always retain at least one copy.
    pub fn remove_copy(&mut self, copy_number: u8) -> Result<ArchiveCopy> {
        if !self.copies.contains_key(&copy_number) {
            return Err(Error::CopyNotFound {
                policy_name: self.name.clone(),
                copy_number,
            });
        }
        if self.copies.len() == 1 {
            return Err(Error::LastCopy(self.name.clone()));
        }
        Ok(self.copies.remove(&copy_number).expect("checked above"))
    }

    /// Append a user-created criteria. DEFAULT-type policies derive their
    /// criteria instead; see [`ArchivePolicy::synthesize_default_criteria`].
    pub fn add_criteria(&mut self, prop: CriteriaProp) -> Result<&mut ArchivePolCriteria> {
        if !self.policy_type.has_match_criteria() {
            return Err(Error::SynthesizedCriteria(self.name.clone()));
        }

        let index = self.criteria.len();
        self.criteria.push(ArchivePolCriteria {
            index,
            prop,
            is_global: false,
            fs_names: Vec::new(),
            copies: BTreeMap::new(),
        });
        Ok(self.criteria.last_mut().expect("just pushed"))
    }

    /// Ensure the synthesized criteria of a DEFAULT-type policy exists at
    /// index 0 and return it.
    pub fn synthesize_default_criteria(&mut self) -> Result<&mut ArchivePolCriteria> {
        if self.policy_type.has_match_criteria() {
            return Err(Error::Internal(format!(
                "policy '{}' does not synthesize criteria",
                self.name
            )));
        }

        if self.criteria.is_empty() {
            self.criteria.push(ArchivePolCriteria {
                index: 0,
                prop: CriteriaProp {
                    starting_dir: ".".to_string(),
                    ..CriteriaProp::default()
                },
                is_global: false,
                fs_names: Vec::new(),
                copies: BTreeMap::new(),
            });
        }
        Ok(&mut self.criteria[0])
    }

    /// Remove a criteria and close the index gap; the remaining criteria
    /// keep their relative evaluation order.
    pub fn remove_criteria(&mut self, index: usize) -> Result<ArchivePolCriteria> {
        if index >= self.criteria.len() {
            return Err(Error::Internal(format!(
                "policy '{}' has no criteria at index {}",
                self.name, index
            )));
        }
        let removed = self.criteria.remove(index);
        for (i, criteria) in self.criteria.iter_mut().enumerate() {
            criteria.index = i;
        }
        Ok(removed)
    }

    /// Local validation run before any remote call. Collects every
    /// problem; an empty result is the precondition for submitting.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.policy_type.requires_copies() && self.copies.is_empty() {
            errors.push(ValidationError::new(
                "copies",
                format!("policy '{}' must have at least one copy", self.name),
            ));
        }
        if !self.policy_type.requires_copies() && !self.copies.is_empty() {
            errors.push(ValidationError::new(
                "copies",
                format!("no-archive policy '{}' cannot have copies", self.name),
            ));
        }

        for criteria in &self.criteria {
            let label = criteria.label();

            if let (Some(min), Some(max)) = (criteria.prop.min_size, criteria.prop.max_size) {
                if max.bytes() < min.bytes() {
                    errors.push(ValidationError::new(
                        "maxSize",
                        format!("{}: maximum size is below minimum size", label),
                    ));
                }
            }
            for size in [criteria.prop.min_size, criteria.prop.max_size]
                .into_iter()
                .flatten()
            {
                if size.is_overflow() {
                    errors.push(ValidationError::new(
                        "size",
                        format!("{}: {} exceeds the maximum representable size", label, size),
                    ));
                }
            }

            for copy in criteria.copies.values() {
                if copy.archive_age.is_overflow() {
                    errors.push(ValidationError::new(
                        "archiveAge",
                        format!(
                            "{}: copy {} archive age exceeds the representable range",
                            label, copy.copy_number
                        ),
                    ));
                }
                if !self.copies.contains_key(&copy.copy_number) {
                    errors.push(ValidationError::new(
                        "copyNumber",
                        format!(
                            "{}: schedule references copy {} which the policy does not define",
                            label, copy.copy_number
                        ),
                    ));
                }
            }
        }

        errors
    }
}

// =============================================================================
// Duplicate Detection
// =============================================================================

/// Conflict found by [`find_duplicate_criteria`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    /// Label of the conflicting criteria
    pub criteria_label: String,
    /// Policy owning the conflicting criteria
    pub policy_name: String,
}

/// Check a criteria against every policy on the server for a duplicate:
/// identical match properties on an overlapping filesystem set. The
/// archiver treats ambiguous matches as a configuration error, so the
/// strict form of this check must run immediately before commit, against
/// a freshly fetched policy set.
///
/// `strict` additionally compares the per-copy schedules; the lenient
/// form flags any match-property overlap for warning purposes.
/// `exclude` skips one criteria (the pre-edit version of the candidate)
/// identified by owning policy name and index.
pub fn find_duplicate_criteria(
    candidate: &ArchivePolCriteria,
    candidate_fs: &[String],
    strict: bool,
    policies: &[ArchivePolicy],
    exclude: Option<(&str, usize)>,
) -> Option<DuplicateMatch> {
    for policy in policies {
        for existing in &policy.criteria {
            if let Some((policy_name, index)) = exclude {
                if policy.name == policy_name && existing.index == index {
                    continue;
                }
            }

            if !existing.overlaps_filesystems(candidate_fs) {
                continue;
            }
            if !existing.prop.matches_same_files(&candidate.prop) {
                continue;
            }
            if strict && !same_copy_schedules(candidate, existing) {
                continue;
            }

            return Some(DuplicateMatch {
                criteria_label: existing.label(),
                policy_name: policy.name.clone(),
            });
        }
    }
    None
}

fn same_copy_schedules(a: &ArchivePolCriteria, b: &ArchivePolCriteria) -> bool {
    if a.copies.len() != b.copies.len() {
        return false;
    }
    a.copies.iter().all(|(number, copy)| {
        b.copies
            .get(number)
            .is_some_and(|other| copy.same_schedule(other))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{SizeUnit, TimeUnit};
    use assert_matches::assert_matches;

    fn tape() -> MediaType {
        MediaType::new("li")
    }

    fn criteria_on(dir: &str, min_mb: u64, fs: &[&str], class: &str) -> ArchivePolCriteria {
        ArchivePolCriteria {
            index: 0,
            prop: CriteriaProp {
                starting_dir: dir.to_string(),
                min_size: Some(SizeValue::new(min_mb, SizeUnit::Mb)),
                class_name: Some(class.to_string()),
                ..CriteriaProp::default()
            },
            is_global: false,
            fs_names: fs.iter().map(|s| s.to_string()).collect(),
            copies: BTreeMap::new(),
        }
    }

    #[test]
    fn test_add_fifth_real_copy_fails() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        for n in 1..=4 {
            policy.add_copy(n, tape()).unwrap();
        }

        let err = policy.add_copy(3, tape()).unwrap_err();
        assert_matches!(err, Error::CopyCapacity { limit: 4, .. });
    }

    #[test]
    fn test_allsets_slot_only_on_allsets_policy() {
        let mut general = ArchivePolicy::new("custom1", PolicyType::General);
        let err = general.add_copy(ALLSETS_COPY_NUMBER, tape()).unwrap_err();
        assert_matches!(err, Error::InvalidCopyNumber { copy_number: 5, .. });

        let mut allsets = ArchivePolicy::new("allsets", PolicyType::AllsetsPseudo);
        assert!(allsets.add_copy(ALLSETS_COPY_NUMBER, tape()).is_ok());
    }

    #[test]
    fn test_copy_number_bounds() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        assert_matches!(
            policy.add_copy(0, tape()).unwrap_err(),
            Error::InvalidCopyNumber { copy_number: 0, .. }
        );
        assert_matches!(
            policy.add_copy(6, tape()).unwrap_err(),
            Error::InvalidCopyNumber { copy_number: 6, .. }
        );
    }

    #[test]
    fn test_duplicate_copy_number_rejected() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy.add_copy(1, tape()).unwrap();
        assert_matches!(
            policy.add_copy(1, tape()).unwrap_err(),
            Error::InvalidCopyNumber { copy_number: 1, .. }
        );
    }

    #[test]
    fn test_remove_last_copy_fails() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy.add_copy(1, tape()).unwrap();

        let err = policy.remove_copy(1).unwrap_err();
        assert_matches!(err, Error::LastCopy(name) if name == "custom1");
    }

    #[test]
    fn test_remove_copy_succeeds_with_two() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy.add_copy(1, tape()).unwrap();
        policy.add_copy(2, tape()).unwrap();

        let removed = policy.remove_copy(1).unwrap();
        assert_eq!(removed.copy_number, 1);
        assert_eq!(policy.copies.len(), 1);
    }

    #[test]
    fn test_default_policy_rejects_user_criteria() {
        let mut policy = ArchivePolicy::new("fs_default", PolicyType::Default);
        let err = policy.add_criteria(CriteriaProp::default()).unwrap_err();
        assert_matches!(err, Error::SynthesizedCriteria(name) if name == "fs_default");
    }

    #[test]
    fn test_default_policy_synthesizes_at_index_zero() {
        let mut policy = ArchivePolicy::new("fs_default", PolicyType::Default);
        let criteria = policy.synthesize_default_criteria().unwrap();
        assert_eq!(criteria.index, 0);
        assert_eq!(criteria.prop.starting_dir, ".");

        // Idempotent: synthesizing again returns the same criteria.
        policy.synthesize_default_criteria().unwrap();
        assert_eq!(policy.criteria.len(), 1);
    }

    #[test]
    fn test_remove_criteria_reindexes() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy
            .add_criteria(CriteriaProp {
                starting_dir: "a".to_string(),
                ..CriteriaProp::default()
            })
            .unwrap();
        policy
            .add_criteria(CriteriaProp {
                starting_dir: "b".to_string(),
                ..CriteriaProp::default()
            })
            .unwrap();
        policy
            .add_criteria(CriteriaProp {
                starting_dir: "c".to_string(),
                ..CriteriaProp::default()
            })
            .unwrap();

        policy.remove_criteria(1).unwrap();

        assert_eq!(policy.criteria.len(), 2);
        assert_eq!(policy.criteria[0].prop.starting_dir, "a");
        assert_eq!(policy.criteria[1].prop.starting_dir, "c");
        assert_eq!(policy.criteria[1].index, 1);
    }

    #[test]
    fn test_duplicate_criteria_across_policies() {
        let mut custom1 = ArchivePolicy::new("custom1", PolicyType::General);
        custom1.add_copy(1, tape()).unwrap();
        custom1.criteria.push(criteria_on("/data", 1, &["fs1"], "C1"));

        let candidate = criteria_on("/data", 1, &["fs1"], "C2");

        let result = find_duplicate_criteria(
            &candidate,
            &["fs1".to_string()],
            true,
            &[custom1],
            None,
        );
        assert_eq!(
            result,
            Some(DuplicateMatch {
                criteria_label: "C1".to_string(),
                policy_name: "custom1".to_string(),
            })
        );
    }

    #[test]
    fn test_no_duplicate_on_disjoint_filesystems() {
        let mut custom1 = ArchivePolicy::new("custom1", PolicyType::General);
        custom1.criteria.push(criteria_on("/data", 1, &["fs1"], "C1"));

        let candidate = criteria_on("/data", 1, &["fs2"], "C2");

        let result = find_duplicate_criteria(
            &candidate,
            &["fs2".to_string()],
            true,
            &[custom1],
            None,
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_global_criteria_overlaps_everything() {
        let mut global_policy = ArchivePolicy::new("globals", PolicyType::General);
        let mut c = criteria_on("/data", 1, &[], "G1");
        c.is_global = true;
        global_policy.criteria.push(c);

        let candidate = criteria_on("/data", 1, &["fs9"], "C2");
        let result = find_duplicate_criteria(
            &candidate,
            &["fs9".to_string()],
            false,
            &[global_policy],
            None,
        );
        assert!(result.is_some());
    }

    #[test]
    fn test_strict_compares_copy_schedules() {
        let mut custom1 = ArchivePolicy::new("custom1", PolicyType::General);
        let mut existing = criteria_on("/data", 1, &["fs1"], "C1");
        existing.copies.insert(
            1,
            CriteriaCopy {
                copy_number: 1,
                archive_age: TimeValue::new(4, TimeUnit::Hours),
                unarchive_age: None,
                release: ReleaseOption::SpaceRequired,
            },
        );
        custom1.criteria.push(existing);

        let mut candidate = criteria_on("/data", 1, &["fs1"], "C2");
        candidate.copies.insert(
            1,
            CriteriaCopy {
                copy_number: 1,
                archive_age: TimeValue::new(8, TimeUnit::Hours),
                unarchive_age: None,
                release: ReleaseOption::SpaceRequired,
            },
        );

        // Different schedules: strict says no duplicate, lenient still flags.
        let strict = find_duplicate_criteria(
            &candidate,
            &["fs1".to_string()],
            true,
            std::slice::from_ref(&custom1),
            None,
        );
        assert_eq!(strict, None);

        let lenient = find_duplicate_criteria(
            &candidate,
            &["fs1".to_string()],
            false,
            std::slice::from_ref(&custom1),
            None,
        );
        assert!(lenient.is_some());
    }

    #[test]
    fn test_equivalent_schedules_in_different_units_are_duplicates() {
        let mut custom1 = ArchivePolicy::new("custom1", PolicyType::General);
        let mut existing = criteria_on("/data", 1, &["fs1"], "C1");
        existing.copies.insert(
            1,
            CriteriaCopy {
                copy_number: 1,
                archive_age: TimeValue::new(60, TimeUnit::Minutes),
                unarchive_age: None,
                release: ReleaseOption::SpaceRequired,
            },
        );
        custom1.criteria.push(existing);

        let mut candidate = criteria_on("/data", 1, &["fs1"], "C2");
        candidate.copies.insert(
            1,
            CriteriaCopy {
                copy_number: 1,
                archive_age: TimeValue::new(1, TimeUnit::Hours),
                unarchive_age: None,
                release: ReleaseOption::SpaceRequired,
            },
        );

        let strict = find_duplicate_criteria(
            &candidate,
            &["fs1".to_string()],
            true,
            &[custom1],
            None,
        );
        assert!(strict.is_some());
    }

    #[test]
    fn test_exclude_skips_pre_edit_self() {
        let mut custom1 = ArchivePolicy::new("custom1", PolicyType::General);
        custom1.criteria.push(criteria_on("/data", 1, &["fs1"], "C1"));

        let candidate = criteria_on("/data", 1, &["fs1"], "C1");
        let result = find_duplicate_criteria(
            &candidate,
            &["fs1".to_string()],
            true,
            &[custom1],
            Some(("custom1", 0)),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_validate_flags_inverted_size_range() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy.add_copy(1, tape()).unwrap();
        let criteria = policy
            .add_criteria(CriteriaProp {
                starting_dir: "/data".to_string(),
                min_size: Some(SizeValue::new(1, SizeUnit::Gb)),
                max_size: Some(SizeValue::new(10, SizeUnit::Mb)),
                ..CriteriaProp::default()
            })
            .unwrap();
        criteria.copies.insert(
            1,
            CriteriaCopy {
                copy_number: 1,
                archive_age: TimeValue::new(4, TimeUnit::Hours),
                unarchive_age: None,
                release: ReleaseOption::default(),
            },
        );

        let errors = policy.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "maxSize");
    }

    #[test]
    fn test_validate_requires_a_copy() {
        let policy = ArchivePolicy::new("custom1", PolicyType::General);
        let errors = policy.validate();
        assert!(errors.iter().any(|e| e.field == "copies"));
    }

    #[test]
    fn test_validate_no_archive_rejects_copies() {
        let mut policy = ArchivePolicy::new("skip", PolicyType::NoArchive);
        policy
            .copies
            .insert(1, ArchiveCopy::new(1, tape()));

        let errors = policy.validate();
        assert!(errors.iter().any(|e| e.message.contains("no-archive")));
    }

    #[test]
    fn test_validate_orphan_criteria_schedule() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy.add_copy(1, tape()).unwrap();
        let criteria = policy.add_criteria(CriteriaProp::default()).unwrap();
        criteria.copies.insert(
            2,
            CriteriaCopy {
                copy_number: 2,
                archive_age: TimeValue::new(4, TimeUnit::Hours),
                unarchive_age: None,
                release: ReleaseOption::default(),
            },
        );

        let errors = policy.validate();
        assert!(errors.iter().any(|e| e.field == "copyNumber"));
    }

    #[test]
    fn test_policy_serializes_camel_case() {
        let mut policy = ArchivePolicy::new("custom1", PolicyType::General);
        policy.add_copy(1, tape()).unwrap();
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"policyType\":\"general\""));
        assert!(json.contains("\"vsnMap\""));
    }
}
