//! Directive Store
//!
//! Process-wide archiver settings and the per-media-type / per-library
//! tunables that hang off them. The server hands the whole
//! [`GlobalArchiveDirective`] over in one fetch; edits are applied in
//! memory and the whole structure is pushed back in one call, and only
//! when something actually changed.
//!
//! Directives are keyed by media type or library name in explicit maps.
//! An unset field means "use the server's built-in default" and is
//! modeled as `None`, never as a sentinel value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ports::MediaType;
use crate::error::ValidationError;
use crate::units::{self, SizeUnit, TimeValue};

// =============================================================================
// Directive Types
// =============================================================================

/// How the archiver discovers candidate files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanMethod {
    /// Omit the directive; the server applies its default.
    #[default]
    NotSet,
    /// Traditional full scan
    Scan,
    /// Scan only directories
    ScanDirs,
    /// Scan only inodes
    ScanInodes,
    /// Continuous archiving, no scan pass
    NoScan,
}

/// A buffer-style size directive for one media type.
///
/// The same shape backs four distinct directive families (archive buffer,
/// stage buffer, maximum archive file size, minimum overflow size); which
/// family an instance belongs to is determined by the map holding it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferDirective {
    /// Size in bytes; `None` means the directive is unset
    pub size_bytes: Option<u64>,

    /// Lock the buffer in memory (meaningful for the buffer families only)
    #[serde(default)]
    pub locked: bool,
}

/// Drive-count directive for one library. Archive and stage keep
/// independent directives over the same library set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveDirective {
    /// Maximum drives to use; `None` means the directive is unset
    pub count: Option<u32>,
}

/// Process-wide archiver settings, fetched and pushed whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalArchiveDirective {
    /// Interval between scan passes
    pub scan_interval: Option<TimeValue>,

    /// Candidate discovery method
    #[serde(default)]
    pub scan_method: ScanMethod,

    /// Archiver log file path
    pub log_path: Option<String>,

    /// Event notification script path
    pub notify_script: Option<String>,

    /// Archive filesystem metadata as well as file data
    #[serde(default)]
    pub archive_meta: bool,

    /// Maximum archive file size, per media type
    #[serde(default)]
    pub max_file_size: BTreeMap<MediaType, BufferDirective>,

    /// Minimum size for overflowing to a second volume, per media type
    #[serde(default)]
    pub min_overflow_size: BTreeMap<MediaType, BufferDirective>,

    /// Archive copy buffer, per media type
    #[serde(default)]
    pub archive_buffers: BTreeMap<MediaType, BufferDirective>,

    /// Stage buffer, per media type
    #[serde(default)]
    pub stage_buffers: BTreeMap<MediaType, BufferDirective>,

    /// Archive drive limits, per library
    #[serde(default)]
    pub archive_drives: BTreeMap<String, DriveDirective>,

    /// Stage drive limits, per library
    #[serde(default)]
    pub stage_drives: BTreeMap<String, DriveDirective>,
}

/// Which buffer-directive family an edit batch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDirectiveKind {
    ArchiveMaxSize,
    OverflowMinSize,
    ArchiveBuffer,
    StageBuffer,
}

/// Which drive-directive family an edit batch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveDirectiveKind {
    Archive,
    Stage,
}

// =============================================================================
// Field Edits
// =============================================================================

/// One submitted size field. `value` is the raw form text; blank keeps the
/// existing directive untouched.
#[derive(Debug, Clone)]
pub struct SizeEdit {
    pub media_type: MediaType,
    pub value: String,
    pub unit: SizeUnit,
}

/// One submitted buffer field: size plus the independent lock toggle.
#[derive(Debug, Clone)]
pub struct BufferEdit {
    pub media_type: MediaType,
    pub value: String,
    pub unit: SizeUnit,
    /// `None` leaves the lock flag untouched
    pub locked: Option<bool>,
}

/// One submitted drive-count field.
#[derive(Debug, Clone)]
pub struct DriveEdit {
    pub library: String,
    pub count: String,
}

/// Result of applying an edit batch.
#[derive(Debug, Default)]
pub struct EditOutcome {
    /// True if any directive now differs from its pre-edit value. The
    /// caller batches this into a single "issue the remote update at all?"
    /// decision.
    pub changed: bool,

    /// Field-level failures; successfully parsed fields are still applied
    pub errors: Vec<ValidationError>,
}

impl EditOutcome {
    fn merge(&mut self, other: EditOutcome) {
        self.changed |= other.changed;
        self.errors.extend(other.errors);
    }
}

// =============================================================================
// Edit Application
// =============================================================================

impl GlobalArchiveDirective {
    fn size_map_mut(&mut self, kind: SizeDirectiveKind) -> &mut BTreeMap<MediaType, BufferDirective> {
        match kind {
            SizeDirectiveKind::ArchiveMaxSize => &mut self.max_file_size,
            SizeDirectiveKind::OverflowMinSize => &mut self.min_overflow_size,
            SizeDirectiveKind::ArchiveBuffer => &mut self.archive_buffers,
            SizeDirectiveKind::StageBuffer => &mut self.stage_buffers,
        }
    }

    fn drive_map_mut(&mut self, kind: DriveDirectiveKind) -> &mut BTreeMap<String, DriveDirective> {
        match kind {
            DriveDirectiveKind::Archive => &mut self.archive_drives,
            DriveDirectiveKind::Stage => &mut self.stage_drives,
        }
    }

    /// Apply a batch of size edits to one directive family. Blank fields
    /// are no-ops; a field that does not parse as a number unsets the
    /// directive. A media type absent from the map is skipped - the media
    /// list is refetched each display cycle and can drift.
    pub fn apply_size_edits(&mut self, kind: SizeDirectiveKind, edits: &[SizeEdit]) -> EditOutcome {
        let mut outcome = EditOutcome::default();
        let map = self.size_map_mut(kind);

        for edit in edits {
            let Some(directive) = map.get_mut(&edit.media_type) else {
                continue;
            };
            outcome.merge(apply_size_to(directive, &edit.media_type, &edit.value, edit.unit));
        }

        outcome
    }

    /// Apply a batch of buffer edits: size handling as in
    /// [`GlobalArchiveDirective::apply_size_edits`], plus the lock toggle,
    /// which changes independently of the size.
    pub fn apply_buffer_edits(
        &mut self,
        kind: SizeDirectiveKind,
        edits: &[BufferEdit],
    ) -> EditOutcome {
        let mut outcome = EditOutcome::default();
        let map = self.size_map_mut(kind);

        for edit in edits {
            let Some(directive) = map.get_mut(&edit.media_type) else {
                continue;
            };
            outcome.merge(apply_size_to(directive, &edit.media_type, &edit.value, edit.unit));

            if let Some(locked) = edit.locked {
                if directive.locked != locked {
                    directive.locked = locked;
                    outcome.changed = true;
                }
            }
        }

        outcome
    }

    /// Apply a batch of drive-count edits. Counts must be non-negative
    /// integers; an unknown library name is silently skipped.
    pub fn apply_drive_edits(
        &mut self,
        kind: DriveDirectiveKind,
        edits: &[DriveEdit],
    ) -> EditOutcome {
        let mut outcome = EditOutcome::default();
        let map = self.drive_map_mut(kind);

        for edit in edits {
            let Some(directive) = map.get_mut(&edit.library) else {
                continue;
            };

            let trimmed = edit.count.trim();
            if trimmed.is_empty() {
                continue;
            }

            let new_count = match trimmed.parse::<u32>() {
                Ok(n) => Some(n),
                // Unparsable means unset, not a hard error.
                Err(_) => None,
            };

            if directive.count != new_count {
                directive.count = new_count;
                outcome.changed = true;
            }
        }

        outcome
    }
}

/// Apply one size field to a directive. Changed is flagged only when the
/// stored byte count actually differs after unit normalization.
fn apply_size_to(
    directive: &mut BufferDirective,
    media_type: &MediaType,
    raw: &str,
    unit: SizeUnit,
) -> EditOutcome {
    let mut outcome = EditOutcome::default();

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return outcome;
    }

    let new_size = match trimmed.parse::<u64>() {
        Ok(value) => {
            if units::is_size_overflow(value, unit) {
                outcome.errors.push(ValidationError::new(
                    format!("size[{}]", media_type),
                    format!("{} {} exceeds the maximum representable size", value, unit),
                ));
                return outcome;
            }
            // Safe: an in-range size fits in u64 by construction.
            Some(units::normalize_size(value, unit) as u64)
        }
        // Unparsable means unset, not a hard error.
        Err(_) => None,
    };

    if directive.size_bytes != new_size {
        directive.size_bytes = new_size;
        outcome.changed = true;
    }

    outcome
}
