//! Data-Class Attribute Model
//!
//! A named data class bundles retention and integrity attributes that
//! attach 1:1 to an archive criteria when the system manages data classes.
//! Edits arrive as a loose bag of form fields;
//! [`DataClassAttributes::apply_edits`] validates the whole bag, applies
//! every field that passed, and returns the collected failures. A field
//! that fails validation keeps its previously stored value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::units::{TimeUnit, TimeValue};

/// Date format accepted for absolute expiration fields.
pub const EXPIRATION_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Attribute Types
// =============================================================================

/// When class members expire. Absolute date and relative duration are
/// mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Expiration {
    /// Expire on a fixed calendar date
    Absolute { date: NaiveDate },
    /// Expire a duration after creation
    Relative { duration: TimeValue },
}

/// Scope of the periodic integrity audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditScope {
    #[default]
    None,
    /// Audit disk copies only
    Disk,
    /// Audit all copies
    All,
}

/// Attribute bag attached to one archive criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataClassAttributes {
    /// Apply WORM protection automatically on ingest
    #[serde(default)]
    pub auto_worm: bool,

    /// Expiration policy; `None` means members never expire
    pub expiration: Option<Expiration>,

    /// Delete members automatically once expired
    #[serde(default)]
    pub auto_delete: bool,

    /// Deduplicate members
    #[serde(default)]
    pub dedup: bool,

    /// Bit-by-bit comparison during dedup; a sub-mode of `dedup`,
    /// never set on its own
    #[serde(default)]
    pub bit_by_bit: bool,

    /// Periodic audit scope
    #[serde(default)]
    pub periodic_audit: AuditScope,

    /// Audit period; required whenever `periodic_audit` is not `None`
    pub audit_period: Option<TimeValue>,

    /// Log audit events
    #[serde(default)]
    pub log_audit: bool,

    /// Log member deletions
    #[serde(default)]
    pub log_deletion: bool,

    /// Log expirations
    #[serde(default)]
    pub log_expiration: bool,

    /// Log integrity-check results
    #[serde(default)]
    pub log_integrity: bool,
}

// =============================================================================
// Edits
// =============================================================================

/// Expiration choice submitted on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationChoice {
    Never,
    Date,
    Duration,
}

/// One edit batch for a data class. `None` fields were not submitted and
/// keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct DataClassEdits {
    pub auto_worm: Option<bool>,

    pub expiration_choice: Option<ExpirationChoice>,
    /// Raw date text, consulted when the choice is `Date`
    pub expiration_date: Option<String>,
    /// Raw duration text, consulted when the choice is `Duration`
    pub duration_value: Option<String>,
    pub duration_unit: Option<TimeUnit>,

    pub auto_delete: Option<bool>,
    pub dedup: Option<bool>,
    pub bit_by_bit: Option<bool>,

    pub periodic_audit: Option<AuditScope>,
    pub audit_period_value: Option<String>,
    pub audit_period_unit: Option<TimeUnit>,

    pub log_audit: Option<bool>,
    pub log_deletion: Option<bool>,
    pub log_expiration: Option<bool>,
    pub log_integrity: Option<bool>,
}

impl DataClassAttributes {
    /// Apply an edit batch. Every field is validated; failures are
    /// collected rather than short-circuiting, and a failed field leaves
    /// the stored value untouched.
    pub fn apply_edits(&mut self, edits: &DataClassEdits) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(choice) = edits.expiration_choice {
            match self.parse_expiration(choice, edits) {
                Ok(expiration) => self.expiration = expiration,
                Err(e) => errors.push(e),
            }
        }

        if let Some(scope) = edits.periodic_audit {
            match parse_audit_period(scope, edits, self.audit_period) {
                Ok(period) => {
                    self.periodic_audit = scope;
                    self.audit_period = period;
                }
                Err(e) => errors.push(e),
            }
        }

        if let Some(v) = edits.auto_worm {
            self.auto_worm = v;
        }
        if let Some(v) = edits.auto_delete {
            self.auto_delete = v;
        }
        if let Some(v) = edits.dedup {
            self.dedup = v;
        }
        if let Some(v) = edits.bit_by_bit {
            self.bit_by_bit = v;
        }
        // Bit-by-bit is a sub-mode of dedup, not an independent attribute.
        if !self.dedup {
            self.bit_by_bit = false;
        }

        if let Some(v) = edits.log_audit {
            self.log_audit = v;
        }
        if let Some(v) = edits.log_deletion {
            self.log_deletion = v;
        }
        if let Some(v) = edits.log_expiration {
            self.log_expiration = v;
        }
        if let Some(v) = edits.log_integrity {
            self.log_integrity = v;
        }

        errors
    }

    fn parse_expiration(
        &self,
        choice: ExpirationChoice,
        edits: &DataClassEdits,
    ) -> Result<Option<Expiration>, ValidationError> {
        match choice {
            ExpirationChoice::Never => Ok(None),
            ExpirationChoice::Date => {
                let raw = edits.expiration_date.as_deref().unwrap_or("").trim();
                if raw.is_empty() {
                    return Err(ValidationError::new(
                        "expirationDate",
                        "an expiration date is required",
                    ));
                }
                let date = NaiveDate::parse_from_str(raw, EXPIRATION_DATE_FORMAT).map_err(|_| {
                    ValidationError::new(
                        "expirationDate",
                        format!("'{}' is not a valid date", raw),
                    )
                })?;
                Ok(Some(Expiration::Absolute { date }))
            }
            ExpirationChoice::Duration => {
                let raw = edits.duration_value.as_deref().unwrap_or("").trim();
                let value = raw.parse::<u64>().ok().filter(|v| *v > 0).ok_or_else(|| {
                    ValidationError::new(
                        "expirationDuration",
                        format!("'{}' is not a positive number", raw),
                    )
                })?;
                let unit = edits.duration_unit.ok_or_else(|| {
                    ValidationError::new("expirationDuration", "a duration unit is required")
                })?;
                let duration = TimeValue::new(value, unit);
                if duration.is_overflow() {
                    return Err(ValidationError::new(
                        "expirationDuration",
                        format!("{} exceeds the maximum representable time", duration),
                    ));
                }
                Ok(Some(Expiration::Relative { duration }))
            }
        }
    }
}

/// A non-none audit scope requires a positive period; scope `None`
/// blanks the period.
fn parse_audit_period(
    scope: AuditScope,
    edits: &DataClassEdits,
    existing: Option<TimeValue>,
) -> Result<Option<TimeValue>, ValidationError> {
    if scope == AuditScope::None {
        return Ok(None);
    }

    match (&edits.audit_period_value, edits.audit_period_unit) {
        (Some(raw), Some(unit)) => {
            let value = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    ValidationError::new(
                        "auditPeriod",
                        format!("'{}' is not a positive number", raw.trim()),
                    )
                })?;
            let period = TimeValue::new(value, unit);
            if period.is_overflow() {
                return Err(ValidationError::new(
                    "auditPeriod",
                    format!("{} exceeds the maximum representable time", period),
                ));
            }
            Ok(Some(period))
        }
        // No period submitted: the stored one must already be set.
        _ => existing.map(Some).ok_or_else(|| {
            ValidationError::new("auditPeriod", "a period is required for periodic audits")
        }),
    }
}
