//! Size and time unit validation
//!
//! All numeric directives in the archive configuration carry an explicit
//! unit. The managed server stores sizes as bytes and ages as seconds, so
//! every comparison here first normalizes to the base unit. Normalization
//! is done in `u128`: a petabyte-scale entry multiplied by its unit factor
//! does not fit in 64 bits, and the overflow check must be exact.
//!
//! # Components
//!
//! - [`SizeUnit`] / [`TimeUnit`] - the fixed unit ladders
//! - [`is_valid_size`] / [`is_valid_time`] - positive-and-representable checks
//! - [`is_size_overflow`] / [`is_time_overflow`] - ceiling checks
//! - [`is_max_ge_min`] - normalized range comparison (ties are valid)
//! - [`parse_optional_field`] / [`parse_required_field`] - form-field parsing

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[cfg(test)]
mod proptest;

// =============================================================================
// Ceilings
// =============================================================================

/// Largest archive size the managed server accepts: 8,000,000 TB in bytes.
pub const MAX_SIZE_BYTES: u128 = 8_000_000 * (1u128 << 40);

/// Largest time value the managed server accepts, in seconds. The server
/// carries ages in a signed 32-bit field on the wire.
pub const MAX_TIME_SECS: u128 = 2_147_483_646;

// =============================================================================
// Size Units
// =============================================================================

/// Fixed ladder of size units, 1024 apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    B,
    Kb,
    Mb,
    Gb,
    Tb,
    Pb,
}

impl SizeUnit {
    /// Bytes per one of this unit.
    pub fn bytes(&self) -> u128 {
        match self {
            SizeUnit::B => 1,
            SizeUnit::Kb => 1 << 10,
            SizeUnit::Mb => 1 << 20,
            SizeUnit::Gb => 1 << 30,
            SizeUnit::Tb => 1 << 40,
            SizeUnit::Pb => 1 << 50,
        }
    }
}

impl std::fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeUnit::B => write!(f, "bytes"),
            SizeUnit::Kb => write!(f, "KB"),
            SizeUnit::Mb => write!(f, "MB"),
            SizeUnit::Gb => write!(f, "GB"),
            SizeUnit::Tb => write!(f, "TB"),
            SizeUnit::Pb => write!(f, "PB"),
        }
    }
}

// =============================================================================
// Time Units
// =============================================================================

/// Fixed ladder of time units.
///
/// The protocol identifies these by discrete codes 5..9; [`TimeUnit::code`]
/// preserves that numbering for the wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    /// Seconds per one of this unit.
    pub fn seconds(&self) -> u128 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3600,
            TimeUnit::Days => 86_400,
            TimeUnit::Weeks => 604_800,
        }
    }

    /// Protocol code for this unit.
    pub fn code(&self) -> u8 {
        match self {
            TimeUnit::Seconds => 5,
            TimeUnit::Minutes => 6,
            TimeUnit::Hours => 7,
            TimeUnit::Days => 8,
            TimeUnit::Weeks => 9,
        }
    }

    /// Inverse of [`TimeUnit::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            5 => Some(TimeUnit::Seconds),
            6 => Some(TimeUnit::Minutes),
            7 => Some(TimeUnit::Hours),
            8 => Some(TimeUnit::Days),
            9 => Some(TimeUnit::Weeks),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Seconds => write!(f, "seconds"),
            TimeUnit::Minutes => write!(f, "minutes"),
            TimeUnit::Hours => write!(f, "hours"),
            TimeUnit::Days => write!(f, "days"),
            TimeUnit::Weeks => write!(f, "weeks"),
        }
    }
}

// =============================================================================
// Normalization and Overflow
// =============================================================================

/// Normalize a size value to bytes. Exact for every `u64` input.
pub fn normalize_size(value: u64, unit: SizeUnit) -> u128 {
    value as u128 * unit.bytes()
}

/// Normalize a time value to seconds. Exact for every `u64` input.
pub fn normalize_time(value: u64, unit: TimeUnit) -> u128 {
    value as u128 * unit.seconds()
}

/// True if the normalized size exceeds [`MAX_SIZE_BYTES`].
/// Exactly `MAX_SIZE_BYTES` is not an overflow.
pub fn is_size_overflow(value: u64, unit: SizeUnit) -> bool {
    normalize_size(value, unit) > MAX_SIZE_BYTES
}

/// True if the normalized time exceeds [`MAX_TIME_SECS`].
pub fn is_time_overflow(value: u64, unit: TimeUnit) -> bool {
    normalize_time(value, unit) > MAX_TIME_SECS
}

/// A size is valid when it is positive and representable on the server.
pub fn is_valid_size(value: i64, unit: SizeUnit) -> bool {
    if value <= 0 {
        return false;
    }
    !is_size_overflow(value as u64, unit)
}

/// A time is valid when it is positive and representable on the server.
pub fn is_valid_time(value: i64, unit: TimeUnit) -> bool {
    if value <= 0 {
        return false;
    }
    !is_time_overflow(value as u64, unit)
}

/// Compare a (min, max) size pair after normalization. Equal magnitudes
/// count as valid, so 100 MB vs 102400 KB passes.
pub fn is_max_ge_min(
    min_value: u64,
    min_unit: SizeUnit,
    max_value: u64,
    max_unit: SizeUnit,
) -> bool {
    normalize_size(max_value, max_unit) >= normalize_size(min_value, min_unit)
}

// =============================================================================
// Value Carriers
// =============================================================================

/// A size together with the unit it was entered in. The original entry unit
/// is preserved for display; comparisons go through [`SizeValue::bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeValue {
    pub value: u64,
    pub unit: SizeUnit,
}

impl SizeValue {
    pub fn new(value: u64, unit: SizeUnit) -> Self {
        Self { value, unit }
    }

    /// Normalized magnitude in bytes.
    pub fn bytes(&self) -> u128 {
        normalize_size(self.value, self.unit)
    }

    pub fn is_overflow(&self) -> bool {
        self.bytes() > MAX_SIZE_BYTES
    }
}

impl std::fmt::Display for SizeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// A time value together with its entry unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeValue {
    pub value: u64,
    pub unit: TimeUnit,
}

impl TimeValue {
    pub fn new(value: u64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    /// Normalized magnitude in seconds.
    pub fn seconds(&self) -> u128 {
        normalize_time(self.value, self.unit)
    }

    pub fn is_overflow(&self) -> bool {
        self.seconds() > MAX_TIME_SECS
    }
}

impl std::fmt::Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

// =============================================================================
// Form-Field Parsing
// =============================================================================

/// Parse an optional numeric form field. Blank and malformed input both
/// mean "leave unset" - the server substitutes its built-in default.
pub fn parse_optional_field(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<u64>().ok()
}

/// Parse a numeric form field that business rules require a value for
/// (e.g. archive age on a criteria copy). Malformed input is a field-level
/// validation error here, not a silent default.
pub fn parse_required_field(field: &str, raw: &str) -> Result<u64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "a value is required"));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a valid number", trimmed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_ceiling_boundary() {
        // Exactly 8,000,000 TB is representable.
        assert!(!is_size_overflow(8_000_000, SizeUnit::Tb));
        // One more byte is not.
        let max_bytes = 8_000_000u64 * (1 << 40);
        assert!(!is_size_overflow(max_bytes, SizeUnit::B));
        assert!(is_size_overflow(max_bytes + 1, SizeUnit::B));
    }

    #[test]
    fn test_size_overflow_large_units() {
        // Petabyte-scale entries must not wrap in 64-bit math.
        assert!(is_size_overflow(u64::MAX, SizeUnit::Pb));
        assert!(is_size_overflow(8_000_000, SizeUnit::Pb));
        assert!(!is_size_overflow(7812, SizeUnit::Pb)); // 7812 PB < 8,000,000 TB
        assert!(is_size_overflow(7813, SizeUnit::Pb));
    }

    #[test]
    fn test_time_ceiling_boundary() {
        assert!(!is_time_overflow(2_147_483_646, TimeUnit::Seconds));
        assert!(is_time_overflow(2_147_483_647, TimeUnit::Seconds));
        assert!(!is_time_overflow(3550, TimeUnit::Weeks)); // 3550 weeks fits
        assert!(is_time_overflow(3551, TimeUnit::Weeks));
    }

    #[test]
    fn test_valid_rejects_non_positive() {
        assert!(!is_valid_size(0, SizeUnit::Kb));
        assert!(!is_valid_size(-5, SizeUnit::B));
        assert!(is_valid_size(1, SizeUnit::B));
        assert!(!is_valid_time(0, TimeUnit::Hours));
        assert!(!is_valid_time(-1, TimeUnit::Seconds));
        assert!(is_valid_time(1, TimeUnit::Weeks));
    }

    #[test]
    fn test_max_ge_min_ties_are_valid() {
        // 100 MB == 102400 KB after normalization.
        assert!(is_max_ge_min(100, SizeUnit::Mb, 102_400, SizeUnit::Kb));
        assert!(is_max_ge_min(1, SizeUnit::Kb, 1, SizeUnit::Mb));
        assert!(!is_max_ge_min(1, SizeUnit::Gb, 1023, SizeUnit::Mb));
    }

    #[test]
    fn test_time_unit_codes_round_trip() {
        for unit in [
            TimeUnit::Seconds,
            TimeUnit::Minutes,
            TimeUnit::Hours,
            TimeUnit::Days,
            TimeUnit::Weeks,
        ] {
            assert_eq!(TimeUnit::from_code(unit.code()), Some(unit));
        }
        assert_eq!(TimeUnit::from_code(4), None);
        assert_eq!(TimeUnit::from_code(10), None);
    }

    #[test]
    fn test_parse_optional_field() {
        assert_eq!(parse_optional_field(""), None);
        assert_eq!(parse_optional_field("   "), None);
        assert_eq!(parse_optional_field("abc"), None);
        assert_eq!(parse_optional_field("-3"), None);
        assert_eq!(parse_optional_field(" 42 "), Some(42));
    }

    #[test]
    fn test_parse_required_field() {
        assert_eq!(parse_required_field("age", "10"), Ok(10));

        let blank = parse_required_field("age", "  ").unwrap_err();
        assert_eq!(blank.field, "age");

        let garbage = parse_required_field("age", "ten").unwrap_err();
        assert!(garbage.message.contains("ten"));
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(SizeUnit::Pb.to_string(), "PB");
        assert_eq!(TimeUnit::Weeks.to_string(), "weeks");
    }

    #[test]
    fn test_units_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&SizeUnit::Gb).unwrap(), "\"gb\"");
        assert_eq!(
            serde_json::to_string(&TimeUnit::Minutes).unwrap(),
            "\"minutes\""
        );
    }
}
