//! Property-Based Tests for Unit Validation
//!
//! Uses proptest to verify the normalization and overflow checks across the
//! whole input space, where hand-picked boundary tests can miss a unit.
//!
//! # Test Properties
//!
//! 1. **Ceiling Consistency**: overflow iff normalized magnitude exceeds the
//!    fixed ceiling, for every unit
//! 2. **Monotonicity**: growing a value never clears an overflow
//! 3. **Comparison Symmetry**: is_max_ge_min agrees with normalized ordering

#![cfg(test)]

use proptest::prelude::*;

use super::{
    is_max_ge_min, is_size_overflow, is_time_overflow, is_valid_size, normalize_size,
    normalize_time, SizeUnit, TimeUnit, MAX_SIZE_BYTES, MAX_TIME_SECS,
};

// =============================================================================
// Property Strategies
// =============================================================================

fn size_unit_strategy() -> impl Strategy<Value = SizeUnit> {
    prop_oneof![
        Just(SizeUnit::B),
        Just(SizeUnit::Kb),
        Just(SizeUnit::Mb),
        Just(SizeUnit::Gb),
        Just(SizeUnit::Tb),
        Just(SizeUnit::Pb),
    ]
}

fn time_unit_strategy() -> impl Strategy<Value = TimeUnit> {
    prop_oneof![
        Just(TimeUnit::Seconds),
        Just(TimeUnit::Minutes),
        Just(TimeUnit::Hours),
        Just(TimeUnit::Days),
        Just(TimeUnit::Weeks),
    ]
}

// =============================================================================
// Ceiling Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn size_overflow_matches_normalized_ceiling(
        value in 0u64..=u64::MAX,
        unit in size_unit_strategy(),
    ) {
        let normalized = normalize_size(value, unit);
        prop_assert_eq!(is_size_overflow(value, unit), normalized > MAX_SIZE_BYTES);
    }

    #[test]
    fn time_overflow_matches_normalized_ceiling(
        value in 0u64..=u64::MAX,
        unit in time_unit_strategy(),
    ) {
        let normalized = normalize_time(value, unit);
        prop_assert_eq!(is_time_overflow(value, unit), normalized > MAX_TIME_SECS);
    }

    #[test]
    fn size_overflow_is_monotonic(
        value in 0u64..u64::MAX,
        unit in size_unit_strategy(),
    ) {
        if is_size_overflow(value, unit) {
            prop_assert!(is_size_overflow(value + 1, unit));
        }
    }

    #[test]
    fn valid_size_implies_positive_and_representable(
        value in any::<i64>(),
        unit in size_unit_strategy(),
    ) {
        if is_valid_size(value, unit) {
            prop_assert!(value > 0);
            prop_assert!(normalize_size(value as u64, unit) <= MAX_SIZE_BYTES);
        }
    }
}

// =============================================================================
// Comparison Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn max_ge_min_agrees_with_normalization(
        min_value in 0u64..=1 << 44,
        min_unit in size_unit_strategy(),
        max_value in 0u64..=1 << 44,
        max_unit in size_unit_strategy(),
    ) {
        let expected =
            normalize_size(max_value, max_unit) >= normalize_size(min_value, min_unit);
        prop_assert_eq!(
            is_max_ge_min(min_value, min_unit, max_value, max_unit),
            expected
        );
    }

    #[test]
    fn max_ge_min_is_reflexive(
        value in 0u64..=1 << 44,
        unit in size_unit_strategy(),
    ) {
        prop_assert!(is_max_ge_min(value, unit, value, unit));
    }
}
