//! Property-based tests for the tier step function.
//!
//! - Monotonicity: b1 <= b2 implies tier_of(b1) <= tier_of(b2)
//! - Determinism: the same balance always yields the same tier
//! - Step shape: the result is the tier of the greatest threshold <= balance

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::table::{Tier, TierTable, TierThreshold};

/// Strategy for balances, including negative ones.
fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (-5_000_000i64..5_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::Bronze),
        Just(Tier::Silver),
        Just(Tier::Gold),
        Just(Tier::Platinum),
    ]
}

/// Strategy for arbitrary valid tables: ascending cutoffs, sorted tiers.
fn table_strategy() -> impl Strategy<Value = TierTable> {
    prop::collection::btree_set(-10_000i64..10_000i64, 1..6).prop_flat_map(|cutoffs| {
        let len = cutoffs.len();
        prop::collection::vec(tier_strategy(), len).prop_map(move |mut tiers| {
            tiers.sort();
            let rows = cutoffs
                .iter()
                .zip(tiers)
                .map(|(cutoff, tier)| TierThreshold::new(Decimal::new(*cutoff, 0), tier))
                .collect();
            TierTable::new(rows).unwrap()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Tier never decreases as balance grows.
    #[test]
    fn prop_tier_is_monotonic(
        table in table_strategy(),
        a in balance_strategy(),
        b in balance_strategy(),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(table.tier_of(low) <= table.tier_of(high));
    }

    /// The default table is monotonic too.
    #[test]
    fn prop_default_table_is_monotonic(
        a in balance_strategy(),
        b in balance_strategy(),
    ) {
        let table = TierTable::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(table.tier_of(low) <= table.tier_of(high));
    }

    /// Same input, same output.
    #[test]
    fn prop_tier_is_deterministic(
        table in table_strategy(),
        balance in balance_strategy(),
    ) {
        prop_assert_eq!(table.tier_of(balance), table.tier_of(balance));
    }

    /// The result matches a linear scan for the greatest threshold <= balance.
    #[test]
    fn prop_matches_linear_scan(
        table in table_strategy(),
        balance in balance_strategy(),
    ) {
        let expected = table
            .thresholds()
            .iter()
            .rev()
            .find(|t| t.min_balance <= balance)
            .map_or(table.lowest(), |t| t.tier);
        prop_assert_eq!(table.tier_of(balance), expected);
    }
}
