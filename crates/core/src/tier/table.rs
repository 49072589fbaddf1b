//! Threshold table and the tier step function.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use loyalty_shared::config::TierThresholdConfig;

use super::error::TierTableError;

/// Loyalty tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Entry level.
    Bronze = 0,
    /// Second level.
    Silver = 1,
    /// Third level.
    Gold = 2,
    /// Top level.
    Platinum = 3,
}

impl Tier {
    /// Parse a tier from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "platinum" => Some(Self::Platinum),
            _ => None,
        }
    }

    /// Returns the string representation of the tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierThreshold {
    /// Lowest balance that reaches `tier`.
    pub min_balance: Decimal,
    /// Tier granted from `min_balance` upwards.
    pub tier: Tier,
}

impl TierThreshold {
    /// Creates a threshold row.
    #[must_use]
    pub const fn new(min_balance: Decimal, tier: Tier) -> Self {
        Self { min_balance, tier }
    }
}

/// Ascending threshold table mapping balances to tiers.
///
/// Construction guarantees strictly ascending thresholds and non-decreasing
/// tiers, so `tier_of` is a monotonic step function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    thresholds: Vec<TierThreshold>,
}

impl TierTable {
    /// Builds a validated table.
    ///
    /// # Errors
    ///
    /// Returns `TierTableError` if the table is empty, thresholds are not
    /// strictly ascending, or a tier is lower than the one before it.
    pub fn new(thresholds: Vec<TierThreshold>) -> Result<Self, TierTableError> {
        if thresholds.is_empty() {
            return Err(TierTableError::Empty);
        }

        for pair in thresholds.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            if current.min_balance <= previous.min_balance {
                return Err(TierTableError::NotAscending {
                    previous: previous.min_balance,
                    current: current.min_balance,
                });
            }
            if current.tier < previous.tier {
                return Err(TierTableError::TierDecreases(current.min_balance));
            }
        }

        Ok(Self { thresholds })
    }

    /// Builds a table from configuration rows; no rows means the default table.
    ///
    /// # Errors
    ///
    /// Returns `TierTableError` for unknown tier names or an invalid table.
    pub fn from_config(rows: &[TierThresholdConfig]) -> Result<Self, TierTableError> {
        if rows.is_empty() {
            return Ok(Self::default());
        }

        let thresholds = rows
            .iter()
            .map(|row| {
                Tier::parse(&row.tier)
                    .map(|tier| TierThreshold::new(row.min_balance, tier))
                    .ok_or_else(|| TierTableError::UnknownTier(row.tier.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(thresholds)
    }

    /// Returns the tier whose threshold is the greatest value `<= balance`.
    ///
    /// Balances below the first threshold get the lowest tier.
    #[must_use]
    pub fn tier_of(&self, balance: Decimal) -> Tier {
        match self.thresholds.partition_point(|t| t.min_balance <= balance) {
            0 => self.lowest(),
            n => self.thresholds[n - 1].tier,
        }
    }

    /// Returns the tier of the first row.
    #[must_use]
    pub fn lowest(&self) -> Tier {
        self.thresholds[0].tier
    }

    /// Returns the table rows.
    #[must_use]
    pub fn thresholds(&self) -> &[TierThreshold] {
        &self.thresholds
    }
}

impl Default for TierTable {
    /// Placeholder cutoffs until the business supplies real ones.
    fn default() -> Self {
        Self {
            thresholds: vec![
                TierThreshold::new(Decimal::ZERO, Tier::Bronze),
                TierThreshold::new(Decimal::new(1_000, 0), Tier::Silver),
                TierThreshold::new(Decimal::new(5_000, 0), Tier::Gold),
                TierThreshold::new(Decimal::new(20_000, 0), Tier::Platinum),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_table_steps() {
        let table = TierTable::default();
        assert_eq!(table.tier_of(dec!(0)), Tier::Bronze);
        assert_eq!(table.tier_of(dec!(999.99)), Tier::Bronze);
        assert_eq!(table.tier_of(dec!(1000)), Tier::Silver);
        assert_eq!(table.tier_of(dec!(4999)), Tier::Silver);
        assert_eq!(table.tier_of(dec!(5000)), Tier::Gold);
        assert_eq!(table.tier_of(dec!(20000)), Tier::Platinum);
        assert_eq!(table.tier_of(dec!(1000000)), Tier::Platinum);
    }

    #[test]
    fn test_below_lowest_threshold_is_lowest_tier() {
        let table = TierTable::new(vec![
            TierThreshold::new(dec!(100), Tier::Silver),
            TierThreshold::new(dec!(500), Tier::Gold),
        ])
        .unwrap();

        assert_eq!(table.tier_of(dec!(-30)), Tier::Silver);
        assert_eq!(table.tier_of(dec!(99)), Tier::Silver);
        assert_eq!(table.lowest(), Tier::Silver);
    }

    #[test]
    fn test_rejects_empty_table() {
        assert_eq!(TierTable::new(vec![]), Err(TierTableError::Empty));
    }

    #[test]
    fn test_rejects_unsorted_thresholds() {
        let result = TierTable::new(vec![
            TierThreshold::new(dec!(100), Tier::Bronze),
            TierThreshold::new(dec!(100), Tier::Silver),
        ]);
        assert!(matches!(result, Err(TierTableError::NotAscending { .. })));
    }

    #[test]
    fn test_rejects_decreasing_tiers() {
        let result = TierTable::new(vec![
            TierThreshold::new(dec!(0), Tier::Gold),
            TierThreshold::new(dec!(100), Tier::Silver),
        ]);
        assert_eq!(result, Err(TierTableError::TierDecreases(dec!(100))));
    }

    #[test]
    fn test_from_config() {
        let rows = vec![
            TierThresholdConfig {
                min_balance: dec!(0),
                tier: "bronze".to_string(),
            },
            TierThresholdConfig {
                min_balance: dec!(250),
                tier: "Gold".to_string(),
            },
        ];
        let table = TierTable::from_config(&rows).unwrap();
        assert_eq!(table.tier_of(dec!(300)), Tier::Gold);

        assert_eq!(TierTable::from_config(&[]).unwrap(), TierTable::default());
    }

    #[test]
    fn test_from_config_unknown_tier() {
        let rows = vec![TierThresholdConfig {
            min_balance: dec!(0),
            tier: "diamond".to_string(),
        }];
        assert_eq!(
            TierTable::from_config(&rows),
            Err(TierTableError::UnknownTier("diamond".to_string()))
        );
    }

    #[test]
    fn test_tier_parse_round_trip() {
        for tier in [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum] {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("PLATINUM"), Some(Tier::Platinum));
        assert_eq!(Tier::parse("iron"), None);
    }
}
