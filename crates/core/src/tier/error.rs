//! Tier table construction errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while building a `TierTable`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierTableError {
    /// The table has no rows.
    #[error("Tier table must have at least one threshold")]
    Empty,

    /// Thresholds are not strictly ascending.
    #[error("Tier thresholds must be strictly ascending; {current} follows {previous}")]
    NotAscending {
        /// Threshold of the earlier row.
        previous: Decimal,
        /// Threshold of the offending row.
        current: Decimal,
    },

    /// A higher threshold maps to a lower tier.
    #[error("Tier at threshold {0} is lower than the tier before it")]
    TierDecreases(Decimal),

    /// Unknown tier name in configuration.
    #[error("Unknown tier: {0}")]
    UnknownTier(String),
}
