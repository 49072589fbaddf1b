//! Loyalty tiers derived from account balance.
//!
//! A tier is never independent state: it is always `TierTable::tier_of`
//! applied to the current balance, cached on the account for reads.

pub mod error;
pub mod table;

#[cfg(test)]
mod table_props;

pub use error::TierTableError;
pub use table::{Tier, TierTable, TierThreshold};
