//! Points ledger.
//!
//! This module implements the core ledger functionality:
//! - Domain types for tenants, accounts, and postings
//! - Error types for ledger operations
//! - The `LedgerStore` persistence seam and its compare-and-apply primitive
//! - An in-memory store
//! - The transaction processor with idempotency and balance policy

pub mod error;
pub mod memory;
pub mod processor;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod processor_props;

pub use error::LedgerError;
pub use memory::InMemoryLedgerStore;
pub use processor::{DEFAULT_MAX_COMMIT_ATTEMPTS, TransactionProcessor};
pub use store::{BalanceCommit, CommitOutcome, CreateAccountOutcome, LedgerStore, StoreError};
pub use types::{
    Account, AccountKey, AccountType, AccrualSetting, LedgerTransaction, PostPurchase,
    PostTransaction, PostingMeta, Tenant, TenantStatus, TransactionType,
};
