//! Persistence seam for the ledger.
//!
//! The processor only talks to a `LedgerStore`. Implementations must make
//! `compare_and_apply` atomic: the balance update, the version bump, and the
//! transaction record land together or not at all.

use async_trait::async_trait;
use loyalty_shared::types::{CustomerId, PageRequest, PageResponse, TenantId, TransactionTypeId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{Account, AccountKey, LedgerTransaction, Tenant, TransactionType};
use crate::tier::Tier;

/// Store failures that are not ledger outcomes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or rejected the query.
    #[error("backend failure: {0}")]
    Backend(String),

    /// Persisted data could not be mapped back into domain types.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Everything a committed posting changes.
#[derive(Debug, Clone)]
pub struct BalanceCommit {
    /// Account to update.
    pub key: AccountKey,
    /// Version observed when the posting was evaluated.
    pub expected_version: i64,
    /// Balance to write.
    pub new_balance: Decimal,
    /// Tier to write.
    pub new_tier: Tier,
    /// Record to append.
    pub transaction: LedgerTransaction,
}

/// Result of a compare-and-apply attempt.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// Update and record were written.
    Committed {
        /// Account after the commit.
        account: Account,
        /// Record as stored.
        transaction: LedgerTransaction,
    },
    /// Stored version no longer matches; nothing was written.
    VersionConflict,
    /// Another posting with the same idempotency key already committed.
    DuplicateIdempotencyKey(LedgerTransaction),
}

/// Result of opening an account.
#[derive(Debug, Clone)]
pub enum CreateAccountOutcome {
    /// Account was created.
    Created(Account),
    /// An account already exists for the key.
    AlreadyExists(Account),
}

/// Ledger persistence.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Tenant by id, including soft-deleted ones.
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, StoreError>;

    /// Tenants not soft-deleted, oldest first.
    async fn list_tenants(&self, page: PageRequest) -> Result<PageResponse<Tenant>, StoreError>;

    /// Transaction type by id, whatever its tenant.
    async fn find_transaction_type(
        &self,
        transaction_type_id: TransactionTypeId,
    ) -> Result<Option<TransactionType>, StoreError>;

    /// Account for a key.
    async fn find_account(&self, key: &AccountKey) -> Result<Option<Account>, StoreError>;

    /// Inserts `account` unless one already exists for its key.
    async fn create_account(&self, account: Account) -> Result<CreateAccountOutcome, StoreError>;

    /// Committed posting on `key` with this idempotency key.
    async fn find_by_idempotency_key(
        &self,
        key: &AccountKey,
        idempotency_key: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    /// Atomically applies `commit` if the stored version still matches.
    async fn compare_and_apply(&self, commit: BalanceCommit) -> Result<CommitOutcome, StoreError>;

    /// Postings on `key`, newest first.
    async fn list_transactions(
        &self,
        key: &AccountKey,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, StoreError>;

    /// Every account a customer holds across tenants.
    async fn list_customer_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, StoreError>;
}
