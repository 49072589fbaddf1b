//! In-process `LedgerStore` backed by `DashMap`.
//!
//! Each account lives in one map entry together with its postings and its
//! idempotency index, so compare-and-apply runs under a single entry lock.
//! Used by tests and by single-node deployments that do not need
//! durability.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use loyalty_shared::types::{CustomerId, PageRequest, PageResponse, TenantId, TransactionTypeId};

use super::store::{BalanceCommit, CommitOutcome, CreateAccountOutcome, LedgerStore, StoreError};
use super::types::{Account, AccountKey, LedgerTransaction, Tenant, TransactionType};

#[derive(Debug)]
struct AccountLedger {
    account: Account,
    transactions: Vec<LedgerTransaction>,
    idempotency: HashMap<String, usize>,
}

impl AccountLedger {
    fn new(account: Account) -> Self {
        Self {
            account,
            transactions: Vec::new(),
            idempotency: HashMap::new(),
        }
    }
}

/// Ledger store kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tenants: DashMap<TenantId, Tenant>,
    transaction_types: DashMap<TransactionTypeId, TransactionType>,
    ledgers: DashMap<AccountKey, AccountLedger>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tenant.
    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.id, tenant);
    }

    /// Inserts or replaces a transaction type.
    pub fn insert_transaction_type(&self, transaction_type: TransactionType) {
        self.transaction_types
            .insert(transaction_type.id, transaction_type);
    }

    /// Number of postings recorded for `key`.
    #[must_use]
    pub fn transaction_count(&self, key: &AccountKey) -> usize {
        self.ledgers
            .get(key)
            .map_or(0, |ledger| ledger.transactions.len())
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> PageResponse<T> {
    let page = page.normalized();
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let data = items.iter().skip(offset).take(limit).cloned().collect();

    PageResponse::new(data, page, items.len() as u64)
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.tenants.get(&tenant_id).map(|t| t.clone()))
    }

    async fn list_tenants(&self, page: PageRequest) -> Result<PageResponse<Tenant>, StoreError> {
        let mut tenants: Vec<Tenant> = self
            .tenants
            .iter()
            .filter(|t| !t.is_deleted)
            .map(|t| t.clone())
            .collect();
        tenants.sort_by_key(|t| (t.created_at, t.id.into_inner()));

        Ok(paginate(&tenants, page))
    }

    async fn find_transaction_type(
        &self,
        transaction_type_id: TransactionTypeId,
    ) -> Result<Option<TransactionType>, StoreError> {
        Ok(self
            .transaction_types
            .get(&transaction_type_id)
            .map(|t| t.clone()))
    }

    async fn find_account(&self, key: &AccountKey) -> Result<Option<Account>, StoreError> {
        Ok(self.ledgers.get(key).map(|l| l.account.clone()))
    }

    async fn create_account(&self, account: Account) -> Result<CreateAccountOutcome, StoreError> {
        match self.ledgers.entry(account.key) {
            Entry::Occupied(existing) => Ok(CreateAccountOutcome::AlreadyExists(
                existing.get().account.clone(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(AccountLedger::new(account.clone()));
                Ok(CreateAccountOutcome::Created(account))
            }
        }
    }

    async fn find_by_idempotency_key(
        &self,
        key: &AccountKey,
        idempotency_key: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        Ok(self.ledgers.get(key).and_then(|ledger| {
            ledger
                .idempotency
                .get(idempotency_key)
                .map(|&index| ledger.transactions[index].clone())
        }))
    }

    async fn compare_and_apply(&self, commit: BalanceCommit) -> Result<CommitOutcome, StoreError> {
        let Some(mut ledger) = self.ledgers.get_mut(&commit.key) else {
            return Err(StoreError::Corrupt(format!(
                "commit against missing account {}",
                commit.key
            )));
        };

        if let Some(idempotency_key) = commit.transaction.idempotency_key.as_deref() {
            if let Some(&index) = ledger.idempotency.get(idempotency_key) {
                return Ok(CommitOutcome::DuplicateIdempotencyKey(
                    ledger.transactions[index].clone(),
                ));
            }
        }

        if ledger.account.version != commit.expected_version {
            return Ok(CommitOutcome::VersionConflict);
        }

        let transaction = commit.transaction;
        ledger.account.balance = commit.new_balance;
        ledger.account.tier = commit.new_tier;
        ledger.account.version += 1;
        ledger.account.updated_at = transaction.created_at;
        ledger.account.performed_by = transaction.performed_by;

        let index = ledger.transactions.len();
        if let Some(idempotency_key) = transaction.idempotency_key.clone() {
            ledger.idempotency.insert(idempotency_key, index);
        }
        ledger.transactions.push(transaction.clone());

        Ok(CommitOutcome::Committed {
            account: ledger.account.clone(),
            transaction,
        })
    }

    async fn list_transactions(
        &self,
        key: &AccountKey,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, StoreError> {
        let newest_first: Vec<LedgerTransaction> = self
            .ledgers
            .get(key)
            .map(|ledger| ledger.transactions.iter().rev().cloned().collect())
            .unwrap_or_default();

        Ok(paginate(&newest_first, page))
    }

    async fn list_customer_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .ledgers
            .iter()
            .filter(|entry| entry.key().customer_id == customer_id)
            .map(|entry| entry.account.clone())
            .collect();
        accounts.sort_by_key(|a| (a.created_at, a.id.into_inner()));

        Ok(accounts)
    }
}
