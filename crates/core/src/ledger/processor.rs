//! Transaction processor.
//!
//! Applies postings to accounts through the store's compare-and-apply
//! primitive. A posting that loses a version race is re-evaluated from a
//! fresh read, including the idempotency and balance-policy checks, up to
//! `max_commit_attempts` times.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use loyalty_shared::types::{
    CustomerId, PageRequest, PageResponse, TenantId, TransactionId, TransactionTypeId, UserId,
};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::store::{BalanceCommit, CommitOutcome, CreateAccountOutcome, LedgerStore};
use super::types::{
    Account, AccountKey, LedgerTransaction, PostPurchase, PostTransaction, Tenant, TransactionType,
};
use crate::tier::TierTable;

/// Default bound on compare-and-apply attempts per posting.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Longest idempotency key accepted.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Decimal places a stored points value may carry.
pub const POINTS_SCALE: u32 = 4;

/// Integer digits a stored points value may carry.
pub const POINTS_INTEGER_DIGITS: u32 = 24;

/// Sub-second digits kept on commit timestamps.
const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;

/// Posts transactions and serves ledger reads.
pub struct TransactionProcessor<S: ?Sized> {
    store: Arc<S>,
    tiers: TierTable,
    max_commit_attempts: u32,
}

impl<S: ?Sized> std::fmt::Debug for TransactionProcessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("tiers", &self.tiers)
            .field("max_commit_attempts", &self.max_commit_attempts)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore + ?Sized> TransactionProcessor<S> {
    /// Creates a processor with the default retry bound.
    pub fn new(store: Arc<S>, tiers: TierTable) -> Self {
        Self {
            store,
            tiers,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Overrides the retry bound. Values below one are treated as one.
    #[must_use]
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The tier table applied on every commit.
    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Posts `request.amount` to an existing account.
    ///
    /// A repeated idempotency key returns the originally committed
    /// transaction without touching the balance.
    pub async fn post_transaction(
        &self,
        request: PostTransaction,
    ) -> Result<LedgerTransaction, LedgerError> {
        let PostTransaction {
            key,
            transaction_type_id,
            amount,
            meta,
        } = request;

        if amount.is_zero() {
            return Err(LedgerError::Validation("amount must not be zero".to_string()));
        }
        let amount = storable_points(amount, "amount")?;
        if let Some(idempotency_key) = meta.idempotency_key.as_deref() {
            validate_idempotency_key(idempotency_key)?;
        }

        self.active_tenant(key.tenant_id).await?;
        let transaction_type = self
            .posting_type(key.tenant_id, transaction_type_id)
            .await?;

        if let Some(original) = self.replayed(&key, meta.idempotency_key.as_deref()).await? {
            return Ok(original);
        }

        let effective_delta =
            storable_points(transaction_type.effective_delta(amount)?, "effective delta")?;
        let occurred_at = meta
            .occurred_at
            .map(|t| t.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS));

        for attempt in 1..=self.max_commit_attempts {
            let account = self
                .store
                .find_account(&key)
                .await?
                .ok_or(LedgerError::AccountNotFound(key))?;

            if attempt > 1 {
                if let Some(original) =
                    self.replayed(&key, meta.idempotency_key.as_deref()).await?
                {
                    return Ok(original);
                }
            }

            let new_balance = account
                .balance
                .checked_add(effective_delta)
                .ok_or(LedgerError::AmountOverflow)?;
            let new_balance = storable_points(new_balance, "balance")?;

            if !transaction_type.allow_negative && new_balance < Decimal::ZERO {
                let requested_amount = if effective_delta < Decimal::ZERO {
                    -effective_delta
                } else {
                    Decimal::ZERO
                };
                tracing::warn!(
                    account = %key,
                    balance = %account.balance,
                    %requested_amount,
                    "Posting rejected: insufficient balance"
                );
                return Err(LedgerError::InsufficientBalance {
                    current_balance: account.balance,
                    requested_amount,
                });
            }

            let new_tier = self.tiers.tier_of(new_balance);
            let now = Utc::now().trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS);
            let transaction = LedgerTransaction {
                id: TransactionId::new(),
                account_id: account.id,
                key,
                transaction_type_id,
                amount,
                effective_delta,
                balance_after: new_balance,
                tier_after: new_tier,
                reason: meta.reason.clone(),
                reference_id: meta.reference_id.clone(),
                idempotency_key: meta.idempotency_key.clone(),
                occurred_at: occurred_at.unwrap_or(now),
                created_at: now,
                performed_by: meta.performed_by,
            };

            let commit = BalanceCommit {
                key,
                expected_version: account.version,
                new_balance,
                new_tier,
                transaction,
            };

            match self.store.compare_and_apply(commit).await? {
                CommitOutcome::Committed { transaction, .. } => {
                    tracing::info!(
                        tenant = %key.tenant_id,
                        customer = %key.customer_id,
                        account_type = %key.account_type_id,
                        transaction_id = %transaction.id,
                        %effective_delta,
                        balance_after = %transaction.balance_after,
                        tier = %transaction.tier_after,
                        "Transaction committed"
                    );
                    return Ok(transaction);
                }
                CommitOutcome::DuplicateIdempotencyKey(original) => {
                    tracing::debug!(
                        account = %key,
                        transaction_id = %original.id,
                        "Idempotent replay detected at commit"
                    );
                    return Ok(original);
                }
                CommitOutcome::VersionConflict => {
                    tracing::warn!(
                        account = %key,
                        attempt,
                        max_attempts = self.max_commit_attempts,
                        "Version conflict, retrying"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(LedgerError::ConcurrencyConflict {
            attempts: self.max_commit_attempts,
        })
    }

    /// Converts a purchase into points with the tenant's accrual rule and
    /// posts them.
    pub async fn post_purchase(
        &self,
        request: PostPurchase,
    ) -> Result<LedgerTransaction, LedgerError> {
        let tenant = self.active_tenant(request.key.tenant_id).await?;
        let accrual = tenant
            .accrual
            .ok_or(LedgerError::AccrualNotConfigured(tenant.id))?;

        let points = accrual.points_for(request.currency_amount)?;
        if points.is_zero() {
            return Err(LedgerError::Validation(
                "purchase amount too small to earn points".to_string(),
            ));
        }

        tracing::debug!(
            account = %request.key,
            currency_amount = %request.currency_amount,
            %points,
            "Purchase converted to points"
        );

        self.post_transaction(PostTransaction {
            key: request.key,
            transaction_type_id: request.transaction_type_id,
            amount: points,
            meta: request.meta,
        })
        .await
    }

    /// Opens a zero-balance account at the lowest tier.
    pub async fn open_account(
        &self,
        key: AccountKey,
        performed_by: Option<UserId>,
    ) -> Result<Account, LedgerError> {
        let tenant = self.active_tenant(key.tenant_id).await?;
        let account_type = tenant
            .account_type(key.account_type_id)
            .ok_or(LedgerError::AccountTypeNotFound(key.account_type_id))?;
        if !account_type.is_active {
            return Err(LedgerError::AccountTypeInactive(key.account_type_id));
        }

        let tier = self.tiers.tier_of(Decimal::ZERO);
        let now = Utc::now().trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS);
        let account = Account::open(key, tier, performed_by, now);

        match self.store.create_account(account).await? {
            CreateAccountOutcome::Created(account) => {
                tracing::info!(account = %key, account_id = %account.id, "Account opened");
                Ok(account)
            }
            CreateAccountOutcome::AlreadyExists(_) => Err(LedgerError::AccountAlreadyExists(key)),
        }
    }

    /// Current balance and tier of an account.
    pub async fn get_account(&self, key: &AccountKey) -> Result<Account, LedgerError> {
        self.store
            .find_account(key)
            .await?
            .ok_or(LedgerError::AccountNotFound(*key))
    }

    /// Committed postings on an account, newest first.
    pub async fn list_transactions(
        &self,
        key: &AccountKey,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError> {
        self.get_account(key).await?;
        Ok(self.store.list_transactions(key, page.normalized()).await?)
    }

    /// Accounts a customer holds across tenants.
    pub async fn list_customer_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, LedgerError> {
        Ok(self.store.list_customer_accounts(customer_id).await?)
    }

    /// A tenant that has not been soft-deleted.
    pub async fn get_tenant(&self, tenant_id: TenantId) -> Result<Tenant, LedgerError> {
        self.store
            .find_tenant(tenant_id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or(LedgerError::TenantNotFound(tenant_id))
    }

    /// Tenants that have not been soft-deleted.
    pub async fn list_tenants(&self, page: PageRequest) -> Result<PageResponse<Tenant>, LedgerError> {
        Ok(self.store.list_tenants(page.normalized()).await?)
    }

    async fn active_tenant(&self, tenant_id: TenantId) -> Result<Tenant, LedgerError> {
        let tenant = self.get_tenant(tenant_id).await?;
        if !tenant.is_active() {
            return Err(LedgerError::TenantNotActive(tenant_id));
        }
        Ok(tenant)
    }

    async fn posting_type(
        &self,
        tenant_id: TenantId,
        transaction_type_id: TransactionTypeId,
    ) -> Result<TransactionType, LedgerError> {
        self.store
            .find_transaction_type(transaction_type_id)
            .await?
            .filter(|t| t.tenant_id == tenant_id && t.is_active)
            .ok_or(LedgerError::TransactionTypeNotFound(transaction_type_id))
    }

    async fn replayed(
        &self,
        key: &AccountKey,
        idempotency_key: Option<&str>,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        let Some(idempotency_key) = idempotency_key else {
            return Ok(None);
        };

        let original = self
            .store
            .find_by_idempotency_key(key, idempotency_key)
            .await?;
        if let Some(original) = &original {
            tracing::debug!(
                account = %key,
                transaction_id = %original.id,
                "Idempotent replay"
            );
        }
        Ok(original)
    }
}

fn validate_idempotency_key(key: &str) -> Result<(), LedgerError> {
    if key.trim().is_empty() {
        return Err(LedgerError::Validation(
            "idempotency key must not be blank".to_string(),
        ));
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(LedgerError::Validation(format!(
            "idempotency key longer than {MAX_IDEMPOTENCY_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

/// Normalizes `value` and checks it fits a `NUMERIC(28, 4)` column.
fn storable_points(value: Decimal, field: &str) -> Result<Decimal, LedgerError> {
    let value = value.normalize();
    if value.scale() > POINTS_SCALE {
        return Err(LedgerError::Validation(format!(
            "{field} must have at most {POINTS_SCALE} decimal places"
        )));
    }
    let limit = Decimal::from_i128_with_scale(10_i128.pow(POINTS_INTEGER_DIGITS), 0);
    if value.abs() >= limit {
        return Err(LedgerError::AmountOverflow);
    }
    Ok(value)
}
