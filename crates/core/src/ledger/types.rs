//! Ledger domain types.
//!
//! Records here mirror what the store persists; request types carry what a
//! caller may supply when posting.

use chrono::{DateTime, Utc};
use loyalty_shared::types::{
    AccountId, AccountTypeId, CustomerId, TenantId, TransactionId, TransactionTypeId, UserId,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use crate::tier::Tier;

/// Tenant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// Tenant can post and open accounts.
    Active,
    /// Tenant disabled by its owner.
    Inactive,
    /// Tenant disabled by the platform.
    Suspended,
}

impl TenantStatus {
    /// Parse a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

/// How purchases turn into points for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualSetting {
    /// Points earned per unit of currency spent.
    pub points_per_currency_unit: Decimal,
    /// Days until earned points expire, if they do.
    pub expiry_days: Option<u32>,
}

impl AccrualSetting {
    /// Whole points earned for `currency_amount`, rounded down.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for a non-positive amount and
    /// `LedgerError::AmountOverflow` if the product does not fit.
    pub fn points_for(&self, currency_amount: Decimal) -> Result<Decimal, LedgerError> {
        if currency_amount <= Decimal::ZERO {
            return Err(LedgerError::Validation(
                "purchase amount must be positive".to_string(),
            ));
        }

        let points = currency_amount
            .checked_mul(self.points_per_currency_unit)
            .ok_or(LedgerError::AmountOverflow)?;

        Ok(points.round_dp_with_strategy(0, RoundingStrategy::ToZero))
    }
}

/// A tenant-defined kind of balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountType {
    /// Account type ID.
    pub id: AccountTypeId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Whether new accounts may be opened with this type.
    pub is_active: bool,
}

/// A business customer of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant ID.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: TenantStatus,
    /// Accrual rule, if the tenant converts purchases into points.
    pub accrual: Option<AccrualSetting>,
    /// Account types defined by the tenant, in definition order.
    pub account_types: Vec<AccountType>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Onboarding time.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Whether the tenant may post and open accounts.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_deleted && self.status == TenantStatus::Active
    }

    /// Looks up one of the tenant's account types.
    #[must_use]
    pub fn account_type(&self, id: AccountTypeId) -> Option<&AccountType> {
        self.account_types.iter().find(|t| t.id == id)
    }
}

/// Catalog entry describing how a posting affects a balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionType {
    /// Transaction type ID.
    pub id: TransactionTypeId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Stable machine name, e.g. `"purchase"`.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Factor applied to the posted amount; never negative.
    pub multiplier: Decimal,
    /// Whether postings of this type may leave the balance below zero.
    pub allow_negative: bool,
    /// Inactive types cannot be posted.
    pub is_active: bool,
}

impl TransactionType {
    /// `amount * multiplier`, keeping the sign of `amount`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidMultiplier` for a negative multiplier and
    /// `LedgerError::AmountOverflow` if the product does not fit.
    pub fn effective_delta(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if self.multiplier.is_sign_negative() && !self.multiplier.is_zero() {
            return Err(LedgerError::InvalidMultiplier(self.id));
        }

        amount
            .checked_mul(self.multiplier)
            .ok_or(LedgerError::AmountOverflow)
    }
}

/// Identifies an account: one per (tenant, customer, account type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Customer.
    pub customer_id: CustomerId,
    /// Account type.
    pub account_type_id: AccountTypeId,
}

impl AccountKey {
    /// Creates an account key.
    #[must_use]
    pub const fn new(
        tenant_id: TenantId,
        customer_id: CustomerId,
        account_type_id: AccountTypeId,
    ) -> Self {
        Self {
            tenant_id,
            customer_id,
            account_type_id,
        }
    }
}

impl std::fmt::Display for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.customer_id, self.account_type_id
        )
    }
}

/// A customer's balance for one tenant and account type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning key.
    pub key: AccountKey,
    /// Sum of every committed effective delta.
    pub balance: Decimal,
    /// Cached `tier_of(balance)`.
    pub tier: Tier,
    /// Concurrency token; bumped on every committed posting.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last committed posting.
    pub updated_at: DateTime<Utc>,
    /// User behind the last change.
    pub performed_by: Option<UserId>,
}

impl Account {
    /// A fresh zero-balance account.
    #[must_use]
    pub fn open(key: AccountKey, tier: Tier, performed_by: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            key,
            balance: Decimal::ZERO,
            tier,
            version: 0,
            created_at: now,
            updated_at: now,
            performed_by,
        }
    }
}

/// A committed posting. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Account the posting was applied to.
    pub account_id: AccountId,
    /// Key of that account.
    pub key: AccountKey,
    /// Catalog type used.
    pub transaction_type_id: TransactionTypeId,
    /// Amount as posted, signed.
    pub amount: Decimal,
    /// `amount * multiplier`, as applied to the balance.
    pub effective_delta: Decimal,
    /// Account balance right after this posting.
    pub balance_after: Decimal,
    /// Tier right after this posting.
    pub tier_after: Tier,
    /// Free-text reason.
    pub reason: Option<String>,
    /// External reference, e.g. an order number.
    pub reference_id: Option<String>,
    /// Client-supplied deduplication key.
    pub idempotency_key: Option<String>,
    /// Business time.
    pub occurred_at: DateTime<Utc>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
    /// User who posted.
    pub performed_by: Option<UserId>,
}

/// Optional fields shared by every posting request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingMeta {
    /// Free-text reason.
    pub reason: Option<String>,
    /// External reference.
    pub reference_id: Option<String>,
    /// Deduplication key, scoped to the account.
    pub idempotency_key: Option<String>,
    /// Business time; commit time when absent.
    pub occurred_at: Option<DateTime<Utc>>,
    /// User posting.
    pub performed_by: Option<UserId>,
}

/// Request to post a points amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTransaction {
    /// Target account.
    pub key: AccountKey,
    /// Catalog type to apply.
    pub transaction_type_id: TransactionTypeId,
    /// Signed points amount.
    pub amount: Decimal,
    /// Optional fields.
    pub meta: PostingMeta,
}

impl PostTransaction {
    /// Creates a posting with no optional fields.
    #[must_use]
    pub fn new(key: AccountKey, transaction_type_id: TransactionTypeId, amount: Decimal) -> Self {
        Self {
            key,
            transaction_type_id,
            amount,
            meta: PostingMeta::default(),
        }
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.meta.reason = Some(reason.into());
        self
    }

    /// Sets the optional fields wholesale.
    #[must_use]
    pub fn with_meta(mut self, meta: PostingMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// Request to convert a purchase into points using the tenant accrual rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPurchase {
    /// Target account.
    pub key: AccountKey,
    /// Catalog type to apply to the accrued points.
    pub transaction_type_id: TransactionTypeId,
    /// Amount spent, in currency units.
    pub currency_amount: Decimal,
    /// Optional fields.
    pub meta: PostingMeta,
}
