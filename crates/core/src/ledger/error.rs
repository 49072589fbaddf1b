//! Ledger error types.
//!
//! Every failure a ledger operation can surface, with the stable code and
//! HTTP status each one maps to at the system edge.

use loyalty_shared::error::AppError;
use loyalty_shared::types::{AccountTypeId, TenantId, TransactionTypeId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::store::StoreError;
use super::types::AccountKey;
use crate::authz::AccessDenied;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Request failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Amount arithmetic overflowed.
    #[error("Amount is out of range")]
    AmountOverflow,

    /// Transaction type has a negative multiplier.
    #[error("Transaction type {0} has a negative multiplier")]
    InvalidMultiplier(TransactionTypeId),

    // ========== Lookup Errors ==========
    /// Tenant does not exist or was deleted.
    #[error("Tenant not found: {0}")]
    TenantNotFound(TenantId),

    /// Tenant exists but is not active.
    #[error("Tenant {0} is not active")]
    TenantNotActive(TenantId),

    /// No account for the key.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountKey),

    /// Tenant has no such account type.
    #[error("Account type not found: {0}")]
    AccountTypeNotFound(AccountTypeId),

    /// Account type exists but is inactive.
    #[error("Account type {0} is inactive")]
    AccountTypeInactive(AccountTypeId),

    /// Account already opened for the key.
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(AccountKey),

    /// Transaction type missing, inactive, or owned by another tenant.
    #[error("Transaction type not found: {0}")]
    TransactionTypeNotFound(TransactionTypeId),

    /// Tenant has no accrual rule configured.
    #[error("Tenant {0} has no accrual setting")]
    AccrualNotConfigured(TenantId),

    // ========== Policy Errors ==========
    /// Posting would take a non-negative account below zero.
    #[error("Insufficient balance. Current: {current_balance}, requested: {requested_amount}")]
    InsufficientBalance {
        /// Balance observed when the posting was evaluated.
        current_balance: Decimal,
        /// Points the posting tried to take out.
        requested_amount: Decimal,
    },

    // ========== Concurrency Errors ==========
    /// Compare-and-apply kept losing to concurrent postings.
    #[error("Concurrent modification: gave up after {attempts} attempts")]
    ConcurrencyConflict {
        /// Attempts made before giving up.
        attempts: u32,
    },

    // ========== Authorization Errors ==========
    /// Principal may not act on the requested scope.
    #[error("Access denied")]
    AuthorizationDenied,

    // ========== Store Errors ==========
    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::InvalidMultiplier(_) => "INVALID_MULTIPLIER",
            Self::TenantNotFound(_) => "TENANT_NOT_FOUND",
            Self::TenantNotActive(_) => "TENANT_NOT_ACTIVE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountTypeNotFound(_) => "ACCOUNT_TYPE_NOT_FOUND",
            Self::AccountTypeInactive(_) => "ACCOUNT_TYPE_INACTIVE",
            Self::AccountAlreadyExists(_) => "ACCOUNT_ALREADY_EXISTS",
            Self::TransactionTypeNotFound(_) => "TRANSACTION_TYPE_NOT_FOUND",
            Self::AccrualNotConfigured(_) => "ACCRUAL_NOT_CONFIGURED",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::AuthorizationDenied => "FORBIDDEN",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::AmountOverflow => 400,

            Self::AuthorizationDenied => 403,

            Self::TenantNotFound(_)
            | Self::AccountNotFound(_)
            | Self::AccountTypeNotFound(_)
            | Self::TransactionTypeNotFound(_) => 404,

            Self::AccountAlreadyExists(_) | Self::ConcurrencyConflict { .. } => 409,

            Self::TenantNotActive(_)
            | Self::AccountTypeInactive(_)
            | Self::InvalidMultiplier(_)
            | Self::AccrualNotConfigured(_)
            | Self::InsufficientBalance { .. } => 422,

            Self::Store(_) => 500,
        }
    }

    /// Whether the caller can reasonably retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. } | Self::Store(_))
    }
}

impl From<AccessDenied> for LedgerError {
    fn from(_: AccessDenied) -> Self {
        Self::AuthorizationDenied
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(msg) => Self::Validation(msg),
            LedgerError::AmountOverflow => Self::Validation(err.to_string()),
            LedgerError::AuthorizationDenied => Self::Forbidden,
            LedgerError::InsufficientBalance {
                current_balance,
                requested_amount,
            } => Self::InsufficientBalance {
                amount: current_balance,
                requested_amount,
            },
            LedgerError::TenantNotFound(_)
            | LedgerError::AccountNotFound(_)
            | LedgerError::AccountTypeNotFound(_)
            | LedgerError::TransactionTypeNotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::AccountAlreadyExists(_) | LedgerError::ConcurrencyConflict { .. } => {
                Self::Conflict(err.to_string())
            }
            LedgerError::TenantNotActive(_)
            | LedgerError::AccountTypeInactive(_)
            | LedgerError::InvalidMultiplier(_)
            | LedgerError::AccrualNotConfigured(_) => Self::BusinessRule(err.to_string()),
            LedgerError::Store(msg) => Self::Database(msg),
        }
    }
}
