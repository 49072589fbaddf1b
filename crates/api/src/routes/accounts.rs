//! Customer account routes: open, read, post, and history.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::post,
};
use chrono::{DateTime, Utc};
use loyalty_core::ledger::{
    Account, AccountKey, LedgerTransaction, PostPurchase, PostTransaction, PostingMeta,
};
use loyalty_core::tier::Tier;
use loyalty_shared::types::{
    AccountId, AccountTypeId, CustomerId, PageRequest, PageResponse, TenantId, TransactionId,
    TransactionTypeId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, middleware::CurrentPrincipal};

const ACCOUNT_PATH: &str = "/tenants/{tenant_id}/customers/{customer_id}/accounts/{account_type_id}";

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(ACCOUNT_PATH, post(open_account).get(get_account))
        .route(
            &format!("{ACCOUNT_PATH}/transactions"),
            post(post_transaction).get(list_transactions),
        )
        .route(&format!("{ACCOUNT_PATH}/purchases"), post(post_purchase))
}

/// Path segments naming an account.
#[derive(Debug, Deserialize)]
pub struct AccountPath {
    /// Tenant ID.
    pub tenant_id: TenantId,
    /// Customer ID.
    pub customer_id: CustomerId,
    /// Account type ID.
    pub account_type_id: AccountTypeId,
}

impl From<AccountPath> for AccountKey {
    fn from(path: AccountPath) -> Self {
        Self::new(path.tenant_id, path.customer_id, path.account_type_id)
    }
}

/// Optional posting fields shared by both request bodies.
///
/// The performer is never read from the body; postings are attributed
/// to the authenticated caller.
#[derive(Debug, Default, Deserialize)]
pub struct PostingFields {
    /// Free-text reason.
    pub reason: Option<String>,
    /// External reference, e.g. an order number.
    pub reference_id: Option<String>,
    /// Deduplication key, scoped to the account.
    pub idempotency_key: Option<String>,
    /// Business time; commit time when absent.
    pub occurred_at: Option<DateTime<Utc>>,
}

impl From<PostingFields> for PostingMeta {
    fn from(fields: PostingFields) -> Self {
        Self {
            reason: fields.reason,
            reference_id: fields.reference_id,
            idempotency_key: fields.idempotency_key,
            occurred_at: fields.occurred_at,
            performed_by: None,
        }
    }
}

/// Request body for posting points.
#[derive(Debug, Deserialize)]
pub struct PostTransactionRequest {
    /// Catalog type to apply.
    pub transaction_type_id: TransactionTypeId,
    /// Signed points amount.
    pub amount: Decimal,
    /// Optional fields.
    #[serde(flatten)]
    pub meta: PostingFields,
}

/// Request body for a purchase.
#[derive(Debug, Deserialize)]
pub struct PostPurchaseRequest {
    /// Catalog type the earned points are posted with.
    pub transaction_type_id: TransactionTypeId,
    /// Amount spent, in currency units.
    pub currency_amount: Decimal,
    /// Optional fields.
    #[serde(flatten)]
    pub meta: PostingFields,
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Tenant ID.
    pub tenant_id: TenantId,
    /// Customer ID.
    pub customer_id: CustomerId,
    /// Account type ID.
    pub account_type_id: AccountTypeId,
    /// Current balance.
    pub balance: String,
    /// Current tier.
    pub tier: Tier,
    /// Concurrency token.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last committed posting.
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            tenant_id: account.key.tenant_id,
            customer_id: account.key.customer_id,
            account_type_id: account.key.account_type_id,
            balance: account.balance.to_string(),
            tier: account.tier,
            version: account.version,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Response for a committed transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: TransactionId,
    /// Account ID.
    pub account_id: AccountId,
    /// Catalog type used.
    pub transaction_type_id: TransactionTypeId,
    /// Amount as posted.
    pub amount: String,
    /// Amount as applied to the balance.
    pub effective_delta: String,
    /// Balance after this posting.
    pub balance_after: String,
    /// Tier after this posting.
    pub tier_after: Tier,
    /// Free-text reason.
    pub reason: Option<String>,
    /// External reference.
    pub reference_id: Option<String>,
    /// Deduplication key.
    pub idempotency_key: Option<String>,
    /// Business time.
    pub occurred_at: DateTime<Utc>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
    /// User who posted.
    pub performed_by: Option<UserId>,
}

impl From<LedgerTransaction> for TransactionResponse {
    fn from(tx: LedgerTransaction) -> Self {
        Self {
            id: tx.id,
            account_id: tx.account_id,
            transaction_type_id: tx.transaction_type_id,
            amount: tx.amount.to_string(),
            effective_delta: tx.effective_delta.to_string(),
            balance_after: tx.balance_after.to_string(),
            tier_after: tx.tier_after,
            reason: tx.reason,
            reference_id: tx.reference_id,
            idempotency_key: tx.idempotency_key,
            occurred_at: tx.occurred_at,
            created_at: tx.created_at,
            performed_by: tx.performed_by,
        }
    }
}

/// POST `.../accounts/{account_type_id}` - Open an account.
async fn open_account(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(path): Path<AccountPath>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state.service.open_account(&principal, path.into()).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// GET `.../accounts/{account_type_id}` - Balance and tier.
async fn get_account(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(path): Path<AccountPath>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.service.get_account(&principal, &path.into()).await?;
    Ok(Json(account.into()))
}

/// POST `.../transactions` - Post points.
async fn post_transaction(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(path): Path<AccountPath>,
    Json(payload): Json<PostTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let request = PostTransaction::new(path.into(), payload.transaction_type_id, payload.amount)
        .with_meta(payload.meta.into());
    let tx = state.service.post_transaction(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

/// POST `.../purchases` - Convert a purchase into points.
async fn post_purchase(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(path): Path<AccountPath>,
    Json(payload): Json<PostPurchaseRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let request = PostPurchase {
        key: path.into(),
        transaction_type_id: payload.transaction_type_id,
        currency_amount: payload.currency_amount,
        meta: payload.meta.into(),
    };
    let tx = state.service.post_purchase(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

/// GET `.../transactions` - Transaction history, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(path): Path<AccountPath>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<TransactionResponse>>, ApiError> {
    let history = state
        .service
        .list_transactions(&principal, &path.into(), page)
        .await?;
    Ok(Json(history.map(TransactionResponse::from)))
}
