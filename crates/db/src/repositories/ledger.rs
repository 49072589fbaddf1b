//! Ledger repository: the Postgres `LedgerStore`.
//!
//! `compare_and_apply` runs one database transaction that re-checks the
//! idempotency key, performs a conditional `UPDATE ... WHERE version = ?`,
//! and appends the transaction row. A lost race writes nothing.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use loyalty_core::ledger::{
    Account, AccountKey, AccountType, AccrualSetting, BalanceCommit, CommitOutcome,
    CreateAccountOutcome, LedgerStore, LedgerTransaction, StoreError, Tenant, TenantStatus,
    TransactionType,
};
use loyalty_core::tier::Tier;
use loyalty_shared::types::{
    AccountId, AccountTypeId, CustomerId, PageRequest, PageResponse, TenantId, TransactionId,
    TransactionTypeId, UserId,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{account_types, accounts, tenants, transaction_types, transactions};

/// Ledger repository backed by `SeaORM`.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a tenant together with its account types.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(backend)?;
        let now = to_db_time(tenant.created_at);

        tenants::ActiveModel {
            id: Set(tenant.id.into_inner()),
            name: Set(tenant.name.clone()),
            status: Set(tenant.status.as_str().to_string()),
            points_per_currency_unit: Set(tenant.accrual.map(|a| a.points_per_currency_unit)),
            accrual_expiry_days: Set(tenant
                .accrual
                .and_then(|a| a.expiry_days)
                .and_then(|d| i32::try_from(d).ok())),
            is_deleted: Set(tenant.is_deleted),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(backend)?;

        for (position, account_type) in tenant.account_types.iter().enumerate() {
            account_types::ActiveModel {
                id: Set(account_type.id.into_inner()),
                tenant_id: Set(tenant.id.into_inner()),
                name: Set(account_type.name.clone()),
                position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                is_active: Set(account_type.is_active),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(backend)?;
        }

        txn.commit().await.map_err(backend)?;
        Ok(())
    }

    /// Inserts a transaction type into a tenant's catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_transaction_type(
        &self,
        transaction_type: &TransactionType,
    ) -> Result<(), StoreError> {
        transaction_types::ActiveModel {
            id: Set(transaction_type.id.into_inner()),
            tenant_id: Set(transaction_type.tenant_id.into_inner()),
            slug: Set(transaction_type.slug.clone()),
            name: Set(transaction_type.name.clone()),
            description: Set(transaction_type.description.clone()),
            multiplier: Set(transaction_type.multiplier),
            allow_negative: Set(transaction_type.allow_negative),
            is_active: Set(transaction_type.is_active),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn load_account_types(
        &self,
        tenant_ids: Vec<Uuid>,
    ) -> Result<Vec<account_types::Model>, StoreError> {
        account_types::Entity::find()
            .filter(account_types::Column::TenantId.is_in(tenant_ids))
            .order_by_asc(account_types::Column::Position)
            .all(&self.db)
            .await
            .map_err(backend)
    }

    async fn find_account_model<C: ConnectionTrait>(
        conn: &C,
        key: &AccountKey,
    ) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(key.tenant_id.into_inner()))
            .filter(accounts::Column::CustomerId.eq(key.customer_id.into_inner()))
            .filter(accounts::Column::AccountTypeId.eq(key.account_type_id.into_inner()))
            .one(conn)
            .await
    }

    async fn find_idempotent<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
        idempotency_key: &str,
    ) -> Result<Option<transactions::Model>, DbErr> {
        transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .filter(transactions::Column::IdempotencyKey.eq(idempotency_key))
            .one(conn)
            .await
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let Some(model) = tenants::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?
        else {
            return Ok(None);
        };

        let types = self.load_account_types(vec![model.id]).await?;
        tenant_from_model(model, &types).map(Some)
    }

    async fn list_tenants(&self, page: PageRequest) -> Result<PageResponse<Tenant>, StoreError> {
        let query = tenants::Entity::find().filter(tenants::Column::IsDeleted.eq(false));

        let total = query.clone().count(&self.db).await.map_err(backend)?;
        let models = query
            .order_by_asc(tenants::Column::CreatedAt)
            .order_by_asc(tenants::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(backend)?;

        let types = self
            .load_account_types(models.iter().map(|m| m.id).collect())
            .await?;
        let data = models
            .into_iter()
            .map(|m| tenant_from_model(m, &types))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(data, page, total))
    }

    async fn find_transaction_type(
        &self,
        transaction_type_id: TransactionTypeId,
    ) -> Result<Option<TransactionType>, StoreError> {
        let model = transaction_types::Entity::find_by_id(transaction_type_id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?;

        Ok(model.map(transaction_type_from_model))
    }

    async fn find_account(&self, key: &AccountKey) -> Result<Option<Account>, StoreError> {
        Self::find_account_model(&self.db, key)
            .await
            .map_err(backend)?
            .map(account_from_model)
            .transpose()
    }

    async fn create_account(&self, account: Account) -> Result<CreateAccountOutcome, StoreError> {
        let model = accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            tenant_id: Set(account.key.tenant_id.into_inner()),
            customer_id: Set(account.key.customer_id.into_inner()),
            account_type_id: Set(account.key.account_type_id.into_inner()),
            balance: Set(account.balance),
            tier: Set(account.tier.as_str().to_string()),
            version: Set(account.version),
            performed_by: Set(account.performed_by.map(UserId::into_inner)),
            created_at: Set(to_db_time(account.created_at)),
            updated_at: Set(to_db_time(account.updated_at)),
        };

        match model.insert(&self.db).await {
            Ok(inserted) => Ok(CreateAccountOutcome::Created(account_from_model(inserted)?)),
            Err(err) if is_unique_violation(&err) => {
                let existing = Self::find_account_model(&self.db, &account.key)
                    .await
                    .map_err(backend)?
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!("account {} vanished", account.key))
                    })?;
                Ok(CreateAccountOutcome::AlreadyExists(account_from_model(
                    existing,
                )?))
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn find_by_idempotency_key(
        &self,
        key: &AccountKey,
        idempotency_key: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        let Some(account) = Self::find_account_model(&self.db, key)
            .await
            .map_err(backend)?
        else {
            return Ok(None);
        };

        Self::find_idempotent(&self.db, account.id, idempotency_key)
            .await
            .map_err(backend)?
            .map(transaction_from_model)
            .transpose()
    }

    async fn compare_and_apply(&self, commit: BalanceCommit) -> Result<CommitOutcome, StoreError> {
        let BalanceCommit {
            key,
            expected_version,
            new_balance,
            new_tier,
            transaction,
        } = commit;
        let account_id = transaction.account_id.into_inner();

        let txn = self.db.begin().await.map_err(backend)?;

        if let Some(idempotency_key) = transaction.idempotency_key.as_deref() {
            if let Some(existing) = Self::find_idempotent(&txn, account_id, idempotency_key)
                .await
                .map_err(backend)?
            {
                txn.rollback().await.map_err(backend)?;
                return Ok(CommitOutcome::DuplicateIdempotencyKey(
                    transaction_from_model(existing)?,
                ));
            }
        }

        let updated = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(new_balance))
            .col_expr(accounts::Column::Tier, Expr::value(new_tier.as_str()))
            .col_expr(
                accounts::Column::Version,
                Expr::col(accounts::Column::Version).add(1),
            )
            .col_expr(
                accounts::Column::UpdatedAt,
                Expr::value(to_db_time(transaction.created_at)),
            )
            .col_expr(
                accounts::Column::PerformedBy,
                Expr::value(transaction.performed_by.map(UserId::into_inner)),
            )
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::Version.eq(expected_version))
            .exec(&txn)
            .await
            .map_err(backend)?;

        if updated.rows_affected == 0 {
            txn.rollback().await.map_err(backend)?;
            tracing::debug!(account = %key, expected_version, "Conditional update matched no row");
            return Ok(CommitOutcome::VersionConflict);
        }

        let row = transaction_active_model(&transaction);
        if let Err(err) = row.insert(&txn).await {
            txn.rollback().await.map_err(backend)?;

            if is_unique_violation(&err) {
                if let Some(idempotency_key) = transaction.idempotency_key.as_deref() {
                    let existing = Self::find_idempotent(&self.db, account_id, idempotency_key)
                        .await
                        .map_err(backend)?
                        .ok_or_else(|| {
                            StoreError::Corrupt(format!(
                                "idempotency key {idempotency_key} conflicted but is missing"
                            ))
                        })?;
                    return Ok(CommitOutcome::DuplicateIdempotencyKey(
                        transaction_from_model(existing)?,
                    ));
                }
            }

            tracing::error!(account = %key, error = %err, "Failed to append transaction");
            return Err(backend(err));
        }

        let account = accounts::Entity::find_by_id(account_id)
            .one(&txn)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::Corrupt(format!("account {key} vanished mid-commit")))?;

        txn.commit().await.map_err(|err| {
            tracing::error!(account = %key, error = %err, "Commit failed");
            backend(err)
        })?;

        Ok(CommitOutcome::Committed {
            account: account_from_model(account)?,
            transaction,
        })
    }

    async fn list_transactions(
        &self,
        key: &AccountKey,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, StoreError> {
        let query = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(key.tenant_id.into_inner()))
            .filter(transactions::Column::CustomerId.eq(key.customer_id.into_inner()))
            .filter(transactions::Column::AccountTypeId.eq(key.account_type_id.into_inner()));

        let total = query.clone().count(&self.db).await.map_err(backend)?;
        let data = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(transaction_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(data, page, total))
    }

    async fn list_customer_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, StoreError> {
        accounts::Entity::find()
            .filter(accounts::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(account_from_model)
            .collect()
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn to_db_time(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.into()
}

fn from_db_time(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

fn parse_tier(raw: &str) -> Result<Tier, StoreError> {
    Tier::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("unknown tier '{raw}'")))
}

fn tenant_from_model(
    model: tenants::Model,
    types: &[account_types::Model],
) -> Result<Tenant, StoreError> {
    let status = TenantStatus::parse(&model.status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown tenant status '{}'", model.status)))?;

    let accrual = model
        .points_per_currency_unit
        .map(|points_per_currency_unit| AccrualSetting {
            points_per_currency_unit,
            expiry_days: model
                .accrual_expiry_days
                .and_then(|d| u32::try_from(d).ok()),
        });

    let account_types = types
        .iter()
        .filter(|t| t.tenant_id == model.id)
        .map(|t| AccountType {
            id: AccountTypeId::from_uuid(t.id),
            tenant_id: TenantId::from_uuid(t.tenant_id),
            name: t.name.clone(),
            is_active: t.is_active,
        })
        .collect();

    Ok(Tenant {
        id: TenantId::from_uuid(model.id),
        name: model.name,
        status,
        accrual,
        account_types,
        is_deleted: model.is_deleted,
        created_at: from_db_time(model.created_at),
    })
}

fn transaction_type_from_model(model: transaction_types::Model) -> TransactionType {
    TransactionType {
        id: TransactionTypeId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        slug: model.slug,
        name: model.name,
        description: model.description,
        multiplier: model.multiplier,
        allow_negative: model.allow_negative,
        is_active: model.is_active,
    }
}

fn account_from_model(model: accounts::Model) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId::from_uuid(model.id),
        key: AccountKey::new(
            TenantId::from_uuid(model.tenant_id),
            CustomerId::from_uuid(model.customer_id),
            AccountTypeId::from_uuid(model.account_type_id),
        ),
        balance: model.balance.normalize(),
        tier: parse_tier(&model.tier)?,
        version: model.version,
        created_at: from_db_time(model.created_at),
        updated_at: from_db_time(model.updated_at),
        performed_by: model.performed_by.map(UserId::from_uuid),
    })
}

fn transaction_from_model(model: transactions::Model) -> Result<LedgerTransaction, StoreError> {
    Ok(LedgerTransaction {
        id: TransactionId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        key: AccountKey::new(
            TenantId::from_uuid(model.tenant_id),
            CustomerId::from_uuid(model.customer_id),
            AccountTypeId::from_uuid(model.account_type_id),
        ),
        transaction_type_id: TransactionTypeId::from_uuid(model.transaction_type_id),
        amount: model.amount.normalize(),
        effective_delta: model.effective_delta.normalize(),
        balance_after: model.balance_after.normalize(),
        tier_after: parse_tier(&model.tier_after)?,
        reason: model.reason,
        reference_id: model.reference_id,
        idempotency_key: model.idempotency_key,
        occurred_at: from_db_time(model.occurred_at),
        created_at: from_db_time(model.created_at),
        performed_by: model.performed_by.map(UserId::from_uuid),
    })
}

fn transaction_active_model(transaction: &LedgerTransaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        account_id: Set(transaction.account_id.into_inner()),
        tenant_id: Set(transaction.key.tenant_id.into_inner()),
        customer_id: Set(transaction.key.customer_id.into_inner()),
        account_type_id: Set(transaction.key.account_type_id.into_inner()),
        transaction_type_id: Set(transaction.transaction_type_id.into_inner()),
        amount: Set(transaction.amount),
        effective_delta: Set(transaction.effective_delta),
        balance_after: Set(transaction.balance_after),
        tier_after: Set(transaction.tier_after.as_str().to_string()),
        reason: Set(transaction.reason.clone()),
        reference_id: Set(transaction.reference_id.clone()),
        idempotency_key: Set(transaction.idempotency_key.clone()),
        occurred_at: Set(to_db_time(transaction.occurred_at)),
        created_at: Set(to_db_time(transaction.created_at)),
        performed_by: Set(transaction.performed_by.map(UserId::into_inner)),
    }
}
