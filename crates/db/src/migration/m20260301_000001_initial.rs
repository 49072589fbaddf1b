//! Initial database migration.
//!
//! Creates tenants, their catalogs, accounts, and the append-only
//! transaction log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(ACCOUNT_TYPES_SQL).await?;
        db.execute_unprepared(TRANSACTION_TYPES_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(APPEND_ONLY_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'inactive', 'suspended')),
    points_per_currency_unit NUMERIC(19, 4) CHECK (points_per_currency_unit >= 0),
    accrual_expiry_days INTEGER CHECK (accrual_expiry_days > 0),
    is_deleted BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_tenants_listing ON tenants(created_at, id) WHERE NOT is_deleted;
";

const ACCOUNT_TYPES_SQL: &str = r"
CREATE TABLE account_types (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    name VARCHAR(255) NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_account_types_tenant ON account_types(tenant_id, position);
";

const TRANSACTION_TYPES_SQL: &str = r"
CREATE TABLE transaction_types (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    slug VARCHAR(64) NOT NULL,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    multiplier NUMERIC(19, 4) NOT NULL DEFAULT 1 CHECK (multiplier >= 0),
    allow_negative BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_transaction_types_slug UNIQUE (tenant_id, slug)
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    customer_id UUID NOT NULL,
    account_type_id UUID NOT NULL REFERENCES account_types(id),
    balance NUMERIC(28, 4) NOT NULL DEFAULT 0,
    tier VARCHAR(16) NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    performed_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_key UNIQUE (tenant_id, customer_id, account_type_id)
);

CREATE INDEX idx_accounts_customer ON accounts(customer_id, created_at);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    tenant_id UUID NOT NULL,
    customer_id UUID NOT NULL,
    account_type_id UUID NOT NULL,
    transaction_type_id UUID NOT NULL REFERENCES transaction_types(id),
    amount NUMERIC(28, 4) NOT NULL CHECK (amount <> 0),
    effective_delta NUMERIC(28, 4) NOT NULL,
    balance_after NUMERIC(28, 4) NOT NULL,
    tier_after VARCHAR(16) NOT NULL,
    reason TEXT,
    reference_id VARCHAR(255),
    idempotency_key VARCHAR(128),
    occurred_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    performed_by UUID
);

CREATE UNIQUE INDEX uq_transactions_idempotency
    ON transactions(account_id, idempotency_key)
    WHERE idempotency_key IS NOT NULL;

CREATE INDEX idx_transactions_account ON transactions(account_id, created_at DESC, id DESC);
";

const APPEND_ONLY_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_transaction_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'transactions are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_append_only
    BEFORE UPDATE OR DELETE ON transactions
    FOR EACH ROW EXECUTE FUNCTION reject_transaction_mutation();
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP FUNCTION IF EXISTS reject_transaction_mutation();
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS transaction_types CASCADE;
DROP TABLE IF EXISTS account_types CASCADE;
DROP TABLE IF EXISTS tenants CASCADE;
";
