//! Seeded in-memory ledger shared by processor and service tests.

use std::sync::Arc;

use chrono::Utc;
use loyalty_shared::types::{AccountTypeId, CustomerId, TenantId, TransactionTypeId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::memory::InMemoryLedgerStore;
use super::processor::TransactionProcessor;
use super::types::{
    AccountKey, AccountType, AccrualSetting, Tenant, TenantStatus, TransactionType,
};
use crate::tier::TierTable;

pub(crate) struct Fixture {
    pub store: Arc<InMemoryLedgerStore>,
    pub tenant_id: TenantId,
    pub account_type_id: AccountTypeId,
    /// multiplier 1, negative not allowed
    pub earn: TransactionTypeId,
    /// multiplier 2, negative allowed
    pub adjust: TransactionTypeId,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let tenant_id = TenantId::new();
        let account_type_id = AccountTypeId::new();

        store.insert_tenant(Tenant {
            id: tenant_id,
            name: "Acme Coffee".to_string(),
            status: TenantStatus::Active,
            accrual: Some(AccrualSetting {
                points_per_currency_unit: dec!(1.5),
                expiry_days: Some(365),
            }),
            account_types: vec![AccountType {
                id: account_type_id,
                tenant_id,
                name: "Standard points".to_string(),
                is_active: true,
            }],
            is_deleted: false,
            created_at: Utc::now(),
        });

        let earn = TransactionTypeId::new();
        store.insert_transaction_type(transaction_type(tenant_id, earn, "earn", dec!(1), false));
        let adjust = TransactionTypeId::new();
        store.insert_transaction_type(transaction_type(tenant_id, adjust, "adjust", dec!(2), true));

        Self {
            store,
            tenant_id,
            account_type_id,
            earn,
            adjust,
        }
    }

    pub fn processor(&self) -> TransactionProcessor<InMemoryLedgerStore> {
        TransactionProcessor::new(Arc::clone(&self.store), TierTable::default())
    }

    pub fn key(&self, customer_id: CustomerId) -> AccountKey {
        AccountKey::new(self.tenant_id, customer_id, self.account_type_id)
    }

    pub fn add_transaction_type(
        &self,
        slug: &str,
        multiplier: Decimal,
        allow_negative: bool,
    ) -> TransactionTypeId {
        let id = TransactionTypeId::new();
        self.store.insert_transaction_type(transaction_type(
            self.tenant_id,
            id,
            slug,
            multiplier,
            allow_negative,
        ));
        id
    }
}

fn transaction_type(
    tenant_id: TenantId,
    id: TransactionTypeId,
    slug: &str,
    multiplier: Decimal,
    allow_negative: bool,
) -> TransactionType {
    TransactionType {
        id,
        tenant_id,
        slug: slug.to_string(),
        name: slug.to_string(),
        description: None,
        multiplier,
        allow_negative,
        is_active: true,
    }
}
