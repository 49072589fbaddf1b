//! Authorization-gated entry points.
//!
//! `LoyaltyService` is what the transport layer calls. Every operation
//! resolves the principal's scope first and only then touches the ledger,
//! so an unauthorized caller never learns whether a tenant or account
//! exists.

use loyalty_shared::types::{CustomerId, PageRequest, PageResponse, TenantId, UserId};

use crate::authz::{AccessRequest, Decision, Principal, ScopeResolver};
use crate::ledger::{
    Account, AccountKey, LedgerError, LedgerStore, LedgerTransaction, PostPurchase,
    PostTransaction, Tenant, TransactionProcessor,
};

/// Ledger operations behind the scope resolver.
pub struct LoyaltyService<S: ?Sized> {
    resolver: ScopeResolver,
    processor: TransactionProcessor<S>,
}

impl<S: ?Sized> std::fmt::Debug for LoyaltyService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoyaltyService")
            .field("resolver", &self.resolver)
            .field("processor", &self.processor)
            .finish()
    }
}

impl<S: LedgerStore + ?Sized> LoyaltyService<S> {
    /// Creates a service.
    pub fn new(resolver: ScopeResolver, processor: TransactionProcessor<S>) -> Self {
        Self {
            resolver,
            processor,
        }
    }

    /// The underlying processor, without authorization.
    pub fn processor(&self) -> &TransactionProcessor<S> {
        &self.processor
    }

    /// Raw scope decision for a principal.
    pub fn authorize(&self, principal: &Principal, request: &AccessRequest) -> Decision {
        self.resolver.authorize(principal, request)
    }

    /// Posts points. Requires tenant scope on the account's tenant.
    pub async fn post_transaction(
        &self,
        principal: &Principal,
        mut request: PostTransaction,
    ) -> Result<LedgerTransaction, LedgerError> {
        self.require(principal, &AccessRequest::tenant(Some(request.key.tenant_id)))?;
        request.meta.performed_by = performed_by(principal, request.meta.performed_by);
        self.processor.post_transaction(request).await
    }

    /// Converts a purchase to points. Requires tenant scope.
    pub async fn post_purchase(
        &self,
        principal: &Principal,
        mut request: PostPurchase,
    ) -> Result<LedgerTransaction, LedgerError> {
        self.require(principal, &AccessRequest::tenant(Some(request.key.tenant_id)))?;
        request.meta.performed_by = performed_by(principal, request.meta.performed_by);
        self.processor.post_purchase(request).await
    }

    /// Opens an account. Requires tenant scope.
    pub async fn open_account(
        &self,
        principal: &Principal,
        key: AccountKey,
    ) -> Result<Account, LedgerError> {
        self.require(principal, &AccessRequest::tenant(Some(key.tenant_id)))?;
        self.processor
            .open_account(key, principal.user_id())
            .await
    }

    /// Balance and tier. Tenant scope, or the account's own customer.
    pub async fn get_account(
        &self,
        principal: &Principal,
        key: &AccountKey,
    ) -> Result<Account, LedgerError> {
        self.require(
            principal,
            &AccessRequest::tenant_customer(key.tenant_id, key.customer_id),
        )?;
        self.processor.get_account(key).await
    }

    /// Transaction history. Tenant scope, or the account's own customer.
    pub async fn list_transactions(
        &self,
        principal: &Principal,
        key: &AccountKey,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError> {
        self.require(
            principal,
            &AccessRequest::tenant_customer(key.tenant_id, key.customer_id),
        )?;
        self.processor.list_transactions(key, page).await
    }

    /// Every account of a customer. Platform operators or that customer.
    pub async fn list_customer_accounts(
        &self,
        principal: &Principal,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, LedgerError> {
        self.require(principal, &AccessRequest::customer(customer_id))?;
        self.processor.list_customer_accounts(customer_id).await
    }

    /// A tenant by id, or the principal's own tenant when `tenant_id` is
    /// `None`.
    pub async fn get_tenant(
        &self,
        principal: &Principal,
        tenant_id: Option<TenantId>,
    ) -> Result<Tenant, LedgerError> {
        self.require(principal, &AccessRequest::tenant(tenant_id))?;
        let tenant_id = tenant_id
            .or_else(|| principal.home_tenant())
            .ok_or(LedgerError::AuthorizationDenied)?;
        self.processor.get_tenant(tenant_id).await
    }

    /// All tenants. Platform operators only.
    pub async fn list_tenants(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> Result<PageResponse<Tenant>, LedgerError> {
        self.require(principal, &AccessRequest::platform_root())?;
        self.processor.list_tenants(page).await
    }

    fn require(&self, principal: &Principal, request: &AccessRequest) -> Result<(), LedgerError> {
        Ok(self.resolver.require(principal, request)?)
    }
}

fn performed_by(principal: &Principal, supplied: Option<UserId>) -> Option<UserId> {
    supplied.or_else(|| principal.user_id())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
