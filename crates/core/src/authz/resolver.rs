//! Scope decision rules.
//!
//! Rules are evaluated short-circuit and the default is deny. Identifier
//! comparisons only match when both sides are present.

use loyalty_shared::types::{CustomerId, TenantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::principal::{Principal, Role};

/// Category of access being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Platform operators only.
    PlatformRootAccess,
    /// Platform operators or the owner of the tenant.
    TenantScopeAccess,
    /// Tenant-scope principals or the customer named in the route.
    TenantCustomerAccess,
    /// Platform operators or the customer named in the route.
    CustomerAccess,
}

/// A scope plus the identifiers bound from the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    /// Scope being checked.
    pub scope: ScopeKind,
    /// Tenant named in the route, if any.
    pub route_tenant: Option<TenantId>,
    /// Customer named in the route, if any.
    pub route_customer: Option<CustomerId>,
}

impl AccessRequest {
    /// Platform-root access.
    #[must_use]
    pub const fn platform_root() -> Self {
        Self {
            scope: ScopeKind::PlatformRootAccess,
            route_tenant: None,
            route_customer: None,
        }
    }

    /// Tenant-scope access; `None` when the route names no tenant.
    #[must_use]
    pub const fn tenant(route_tenant: Option<TenantId>) -> Self {
        Self {
            scope: ScopeKind::TenantScopeAccess,
            route_tenant,
            route_customer: None,
        }
    }

    /// Access to one customer's data inside a tenant.
    #[must_use]
    pub const fn tenant_customer(route_tenant: TenantId, route_customer: CustomerId) -> Self {
        Self {
            scope: ScopeKind::TenantCustomerAccess,
            route_tenant: Some(route_tenant),
            route_customer: Some(route_customer),
        }
    }

    /// Access to one customer's data across tenants.
    #[must_use]
    pub const fn customer(route_customer: CustomerId) -> Self {
        Self {
            scope: ScopeKind::CustomerAccess,
            route_tenant: None,
            route_customer: Some(route_customer),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request may proceed.
    Allow,
    /// Request must be rejected.
    Deny,
}

impl Decision {
    /// Returns true for `Allow`.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    const fn from_bool(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}

/// Access was denied. Carries no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access denied")]
pub struct AccessDenied;

/// Evaluates access requests against a principal.
///
/// Holds only the host tenant, so it is cheap to share and safe to call
/// from any number of tasks.
#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver {
    host_tenant: TenantId,
}

impl ScopeResolver {
    /// Creates a resolver for the given host tenant.
    #[must_use]
    pub const fn new(host_tenant: TenantId) -> Self {
        Self { host_tenant }
    }

    /// The tenant reserved for platform operators.
    #[must_use]
    pub const fn host_tenant(&self) -> TenantId {
        self.host_tenant
    }

    /// Decides whether `principal` may perform `request`.
    #[must_use]
    pub fn authorize(&self, principal: &Principal, request: &AccessRequest) -> Decision {
        if !principal.is_authenticated() {
            return Decision::Deny;
        }

        let allowed = match request.scope {
            ScopeKind::PlatformRootAccess => self.is_platform_root(principal),
            ScopeKind::TenantScopeAccess => self.has_tenant_scope(principal, request.route_tenant),
            ScopeKind::TenantCustomerAccess => {
                self.has_tenant_scope(principal, request.route_tenant)
                    || is_route_customer(principal, request.route_customer)
            }
            ScopeKind::CustomerAccess => {
                self.is_platform_root(principal)
                    || is_route_customer(principal, request.route_customer)
            }
        };

        Decision::from_bool(allowed)
    }

    /// Like `authorize`, but as a `Result` for `?` propagation.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when the decision is `Deny`.
    pub fn require(&self, principal: &Principal, request: &AccessRequest) -> Result<(), AccessDenied> {
        if self.authorize(principal, request).is_allowed() {
            Ok(())
        } else {
            tracing::debug!(scope = ?request.scope, "access denied");
            Err(AccessDenied)
        }
    }

    /// Host-tenant super admin.
    fn is_platform_root(&self, principal: &Principal) -> bool {
        principal.home_tenant() == Some(self.host_tenant) && principal.has_role(Role::SuperAdmin)
    }

    fn has_tenant_scope(&self, principal: &Principal, route_tenant: Option<TenantId>) -> bool {
        if self.is_platform_root(principal) {
            return true;
        }
        if !principal.has_role(Role::TenantOwner) {
            return false;
        }

        match (route_tenant, principal.home_tenant()) {
            // No tenant in the route: an owner acts on their own tenant.
            (None, Some(_)) => true,
            (Some(route), Some(home)) => route == home,
            (_, None) => false,
        }
    }
}

fn is_route_customer(principal: &Principal, route_customer: Option<CustomerId>) -> bool {
    principal.has_role(Role::Customer)
        && matches!(
            (route_customer, principal.customer_id()),
            (Some(route), Some(own)) if route == own
        )
}
