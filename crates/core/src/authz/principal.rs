//! Request principal.

use std::collections::BTreeSet;

use loyalty_shared::Claims;
use loyalty_shared::types::{CustomerId, TenantId, UserId};
use serde::{Deserialize, Serialize};

/// Role tags a principal can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator; only meaningful in the host tenant.
    SuperAdmin,
    /// Owner of a tenant.
    TenantOwner,
    /// Loyalty customer.
    Customer,
    /// Plain authenticated user.
    User,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "super_admin" | "superadmin" => Some(Self::SuperAdmin),
            "tenant_owner" | "tenantowner" => Some(Self::TenantOwner),
            "customer" => Some(Self::Customer),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::TenantOwner => "tenant_owner",
            Self::Customer => "customer",
            Self::User => "user",
        }
    }
}

/// A user's role in a tenant, or globally when `tenant_id` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRoleBinding {
    /// The bound user.
    pub user_id: UserId,
    /// Tenant the role applies in.
    pub tenant_id: Option<TenantId>,
    /// The role.
    pub role: Role,
}

/// Who is making a request.
///
/// Built once per request by the boundary and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    authenticated: bool,
    user_id: Option<UserId>,
    home_tenant: Option<TenantId>,
    customer_id: Option<CustomerId>,
    roles: BTreeSet<Role>,
}

impl Principal {
    /// A principal with no identity and no roles.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
            home_tenant: None,
            customer_id: None,
            roles: BTreeSet::new(),
        }
    }

    /// An authenticated principal.
    #[must_use]
    pub fn authenticated(
        user_id: UserId,
        home_tenant: Option<TenantId>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
            home_tenant,
            customer_id: None,
            roles: roles.into_iter().collect(),
        }
    }

    /// Builds an authenticated principal from role bindings.
    ///
    /// Only global bindings and bindings for `home_tenant` contribute.
    /// Bindings for other users are ignored. `customer_id` links the user
    /// to their customer identity; without it a `Customer` role grants no
    /// customer access.
    #[must_use]
    pub fn from_bindings(
        user_id: UserId,
        home_tenant: Option<TenantId>,
        customer_id: Option<CustomerId>,
        bindings: &[UserRoleBinding],
    ) -> Self {
        let roles = bindings
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| b.tenant_id.is_none() || b.tenant_id == home_tenant)
            .map(|b| b.role);

        Self {
            customer_id,
            ..Self::authenticated(user_id, home_tenant, roles)
        }
    }

    /// Builds an authenticated principal from verified token claims.
    ///
    /// Unknown role strings are dropped.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        let roles = claims.roles.iter().filter_map(|r| Role::parse(r));
        let principal = Self::authenticated(
            UserId::from_uuid(claims.sub),
            claims.tenant.map(TenantId::from_uuid),
            roles,
        );

        match claims.customer {
            Some(customer) => principal.with_customer(CustomerId::from_uuid(customer)),
            None => principal,
        }
    }

    /// Links the principal to a customer identity.
    #[must_use]
    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Returns a copy with `authenticated` cleared.
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Whether credentials were verified.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The user behind the request, if known.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The principal's home tenant.
    #[must_use]
    pub const fn home_tenant(&self) -> Option<TenantId> {
        self.home_tenant
    }

    /// The customer identity linked to the principal.
    #[must_use]
    pub const fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    /// Whether the principal holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// All role tags.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_anonymous_has_nothing() {
        let principal = Principal::anonymous();
        assert!(!principal.is_authenticated());
        assert!(principal.user_id().is_none());
        assert!(principal.roles().is_empty());
    }

    #[test]
    fn test_from_bindings_scopes_roles_to_home_tenant() {
        let user = UserId::new();
        let home = TenantId::new();
        let other = TenantId::new();
        let bindings = [
            UserRoleBinding {
                user_id: user,
                tenant_id: Some(home),
                role: Role::TenantOwner,
            },
            UserRoleBinding {
                user_id: user,
                tenant_id: Some(other),
                role: Role::SuperAdmin,
            },
            UserRoleBinding {
                user_id: user,
                tenant_id: None,
                role: Role::User,
            },
            UserRoleBinding {
                user_id: UserId::new(),
                tenant_id: Some(home),
                role: Role::Customer,
            },
        ];

        let principal = Principal::from_bindings(user, Some(home), None, &bindings);

        assert!(principal.is_authenticated());
        assert!(principal.customer_id().is_none());
        assert!(principal.has_role(Role::TenantOwner));
        assert!(principal.has_role(Role::User));
        assert!(!principal.has_role(Role::SuperAdmin));
        assert!(!principal.has_role(Role::Customer));
    }

    #[test]
    fn test_from_claims() {
        let user = uuid::Uuid::new_v4();
        let tenant = uuid::Uuid::new_v4();
        let customer = uuid::Uuid::new_v4();
        let claims = Claims::new(
            user,
            Some(tenant),
            vec!["customer".to_string(), "wizard".to_string()],
            Utc::now() + Duration::hours(1),
        )
        .with_customer(customer);

        let principal = Principal::from_claims(&claims);

        assert!(principal.is_authenticated());
        assert_eq!(principal.user_id(), Some(UserId::from_uuid(user)));
        assert_eq!(principal.home_tenant(), Some(TenantId::from_uuid(tenant)));
        assert_eq!(principal.customer_id(), Some(CustomerId::from_uuid(customer)));
        assert_eq!(principal.roles().len(), 1);
        assert!(principal.has_role(Role::Customer));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("SuperAdmin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("tenant_owner"), Some(Role::TenantOwner));
        assert_eq!(Role::parse(Role::Customer.as_str()), Some(Role::Customer));
        assert_eq!(Role::parse("root"), None);
    }
}
