//! Token claims consumed when building a request principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens.
///
/// Tokens are issued elsewhere; this service only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Home tenant of the user, if any.
    #[serde(default)]
    pub tenant: Option<Uuid>,
    /// Customer identity linked to the user, if any.
    #[serde(default)]
    pub customer: Option<Uuid>,
    /// Role tags granted in the home tenant.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        roles: Vec<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            tenant: tenant_id,
            customer: None,
            roles,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Links the claims to a customer identity.
    #[must_use]
    pub fn with_customer(mut self, customer_id: Uuid) -> Self {
        self.customer = Some(customer_id);
        self
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the home tenant ID from claims.
    #[must_use]
    pub const fn tenant_id(&self) -> Option<Uuid> {
        self.tenant
    }
}
