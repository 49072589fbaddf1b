//! Tenant routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use loyalty_core::ledger::{AccountType, Tenant};
use loyalty_shared::types::{AccountTypeId, PageRequest, PageResponse, TenantId};
use serde::Serialize;

use crate::{AppState, error::ApiError, middleware::CurrentPrincipal};

/// Creates the tenant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants))
        .route("/tenants/{tenant_id}", get(get_tenant))
        .route("/tenant", get(get_own_tenant))
}

/// Response for a tenant.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    /// Tenant ID.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: &'static str,
    /// Points per currency unit, when purchases accrue points.
    pub points_per_currency_unit: Option<String>,
    /// Days until accrued points expire.
    pub accrual_expiry_days: Option<u32>,
    /// Account types in definition order.
    pub account_types: Vec<AccountTypeResponse>,
    /// Onboarding time.
    pub created_at: DateTime<Utc>,
}

/// Response for an account type.
#[derive(Debug, Serialize)]
pub struct AccountTypeResponse {
    /// Account type ID.
    pub id: AccountTypeId,
    /// Display name.
    pub name: String,
    /// Whether accounts may be opened with it.
    pub is_active: bool,
}

impl From<AccountType> for AccountTypeResponse {
    fn from(account_type: AccountType) -> Self {
        Self {
            id: account_type.id,
            name: account_type.name,
            is_active: account_type.is_active,
        }
    }
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            status: tenant.status.as_str(),
            points_per_currency_unit: tenant
                .accrual
                .map(|a| a.points_per_currency_unit.to_string()),
            accrual_expiry_days: tenant.accrual.and_then(|a| a.expiry_days),
            account_types: tenant.account_types.into_iter().map(Into::into).collect(),
            created_at: tenant.created_at,
        }
    }
}

/// GET `/tenants` - List tenants (platform operators).
async fn list_tenants(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<TenantResponse>>, ApiError> {
    let tenants = state.service.list_tenants(&principal, page).await?;
    Ok(Json(tenants.map(TenantResponse::from)))
}

/// GET `/tenants/{tenant_id}` - Get a tenant.
async fn get_tenant(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state.service.get_tenant(&principal, Some(tenant_id)).await?;
    Ok(Json(tenant.into()))
}

/// GET `/tenant` - Get the caller's home tenant.
async fn get_own_tenant(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state.service.get_tenant(&principal, None).await?;
    Ok(Json(tenant.into()))
}
