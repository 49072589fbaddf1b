//! Customer-wide routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use loyalty_shared::types::CustomerId;
use serde::Serialize;

use super::accounts::AccountResponse;
use crate::{AppState, error::ApiError, middleware::CurrentPrincipal};

/// Creates the customer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/customers/{customer_id}/accounts", get(list_accounts))
}

/// Accounts held by one customer.
#[derive(Debug, Serialize)]
pub struct CustomerAccountsResponse {
    /// Customer ID.
    pub customer_id: CustomerId,
    /// Accounts across tenants.
    pub accounts: Vec<AccountResponse>,
}

/// GET `/customers/{customer_id}/accounts` - Every account of a customer.
async fn list_accounts(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<CustomerAccountsResponse>, ApiError> {
    let accounts = state
        .service
        .list_customer_accounts(&principal, customer_id)
        .await?;
    Ok(Json(CustomerAccountsResponse {
        customer_id,
        accounts: accounts.into_iter().map(Into::into).collect(),
    }))
}
