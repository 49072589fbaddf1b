//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::principal_middleware};

pub mod accounts;
pub mod customers;
pub mod health;
pub mod tenants;

/// Creates the API router; everything except health runs behind the
/// principal middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let scoped_routes = Router::new()
        .merge(tenants::routes())
        .merge(accounts::routes())
        .merge(customers::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            principal_middleware,
        ));

    Router::new().merge(health::routes()).merge(scoped_routes)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
