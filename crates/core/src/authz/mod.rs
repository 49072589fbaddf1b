//! Tenant-scope authorization.
//!
//! Every ledger-touching request is checked here before it reaches the
//! ledger. The resolver is a pure function of the principal, the requested
//! scope, the route identifiers, and the configured host tenant.
//!
//! # Modules
//!
//! - `principal` - Immutable request principal and role tags
//! - `resolver` - Scope decision rules

pub mod principal;
pub mod resolver;

#[cfg(test)]
mod resolver_tests;

pub use principal::{Principal, Role, UserRoleBinding};
pub use resolver::{AccessDenied, AccessRequest, Decision, ScopeKind, ScopeResolver};
