//! Request middleware.

pub mod auth;

pub use auth::{CurrentPrincipal, principal_middleware};
