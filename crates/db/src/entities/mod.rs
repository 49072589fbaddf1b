//! `SeaORM` entity definitions.

pub mod account_types;
pub mod accounts;
pub mod tenants;
pub mod transaction_types;
pub mod transactions;
