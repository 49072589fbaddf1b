//! Core business logic for the loyalty ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the `LedgerStore` trait.
//!
//! # Modules
//!
//! - `tier` - Balance to tier step function
//! - `authz` - Principal and tenant-scope resolver
//! - `ledger` - Accounts, postings, and the transaction processor
//! - `service` - Authorization-gated entry points

pub mod authz;
pub mod ledger;
pub mod service;
pub mod tier;

pub use service::LoyaltyService;
