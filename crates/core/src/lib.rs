//! NEXX Core - Shared domain types.
//!
//! This crate provides the types shared by the NEXX store components:
//! - `api` - HTTP backend (catalog, cart, orders, accounts, integrations)
//! - `cli` - Command-line tools for data initialization and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, phones, slugs, money and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
