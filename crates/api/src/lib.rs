//! NEXX store API library.
//!
//! The HTTP backend of the NEXX auto-parts store as a library, so the binary,
//! the CLI and the integration tests share one router and one store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::build_router;
pub use config::ApiConfig;
pub use state::AppState;
