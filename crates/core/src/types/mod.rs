//! Core types for NEXX.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod phone;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Currency, apply_markup, format_amount};
pub use phone::{Phone, PhoneError};
pub use slug::{Slug, SlugError};
pub use status::*;
