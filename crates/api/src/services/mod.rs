//! Business logic that sits between routes and the store.
//!
//! - [`auth`] - password accounts
//! - [`otp`] / [`sms`] - SMS login codes and their delivery
//! - [`offers`] / [`abcp`] - supplier quotes
//! - [`yookassa`] - payment provider
//! - [`onec`] - 1C accounting sync
//! - [`content`] / [`seo`] / [`media`] - pages, robots, sitemap, uploads
//! - [`analytics`] - admin dashboard

pub mod abcp;
pub mod analytics;
pub mod auth;
pub mod content;
pub mod media;
pub mod offers;
pub mod onec;
pub mod otp;
pub mod seo;
pub mod sms;
pub mod yookassa;
