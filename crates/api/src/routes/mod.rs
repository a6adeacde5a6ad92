//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/                                - API banner
//!
//! # Catalog
//! GET  /api/products                        - List (brand, category, search, in_stock, sort)
//! POST /api/products                        - Create (staff)
//! GET  /api/products/{id}                   - Product by id
//! PUT  /api/products/{id}                   - Partial update (staff)
//! DELETE /api/products/{id}                 - Delete (staff)
//! GET  /api/products/slug/{slug}            - Product by slug
//! GET  /api/products/{id}/offers            - Aggregated supplier offers
//! GET  /api/catalog/facets                  - Brand and category counts
//!
//! # Cart and orders (owner or staff)
//! GET  /api/cart/{user_id}                  - Cart with totals
//! POST /api/cart/{user_id}/items            - Add a line
//! PUT  /api/cart/{user_id}/items/{item_id}  - Change quantity (<= 0 removes)
//! DELETE /api/cart/{user_id}/items/{item_id}
//! DELETE /api/cart/{user_id}                - Clear
//! POST /api/orders/{user_id}                - Checkout
//! GET  /api/orders/{user_id}                - User's orders
//! GET  /api/orders                          - All orders (staff)
//! GET  /api/admin/orders/{order_id}         - Order detail (staff)
//! PUT  /api/admin/orders/{order_id}/status  - Status change (staff)
//!
//! # Accounts
//! POST /api/auth/register, /api/auth/login, /api/auth/logout
//! GET  /api/auth/me
//! POST /api/auth/sms/send, /api/auth/sms/verify
//! GET|POST /api/admin/users, GET|PUT|DELETE /api/admin/users/{id}
//!
//! # Integrations (staff)
//! GET|POST /api/suppliers, GET|PUT|DELETE /api/suppliers/{id}
//! GET|POST /api/suppliers/abcp/settings
//! GET  /api/suppliers/abcp/test, /api/suppliers/abcp/search
//! GET|POST /api/payments/settings
//! POST /api/payments/create                 - Start a payment (owner or staff)
//! GET  /api/payments/{payment_id}           - Payment status (owner or staff)
//! POST /api/webhooks/yoomoney               - Provider notifications
//! GET|POST /api/admin/1c/settings, POST /api/admin/1c/sync
//! GET  /api/admin/1c/sync/history
//!
//! # Settings and content
//! GET|POST /api/settings/site               - Public read, staff write
//! GET|POST /api/admin/seo/settings, /api/admin/sms/settings
//! GET  /api/pages, /api/pages/{slug}
//! POST /api/admin/pages, PUT|DELETE /api/admin/pages/{id}
//! GET  /api/admin/media, POST /api/admin/media/upload
//! DELETE /api/admin/media/{id}
//! GET  /api/analytics/dashboard             - Staff dashboard
//! GET  /robots.txt, /sitemap.xml
//! ```

pub mod admin_users;
pub mod analytics;
pub mod auth;
pub mod cart;
pub mod media;
pub mod onec;
pub mod orders;
pub mod pages;
pub mod payments;
pub mod products;
pub mod seo;
pub mod settings;
pub mod sms_auth;
pub mod suppliers;

use axum::{Router, routing::get};
use serde::Serialize;
use serde_json::{Value, json};

use crate::extract::Json;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Success envelope used by the settings and integration endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// `{"success": true, "message": ...}` for operations with nothing to return.
pub(crate) fn done(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}

async fn banner() -> Json<Value> {
    Json(json!({ "message": "NEXX E-Commerce API" }))
}

/// Create all API routes.
///
/// `auth_limiter` is applied to the login, registration and SMS routes.
pub fn routes(auth_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let mut auth = auth::router().merge(sms_auth::router());
    if let Some(limiter) = auth_limiter {
        auth = auth.layer(limiter);
    }

    Router::new()
        .route("/api", get(banner))
        .route("/api/", get(banner))
        .merge(auth)
        .merge(auth::session_router())
        .merge(products::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(admin_users::router())
        .merge(suppliers::router())
        .merge(payments::router())
        .merge(settings::router())
        .merge(pages::router())
        .merge(media::router())
        .merge(onec::router())
        .merge(analytics::router())
        .merge(seo::router())
}
