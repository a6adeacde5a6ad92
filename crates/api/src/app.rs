//! Router assembly.

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    routing::get,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, create_session_layer, request_id_middleware};
use crate::routes;
use crate::services::media::MEDIA_URL_PREFIX;
use crate::state::AppState;

/// Build the complete application router.
///
/// Layers, innermost first: session, CORS, request id, tracing, Sentry.
pub fn build_router(state: AppState) -> Router {
    let config = state.config().clone();

    let auth_limiter = if config.rate_limit {
        let limiter = auth_rate_limiter();
        if limiter.is_none() {
            tracing::warn!("Auth rate limiter could not be built; continuing without it");
        }
        limiter
    } else {
        None
    };

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(auth_limiter))
        .nest_service(MEDIA_URL_PREFIX, ServeDir::new(&config.media_dir))
        .fallback(not_found)
        .layer(create_session_layer(&config))
        .layer(cors_layer(&config))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the storefront and admin frontends.
///
/// Without configured origins any origin is allowed, but without
/// credentials; listed origins may send the session cookie.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the data directory is not readable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.db().is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_owned())
}
