//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::db::{Database, RepositoryError};
use crate::services::media::MediaStorage;
use crate::services::offers::OfferService;
use crate::services::otp::OtpService;
use crate::services::sms::SmsService;

/// Timeout for calls to SMS gateways, ABCP and the payment provider.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open data directory: {0}")]
    Database(#[from] RepositoryError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// store, the configuration and the long-lived services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: Database,
    http: Client,
    otp: OtpService,
    offers: OfferService,
    sms: SmsService,
    media: MediaStorage,
}

impl AppState {
    /// Open the data directory and build the services.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened or the HTTP
    /// client cannot be built.
    pub async fn new(config: ApiConfig) -> Result<Self, StateError> {
        let db = Database::open(&config.data_dir).await?;
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("nexx-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                otp: OtpService::new(&config.otp),
                offers: OfferService::new(http.clone()),
                sms: SmsService::new(http.clone()),
                media: MediaStorage::new(config.media_dir.clone()),
                http,
                db,
                config,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the JSON store.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Shared HTTP client for outbound integrations.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.inner.http
    }

    #[must_use]
    pub fn otp(&self) -> &OtpService {
        &self.inner.otp
    }

    #[must_use]
    pub fn offers(&self) -> &OfferService {
        &self.inner.offers
    }

    #[must_use]
    pub fn sms(&self) -> &SmsService {
        &self.inner.sms
    }

    #[must_use]
    pub fn media(&self) -> &MediaStorage {
        &self.inner.media
    }
}
