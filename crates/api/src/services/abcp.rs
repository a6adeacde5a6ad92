//! ABCP distributor API client.
//!
//! Only article search is used. ABCP authenticates every call with the
//! account login and the MD5 hex digest of the password as query parameters.
//! Search replies are parsed leniently: malformed entries are skipped.

use std::str::FromStr;
use std::time::{Duration, Instant};

use md5::{Digest, Md5};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use nexx_core::apply_markup;

use crate::models::{AbcpSettings, SupplierOffer};

/// Per-request timeout for ABCP calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// ABCP error code for a rejected login.
const AUTH_ERROR_CODE: i64 = 102;

/// Delivery estimate when ABCP gives none.
const DEFAULT_DELIVERY_DAYS: u32 = 3;

/// Rating shown for ABCP offers, which carry none.
const DEFAULT_RATING: f32 = 4.5;

/// Errors from the ABCP client.
#[derive(Debug, Error)]
pub enum AbcpError {
    /// No active ABCP account is configured.
    #[error("ABCP service not configured")]
    NotConfigured,

    /// The configured host does not form a valid URL.
    #[error("invalid ABCP host: {0}")]
    InvalidHost(String),

    /// HTTP request failed.
    #[error("ABCP request failed: {0}")]
    Request(String),

    /// Failed to read the response.
    #[error("ABCP response error: {0}")]
    Response(String),

    /// ABCP returned an error document.
    #[error("ABCP API error {code}: {message}")]
    Api { code: i64, message: String },
}

impl AbcpError {
    /// Whether ABCP rejected the credentials.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == AUTH_ERROR_CODE)
    }
}

/// One article from an ABCP search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbcpArticle {
    pub brand: String,
    pub number: String,
    pub description: String,
    pub price: Decimal,
    pub availability: u32,
    pub supplier_code: String,
    pub item_key: String,
    pub delivery_days: u32,
}

impl AbcpArticle {
    /// Quote for this article with `markup_percent` applied.
    #[must_use]
    pub fn into_offer(
        self,
        supplier_id: String,
        supplier_name: String,
        markup_percent: Decimal,
    ) -> SupplierOffer {
        SupplierOffer {
            supplier_id,
            supplier_name,
            client_price: apply_markup(self.price, markup_percent),
            wholesale_price: self.price,
            brand: self.brand,
            part_number: self.number,
            description: self.description,
            stock_quantity: self.availability,
            delivery_time_days: self.delivery_days,
            supplier_rating: Some(DEFAULT_RATING),
            item_key: Some(self.item_key),
        }
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: String,
    pub response_time_ms: u64,
}

/// Client for one ABCP account.
#[derive(Clone)]
pub struct AbcpClient {
    client: Client,
    search_url: Url,
    username: String,
    password_md5: SecretString,
}

impl std::fmt::Debug for AbcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbcpClient")
            .field("search_url", &self.search_url.as_str())
            .field("username", &self.username)
            .field("password_md5", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AbcpClient {
    /// Build a client from stored settings.
    ///
    /// # Errors
    ///
    /// Returns `AbcpError::NotConfigured` when there are no settings or they
    /// are inactive, and `AbcpError::InvalidHost` for an unusable host.
    pub fn from_settings(client: Client, settings: Option<&AbcpSettings>) -> Result<Self, AbcpError> {
        let settings = settings
            .filter(|s| s.active && !s.username.is_empty())
            .ok_or(AbcpError::NotConfigured)?;

        Ok(Self {
            client,
            search_url: search_url(&settings.host)?,
            username: settings.username.clone(),
            password_md5: SecretString::from(password_digest(&settings.password)),
        })
    }

    /// Search articles by part number, optionally narrowed to a brand.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or ABCP answers with an error.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        number: &str,
        brand: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AbcpArticle>, AbcpError> {
        let limit_param = limit.to_string();
        let mut params = vec![("number", number), ("limit", limit_param.as_str())];
        if let Some(brand) = brand.filter(|b| !b.is_empty()) {
            params.push(("brand", brand));
        }

        let body = self.get(&params).await?;
        let mut articles = parse_articles(&body, number, brand)?;
        articles.truncate(limit);

        debug!(count = articles.len(), "ABCP search finished");
        Ok(articles)
    }

    /// Issue a minimal search to check credentials and reachability.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> ConnectionCheck {
        let started = Instant::now();
        let result = self.get(&[("number", "test"), ("limit", "1")]).await;
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (success, message) = match result.and_then(|body| check_error(&body)) {
            Ok(()) => (true, "Подключение успешно".to_owned()),
            Err(e) if e.is_auth_failure() => (false, "Ошибка аутентификации".to_owned()),
            // Other API errors (e.g. nothing found for "test") still prove the login works.
            Err(AbcpError::Api { .. }) => (true, "Подключение успешно".to_owned()),
            Err(e) => {
                warn!(error = %e, "ABCP connection test failed");
                (false, format!("Ошибка подключения: {e}"))
            }
        };

        ConnectionCheck {
            success,
            message,
            response_time_ms,
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value, AbcpError> {
        let response = self
            .client
            .get(self.search_url.clone())
            .query(&[
                ("userlogin", self.username.as_str()),
                ("userpsw", self.password_md5.expose_secret()),
            ])
            .query(params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AbcpError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AbcpError::Response(format!("HTTP Error {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| AbcpError::Response(e.to_string()))
    }
}

/// MD5 hex digest of the account password, as ABCP expects it.
fn password_digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

/// Article search endpoint for `host`, which may include a scheme.
fn search_url(host: &str) -> Result<Url, AbcpError> {
    let host = host.trim().trim_end_matches('/');
    let base = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    };
    Url::parse(&format!("{base}/search/articles"))
        .map_err(|e| AbcpError::InvalidHost(format!("{host}: {e}")))
}

/// Error document check: `{"errorCode": 102, "errorMessage": "..."}`.
fn check_error(body: &Value) -> Result<(), AbcpError> {
    let Some(obj) = body.as_object() else {
        return Ok(());
    };
    if !obj.contains_key("error") && !obj.contains_key("errorCode") {
        return Ok(());
    }

    let code = obj.get("errorCode").and_then(Value::as_i64).unwrap_or(0);
    let message = obj
        .get("errorMessage")
        .or_else(|| obj.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_owned();
    Err(AbcpError::Api { code, message })
}

fn parse_articles(
    body: &Value,
    number: &str,
    brand: Option<&str>,
) -> Result<Vec<AbcpArticle>, AbcpError> {
    check_error(body)?;
    let Some(items) = body.as_array() else {
        return Err(AbcpError::Response("expected an array of articles".to_owned()));
    };

    let articles = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let article = parse_article(item, i + 1, number, brand);
            if article.is_none() {
                warn!(index = i, "Skipping ABCP article without a usable price");
            }
            article
        })
        .collect();
    Ok(articles)
}

fn parse_article(item: &Value, position: usize, number: &str, brand: Option<&str>) -> Option<AbcpArticle> {
    let text = |key: &str| item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    let price = item.get("price").and_then(decimal_value)?;
    if price <= Decimal::ZERO {
        return None;
    }

    // Negative availability means "unknown" or "on request".
    let availability = item
        .get("availability")
        .and_then(integer_value)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);

    let delivery_days = item
        .get("deliveryDays")
        .and_then(integer_value)
        .or_else(|| {
            item.get("deliveryPeriod")
                .and_then(integer_value)
                .map(|hours| (hours + 23) / 24)
        })
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_DELIVERY_DAYS);

    Some(AbcpArticle {
        brand: text("brand").or(brand).unwrap_or("Unknown").to_owned(),
        number: text("number").unwrap_or(number).to_owned(),
        description: text("description").map_or_else(|| format!("Запчасть {number}"), str::to_owned),
        price,
        availability,
        supplier_code: item
            .get("supplierCode")
            .and_then(scalar_string)
            .unwrap_or_else(|| format!("SUP_{position}")),
        item_key: text("itemKey").map_or_else(|| format!("key_{position}"), str::to_owned),
        delivery_days,
    })
}

/// ABCP sends numbers either as JSON numbers or as strings.
fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
