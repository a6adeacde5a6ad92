//! Singleton settings documents.
//!
//! All of them live in `settings.json`. Secrets are stored as-is on disk and
//! replaced by [`MASK`] whenever they are returned. Saving a settings
//! document whose secret equals the mask keeps the stored secret, so a client
//! can round-trip what it received.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nexx_core::SyncRunId;

use super::MASK;
use crate::db::RepositoryError;

/// Everything stored in `settings.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub site: Option<SiteSettings>,
    #[serde(default)]
    pub seo: Option<SeoSettings>,
    #[serde(default)]
    pub sms: Option<SmsSettings>,
    #[serde(default)]
    pub abcp: Option<AbcpSettings>,
    #[serde(default)]
    pub onec: Option<OneCSettings>,
}

/// Keep `current` when `incoming` is the mask.
///
/// A mask with nothing stored behind it is rejected rather than saved as the
/// secret itself.
pub(crate) fn keep_secret(
    incoming: &mut String,
    current: Option<&str>,
) -> Result<(), RepositoryError> {
    if incoming != MASK {
        return Ok(());
    }
    let current = current.ok_or_else(|| {
        RepositoryError::Conflict("Masked secret has no stored value".to_owned())
    })?;
    current.clone_into(incoming);
    Ok(())
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Site
// =============================================================================

/// Company details and branding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub company_name: String,
    #[serde(default)]
    pub company_inn: Option<String>,
    #[serde(default)]
    pub company_address: Option<String>,
    #[serde(default)]
    pub company_phone: Option<String>,
    #[serde(default)]
    pub company_email: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_secondary_color")]
    pub secondary_color: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
}

fn default_primary_color() -> String {
    "#1e40af".to_owned()
}

fn default_secondary_color() -> String {
    "#64748b".to_owned()
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            company_name: "NEXX".to_owned(),
            company_inn: None,
            company_address: None,
            company_phone: None,
            company_email: None,
            logo_url: None,
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            meta_title: Some("NEXX - оригинальные запчасти JCB".to_owned()),
            meta_description: None,
        }
    }
}

// =============================================================================
// SEO
// =============================================================================

/// Search engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoSettings {
    /// Custom robots.txt body; a default is served when unset.
    #[serde(default)]
    pub robots_txt: Option<String>,
    #[serde(default = "default_true")]
    pub sitemap_enabled: bool,
    #[serde(default)]
    pub google_analytics: Option<String>,
    #[serde(default)]
    pub yandex_metrika: Option<String>,
    #[serde(default)]
    pub google_search_console: Option<String>,
    #[serde(default)]
    pub yandex_webmaster: Option<String>,
    #[serde(default = "default_true")]
    pub structured_data: bool,
    #[serde(default = "default_true")]
    pub open_graph: bool,
}

impl Default for SeoSettings {
    fn default() -> Self {
        Self {
            robots_txt: None,
            sitemap_enabled: true,
            google_analytics: None,
            yandex_metrika: None,
            google_search_console: None,
            yandex_webmaster: None,
            structured_data: true,
            open_graph: true,
        }
    }
}

// =============================================================================
// SMS
// =============================================================================

/// SMS gateway credentials.
///
/// `smsc` uses login and password, `smsru` uses the API key. Any other
/// provider, or missing credentials, means codes are only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsSettings {
    pub provider: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_sender")]
    pub sender: String,
}

fn default_sender() -> String {
    "NEXX".to_owned()
}

impl SmsSettings {
    /// Copy with password and API key masked.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| MASK.to_owned()),
            api_key: self.api_key.as_ref().map(|_| MASK.to_owned()),
            ..self.clone()
        }
    }

    /// Restore masked secrets from the stored settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a masked secret with nothing
    /// stored behind it.
    pub fn keep_secrets_from(&mut self, current: Option<&Self>) -> Result<(), RepositoryError> {
        if let Some(password) = self.password.as_mut() {
            keep_secret(password, current.and_then(|c| c.password.as_deref()))?;
        }
        if let Some(api_key) = self.api_key.as_mut() {
            keep_secret(api_key, current.and_then(|c| c.api_key.as_deref()))?;
        }
        Ok(())
    }
}

// =============================================================================
// ABCP
// =============================================================================

/// ABCP distributor account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbcpSettings {
    pub username: String,
    pub password: String,
    #[serde(default = "default_abcp_host")]
    pub host: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_abcp_host() -> String {
    "api.abcp.ru".to_owned()
}

impl AbcpSettings {
    /// Copy with the password masked.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            password: MASK.to_owned(),
            ..self.clone()
        }
    }
}

// =============================================================================
// 1C
// =============================================================================

/// 1C accounting server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneCSettings {
    pub server_url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub sync_products: bool,
    #[serde(default = "default_true")]
    pub sync_prices: bool,
    #[serde(default = "default_true")]
    pub sync_orders: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl OneCSettings {
    /// Copy with the password masked.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            password: MASK.to_owned(),
            ..self.clone()
        }
    }
}

/// What a 1C sync run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Products,
    Prices,
    Orders,
    All,
}

impl SyncType {
    #[must_use]
    pub const fn includes_products(self) -> bool {
        matches!(self, Self::Products | Self::All)
    }

    #[must_use]
    pub const fn includes_prices(self) -> bool {
        matches!(self, Self::Prices | Self::All)
    }

    #[must_use]
    pub const fn includes_orders(self) -> bool {
        matches!(self, Self::Orders | Self::All)
    }
}

/// Counters reported by a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResults {
    pub products_synced: usize,
    pub prices_updated: usize,
    pub orders_sent: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// One entry of the 1C sync history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: SyncRunId,
    pub sync_type: SyncType,
    #[serde(default)]
    pub force: bool,
    /// Orders were part of this run and enabled in the settings.
    #[serde(default)]
    pub orders_exported: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: SyncResults,
}

impl SyncRun {
    /// A run without errors.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.results.errors.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_document_parses() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.site.is_none());
        assert!(settings.onec.is_none());
    }

    #[test]
    fn test_seo_defaults_from_partial_input() {
        let seo: SeoSettings = serde_json::from_str(r#"{"yandex_metrika": "123"}"#).unwrap();
        assert!(seo.sitemap_enabled);
        assert!(seo.open_graph);
        assert_eq!(seo.yandex_metrika.as_deref(), Some("123"));
    }

    #[test]
    fn test_sms_mask_and_restore() {
        let stored = SmsSettings {
            provider: "smsru".to_owned(),
            login: None,
            password: None,
            api_key: Some("real-key".to_owned()),
            sender: default_sender(),
        };
        let mut incoming = stored.masked();
        assert_eq!(incoming.api_key.as_deref(), Some(MASK));
        assert!(incoming.password.is_none());

        incoming.keep_secrets_from(Some(&stored)).unwrap();
        assert_eq!(incoming.api_key.as_deref(), Some("real-key"));

        let mut fresh = stored.masked();
        assert!(matches!(
            fresh.keep_secrets_from(None),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_sync_type_coverage() {
        assert!(SyncType::All.includes_orders());
        assert!(SyncType::Prices.includes_prices());
        assert!(!SyncType::Prices.includes_products());
        let parsed: SyncType = serde_json::from_str("\"orders\"").unwrap();
        assert_eq!(parsed, SyncType::Orders);
    }
}
