//! Settings repository over the singleton `settings.json` document.

use super::{Database, RepositoryError};
use crate::models::settings::keep_secret;
use crate::models::{AbcpSettings, OneCSettings, SeoSettings, Settings, SiteSettings, SmsSettings};

/// Repository for site, SEO and integration settings.
pub struct SettingsRepository<'a> {
    db: &'a Database,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    async fn load(&self) -> Result<Settings, RepositoryError> {
        self.db.settings().load().await
    }

    /// Site settings, defaults when never saved.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn site(&self) -> Result<SiteSettings, RepositoryError> {
        Ok(self.load().await?.site.unwrap_or_default())
    }

    /// Replace the site settings.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn set_site(&self, site: SiteSettings) -> Result<SiteSettings, RepositoryError> {
        self.db
            .settings()
            .update(move |settings| {
                settings.site = Some(site.clone());
                Ok(site)
            })
            .await
    }

    /// SEO settings, defaults when never saved.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn seo(&self) -> Result<SeoSettings, RepositoryError> {
        Ok(self.load().await?.seo.unwrap_or_default())
    }

    /// Replace the SEO settings.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn set_seo(&self, seo: SeoSettings) -> Result<SeoSettings, RepositoryError> {
        self.db
            .settings()
            .update(move |settings| {
                settings.seo = Some(seo.clone());
                Ok(seo)
            })
            .await
    }

    /// Stored SMS gateway settings, unmasked.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn sms(&self) -> Result<Option<SmsSettings>, RepositoryError> {
        Ok(self.load().await?.sms)
    }

    /// Replace the SMS settings, keeping masked secrets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a masked secret with nothing
    /// stored behind it, or a storage error if the document cannot be read or
    /// written.
    pub async fn set_sms(&self, mut sms: SmsSettings) -> Result<SmsSettings, RepositoryError> {
        self.db
            .settings()
            .update(move |settings| {
                sms.keep_secrets_from(settings.sms.as_ref())?;
                settings.sms = Some(sms.clone());
                Ok(sms)
            })
            .await
    }

    /// Stored ABCP account, unmasked.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn abcp(&self) -> Result<Option<AbcpSettings>, RepositoryError> {
        Ok(self.load().await?.abcp)
    }

    /// Replace the ABCP account, keeping a masked password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a masked secret with nothing
    /// stored behind it, or a storage error if the document cannot be read or
    /// written.
    pub async fn set_abcp(&self, mut abcp: AbcpSettings) -> Result<AbcpSettings, RepositoryError> {
        self.db
            .settings()
            .update(move |settings| {
                keep_secret(
                    &mut abcp.password,
                    settings.abcp.as_ref().map(|a| a.password.as_str()),
                )?;
                settings.abcp = Some(abcp.clone());
                Ok(abcp)
            })
            .await
    }

    /// Stored 1C connection, unmasked.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn onec(&self) -> Result<Option<OneCSettings>, RepositoryError> {
        Ok(self.load().await?.onec)
    }

    /// Replace the 1C connection, keeping a masked password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a masked secret with nothing
    /// stored behind it, or a storage error if the document cannot be read or
    /// written.
    pub async fn set_onec(&self, mut onec: OneCSettings) -> Result<OneCSettings, RepositoryError> {
        self.db
            .settings()
            .update(move |settings| {
                keep_secret(
                    &mut onec.password,
                    settings.onec.as_ref().map(|o| o.password.as_str()),
                )?;
                settings.onec = Some(onec.clone());
                Ok(onec)
            })
            .await
    }
}
