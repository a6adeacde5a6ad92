//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults suit local development.
//!
//! - `NEXX_HOST` - Bind address (default: 127.0.0.1)
//! - `NEXX_PORT` - Listen port (default: 8001)
//! - `NEXX_DATA_DIR` - Directory holding the JSON collections (default: data)
//! - `NEXX_MEDIA_DIR` - Directory for uploaded media (default: `<data>/media`)
//! - `NEXX_BASE_URL` - Public URL used in sitemap and payment return links
//! - `NEXX_CORS_ORIGINS` - Comma-separated allowed origins, or `*`
//! - `NEXX_RATE_LIMIT` - Enable auth rate limiting (default: true)
//! - `NEXX_OTP_TTL_SECS` - SMS code lifetime (default: 300)
//! - `NEXX_OTP_MAX_ATTEMPTS` - Wrong guesses before a code is burned (default: 3)
//! - `NEXX_OTP_FIXED_CODE` - Staging only: every SMS code is this value
//! - `NEXX_PAYMENTS_LIVE` - Call the real payment provider (default: false)
//! - `NEXX_ABCP_MARKUP_PERCENT` - Markup on ABCP quotes without a supplier record (default: 15)
//! - `NEXX_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the JSON collections
    pub data_dir: PathBuf,
    /// Directory for uploaded media files
    pub media_dir: PathBuf,
    /// Public base URL (no trailing slash)
    pub base_url: String,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Whether auth endpoints are rate limited
    pub rate_limit: bool,
    /// SMS one-time password settings
    pub otp: OtpConfig,
    /// Whether payments go to the real provider
    pub payments_live: bool,
    /// Markup for ABCP quotes that have no supplier record
    pub abcp_markup_percent: Decimal,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// SMS one-time password configuration.
///
/// Implements `Debug` manually to redact the fixed code.
#[derive(Clone)]
pub struct OtpConfig {
    /// How long a code stays valid
    pub ttl: Duration,
    /// Wrong guesses allowed before the code is discarded
    pub max_attempts: u32,
    /// Staging override: use this code instead of a random one
    pub fixed_code: Option<SecretString>,
}

impl std::fmt::Debug for OtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpConfig")
            .field("ttl", &self.ttl)
            .field("max_attempts", &self.max_attempts)
            .field(
                "fixed_code",
                &self.fixed_code.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_attempts: 3,
            fixed_code: None,
        }
    }
}

/// Sentry configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; Sentry is disabled when unset
    pub dsn: Option<String>,
    /// Environment tag (e.g. production, staging)
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Performance transaction sample rate
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or("NEXX_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_env_or("NEXX_PORT", 8001_u16)?;
        let data_dir = PathBuf::from(get_env_or_default("NEXX_DATA_DIR", "data"));
        let media_dir = get_optional_env("NEXX_MEDIA_DIR")
            .map_or_else(|| data_dir.join("media"), PathBuf::from);
        let base_url = get_env_or_default("NEXX_BASE_URL", &format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();
        let cors_origins = parse_origins(&get_env_or_default("NEXX_CORS_ORIGINS", "*"));

        let otp = OtpConfig {
            ttl: Duration::from_secs(parse_env_or("NEXX_OTP_TTL_SECS", 300_u64)?),
            max_attempts: parse_env_or("NEXX_OTP_MAX_ATTEMPTS", 3_u32)?,
            fixed_code: get_optional_env("NEXX_OTP_FIXED_CODE").map(SecretString::from),
        };

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            traces_sample_rate: parse_env_or("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            media_dir,
            base_url,
            cors_origins,
            rate_limit: parse_bool_env("NEXX_RATE_LIMIT", true)?,
            otp,
            payments_live: parse_bool_env("NEXX_PAYMENTS_LIVE", false)?,
            abcp_markup_percent: parse_env_or("NEXX_ABCP_MARKUP_PERCENT", Decimal::new(15, 0))?,
            log_json: parse_bool_env("NEXX_LOG_JSON", false)?,
            sentry,
        })
    }

    /// Configuration rooted at `data_dir` with development defaults.
    ///
    /// Used by the CLI and by tests; never reads the environment.
    #[must_use]
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8001,
            media_dir: data_dir.join("media"),
            data_dir,
            base_url: "http://localhost:8001".to_owned(),
            cors_origins: Vec::new(),
            rate_limit: false,
            otp: OtpConfig::default(),
            payments_live: false,
            abcp_markup_percent: Decimal::new(15, 0),
            log_json: false,
            sentry: SentryConfig::default(),
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`.
fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| parse_bool(&raw).ok_or_else(|| {
        ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got '{raw}'"))
    }))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated origin list; `*` means any origin.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .map(|o| o.trim_end_matches('/').to_owned())
        .collect()
}
