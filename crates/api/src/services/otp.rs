//! One-time SMS login codes.
//!
//! Codes live in an in-memory moka cache keyed by the normalized phone. The
//! cache evicts at twice the code lifetime; the lifetime itself is checked
//! against the issue time so an expired code can be reported as such.

use std::time::{Duration, Instant};

use moka::future::Cache;
use rand::Rng;
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio::sync::Mutex;

use nexx_core::Phone;

use crate::config::OtpConfig;

/// Digits in a generated code.
const CODE_LENGTH: usize = 4;

/// Upper bound on outstanding codes.
const MAX_PENDING_CODES: u64 = 100_000;

/// Why a code was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    /// No code was issued for this phone, or it was evicted.
    #[error("code not found or expired")]
    NotFound,

    /// The code is older than the configured lifetime.
    #[error("code expired")]
    Expired,

    /// The attempt budget was used up.
    #[error("too many attempts")]
    TooManyAttempts,

    /// Wrong code; the entry stays for another try.
    #[error("invalid code, {0} attempts left")]
    InvalidCode(u32),
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    issued_at: Instant,
    attempts: u32,
    message_id: Option<String>,
}

/// Issues and verifies SMS login codes.
pub struct OtpService {
    codes: Cache<String, PendingCode>,
    // Serializes verify's read-modify-write per process.
    verify_lock: Mutex<()>,
    ttl: Duration,
    max_attempts: u32,
    fixed_code: Option<String>,
}

impl std::fmt::Debug for OtpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpService")
            .field("ttl", &self.ttl)
            .field("max_attempts", &self.max_attempts)
            .field("fixed_code", &self.fixed_code.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl OtpService {
    /// Create the service from configuration.
    #[must_use]
    pub fn new(config: &OtpConfig) -> Self {
        let codes = Cache::builder()
            .max_capacity(MAX_PENDING_CODES)
            .time_to_live(config.ttl.saturating_mul(2))
            .build();

        Self {
            codes,
            verify_lock: Mutex::new(()),
            ttl: config.ttl,
            max_attempts: config.max_attempts,
            fixed_code: config
                .fixed_code
                .as_ref()
                .map(|c| c.expose_secret().to_owned()),
        }
    }

    /// A fresh code, or the configured fixed code.
    #[must_use]
    pub fn generate_code(&self) -> String {
        if let Some(code) = &self.fixed_code {
            return code.clone();
        }
        let mut rng = rand::rng();
        (0..CODE_LENGTH)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect()
    }

    /// Remember a code that was delivered to `phone`, replacing any earlier one.
    pub async fn store(&self, phone: &Phone, code: String, message_id: Option<String>) {
        let _guard = self.verify_lock.lock().await;
        self.codes
            .insert(
                phone.digits().to_owned(),
                PendingCode {
                    code,
                    issued_at: Instant::now(),
                    attempts: 0,
                    message_id,
                },
            )
            .await;
    }

    /// Check `code` for `phone`.
    ///
    /// A matching code is consumed. A wrong code costs one attempt.
    ///
    /// # Errors
    ///
    /// Returns the reason the code was rejected; expired and exhausted
    /// entries are removed.
    pub async fn verify(&self, phone: &Phone, code: &str) -> Result<(), OtpError> {
        let _guard = self.verify_lock.lock().await;
        let key = phone.digits().to_owned();

        let mut pending = self.codes.get(&key).await.ok_or(OtpError::NotFound)?;

        if pending.issued_at.elapsed() > self.ttl {
            self.codes.invalidate(&key).await;
            return Err(OtpError::Expired);
        }

        if pending.attempts >= self.max_attempts {
            self.codes.invalidate(&key).await;
            return Err(OtpError::TooManyAttempts);
        }

        if pending.code == code.trim() {
            self.codes.invalidate(&key).await;
            tracing::debug!(
                phone = %phone,
                message_id = pending.message_id.as_deref().unwrap_or("-"),
                "SMS code verified"
            );
            return Ok(());
        }

        pending.attempts += 1;
        let left = self.max_attempts.saturating_sub(pending.attempts);
        self.codes.insert(key, pending).await;
        Err(OtpError::InvalidCode(left))
    }
}
