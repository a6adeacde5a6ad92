//! SMS gateways for login codes.
//!
//! Supports SMSC.ru (login + password) and SMS.ru (API key). Any other
//! provider, or a provider without credentials, runs in mock mode: the message
//! is only logged and a synthetic message id is returned.

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument};

use nexx_core::Phone;

use crate::models::SmsSettings;

const SMSC_SEND_URL: &str = "https://smsc.ru/sys/send.php";
const SMSRU_SEND_URL: &str = "https://sms.ru/sms/send";

/// SMS.ru status code for an accepted request.
const SMSRU_OK: i64 = 100;

/// Provider assumed when no SMS settings were saved.
const DEFAULT_PROVIDER: &str = "smsc";

/// Errors talking to an SMS gateway.
#[derive(Debug, Error)]
pub enum SmsError {
    /// HTTP request failed.
    #[error("SMS request failed: {0}")]
    Request(String),

    /// Gateway answered with something unreadable.
    #[error("SMS response error: {0}")]
    Response(String),

    /// Gateway rejected the message.
    #[error("{0}")]
    Api(String),
}

/// Outcome of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsDelivery {
    pub success: bool,
    /// Provider name, with a `_mock` suffix in mock mode.
    pub provider: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Which gateway a message goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Gateway {
    Smsc {
        login: String,
        password: String,
        sender: String,
    },
    SmsRu {
        api_key: String,
        sender: String,
    },
    Mock(String),
}

impl Gateway {
    fn from_settings(settings: Option<&SmsSettings>) -> Self {
        let Some(settings) = settings else {
            return Self::Mock(DEFAULT_PROVIDER.to_owned());
        };
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_owned);

        match settings.provider.as_str() {
            "smsc" => match (present(&settings.login), present(&settings.password)) {
                (Some(login), Some(password)) => Self::Smsc {
                    login,
                    password,
                    sender: settings.sender.clone(),
                },
                _ => Self::Mock(settings.provider.clone()),
            },
            "smsru" => present(&settings.api_key).map_or_else(
                || Self::Mock(settings.provider.clone()),
                |api_key| Self::SmsRu {
                    api_key,
                    sender: settings.sender.clone(),
                },
            ),
            other => Self::Mock(other.to_owned()),
        }
    }

    fn provider(&self) -> &str {
        match self {
            Self::Smsc { .. } => "smsc",
            Self::SmsRu { .. } => "smsru",
            Self::Mock(provider) => provider,
        }
    }
}

/// The text of a login code message.
#[must_use]
pub fn code_message(code: &str) -> String {
    format!("Код подтверждения NEXX: {code}. Никому не сообщайте этот код!")
}

/// Sends SMS through the configured gateway.
#[derive(Debug, Clone)]
pub struct SmsService {
    client: Client,
}

impl SmsService {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send `message` to `phone`.
    ///
    /// Gateway failures are reported in the returned delivery rather than as
    /// an error, so the caller can relay them to the client.
    #[instrument(skip(self, settings, message), fields(phone = %phone))]
    pub async fn send(
        &self,
        settings: Option<&SmsSettings>,
        phone: &Phone,
        message: &str,
    ) -> SmsDelivery {
        let gateway = Gateway::from_settings(settings);
        let provider = gateway.provider().to_owned();

        let result = match &gateway {
            Gateway::Smsc {
                login,
                password,
                sender,
            } => self.send_smsc(login, password, sender, phone, message).await,
            Gateway::SmsRu { api_key, sender } => {
                self.send_smsru(api_key, sender, phone, message).await
            }
            Gateway::Mock(provider) => {
                info!(provider = %provider, message = %message, "Mock SMS sent");
                return SmsDelivery {
                    success: true,
                    provider: format!("{provider}_mock"),
                    message_id: Some(format!(
                        "mock_{provider}_{}",
                        chrono::Utc::now().timestamp()
                    )),
                    error: None,
                };
            }
        };

        match result {
            Ok(message_id) => {
                info!(provider = %provider, "SMS sent");
                SmsDelivery {
                    success: true,
                    provider,
                    message_id,
                    error: None,
                }
            }
            Err(e) => {
                error!(provider = %provider, error = %e, "SMS send failed");
                SmsDelivery {
                    success: false,
                    provider,
                    message_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn send_smsc(
        &self,
        login: &str,
        password: &str,
        sender: &str,
        phone: &Phone,
        message: &str,
    ) -> Result<Option<String>, SmsError> {
        let response: Value = self
            .client
            .get(SMSC_SEND_URL)
            .query(&[
                ("login", login),
                ("psw", password),
                ("phones", phone.digits()),
                ("mes", message),
                ("charset", "utf-8"),
                ("fmt", "3"),
                ("sender", sender),
            ])
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| SmsError::Response(e.to_string()))?;

        parse_smsc_response(&response).map(Some)
    }

    async fn send_smsru(
        &self,
        api_key: &str,
        sender: &str,
        phone: &Phone,
        message: &str,
    ) -> Result<Option<String>, SmsError> {
        let response: Value = self
            .client
            .post(SMSRU_SEND_URL)
            .form(&[
                ("api_id", api_key),
                ("to", phone.digits()),
                ("msg", message),
                ("json", "1"),
                ("from", sender),
            ])
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| SmsError::Response(e.to_string()))?;

        parse_smsru_response(&response, phone.digits())
    }
}

/// Render a JSON scalar as a string id.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Message id from an SMSC `fmt=3` reply.
fn parse_smsc_response(response: &Value) -> Result<String, SmsError> {
    if let Some(id) = response.get("id").and_then(value_to_string) {
        return Ok(id);
    }
    let code = response
        .get("error_code")
        .and_then(value_to_string)
        .unwrap_or_else(|| "Unknown error".to_owned());
    let detail = response.get("error").and_then(Value::as_str);
    Err(SmsError::Api(detail.map_or_else(
        || format!("SMSC error {code}"),
        |detail| format!("SMSC error {code}: {detail}"),
    )))
}

/// Message id from an SMS.ru `json=1` reply.
fn parse_smsru_response(response: &Value, phone: &str) -> Result<Option<String>, SmsError> {
    if response.get("status_code").and_then(Value::as_i64) == Some(SMSRU_OK) {
        return Ok(response
            .get("sms")
            .and_then(|sms| sms.get(phone))
            .and_then(|entry| entry.get("sms_id"))
            .and_then(value_to_string));
    }
    Err(SmsError::Api(
        response
            .get("status_text")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_owned(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings(provider: &str) -> SmsSettings {
        SmsSettings {
            provider: provider.to_owned(),
            login: None,
            password: None,
            api_key: None,
            sender: "NEXX".to_owned(),
        }
    }

    #[test]
    fn test_gateway_selection() {
        assert_eq!(Gateway::from_settings(None), Gateway::Mock("smsc".to_owned()));
        assert_eq!(
            Gateway::from_settings(Some(&settings("smsc"))),
            Gateway::Mock("smsc".to_owned())
        );
        assert_eq!(
            Gateway::from_settings(Some(&settings("unifone"))),
            Gateway::Mock("unifone".to_owned())
        );

        let mut smsru = settings("smsru");
        smsru.api_key = Some("key".to_owned());
        assert!(matches!(
            Gateway::from_settings(Some(&smsru)),
            Gateway::SmsRu { .. }
        ));

        let mut smsc = settings("smsc");
        smsc.login = Some("nexx".to_owned());
        smsc.password = Some("  ".to_owned());
        assert_eq!(
            Gateway::from_settings(Some(&smsc)),
            Gateway::Mock("smsc".to_owned())
        );
        smsc.password = Some("pw".to_owned());
        assert_eq!(Gateway::from_settings(Some(&smsc)).provider(), "smsc");
    }

    #[tokio::test]
    async fn test_mock_delivery() {
        let service = SmsService::new(Client::new());
        let phone = Phone::parse("89001234567").unwrap();

        let delivery = service.send(None, &phone, &code_message("1234")).await;
        assert!(delivery.success);
        assert_eq!(delivery.provider, "smsc_mock");
        assert!(delivery.message_id.unwrap().starts_with("mock_smsc_"));
        assert!(delivery.error.is_none());
    }

    #[test]
    fn test_code_message() {
        assert_eq!(
            code_message("0042"),
            "Код подтверждения NEXX: 0042. Никому не сообщайте этот код!"
        );
    }

    #[test]
    fn test_parse_smsc() {
        assert_eq!(
            parse_smsc_response(&json!({"id": 12, "cnt": 1})).unwrap(),
            "12"
        );
        let err = parse_smsc_response(&json!({"error": "authorise error", "error_code": 2}))
            .unwrap_err();
        assert_eq!(err.to_string(), "SMSC error 2: authorise error");
    }

    #[test]
    fn test_parse_smsru() {
        let ok = json!({
            "status": "OK",
            "status_code": 100,
            "sms": {"79001234567": {"status": "OK", "status_code": 100, "sms_id": "000-100000"}}
        });
        assert_eq!(
            parse_smsru_response(&ok, "79001234567").unwrap().as_deref(),
            Some("000-100000")
        );

        let rejected = json!({"status": "ERROR", "status_code": 200, "status_text": "Неправильный api_id"});
        assert_eq!(
            parse_smsru_response(&rejected, "79001234567")
                .unwrap_err()
                .to_string(),
            "Неправильный api_id"
        );
    }
}
