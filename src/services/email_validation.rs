// src/services/email_validation.rs
//! Deliverability check against a third-party email validation API.
//!
//! The check is advisory: only an affirmative bad verdict (malformed,
//! disposable, undeliverable) blocks registration. An unreachable, slow or
//! erroring validator fails open so a degraded dependency never takes the
//! registration flow down with it.

use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use crate::common::safe_email_log;

/// Outcome of a deliverability check. When `is_valid` is false the message
/// is suitable for a field-level validation response.
#[derive(Debug, Clone)]
pub struct EmailVerdict {
    pub is_valid: bool,
    pub message: String,
}

impl EmailVerdict {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message: "Email is valid.".to_string(),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BoolCheck {
    value: bool,
}

#[derive(Debug, Deserialize)]
struct ValidationPayload {
    is_valid_format: Option<BoolCheck>,
    is_disposable_email: Option<BoolCheck>,
    deliverability: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailValidationService {
    http: Client,
    api_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl EmailValidationService {
    pub fn new(http: Client, api_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_url,
            api_key,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_env(http: Client) -> Self {
        Self::new(
            http,
            env::var("EMAIL_VALIDATION_URL").ok(),
            env::var("EMAIL_VALIDATION_API_KEY").ok(),
        )
    }

    /// Check an address against the validation API.
    ///
    /// Never returns an error: transport failures and timeouts degrade to a
    /// valid verdict with a diagnostic logged server-side.
    pub async fn validate(&self, email: &str) -> EmailVerdict {
        let (api_url, api_key) = match (&self.api_url, &self.api_key) {
            (Some(url), Some(key)) => (url, key),
            _ => {
                debug!("Email validation not configured, skipping check");
                return EmailVerdict::valid();
            }
        };

        let response = self
            .http
            .get(api_url)
            .query(&[("api_key", api_key.as_str()), ("email", email)])
            .timeout(self.timeout)
            .send()
            .await;

        let payload = match response {
            Ok(r) if r.status().is_success() => match r.json::<ValidationPayload>().await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        error = %e,
                        email = %safe_email_log(email),
                        "Email validation response unparseable, proceeding"
                    );
                    return EmailVerdict::valid();
                }
            },
            Ok(r) => {
                warn!(
                    http_status = %r.status(),
                    email = %safe_email_log(email),
                    "Email validation service returned an error, proceeding"
                );
                return EmailVerdict::valid();
            }
            Err(e) => {
                warn!(
                    error = %e,
                    email = %safe_email_log(email),
                    "Email validation service unreachable, proceeding"
                );
                return EmailVerdict::valid();
            }
        };

        Self::judge(&payload)
    }

    fn judge(payload: &ValidationPayload) -> EmailVerdict {
        if let Some(format) = &payload.is_valid_format {
            if !format.value {
                return EmailVerdict::invalid("The email address format is invalid.");
            }
        }

        if let Some(disposable) = &payload.is_disposable_email {
            if disposable.value {
                return EmailVerdict::invalid("Please use a non-disposable email address.");
            }
        }

        if let Some(deliverability) = &payload.deliverability {
            if deliverability == "UNDELIVERABLE" {
                return EmailVerdict::invalid("This email address appears to be undeliverable.");
            }
        }

        EmailVerdict::valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> ValidationPayload {
        serde_json::from_value(json).expect("Failed to parse payload")
    }

    #[test]
    fn test_judge_accepts_clean_verdict() {
        let verdict = EmailValidationService::judge(&payload(serde_json::json!({
            "is_valid_format": { "value": true },
            "is_disposable_email": { "value": false },
            "deliverability": "DELIVERABLE"
        })));
        assert!(verdict.is_valid);
    }

    #[test]
    fn test_judge_rejects_invalid_format() {
        let verdict = EmailValidationService::judge(&payload(serde_json::json!({
            "is_valid_format": { "value": false }
        })));
        assert!(!verdict.is_valid);
        assert!(verdict.message.contains("format"));
    }

    #[test]
    fn test_judge_rejects_disposable_address() {
        let verdict = EmailValidationService::judge(&payload(serde_json::json!({
            "is_valid_format": { "value": true },
            "is_disposable_email": { "value": true }
        })));
        assert!(!verdict.is_valid);
        assert!(verdict.message.contains("non-disposable"));
    }

    #[test]
    fn test_judge_rejects_undeliverable_address() {
        let verdict = EmailValidationService::judge(&payload(serde_json::json!({
            "deliverability": "UNDELIVERABLE"
        })));
        assert!(!verdict.is_valid);
        assert!(verdict.message.contains("undeliverable"));
    }

    #[test]
    fn test_judge_treats_missing_fields_as_valid() {
        let verdict = EmailValidationService::judge(&payload(serde_json::json!({})));
        assert!(verdict.is_valid);
    }

    #[tokio::test]
    async fn test_unconfigured_service_fails_open() {
        let service = EmailValidationService::new(Client::new(), None, None);
        let verdict = service.validate("ann@x.com").await;
        assert!(verdict.is_valid);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        // Nothing listens on this port; the request errors and the verdict
        // must still allow registration to proceed.
        let service = EmailValidationService::new(
            Client::new(),
            Some("http://127.0.0.1:1/v1".to_string()),
            Some("test_key".to_string()),
        );
        let verdict = service.validate("ann@x.com").await;
        assert!(verdict.is_valid);
    }
}
