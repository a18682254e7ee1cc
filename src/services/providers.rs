// src/services/providers.rs
//! OAuth provider drivers.
//!
//! Each provider implements the same small capability surface: build a
//! stateless authorization URL, exchange a callback code, or exchange a
//! client-held access token — all ending in a [`ProviderIdentity`]. Handlers
//! pick a driver from the registry by the provider name in the route.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("OAuth exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("provider returned an incomplete identity: {0}")]
    IncompleteIdentity(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
}

/// Identity attested by a social provider.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub avatar: Option<String>,
}

#[async_trait]
pub trait SocialProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stateless authorization URL for the browser redirect flow.
    fn authorization_url(&self) -> String;

    /// Exchange the callback authorization code for a provider identity.
    async fn exchange_callback(&self, code: &str) -> Result<ProviderIdentity, ProviderError>;

    /// Exchange a client-held access token for a provider identity.
    async fn exchange_token(&self, access_token: &str) -> Result<ProviderIdentity, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

// ============================================================================
// Google
// ============================================================================

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    email_verified: Option<bool>,
    picture: Option<String>,
}

impl GoogleProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String, http: Client) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            http,
        }
    }

    pub fn from_env(http: &Client) -> Option<Self> {
        let client_id = env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/auth/google/callback".to_string());

        Some(Self::new(client_id, client_secret, redirect_uri, http.clone()))
    }
}

#[async_trait]
impl SocialProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self) -> String {
        let scope = "openid email profile";
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(scope)
        )
    }

    async fn exchange_callback(&self, code: &str) -> Result<ProviderIdentity, ProviderError> {
        let params = [
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging Google authorization code for tokens");

        let response = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&params)
            .timeout(EXCHANGE_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Google token exchange failed");
            return Err(ProviderError::ExchangeFailed(format!("HTTP {}", status)));
        }

        let token = response
            .json::<OAuthTokenResponse>()
            .await
            .map_err(|e| ProviderError::ExchangeFailed(e.to_string()))?;

        self.exchange_token(&token.access_token).await
    }

    async fn exchange_token(&self, access_token: &str) -> Result<ProviderIdentity, ProviderError> {
        let response = self
            .http
            .get("https://www.googleapis.com/oauth2/v3/userinfo")
            .bearer_auth(access_token)
            .timeout(EXCHANGE_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ExchangeFailed(format!(
                "userinfo returned HTTP {}",
                status
            )));
        }

        let info = response
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| ProviderError::IncompleteIdentity(e.to_string()))?;

        Ok(ProviderIdentity {
            id: info.sub,
            name: info.name,
            email: info.email,
            email_verified: info.email_verified.unwrap_or(false),
            avatar: info.picture,
        })
    }
}

// ============================================================================
// Facebook
// ============================================================================

pub struct FacebookProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct FacebookUserInfo {
    id: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: FacebookPictureData,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

impl FacebookProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String, http: Client) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            http,
        }
    }

    pub fn from_env(http: &Client) -> Option<Self> {
        let client_id = env::var("FACEBOOK_CLIENT_ID").ok()?;
        let client_secret = env::var("FACEBOOK_CLIENT_SECRET").ok()?;
        let redirect_uri = env::var("FACEBOOK_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/auth/facebook/callback".to_string());

        Some(Self::new(client_id, client_secret, redirect_uri, http.clone()))
    }
}

#[async_trait]
impl SocialProvider for FacebookProvider {
    fn name(&self) -> &'static str {
        "facebook"
    }

    fn authorization_url(&self) -> String {
        format!(
            "https://www.facebook.com/v18.0/dialog/oauth?client_id={}&redirect_uri={}&scope={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode("email,public_profile")
        )
    }

    async fn exchange_callback(&self, code: &str) -> Result<ProviderIdentity, ProviderError> {
        debug!("Exchanging Facebook authorization code for tokens");

        let response = self
            .http
            .get("https://graph.facebook.com/v18.0/oauth/access_token")
            .query(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_uri),
            ])
            .timeout(EXCHANGE_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Facebook token exchange failed");
            return Err(ProviderError::ExchangeFailed(format!("HTTP {}", status)));
        }

        let token = response
            .json::<OAuthTokenResponse>()
            .await
            .map_err(|e| ProviderError::ExchangeFailed(e.to_string()))?;

        self.exchange_token(&token.access_token).await
    }

    async fn exchange_token(&self, access_token: &str) -> Result<ProviderIdentity, ProviderError> {
        let response = self
            .http
            .get("https://graph.facebook.com/me")
            .query(&[
                ("fields", "id,name,email,picture"),
                ("access_token", access_token),
            ])
            .timeout(EXCHANGE_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ExchangeFailed(format!(
                "profile fetch returned HTTP {}",
                status
            )));
        }

        let info = response
            .json::<FacebookUserInfo>()
            .await
            .map_err(|e| ProviderError::IncompleteIdentity(e.to_string()))?;

        // The Graph API only returns confirmed email addresses.
        let email_verified = info.email.is_some();

        Ok(ProviderIdentity {
            id: info.id,
            name: info.name,
            email: info.email,
            email_verified,
            avatar: info.picture.and_then(|p| p.data.url),
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn SocialProvider>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register every provider with credentials in the environment.
    pub fn from_env(http: &Client) -> Self {
        let mut registry = Self::empty();

        if let Some(google) = GoogleProvider::from_env(http) {
            registry.register(Arc::new(google));
        }
        if let Some(facebook) = FacebookProvider::from_env(http) {
            registry.register(Arc::new(facebook));
        }

        registry
    }

    pub fn register(&mut self, provider: Arc<dyn SocialProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SocialProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> GoogleProvider {
        GoogleProvider::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "http://localhost:8080/auth/google/callback".to_string(),
            Client::new(),
        )
    }

    #[test]
    fn test_google_authorization_url_is_stateless() {
        let url = google().authorization_url();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20email%20profile"));
        // No server-held interim state correlates request and callback
        assert!(!url.contains("state="));
    }

    #[test]
    fn test_facebook_authorization_url() {
        let facebook = FacebookProvider::new(
            "fb-id".to_string(),
            "fb-secret".to_string(),
            "http://localhost:8080/auth/facebook/callback".to_string(),
            Client::new(),
        );
        let url = facebook.authorization_url();
        assert!(url.starts_with("https://www.facebook.com/v18.0/dialog/oauth?"));
        assert!(url.contains("client_id=fb-id"));
        assert!(url.contains("scope=email%2Cpublic_profile"));
    }

    #[test]
    fn test_registry_lookup_by_route_segment() {
        let mut registry = ProviderRegistry::empty();
        registry.register(Arc::new(google()));

        assert!(registry.get("google").is_some());
        assert!(registry.get("facebook").is_none());
        assert!(registry.get("twitter").is_none());
    }
}
