// src/client.rs
//! HTTP client for the auth API.
//!
//! The client carries a cookie store, so the `jwt` cookie set by the server
//! is replayed on subsequent requests the way a browser's credentialed
//! fetches would. Every authentication call keeps the session cache in sync.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::session::{SessionCache, SessionUser};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication required")]
    Unauthorized,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("server error: {0}")]
    Server(String),
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: SessionUser,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RedirectResponse {
    url: String,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    pub session: SessionCache,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            session: SessionCache::new(),
        })
    }

    /// POST /register. Succeeds with the server's message; no session is
    /// established (registration and login are separate steps).
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<String, ClientError> {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("email", email.to_string())
            .text("password", password.to_string())
            .text("password_confirmation", password_confirmation.to_string());

        let response = self
            .http
            .post(format!("{}/register", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let body: RegisterResponse = expect_json(response).await?;
        Ok(body.message)
    }

    /// POST /login. On success the server sets the `jwt` cookie in our
    /// store and the returned user is cached.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: AuthResponse = expect_json(response).await?;
        debug!(message = ?body.message, "Login succeeded");
        self.session.set(body.user.clone());
        Ok(body.user)
    }

    /// GET /me. A 401 clears the cache: the cookie-backed session is gone.
    pub async fn me(&self) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .get(format!("{}/me", self.base_url))
            .send()
            .await?;

        match expect_json::<SessionUser>(response).await {
            Ok(user) => {
                self.session.set(user.clone());
                Ok(user)
            }
            Err(ClientError::Unauthorized) => {
                self.session.clear();
                Err(ClientError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve the current user, preferring the cache over a network call.
    /// Failures resolve to `None` - this is the guard's session check.
    pub async fn check_current_user(&self) -> Option<SessionUser> {
        if let Some(user) = self.session.current() {
            return Some(user);
        }
        self.me().await.ok()
    }

    /// POST /logout. Clears the cache; the server answers with an expired
    /// cookie that the store drops.
    pub async fn logout(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .send()
            .await?;

        let body: MessageResponse = expect_json(response).await?;
        self.session.clear();
        Ok(body.message)
    }

    /// POST /refresh. Responds like login: fresh cookie, cached user.
    pub async fn refresh(&self) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .post(format!("{}/refresh", self.base_url))
            .send()
            .await?;

        let body: AuthResponse = expect_json(response).await?;
        self.session.set(body.user.clone());
        Ok(body.user)
    }

    /// GET /auth/{provider}/redirect - the URL to open in a browser.
    pub async fn social_redirect_url(&self, provider: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(format!("{}/auth/{}/redirect", self.base_url, provider))
            .send()
            .await?;

        let body: RedirectResponse = expect_json(response).await?;
        Ok(body.url)
    }

    /// Complete a social login with the token handed back by the callback
    /// redirect: exchange it for the user via the current-user endpoint.
    pub async fn handle_social_callback(&self, token: &str) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .get(format!("{}/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        match expect_json::<SessionUser>(response).await {
            Ok(user) => {
                self.session.set(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Social callback token rejected");
                self.session.clear();
                Err(e)
            }
        }
    }
}

/// Interceptor rule for 401 responses: bounce to login unless already on an
/// auth page, which would loop.
pub fn on_unauthorized(current_path: &str) -> Option<String> {
    const AUTH_ROUTES: &[&str] = &["/login", "/register"];

    if AUTH_ROUTES.iter().any(|route| current_path.starts_with(route)) {
        None
    } else {
        Some("/login".to_string())
    }
}

async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation(body),
        _ => ClientError::Server(format!("HTTP {}: {}", status, body)),
    })
}
