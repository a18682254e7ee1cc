//! Social login handlers

use axum::{
    extract::{Extension, Path, Query},
    http::{
        header::{LOCATION, SET_COOKIE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::linking::find_or_create_user;
use crate::auth::cookies::{session_cookie, SameSite};
use crate::auth::models::User;
use crate::auth::repository::UserRepository;
use crate::common::{safe_email_log, ApiError, AppState};

/// POST /auth/:provider/token request body
#[derive(Deserialize, Debug)]
pub struct SocialTokenRequest {
    pub access_token: Option<String>,
}

/// GET /auth/:provider/redirect
/// Returns the provider's authorization URL for the client to navigate to.
pub async fn redirect_to_provider(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let driver = state.providers.get(&provider).ok_or_else(|| {
        error!(provider = %provider, "Social login redirect error: unsupported provider");
        ApiError::InternalServer(format!("Unable to connect with {}", provider))
    })?;

    Ok(Json(json!({ "url": driver.authorization_url() })))
}

/// GET /auth/:provider/callback
/// Completes the browser OAuth flow. The browser has navigated away from
/// the single-page app, so success and failure both answer with a redirect
/// back to the frontend - never a rendered error page.
pub async fn provider_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = state_lock.read().await.clone();

    match callback_flow(&state, &provider, &params).await {
        Ok((token, user)) => {
            info!(
                user_id = %user.id,
                email = %safe_email_log(&user.email),
                provider = %provider,
                "Social login successful via callback"
            );

            // SameSite=Lax: the browser lands here on a cross-site redirect,
            // so a Strict cookie would never be sent back.
            let cookie = session_cookie(
                &token,
                state.token_issuer.ttl_minutes(),
                state.production,
                SameSite::Lax,
            );

            let redirect_url = format!(
                "{}/auth/social-callback?token={}",
                state.frontend_url, token
            );

            (
                StatusCode::FOUND,
                [(LOCATION, redirect_url), (SET_COOKIE, cookie)],
            )
                .into_response()
        }
        Err(message) => {
            error!(
                provider = %provider,
                error = %message,
                "Social login callback error"
            );

            let error_url = format!(
                "{}/auth/social-callback?error={}",
                state.frontend_url,
                urlencoding::encode(&format!("Authentication failed: {}", message))
            );
            (StatusCode::FOUND, [(LOCATION, error_url)]).into_response()
        }
    }
}

/// POST /auth/:provider/token
/// Token-exchange flow for clients that already hold a provider access
/// token (mobile and SPA-native logins). Responds with JSON, not a redirect.
pub async fn social_token(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
    Json(payload): Json<SocialTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let access_token = payload
        .access_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            ApiError::validation("access_token", "The access token field is required.")
        })?;

    let driver = state.providers.get(&provider).ok_or_else(|| {
        warn!(provider = %provider, "Social token exchange: unsupported provider");
        ApiError::Unauthorized(format!("Unable to authenticate with {}", provider))
    })?;

    let identity = driver.exchange_token(access_token).await.map_err(|e| {
        warn!(
            provider = %provider,
            error = %e,
            "Social token exchange failed"
        );
        ApiError::Unauthorized(format!("Unable to authenticate with {}", provider))
    })?;

    let repo = UserRepository::new(state.db.clone());
    let user = find_or_create_user(&repo, &provider, &identity).await?;

    let token = state.token_issuer.mint(&user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Token minting failed during social login");
        ApiError::InternalServer("jwt error".to_string())
    })?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = %provider,
        "Social login successful via token exchange"
    );

    let cookie = session_cookie(
        &token,
        state.token_issuer.ttl_minutes(),
        state.production,
        SameSite::Strict,
    );

    let body = json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": state.token_issuer.ttl_seconds(),
        "user": user.to_social_json(&state.encryption)?,
        "message": format!("Social login successful with {}", provider),
    });

    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

// ---- Helper Functions ----

/// The fallible middle of the callback handler. Errors come back as short
/// human-readable strings destined for the frontend's error query parameter.
async fn callback_flow(
    state: &AppState,
    provider: &str,
    params: &HashMap<String, String>,
) -> Result<(String, User), String> {
    if let Some(error) = params.get("error") {
        return Err(format!("provider returned {}", error));
    }

    let code = params
        .get("code")
        .ok_or_else(|| "missing authorization code".to_string())?;

    let driver = state
        .providers
        .get(provider)
        .ok_or_else(|| format!("unsupported provider {}", provider))?;

    let identity = driver
        .exchange_callback(code)
        .await
        .map_err(|e| e.to_string())?;

    let repo = UserRepository::new(state.db.clone());
    let user = find_or_create_user(&repo, provider, &identity)
        .await
        .map_err(|e| e.to_string())?;

    let token = state
        .token_issuer
        .mint(&user.id)
        .map_err(|e| e.to_string())?;

    Ok((token, user))
}
