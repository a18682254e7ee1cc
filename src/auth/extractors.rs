//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::repository::UserRepository;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::services::TokenError;

/// Verified request identity, handed to handlers as an explicit argument.
///
/// Verification is signature + expiry + a live lookup: a token whose subject
/// no longer resolves to a stored user is rejected even when the signature
/// is sound.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.role == super::models::ROLE_ADMIN
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        // The cookie middleware has already bridged the `jwt` cookie into
        // this header when the client sent no explicit credential.
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        // Handle "Bearer <token>" format or raw token
        let bare_token = if let Some(rest) = token.strip_prefix("Bearer ") {
            rest.to_string()
        } else {
            token
        };

        let claims = app_state.token_issuer.verify(&bare_token).map_err(|e| {
            warn!(error = %e, "Session token rejected");
            match e {
                TokenError::Expired => ApiError::Unauthorized("token expired".into()),
                _ => ApiError::Unauthorized("invalid token".into()),
            }
        })?;

        let repo = UserRepository::new(app_state.db.clone());
        let user = repo.find_by_id(&claims.sub).await.map_err(|e| {
            error!(
                error = %e,
                user_id = %claims.sub,
                "Database error during user lookup in authentication"
            );
            ApiError::from(e)
        })?;

        match user {
            Some(u) => {
                debug!(
                    user_id = %u.id,
                    email = %safe_email_log(&u.email),
                    role = %u.role,
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser {
                    id: u.id,
                    email: u.email,
                    role: u.role,
                })
            }
            None => {
                warn!(user_id = %claims.sub, "Authentication failed: user not found in store");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}
