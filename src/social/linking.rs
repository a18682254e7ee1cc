// src/social/linking.rs
//! Identity linking: resolving a provider-attested identity to a stored user.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::models::User;
use crate::auth::repository::{NewSocialUser, RepositoryError, UserRepository};
use crate::common::{safe_email_log, ApiError};
use crate::services::ProviderIdentity;

#[derive(Debug, Error)]
pub enum LinkingError {
    #[error("provider identity has no email address")]
    MissingEmail,

    #[error("provider email address is not verified")]
    UnverifiedEmail,

    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

impl From<LinkingError> for ApiError {
    fn from(err: LinkingError) -> Self {
        match err {
            LinkingError::MissingEmail | LinkingError::UnverifiedEmail => {
                ApiError::Unauthorized(err.to_string())
            }
            LinkingError::Repository(e) => e.into(),
        }
    }
}

/// Resolve a provider identity to a user record.
///
/// Lookup order: (provider, provider_id) for repeat logins, then email to
/// link into an existing account, then a fresh password-less record.
///
/// Email-based linking and creation require the provider to assert the
/// address as verified. Merging on an unverified address would let anyone
/// who claims an email at a provider capture the matching local account.
pub async fn find_or_create_user(
    repo: &UserRepository,
    provider: &str,
    identity: &ProviderIdentity,
) -> Result<User, LinkingError> {
    if let Some(user) = repo.find_by_provider_identity(provider, &identity.id).await? {
        debug!(user_id = %user.id, provider = %provider, "Repeat social login");
        return Ok(user);
    }

    let email = identity.email.as_deref().ok_or(LinkingError::MissingEmail)?;

    if !identity.email_verified {
        warn!(
            provider = %provider,
            email = %safe_email_log(email),
            "Refusing to link an unverified provider email"
        );
        return Err(LinkingError::UnverifiedEmail);
    }

    if let Some(user) = repo.find_by_email(email).await? {
        info!(
            user_id = %user.id,
            provider = %provider,
            "Linking social identity to existing account"
        );
        let user = repo
            .attach_provider_identity(&user.id, provider, &identity.id, identity.avatar.as_deref())
            .await?;
        return Ok(user);
    }

    info!(
        email = %safe_email_log(email),
        provider = %provider,
        "Creating user from social identity"
    );

    let user = repo
        .create_social_user(NewSocialUser {
            name: identity.name.as_deref().unwrap_or(email),
            email,
            provider,
            provider_id: &identity.id,
            avatar: identity.avatar.as_deref(),
        })
        .await?;

    Ok(user)
}
