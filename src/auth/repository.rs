// src/auth/repository.rs
//! Storage access for user records.
//!
//! All writes that can collide on a unique index map the violation to a
//! distinguishable error variant, so racing requests resolve to exactly one
//! winner and a clean 422 for the loser.

use sqlx::SqlitePool;
use thiserror::Error;

use super::models::User;
use crate::common::{generate_user_id, ApiError};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("email is already registered")]
    EmailTaken,

    #[error("provider identity is already linked")]
    ProviderIdentityTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::EmailTaken => {
                ApiError::validation("email", "The email has already been taken.")
            }
            RepositoryError::ProviderIdentityTaken => ApiError::validation(
                "provider",
                "This social account is already linked to another user.",
            ),
            RepositoryError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

/// New password-account row.
#[derive(Debug)]
pub struct NewPasswordUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub image: Option<&'a str>,
}

/// New social-account row: no password, email pre-verified because the
/// provider vouches for it.
#[derive(Debug)]
pub struct NewSocialUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub provider: &'a str,
    pub provider_id: &'a str,
    pub avatar: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_provider_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE provider = ? AND provider_id = ?")
                .bind(provider)
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    /// Insert a password account. Role is always `user`; it is not a
    /// client-settable field.
    pub async fn create_password_user(
        &self,
        new: NewPasswordUser<'_>,
    ) -> Result<User, RepositoryError> {
        let id = generate_user_id();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, image)
            VALUES (?, ?, ?, ?, 'user', ?)
            "#,
        )
        .bind(&id)
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.image)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.fetch_created(&id).await
    }

    /// Insert a social account with a verified email and no password.
    pub async fn create_social_user(
        &self,
        new: NewSocialUser<'_>,
    ) -> Result<User, RepositoryError> {
        let id = generate_user_id();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, provider, provider_id, avatar, email_verified_at)
            VALUES (?, ?, ?, 'user', ?, ?, ?, datetime('now'))
            "#,
        )
        .bind(&id)
        .bind(new.name)
        .bind(new.email)
        .bind(new.provider)
        .bind(new.provider_id)
        .bind(new.avatar)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.fetch_created(&id).await
    }

    /// Attach a provider identity to an existing account (account linking).
    /// The user id does not change.
    pub async fn attach_provider_identity(
        &self,
        user_id: &str,
        provider: &str,
        provider_id: &str,
        avatar: Option<&str>,
    ) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET provider = ?, provider_id = ?, avatar = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(provider)
        .bind(provider_id)
        .bind(avatar)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.fetch_created(user_id).await
    }

    async fn fetch_created(&self, id: &str) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }
}

fn map_unique_violation(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        let message = db.message();
        if message.contains("users.email") {
            return RepositoryError::EmailTaken;
        }
        if message.contains("users.provider") {
            return RepositoryError::ProviderIdentityTaken;
        }
    }
    RepositoryError::Database(err)
}
