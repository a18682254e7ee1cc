//! Authentication data models

use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use tracing::error;

use crate::common::ApiError;
use crate::services::EncryptionService;

pub const ROLE_ADMIN: &str = "admin";

/// User database model.
///
/// `password_hash` never leaves the process and the id is encrypted before
/// it is serialized for a client, so there is no blanket `Serialize` here —
/// responses go through the explicit builders below.
#[derive(FromRow, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub image: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub avatar: Option<String>,
    pub email_verified_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Compact shape carried in login/refresh responses.
    pub fn to_session_json(
        &self,
        encryption: &EncryptionService,
    ) -> Result<serde_json::Value, ApiError> {
        Ok(json!({
            "id": self.encrypted_id(encryption)?,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "image": self.image,
        }))
    }

    /// Social responses prefer the provider avatar over an uploaded image
    /// and carry the provider name.
    pub fn to_social_json(
        &self,
        encryption: &EncryptionService,
    ) -> Result<serde_json::Value, ApiError> {
        Ok(json!({
            "id": self.encrypted_id(encryption)?,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "image": self.avatar.as_ref().or(self.image.as_ref()),
            "provider": self.provider,
        }))
    }

    /// Full record minus credential material, for the current-user endpoint.
    pub fn to_profile_json(
        &self,
        encryption: &EncryptionService,
    ) -> Result<serde_json::Value, ApiError> {
        Ok(json!({
            "id": self.encrypted_id(encryption)?,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "image": self.image,
            "provider": self.provider,
            "avatar": self.avatar,
            "email_verified_at": self.email_verified_at,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        }))
    }

    fn encrypted_id(&self, encryption: &EncryptionService) -> Result<String, ApiError> {
        encryption.encrypt(&self.id).map_err(|e| {
            error!(error = %e, user_id = %self.id, "Failed to encrypt user id");
            ApiError::InternalServer("id encoding failed".to_string())
        })
    }
}

/// POST /login request body
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Collected fields of the multipart registration form.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub data: Bytes,
}
