//! Authentication handlers

use axum::{
    extract::{multipart::Field, Extension, Multipart, Path},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tokio::fs as tokio_fs;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::cookies::{expired_session_cookie, session_cookie, SameSite};
use super::extractors::AuthedUser;
use super::models::{LoginRequest, RegisterForm, UploadedImage, User};
use super::repository::{NewPasswordUser, UserRepository};
use super::validators::{LoginValidator, RegisterValidator};
use crate::common::{safe_email_log, ApiError, AppState, Validator};
use crate::services::image_store::{content_type_for, sanitize_filename};

/// POST /register
/// Creates a user account from a multipart form (name, email, password,
/// password_confirmation, image?).
///
/// Registration does not log the user in: no token is minted and no cookie
/// is set. The client is expected to follow up with POST /login.
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let form = collect_register_form(multipart).await?;

    let validation = RegisterValidator.validate(&form);
    if !validation.is_valid {
        return Err(validation.into());
    }

    // Required fields are present once validation passed
    let name = form.name.as_deref().unwrap();
    let email = form.email.as_deref().unwrap();
    let password = form.password.as_deref().unwrap();

    let repo = UserRepository::new(state.db.clone());

    if repo.find_by_email(email).await?.is_some() {
        warn!(
            email = %safe_email_log(email),
            "Registration rejected: email already taken"
        );
        return Err(ApiError::validation(
            "email",
            "The email has already been taken.",
        ));
    }

    // Deliverability check against the third-party validator. Only an
    // affirmative bad verdict blocks; a degraded service fails open.
    let verdict = state.email_validator.validate(email).await;
    if !verdict.is_valid {
        warn!(
            email = %safe_email_log(email),
            reason = %verdict.message,
            "Registration rejected by email validation"
        );
        return Err(ApiError::validation("email", &verdict.message));
    }

    let image_url = match &form.image {
        Some(upload) => {
            let url = state
                .image_store
                .upload_profile_image(email, &upload.data, &upload.filename)
                .await
                .map_err(|e| {
                    error!(error = %e, "Profile image upload failed during registration");
                    ApiError::InternalServer("image upload failed".to_string())
                })?;
            Some(url)
        }
        None => None,
    };

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::InternalServer("registration failed".to_string())
    })?;

    // The unique index still arbitrates if a concurrent registration won
    // the race after the precheck above; the loser maps to the same 422.
    let user = repo
        .create_password_user(NewPasswordUser {
            name,
            email,
            password_hash: &password_hash,
            image: image_url.as_deref(),
        })
        .await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please login with your credentials.",
            "user": {
                "email": user.email,
            }
        })),
    ))
}

/// POST /login
/// Verifies credentials and responds with the session token in both the
/// body context (user payload + message) and an HTTP-only `jwt` cookie.
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = LoginValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_email(&payload.email).await?;

    // Unknown email, social-only account and wrong password all collapse to
    // the same response so a caller cannot probe which addresses exist.
    let user = match user {
        Some(user) => user,
        None => {
            warn!(
                email = %safe_email_log(&payload.email),
                "Login failed: unknown email"
            );
            return Err(invalid_credentials());
        }
    };

    let hash = match user.password_hash.as_deref() {
        Some(hash) => hash,
        None => {
            warn!(user_id = %user.id, "Login failed: account has no password");
            return Err(invalid_credentials());
        }
    };

    let password_ok = bcrypt::verify(&payload.password, hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Password verification error");
        ApiError::InternalServer("login failed".to_string())
    })?;

    if !password_ok {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }

    let token = state.token_issuer.mint(&user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Token minting failed during login");
        ApiError::InternalServer("jwt error".to_string())
    })?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "Login successful"
    );

    respond_with_session(&state, &user, &token, "Login successful")
}

/// GET /me
/// Returns the full record of the authenticated user. The extractor has
/// already verified the token (from the Authorization header, or the cookie
/// via the bridging middleware) and resolved its subject.
pub async fn me(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&authed.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unauthenticated".to_string()))?;

    Ok(Json(user.to_profile_json(&state.encryption)?))
}

/// POST /logout
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// cookie is overwritten with an immediately-expired one so the browser
/// discards it. A still-valid token presented via the Authorization header
/// keeps verifying until it expires.
pub async fn logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    info!(user_id = %authed.id, "User logged out");

    let cookie = expired_session_cookie(state.production);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({ "message": "Successfully logged out" })),
    ))
}

/// POST /refresh
/// Requires a currently valid token; mints a replacement with a fresh
/// expiry for the same subject and responds like login.
pub async fn refresh(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&authed.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unauthenticated".to_string()))?;

    let token = state.token_issuer.mint(&user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Token minting failed during refresh");
        ApiError::InternalServer("jwt error".to_string())
    })?;

    info!(user_id = %user.id, "Session token refreshed");

    respond_with_session(&state, &user, &token, "Token refreshed successfully")
}

/// GET /api/images/:filename - serve locally stored profile images
pub async fn serve_image(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let safe_filename = sanitize_filename(&filename);
    let file_path = state.uploads_dir.join(&safe_filename);

    if !file_path.exists() {
        return Err(ApiError::NotFound("Image not found".to_string()));
    }

    let file_content = tokio_fs::read(&file_path)
        .await
        .map_err(|_| ApiError::InternalServer("Failed to read image file".to_string()))?;

    let content_type = content_type_for(&safe_filename);

    Ok((
        StatusCode::OK,
        [
            ("Content-Type", content_type),
            ("Cache-Control", "public, max-age=31536000"),
        ],
        file_content,
    ))
}

// ---- Helper Functions ----

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

/// Shared login/refresh response: user payload plus the session cookie.
/// Password flows always pin SameSite=Strict.
pub(crate) fn respond_with_session(
    state: &AppState,
    user: &User,
    token: &str,
    message: &str,
) -> Result<axum::response::Response, ApiError> {
    let cookie = session_cookie(
        token,
        state.token_issuer.ttl_minutes(),
        state.production,
        SameSite::Strict,
    );

    let body = json!({
        "user": user.to_session_json(&state.encryption)?,
        "message": message,
    });

    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn collect_register_form(mut multipart: Multipart) -> Result<RegisterForm, ApiError> {
    let mut form = RegisterForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        // Field::text/bytes consume the field, so detach the name first
        let field_name = field.name().map(str::to_string);

        match field_name.as_deref() {
            Some("name") => form.name = Some(text_field(field).await?),
            Some("email") => form.email = Some(text_field(field).await?),
            Some("password") => form.password = Some(text_field(field).await?),
            Some("password_confirmation") => {
                form.password_confirmation = Some(text_field(field).await?)
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let data = field.bytes().await.map_err(|_| {
                    ApiError::BadRequest("failed to read image data".to_string())
                })?;
                form.image = Some(UploadedImage { filename, data });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn text_field(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed form field: {}", e)))
}
