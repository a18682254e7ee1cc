// src/admin/handlers.rs

use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::AuthedUser;
use crate::common::ApiError;

/// GET /admin/dashboard - admin-only landing endpoint
pub async fn dashboard(authed: AuthedUser) -> Result<Json<serde_json::Value>, ApiError> {
    if !authed.is_admin() {
        warn!(
            user_id = %authed.id,
            role = %authed.role,
            "Admin dashboard access denied: admin privileges required"
        );
        return Err(ApiError::Forbidden("Admin privileges required".to_string()));
    }

    info!(admin_user_id = %authed.id, "Admin dashboard accessed");

    Ok(Json(json!({ "message": "Admin dashboard" })))
}
