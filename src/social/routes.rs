//! Social login routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the social login router
///
/// # Routes
/// - `GET /auth/:provider/redirect` - Authorization URL for the browser flow
/// - `GET /auth/:provider/callback` - Provider callback, redirects to the frontend
/// - `POST /auth/:provider/token` - Token-exchange flow for mobile/SPA clients
pub fn social_routes() -> Router {
    Router::new()
        .route(
            "/auth/:provider/redirect",
            get(handlers::redirect_to_provider),
        )
        .route(
            "/auth/:provider/callback",
            get(handlers::provider_callback),
        )
        .route("/auth/:provider/token", post(handlers::social_token))
}
