//! Authentication routes

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /register` - Create an account (multipart form, no token issued)
/// - `POST /login` - Password login, sets the `jwt` cookie
/// - `GET /me` - Current user (token via header or cookie)
/// - `POST /logout` - Clear the session cookie
/// - `POST /refresh` - Re-issue the session token with a fresh expiry
/// - `GET /api/images/:filename` - Locally stored profile images
pub fn auth_routes() -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/me", get(handlers::me))
        .route("/logout", post(handlers::logout))
        .route("/refresh", post(handlers::refresh))
        .route("/api/images/:filename", get(handlers::serve_image))
        // Registration carries an image of up to 2048 KB plus form fields
        .layer(DefaultBodyLimit::max(4 * 1024 * 1024))
}
