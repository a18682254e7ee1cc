//! # Auth Module
//!
//! This module handles the password side of the authentication protocol:
//! - Registration with validation, email deliverability check and image upload
//! - Login, logout, refresh and the current-user endpoint
//! - The `jwt` session cookie and the AuthedUser extractor for protected routes
//! - Repository access to the user store

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod validators;


pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
