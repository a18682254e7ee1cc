//! # Admin Module
//!
//! Role-gated routes. The rest of the admin surface is unbuilt; the
//! dashboard endpoint exists to anchor the role check.

pub mod handlers;
pub mod routes;

pub use routes::admin_routes;
