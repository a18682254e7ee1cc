//! # Social Module
//!
//! Social-provider login: the browser redirect flow, the token-exchange flow
//! for clients that already hold a provider access token, and the identity
//! linking rules shared by both.

pub mod handlers;
pub mod linking;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::social_routes;
