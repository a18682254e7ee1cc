//! Client-side session handling for the shop API.
//!
//! Holds the pieces a frontend needs around the REST surface: a reactive
//! cache of the current user, navigation guard decisions, and a credentialed
//! HTTP client that keeps the cache in sync.

pub mod client;
pub mod guards;
pub mod session;

pub use client::{on_unauthorized, ApiClient, ClientError};
pub use guards::{route_guard, social_callback_guard, CallbackAccess, GuardDecision};
pub use session::{SessionCache, SessionUser};
