// src/guards.rs
//! Navigation guard decisions.
//!
//! Pure decision logic, kept apart from any UI: the caller supplies the
//! target route and a way to resolve the current user, and gets back what
//! the navigation should do.

use std::future::Future;

use crate::session::SessionUser;

/// Routes reachable without a session.
pub const PUBLIC_ROUTES: &[&str] = &["/login", "/register", "/auth/social-callback"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin { return_url: Option<String> },
    RedirectToDashboard,
}

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES
        .iter()
        .any(|public| path == *public || path.starts_with(*public))
}

/// Guard a navigation to `path`.
///
/// Public routes pass immediately. Everything else blocks until
/// `check_current_user` resolves; with no session the caller is bounced to
/// login carrying the original target as `returnUrl`, and admin-gated
/// routes additionally bounce non-admins to the dashboard.
pub async fn route_guard<F, Fut>(
    path: &str,
    requires_admin: bool,
    check_current_user: F,
) -> GuardDecision
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<SessionUser>>,
{
    if is_public_route(path) {
        return GuardDecision::Allow;
    }

    let user = match check_current_user().await {
        Some(user) => user,
        None => {
            return GuardDecision::RedirectToLogin {
                return_url: Some(path.to_string()),
            }
        }
    };

    if requires_admin && !user.is_admin() {
        return GuardDecision::RedirectToDashboard;
    }

    GuardDecision::Allow
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAccess {
    Allowed,
    Denied,
}

/// The social-callback route only makes sense mid-flow: the URL must carry
/// a token, code or error handed over by the provider hop. Direct
/// navigation is bounced back to login.
pub fn social_callback_guard(query: &str) -> CallbackAccess {
    let has_flow_param = query_params(query).any(|(key, value)| {
        matches!(key, "token" | "access_token" | "code" | "error") && !value.is_empty()
    });

    if has_flow_param {
        CallbackAccess::Allowed
    } else {
        CallbackAccess::Denied
    }
}

fn query_params(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key, value),
            None => (pair, ""),
        })
}
