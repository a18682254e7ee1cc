//! Tests for the social module
//!
//! Identity linking runs against an in-memory store; the handler tests cover
//! the redirect/token surfaces and the error-redirect path of the callback
//! (the happy callback path needs a live provider and is exercised by the
//! linking tests below the HTTP layer).

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::{middleware, Extension, Router};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    use crate::auth::repository::{NewPasswordUser, RepositoryError, UserRepository};
    use crate::common::{migrations, AppState};
    use crate::cookie_middleware;
    use crate::services::providers::GoogleProvider;
    use crate::services::{
        EmailValidationService, EncryptionService, ImageStoreService, ProviderIdentity,
        ProviderRegistry, TokenIssuer,
    };
    use crate::social::linking::{find_or_create_user, LinkingError};

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");
        migrations::run_migrations(&pool)
            .await
            .expect("Migrations failed");
        pool
    }

    fn identity(provider_id: &str, email: Option<&str>, verified: bool) -> ProviderIdentity {
        ProviderIdentity {
            id: provider_id.to_string(),
            name: Some("Ann".to_string()),
            email: email.map(str::to_string),
            email_verified: verified,
            avatar: Some("https://lh3.example.com/ann.jpg".to_string()),
        }
    }

    // ========================================================================
    // Identity linking
    // ========================================================================

    #[tokio::test]
    async fn test_linking_creates_preverified_social_user() {
        let repo = UserRepository::new(test_pool().await);

        let user = find_or_create_user(&repo, "google", &identity("g-1", Some("ann@x.com"), true))
            .await
            .expect("Linking failed");

        assert_eq!(user.email, "ann@x.com");
        assert_eq!(user.role, "user");
        assert_eq!(user.provider.as_deref(), Some("google"));
        assert_eq!(user.provider_id.as_deref(), Some("g-1"));
        assert!(user.password_hash.is_none());
        assert!(
            user.email_verified_at.is_some(),
            "provider vouches for the email"
        );
    }

    #[tokio::test]
    async fn test_linking_repeat_login_returns_same_user() {
        let repo = UserRepository::new(test_pool().await);
        let id = identity("g-1", Some("ann@x.com"), true);

        let first = find_or_create_user(&repo, "google", &id).await.unwrap();
        let second = find_or_create_user(&repo, "google", &id).await.unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_linking_attaches_to_password_account_by_email() {
        let repo = UserRepository::new(test_pool().await);

        let existing = repo
            .create_password_user(NewPasswordUser {
                name: "Ann",
                email: "ann@x.com",
                password_hash: "$2b$12$fakefakefakefakefakefake",
                image: None,
            })
            .await
            .unwrap();

        let linked = find_or_create_user(&repo, "google", &identity("g-1", Some("ann@x.com"), true))
            .await
            .unwrap();

        // Same record, now carrying the provider identity; the password
        // survives so password login keeps working
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.provider.as_deref(), Some("google"));
        assert_eq!(linked.provider_id.as_deref(), Some("g-1"));
        assert_eq!(
            linked.avatar.as_deref(),
            Some("https://lh3.example.com/ann.jpg")
        );
        assert_eq!(linked.password_hash, existing.password_hash);
    }

    #[tokio::test]
    async fn test_linking_refuses_unverified_email() {
        let repo = UserRepository::new(test_pool().await);

        let result =
            find_or_create_user(&repo, "google", &identity("g-1", Some("ann@x.com"), false)).await;
        assert!(matches!(result, Err(LinkingError::UnverifiedEmail)));

        let result = find_or_create_user(&repo, "google", &identity("g-1", None, true)).await;
        assert!(matches!(result, Err(LinkingError::MissingEmail)));
    }

    #[tokio::test]
    async fn test_linking_repeat_login_skips_verification_check() {
        // Verification gates email merging, not (provider, provider_id) lookup
        let repo = UserRepository::new(test_pool().await);

        find_or_create_user(&repo, "google", &identity("g-1", Some("ann@x.com"), true))
            .await
            .unwrap();

        let repeat = find_or_create_user(&repo, "google", &identity("g-1", Some("ann@x.com"), false))
            .await
            .expect("repeat login should not re-check verification");
        assert_eq!(repeat.provider_id.as_deref(), Some("g-1"));
    }

    #[tokio::test]
    async fn test_provider_identity_uniqueness_is_enforced() {
        let repo = UserRepository::new(test_pool().await);

        find_or_create_user(&repo, "google", &identity("g-1", Some("ann@x.com"), true))
            .await
            .unwrap();

        let other = repo
            .create_password_user(NewPasswordUser {
                name: "Bob",
                email: "bob@x.com",
                password_hash: "$2b$12$fakefakefakefakefakefake",
                image: None,
            })
            .await
            .unwrap();

        let result = repo
            .attach_provider_identity(&other.id, "google", "g-1", None)
            .await;
        assert!(matches!(result, Err(RepositoryError::ProviderIdentityTaken)));
    }

    // ========================================================================
    // HTTP surface
    // ========================================================================

    async fn test_state() -> Arc<RwLock<AppState>> {
        let pool = test_pool().await;
        let http = reqwest::Client::new();
        let uploads_dir = std::env::temp_dir().join("shop_api_social_tests");

        let mut providers = ProviderRegistry::empty();
        providers.register(Arc::new(GoogleProvider::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "http://localhost:8080/auth/google/callback".to_string(),
            http.clone(),
        )));

        let state = AppState {
            db: pool,
            uploads_dir: uploads_dir.clone(),
            frontend_url: "http://localhost:4200".to_string(),
            production: false,
            token_issuer: Arc::new(TokenIssuer::new("test_secret_key".to_string(), 60)),
            encryption: Arc::new(
                EncryptionService::from_key(&EncryptionService::generate_key())
                    .expect("Failed to build encryption service"),
            ),
            email_validator: Arc::new(EmailValidationService::new(http.clone(), None, None)),
            image_store: Arc::new(ImageStoreService::local(uploads_dir)),
            providers: Arc::new(providers),
        };

        Arc::new(RwLock::new(state))
    }

    fn app(state: Arc<RwLock<AppState>>) -> Router {
        Router::new()
            .merge(crate::social::social_routes())
            .layer(middleware::from_fn(
                cookie_middleware::extract_jwt_from_cookie,
            ))
            .layer(Extension(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&bytes).expect("Response was not JSON")
    }

    #[tokio::test]
    async fn test_redirect_returns_authorization_url() {
        let response = app(test_state().await)
            .oneshot(
                Request::builder()
                    .uri("/auth/google/redirect")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("https://accounts.google.com/"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_redirect_unsupported_provider_is_500() {
        let response = app(test_state().await)
            .oneshot(
                Request::builder()
                    .uri("/auth/myspace/redirect")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unable to connect with myspace");
    }

    #[tokio::test]
    async fn test_callback_with_provider_error_redirects_to_frontend() {
        let response = app(test_state().await)
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback?error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with("http://localhost:4200/auth/social-callback?error="));
        assert!(location.contains("Authentication%20failed"));
        assert!(
            response.headers().get(header::SET_COOKIE).is_none(),
            "no session on a failed flow"
        );
    }

    #[tokio::test]
    async fn test_callback_without_code_redirects_with_error() {
        let response = app(test_state().await)
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.contains("error="));
        assert!(location.contains(urlencoding::encode("missing authorization code").as_ref()));
    }

    #[tokio::test]
    async fn test_token_exchange_requires_access_token() {
        let response = app(test_state().await)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/google/token")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["errors"]["access_token"].is_array());
    }

    #[tokio::test]
    async fn test_token_exchange_unsupported_provider_is_401() {
        let response = app(test_state().await)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/myspace/token")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"access_token":"tok"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unable to authenticate with myspace");
    }
}
