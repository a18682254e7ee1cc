// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod admin;
mod auth;
mod common;
mod cookie_middleware;
mod services;
mod social;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::AppState;
use services::{
    EmailValidationService, EncryptionService, ImageStoreService, ProviderRegistry, TokenIssuer,
};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://shop_api.db".to_string());
    let uploads_dir = env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads/images".to_string());
    let jwt_secret =
        env::var("JWT_SECRET").unwrap_or_else(|_| "replace_with_strong_secret".to_string());
    let jwt_ttl_minutes = env::var("JWT_TTL_MINUTES")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(60);
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:4200".to_string());
    let production = env::var("APP_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    info!(
        ttl_minutes = jwt_ttl_minutes,
        frontend_url = %frontend_url,
        production = production,
        "Configuration loaded"
    );

    // ========================================================================
    // DIRECTORY SETUP
    // ========================================================================

    tokio::fs::create_dir_all(&uploads_dir).await?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().no_proxy().build()?;

    let encryption = Arc::new(match EncryptionService::from_env() {
        Ok(service) => service,
        Err(e) => {
            warn!(
                "ENCRYPTION_MASTER_KEY not usable ({}); generating an ephemeral key. \
                 Client-facing ids will not be stable across restarts.",
                e
            );
            EncryptionService::from_key(&EncryptionService::generate_key())?
        }
    });

    let token_issuer = Arc::new(TokenIssuer::new(jwt_secret, jwt_ttl_minutes));
    info!("TokenIssuer initialized");

    let email_validator = Arc::new(EmailValidationService::from_env(http_client.clone()));
    info!("EmailValidationService initialized");

    let image_store = Arc::new(ImageStoreService::from_env(PathBuf::from(&uploads_dir)).await);
    info!("ImageStoreService initialized");

    let providers = Arc::new(ProviderRegistry::from_env(&http_client));
    info!(providers = ?providers.names(), "Social providers configured");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        db: pool,
        uploads_dir: PathBuf::from(uploads_dir),
        frontend_url: frontend_url.clone(),
        production,
        token_issuer,
        encryption,
        email_validator,
        image_store,
        providers,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .merge(social::social_routes())
        .merge(admin::admin_routes())
        // Bridge the jwt cookie into the Authorization header before any
        // authentication runs
        .layer(middleware::from_fn(
            cookie_middleware::extract_jwt_from_cookie,
        ))
        .layer(Extension(shared.clone()))
        .layer({
            // Credentialed CORS for the single-page frontend
            let cors_origins =
                env::var("CORS_ORIGINS").unwrap_or_else(|_| frontend_url.clone());

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
