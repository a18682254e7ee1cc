// Application state shared across all modules

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::{
    EmailValidationService, EncryptionService, ImageStoreService, ProviderRegistry, TokenIssuer,
};

/// Application state containing database pool, services, and configuration.
/// The shared HTTP client lives inside the services that talk to the
/// outside world; handlers never reach for it directly.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub uploads_dir: PathBuf,
    pub frontend_url: String,
    pub production: bool,
    pub token_issuer: Arc<TokenIssuer>,
    pub encryption: Arc<EncryptionService>,
    pub email_validator: Arc<EmailValidationService>,
    pub image_store: Arc<ImageStoreService>,
    pub providers: Arc<ProviderRegistry>,
}
