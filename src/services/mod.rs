// Services module - token machinery and external collaborators

pub mod email_validation;
pub mod encryption;
pub mod image_store;
pub mod providers;
pub mod token;

pub use email_validation::EmailValidationService;
pub use encryption::EncryptionService;
pub use image_store::ImageStoreService;
pub use providers::{ProviderIdentity, ProviderRegistry, SocialProvider};
pub use token::{Claims, TokenError, TokenIssuer};
