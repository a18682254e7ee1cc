// src/auth/validators.rs

use regex::Regex;
use std::sync::OnceLock;

use super::models::{LoginRequest, RegisterForm};
use crate::common::{ValidationResult, Validator};
use crate::services::image_store::is_valid_image_type;

const MAX_NAME_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 255;

/// Upload cap for profile images, in kilobytes.
pub const MAX_IMAGE_KILOBYTES: usize = 2048;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

// ============================================================================
// Registration
// ============================================================================

pub struct RegisterValidator;

impl Validator<RegisterForm> for RegisterValidator {
    fn validate(&self, data: &RegisterForm) -> ValidationResult {
        let mut result = ValidationResult::new();

        // Validate name
        match data.name.as_deref() {
            None => result.add_error("name", "The name field is required."),
            Some(name) if name.trim().is_empty() => {
                result.add_error("name", "The name field is required.")
            }
            Some(name) if name.len() > MAX_NAME_LEN => {
                result.add_error("name", "The name must not be greater than 255 characters.")
            }
            _ => {}
        }

        // Validate email shape; uniqueness and deliverability are checked
        // against the store and the validator service by the handler
        match data.email.as_deref() {
            None => result.add_error("email", "The email field is required."),
            Some(email) if email.trim().is_empty() => {
                result.add_error("email", "The email field is required.")
            }
            Some(email) if email.len() > MAX_EMAIL_LEN => {
                result.add_error("email", "The email must not be greater than 255 characters.")
            }
            Some(email) if !email_regex().is_match(email) => {
                result.add_error("email", "The email must be a valid email address.")
            }
            _ => {}
        }

        // Validate password and its confirmation
        match data.password.as_deref() {
            None => result.add_error("password", "The password field is required."),
            Some(password) if password.is_empty() => {
                result.add_error("password", "The password field is required.")
            }
            Some(password) => {
                if data.password_confirmation.as_deref() != Some(password) {
                    result.add_error("password", "The password confirmation does not match.");
                }
                result.merge(validate_password_strength(password));
            }
        }

        // Validate image if provided
        if let Some(image) = &data.image {
            if image.data.len() > MAX_IMAGE_KILOBYTES * 1024 {
                result.add_error(
                    "image",
                    "The image must not be greater than 2048 kilobytes.",
                );
            } else if !is_valid_image_type(&image.data) {
                result.add_error("image", "The file must be an image.");
            }
        }

        result
    }
}

/// Composed password policy: minimum length, letters, mixed case, digits,
/// symbols. Every violated rule produces its own message.
pub fn validate_password_strength(password: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if password.len() < 8 {
        result.add_error("password", "The password must be at least 8 characters.");
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        result.add_error("password", "The password must contain at least one letter.");
    }
    if !(password.chars().any(|c| c.is_uppercase()) && password.chars().any(|c| c.is_lowercase()))
    {
        result.add_error(
            "password",
            "The password must contain at least one uppercase and one lowercase letter.",
        );
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        result.add_error("password", "The password must contain at least one number.");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        result.add_error("password", "The password must contain at least one symbol.");
    }

    result
}

// ============================================================================
// Login
// ============================================================================

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.email.trim().is_empty() {
            result.add_error("email", "The email field is required.");
        } else if !email_regex().is_match(&data.email) {
            result.add_error("email", "The email must be a valid email address.");
        }

        if data.password.is_empty() {
            result.add_error("password", "The password field is required.");
        }

        result
    }
}
