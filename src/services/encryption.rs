// src/services/encryption.rs
//! AES-256-GCM encryption for values that leave the process in opaque form,
//! primarily the client-facing user id.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption key not configured")]
    KeyNotConfigured,

    #[error("Invalid encryption key format")]
    InvalidKeyFormat,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid encrypted data format")]
    InvalidDataFormat,
}

pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("cipher", &"<encrypted>")
            .finish()
    }
}

impl EncryptionService {
    /// Initialize from the `ENCRYPTION_MASTER_KEY` environment variable.
    pub fn from_env() -> Result<Self, EncryptionError> {
        let key_str =
            env::var("ENCRYPTION_MASTER_KEY").map_err(|_| EncryptionError::KeyNotConfigured)?;

        Self::from_key(&key_str)
    }

    /// Initialize from a base64-encoded 32-byte key.
    pub fn from_key(key_str: &str) -> Result<Self, EncryptionError> {
        let key_bytes = BASE64
            .decode(key_str.as_bytes())
            .map_err(|_| EncryptionError::InvalidKeyFormat)?;

        if key_bytes.len() != 32 {
            return Err(EncryptionError::InvalidKeyFormat);
        }

        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key_bytes);
        let cipher = Aes256Gcm::new(key);

        Ok(Self { cipher })
    }

    /// Generate a new random key (base64-encoded).
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Encrypt a plaintext string. The random nonce is prepended to the
    /// ciphertext and the whole value is base64-encoded, so encrypting the
    /// same input twice yields different outputs.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError> {
        let combined = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|_| EncryptionError::InvalidDataFormat)?;

        if combined.len() < 12 {
            return Err(EncryptionError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext_bytes)
            .map_err(|_| EncryptionError::DecryptionFailed("invalid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key = EncryptionService::generate_key();
        assert!(!key.is_empty());

        let service = EncryptionService::from_key(&key);
        assert!(service.is_ok());
    }

    #[test]
    fn test_encrypt_decrypt_user_id() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::from_key(&key).unwrap();

        let user_id = "U_K7NP3X";
        let encrypted = service.encrypt(user_id).unwrap();

        assert_ne!(encrypted, user_id);
        assert_eq!(service.decrypt(&encrypted).unwrap(), user_id);
    }

    #[test]
    fn test_encrypt_is_nondeterministic() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::from_key(&key).unwrap();

        let encrypted1 = service.encrypt("U_K7NP3X").unwrap();
        let encrypted2 = service.encrypt("U_K7NP3X").unwrap();

        // Random nonce: same plaintext, different ciphertext
        assert_ne!(encrypted1, encrypted2);
        assert_eq!(service.decrypt(&encrypted1).unwrap(), "U_K7NP3X");
        assert_eq!(service.decrypt(&encrypted2).unwrap(), "U_K7NP3X");
    }

    #[test]
    fn test_invalid_key_format() {
        assert!(EncryptionService::from_key("invalid_key").is_err());
    }

    #[test]
    fn test_decrypt_invalid_data() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::from_key(&key).unwrap();

        assert!(service.decrypt("invalid_encrypted_data").is_err());
    }
}
