// src/services/image_store.rs
//! Profile image storage.
//!
//! Uploads go to S3 when credentials are configured and fall back to a local
//! uploads directory otherwise; either way the caller gets back a public URL
//! to persist on the user record.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use infer::Infer;
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs as tokio_fs;
use tracing::{error, info};

use crate::common::generate_raw_id;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("S3 operation failed: {0}")]
    S3Error(String),

    #[error("failed to write image file: {0}")]
    IoError(String),
}

#[derive(Debug)]
struct S3Target {
    client: S3Client,
    bucket: String,
    public_base: String,
}

#[derive(Debug)]
pub struct ImageStoreService {
    s3: Option<S3Target>,
    uploads_dir: PathBuf,
}

impl ImageStoreService {
    /// Build the store from `AWS_*` environment variables, falling back to
    /// local storage when the S3 side is not fully configured.
    pub async fn from_env(uploads_dir: PathBuf) -> Self {
        let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let bucket = env::var("AWS_S3_BUCKET_NAME").ok();

        let s3 = match (access_key_id, secret_access_key, bucket) {
            (Some(access_key_id), Some(secret_access_key), Some(bucket)) if !bucket.is_empty() => {
                let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
                let public_base = env::var("AWS_CLOUDFRONT_DOMAIN")
                    .map(|domain| format!("https://{}", domain))
                    .unwrap_or_else(|_| {
                        format!("https://{}.s3.{}.amazonaws.com", bucket, region)
                    });

                let credentials =
                    Credentials::new(&access_key_id, &secret_access_key, None, None, "env");
                let aws_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region))
                    .credentials_provider(credentials)
                    .load()
                    .await;

                info!(bucket = %bucket, "Image store using S3");
                Some(S3Target {
                    client: S3Client::new(&aws_config),
                    bucket,
                    public_base,
                })
            }
            _ => {
                info!(dir = %uploads_dir.display(), "Image store using local storage");
                None
            }
        };

        Self { s3, uploads_dir }
    }

    /// Local-only store, used by tests and credential-less deployments.
    pub fn local(uploads_dir: PathBuf) -> Self {
        Self {
            s3: None,
            uploads_dir,
        }
    }

    /// Upload a profile image and return its public URL.
    pub async fn upload_profile_image(
        &self,
        owner: &str,
        data: &[u8],
        original_filename: &str,
    ) -> Result<String, ImageStoreError> {
        let extension = extension_for(original_filename).unwrap_or("jpg");
        let filename = format!("profile_{}_{}.{}", owner, generate_raw_id(8), extension);

        if let Some(s3) = &self.s3 {
            let key = format!("images/{}", filename);
            let content_type = content_type_for(&filename);

            s3.client
                .put_object()
                .bucket(&s3.bucket)
                .key(&key)
                .body(ByteStream::from(Bytes::copy_from_slice(data)))
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, key = %key, "Failed to upload image to S3");
                    ImageStoreError::S3Error(format!("Upload failed: {}", e))
                })?;

            info!(key = %key, bucket = %s3.bucket, "Image uploaded to S3");
            return Ok(format!("{}/{}", s3.public_base, key));
        }

        tokio_fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| ImageStoreError::IoError(e.to_string()))?;

        let file_path = self.uploads_dir.join(&filename);
        tokio_fs::write(&file_path, data).await.map_err(|e| {
            error!(error = %e, file_path = %file_path.display(), "Failed to save image file");
            ImageStoreError::IoError(e.to_string())
        })?;

        info!(filename = %filename, "Image file saved locally");
        Ok(format!("/api/images/{}", filename))
    }
}

/// Content sniffing: only real image payloads are accepted for upload.
pub fn is_valid_image_type(data: &[u8]) -> bool {
    let infer = Infer::new();
    if let Some(info) = infer.get(data) {
        matches!(
            info.mime_type(),
            "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/webp"
        )
    } else {
        false
    }
}

pub fn content_type_for(filename: &str) -> &'static str {
    match filename.split('.').last() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/jpeg",
    }
}

fn extension_for(filename: &str) -> Option<&str> {
    filename
        .split('.')
        .last()
        .filter(|ext| matches!(*ext, "jpg" | "jpeg" | "png" | "gif" | "webp"))
}

/// Strip path traversal sequences and unsafe characters from a filename
/// coming off the URL.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned = filename
        .replace("..", "")
        .replace('/', "")
        .replace('\\', "")
        .replace('\0', "");

    let sanitized: String = cleaned
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '-' || *c == '_')
        .collect();

    let truncated: String = sanitized.chars().take(255).collect();

    if truncated.is_empty() {
        "sanitized_file".to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal valid PNG header bytes for content sniffing
    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn test_is_valid_image_type() {
        assert!(is_valid_image_type(PNG_HEADER));
        assert!(!is_valid_image_type(b"<!DOCTYPE html><html></html>"));
        assert!(!is_valid_image_type(b""));
    }

    #[test]
    fn test_sanitize_filename_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("image.png"), "image.png");
        assert_eq!(sanitize_filename(""), "sanitized_file");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.unknown"), "image/jpeg");
    }

    #[tokio::test]
    async fn test_local_upload_returns_served_url() {
        let dir = std::env::temp_dir().join(format!("shop_api_test_{}", generate_raw_id(8)));
        let store = ImageStoreService::local(dir.clone());

        let url = store
            .upload_profile_image("U_K7NP3X", PNG_HEADER, "avatar.png")
            .await
            .expect("Failed to store image");

        assert!(url.starts_with("/api/images/profile_U_K7NP3X_"));
        assert!(url.ends_with(".png"));

        let filename = url.replace("/api/images/", "");
        assert!(dir.join(filename).exists());

        let _ = tokio_fs::remove_dir_all(&dir).await;
    }
}
