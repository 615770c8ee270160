//! Blob storage for uploaded resumes.
//!
//! Resumes are written once per submission and never rolled back: if the
//! database write that follows fails, the object is left in place.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Download of {key} failed: {message}")]
    Download { key: String, message: String },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), BlobError>;

    async fn get(&self, key: &str) -> Result<Bytes, BlobError>;
}

/// Builds the storage key for a resume upload.
///
/// Only the final path component of the caller's filename is kept, so a
/// crafted name cannot escape the `resumes/` prefix. Re-uploading a file with
/// the same name for the same (user, job) pair targets the same key.
pub fn resume_key(user_id: Uuid, job_id: Uuid, filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    format!("resumes/{user_id}_{job_id}_{base}")
}

/// Guesses a MIME type for the uploaded resume from its suffix.
pub fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else {
        "application/octet-stream"
    }
}

/// S3 / MinIO backed blob store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), BlobError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobError::Download {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let data = object.body.collect().await.map_err(|e| BlobError::Download {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(data.into_bytes())
    }
}
