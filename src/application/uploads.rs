//! Image upload seam towards the hosted media service.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image uploads are not configured")]
    Disabled,
    #[error("uploaded file `{filename}` is empty")]
    EmptyPayload { filename: String },
    #[error("upload request failed")]
    Transport {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("upload response did not contain a url")]
    MissingUrl,
}

impl UploadError {
    pub fn transport(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport {
            source: Box::new(source),
        }
    }
}

/// A file taken from an admin form, ready to forward.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Upload one image and return its public HTTPS URL.
    async fn upload(&self, file: UploadFile) -> Result<String, UploadError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Upload every file concurrently, returning URLs in input order.
///
/// The first failure fails the whole batch; URLs of files that did upload
/// are not returned.
pub async fn upload_many(
    uploader: &dyn ImageUploader,
    files: Vec<UploadFile>,
) -> Result<Vec<String>, UploadError> {
    try_join_all(files.into_iter().map(|file| uploader.upload(file))).await
}
