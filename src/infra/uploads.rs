//! Unsigned image uploads to a Cloudinary-compatible media service.

use async_trait::async_trait;
use metrics::counter;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::{
    application::uploads::{ImageUploader, UploadError, UploadFile},
    config::MediaServiceSettings,
};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Posts each file as `multipart/form-data` with the configured upload preset.
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: reqwest::Client,
    endpoint: Url,
    upload_preset: String,
}

impl CloudinaryUploader {
    pub fn new(settings: &MediaServiceSettings) -> Result<Self, url::ParseError> {
        Self::with_client(reqwest::Client::new(), settings)
    }

    pub fn with_client(
        client: reqwest::Client,
        settings: &MediaServiceSettings,
    ) -> Result<Self, url::ParseError> {
        let path = format!("v1_1/{}/image/upload", settings.cloud_name);
        let endpoint = settings.api_base.join(&path)?;
        Ok(Self {
            client,
            endpoint,
            upload_preset: settings.upload_preset.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
        if file.bytes.is_empty() {
            return Err(UploadError::EmptyPayload {
                filename: file.filename,
            });
        }

        let filename = file.filename.clone();
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(UploadError::transport)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let result = self.send(form).await;
        match &result {
            Ok(url) => {
                counter!("folio_upload_total").increment(1);
                info!(target = "folio::uploads", filename = %filename, url = %url, "image uploaded");
            }
            Err(err) => {
                counter!("folio_upload_failed_total").increment(1);
                warn!(target = "folio::uploads", filename = %filename, error = %err, "image upload failed");
            }
        }
        result
    }
}

impl CloudinaryUploader {
    async fn send(&self, form: Form) -> Result<String, UploadError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(ErrorResponse { error: Some(body) }) => body.message,
                _ => status.to_string(),
            };
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await.map_err(UploadError::transport)?;
        body.secure_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(UploadError::MissingUrl)
    }
}

/// Stand-in used when no media service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUploader;

#[async_trait]
impl ImageUploader for DisabledUploader {
    async fn upload(&self, _file: UploadFile) -> Result<String, UploadError> {
        Err(UploadError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &str) -> MediaServiceSettings {
        MediaServiceSettings {
            api_base: Url::parse(base).expect("url"),
            cloud_name: "demo".to_string(),
            upload_preset: "unsigned".to_string(),
        }
    }

    #[test]
    fn endpoint_follows_cloud_name() {
        let uploader = CloudinaryUploader::new(&settings("https://api.cloudinary.com")).expect("uploader");
        assert_eq!(
            uploader.endpoint().as_str(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[tokio::test]
    async fn empty_files_are_rejected_locally() {
        let uploader = CloudinaryUploader::new(&settings("http://127.0.0.1:9")).expect("uploader");
        let err = uploader
            .upload(UploadFile::new("empty.png", "image/png", bytes::Bytes::new()))
            .await
            .expect_err("empty payload");
        assert!(matches!(err, UploadError::EmptyPayload { .. }));
    }

    #[tokio::test]
    async fn disabled_uploader_refuses() {
        let err = DisabledUploader
            .upload(UploadFile::new("a.png", "image/png", bytes::Bytes::from_static(b"x")))
            .await
            .expect_err("disabled");
        assert!(matches!(err, UploadError::Disabled));
        assert!(!DisabledUploader.is_enabled());
    }
}
