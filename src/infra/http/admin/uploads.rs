//! Forwarding editor image files to the media service.

use axum::{http::StatusCode, response::Response};

use crate::application::{
    error::ErrorReport,
    uploads::{ImageUploader, UploadError, UploadFile, upload_many},
};

/// URLs returned for the files submitted with one form.
#[derive(Debug, Default, PartialEq)]
pub(super) struct UploadedImages {
    pub(super) cover: Option<String>,
    pub(super) gallery: Vec<String>,
}

/// Upload the optional cover and the gallery files in one fan-out.
///
/// Nothing is sent when no file was chosen, so URL-only edits work without a media service.
pub(super) async fn upload_images(
    uploader: &dyn ImageUploader,
    cover: Option<UploadFile>,
    gallery: Vec<UploadFile>,
) -> Result<UploadedImages, UploadError> {
    if cover.is_none() && gallery.is_empty() {
        return Ok(UploadedImages::default());
    }
    if !uploader.is_enabled() {
        return Err(UploadError::Disabled);
    }

    let has_cover = cover.is_some();
    let files: Vec<UploadFile> = cover.into_iter().chain(gallery).collect();
    let mut urls = upload_many(uploader, files).await?;

    let cover = if has_cover && !urls.is_empty() {
        Some(urls.remove(0))
    } else {
        None
    };
    Ok(UploadedImages {
        cover,
        gallery: urls,
    })
}

pub(super) fn upload_error_message(err: &UploadError) -> String {
    match err {
        UploadError::Disabled => {
            "Image uploads are not configured. Use an image URL instead.".to_string()
        }
        other => format!("Image upload failed: {other}. Nothing was saved."),
    }
}

pub(super) fn upload_error_status(err: &UploadError) -> StatusCode {
    match err {
        UploadError::Disabled | UploadError::EmptyPayload { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub(super) fn attach_upload_report(source: &'static str, err: &UploadError, response: &mut Response) {
    ErrorReport::from_error(source, upload_error_status(err), err).attach(response);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;

    struct NamingUploader;

    #[async_trait]
    impl ImageUploader for NamingUploader {
        async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
            Ok(format!("https://cdn.example/{}", file.filename))
        }
    }

    struct OffUploader;

    #[async_trait]
    impl ImageUploader for OffUploader {
        async fn upload(&self, _file: UploadFile) -> Result<String, UploadError> {
            Err(UploadError::Disabled)
        }

        fn is_enabled(&self) -> bool {
            false
        }
    }

    fn file(name: &str) -> UploadFile {
        UploadFile::new(name, "image/png", Bytes::from_static(b"png"))
    }

    #[tokio::test]
    async fn cover_is_split_from_gallery() {
        let uploaded = upload_images(
            &NamingUploader,
            Some(file("cover.png")),
            vec![file("a.png"), file("b.png")],
        )
        .await
        .expect("upload");
        assert_eq!(uploaded.cover.as_deref(), Some("https://cdn.example/cover.png"));
        assert_eq!(
            uploaded.gallery,
            ["https://cdn.example/a.png", "https://cdn.example/b.png"]
        );
    }

    #[tokio::test]
    async fn no_files_needs_no_uploader() {
        let uploaded = upload_images(&OffUploader, None, Vec::new())
            .await
            .expect("nothing to upload");
        assert_eq!(uploaded, UploadedImages::default());
    }

    #[tokio::test]
    async fn files_without_uploader_are_refused() {
        let err = upload_images(&OffUploader, None, vec![file("a.png")])
            .await
            .expect_err("disabled");
        assert!(matches!(err, UploadError::Disabled));
        assert_eq!(upload_error_status(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
