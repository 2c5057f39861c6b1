//! Multipart editor payload parsing.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use tracing::error;

use crate::application::{error::HttpError, uploads::UploadFile};

const SOURCE_BASE: &str = "infra::http::admin::multipart";

pub(super) enum PayloadError {
    PayloadTooLarge,
    InvalidFormData,
    Read { detail: String },
}

impl PayloadError {
    pub(super) fn into_http(self, limit_bytes: u64) -> HttpError {
        match self {
            PayloadError::PayloadTooLarge => {
                let limit_mib = limit_bytes.div_ceil(1_048_576);
                HttpError::new(
                    SOURCE_BASE,
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Form is too large",
                    format!("request body exceeds {limit_mib} MiB"),
                )
            }
            PayloadError::InvalidFormData => HttpError::new(
                SOURCE_BASE,
                StatusCode::BAD_REQUEST,
                "Form data was invalid",
                "multipart body could not be parsed",
            ),
            PayloadError::Read { detail } => HttpError::new(
                SOURCE_BASE,
                StatusCode::BAD_REQUEST,
                "Form could not be read",
                detail,
            ),
        }
    }
}

/// Text fields and chosen files of one submitted editor form.
#[derive(Debug, Default)]
pub(super) struct FormPayload {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadFile)>,
}

impl FormPayload {
    /// Raw value of a text field; absent fields read as empty.
    pub(super) fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub(super) fn file(&self, name: &str) -> Option<UploadFile> {
        self.files(name).into_iter().next()
    }

    pub(super) fn files(&self, name: &str) -> Vec<UploadFile> {
        self.files
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, file)| file.clone())
            .collect()
    }

    #[cfg(test)]
    pub(super) fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            files: Vec::new(),
        }
    }
}

pub(super) async fn read_form_payload(
    multipart: &mut Multipart,
) -> Result<FormPayload, PayloadError> {
    let mut payload = FormPayload::default();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };

                match field.file_name().map(str::to_string) {
                    // File inputs left empty still send a part with a blank filename.
                    Some(filename) => {
                        let content_type = field
                            .content_type()
                            .map(|mime| mime.to_string())
                            .unwrap_or_else(|| "application/octet-stream".to_string());
                        let bytes = field
                            .bytes()
                            .await
                            .map_err(|err| read_error(err.status(), err.to_string()))?;
                        if filename.trim().is_empty() || bytes.is_empty() {
                            continue;
                        }
                        payload
                            .files
                            .push((name, UploadFile::new(filename, content_type, bytes)));
                    }
                    None => {
                        let value = field
                            .text()
                            .await
                            .map_err(|err| read_error(err.status(), err.to_string()))?;
                        payload.fields.insert(name, value);
                    }
                }
            }
            Ok(None) => break,
            Err(err) => return Err(read_error(err.status(), err.to_string())),
        }
    }

    Ok(payload)
}

fn read_error(status: StatusCode, detail: String) -> PayloadError {
    error!(
        target = SOURCE_BASE,
        status = status.as_u16(),
        error = %detail,
        "failed to read multipart payload"
    );
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => PayloadError::PayloadTooLarge,
        StatusCode::BAD_REQUEST => PayloadError::InvalidFormData,
        _ => PayloadError::Read { detail },
    }
}
