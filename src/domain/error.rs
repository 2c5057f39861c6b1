use thiserror::Error;

use super::slug::SlugError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),
    #[error(transparent)]
    Slug(#[from] SlugError),
}

/// A stored document that could not be coerced into its content type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed `{collection}` record `{id}`: {reason}")]
pub struct MalformedRecordError {
    pub collection: &'static str,
    pub id: String,
    pub reason: String,
}

impl MalformedRecordError {
    pub fn new(collection: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
            reason: reason.into(),
        }
    }
}
