//! Repository trait describing the document store adapters.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::content::Collection;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A raw document: its id within a collection and its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Schemaless document storage grouped into the four content collections.
///
/// Document bodies are JSON objects. Listing order is unspecified; callers
/// sort after decoding.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, RepoError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, RepoError>;

    /// Documents whose top-level `field` equals `value` as a string.
    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, RepoError>;

    /// Insert under a freshly generated id and return it.
    async fn create(&self, collection: Collection, data: Value) -> Result<String, RepoError>;

    /// Insert or replace the document stored under `id`.
    async fn put(&self, collection: Collection, id: &str, data: Value) -> Result<(), RepoError>;

    /// Merge the top-level fields of `data` into an existing document.
    async fn update(&self, collection: Collection, id: &str, data: Value)
    -> Result<(), RepoError>;

    /// Remove a document. Deleting an absent id is `NotFound`.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

/// Shallow merge: each top-level key of `patch` replaces the one in `target`.
pub fn merge_fields(target: &mut Value, patch: Value) -> Result<(), RepoError> {
    let Value::Object(patch) = patch else {
        return Err(RepoError::InvalidInput {
            message: "document body must be a JSON object".to_string(),
        });
    };

    match target {
        Value::Object(existing) => {
            existing.extend(patch);
            Ok(())
        }
        other => {
            *other = Value::Object(patch);
            Ok(())
        }
    }
}

/// Reject bodies that are not JSON objects.
pub fn ensure_object(data: &Value) -> Result<(), RepoError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(RepoError::InvalidInput {
            message: "document body must be a JSON object".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_replaces_only_given_fields() {
        let mut doc = json!({ "title": "Old", "tags": ["a"], "slug": "old-12345" });
        merge_fields(&mut doc, json!({ "title": "New", "tags": [] })).expect("merge");
        assert_eq!(doc, json!({ "title": "New", "tags": [], "slug": "old-12345" }));
    }

    #[test]
    fn merge_rejects_non_objects() {
        let mut doc = json!({});
        assert!(matches!(
            merge_fields(&mut doc, json!([1, 2])),
            Err(RepoError::InvalidInput { .. })
        ));
    }
}
