//! In-process document store used when no database is configured.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    application::repos::{Document, DocumentStore, RepoError, ensure_object, merge_fields},
    domain::content::Collection,
};

#[derive(Debug, Default)]
pub struct MemoryDocuments {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> RepoError {
    RepoError::from_persistence("document map lock poisoned")
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, RepoError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, RepoError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, RepoError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| data.get(field).and_then(Value::as_str) == Some(value))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<String, RepoError> {
        ensure_object(&data)?;
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .entry(collection)
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn put(&self, collection: Collection, id: &str, data: Value) -> Result<(), RepoError> {
        ensure_object(&data)?;
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> Result<(), RepoError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let existing = collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(RepoError::NotFound)?;
        merge_fields(existing, data)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RepoError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.collections.read().map(|_| ()).map_err(|_| poisoned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_find_update_delete() {
        let store = MemoryDocuments::new();
        let id = store
            .create(Collection::BlogPosts, json!({ "title": "Hi", "slug": "hi-12345" }))
            .await
            .expect("create");

        let found = store
            .find_by_field(Collection::BlogPosts, "slug", "hi-12345")
            .await
            .expect("find");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);

        store
            .update(Collection::BlogPosts, &id, json!({ "title": "Hello" }))
            .await
            .expect("update");
        let doc = store
            .get(Collection::BlogPosts, &id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(doc.data, json!({ "title": "Hello", "slug": "hi-12345" }));

        store.delete(Collection::BlogPosts, &id).await.expect("delete");
        assert!(
            store
                .get(Collection::BlogPosts, &id)
                .await
                .expect("get")
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_documents_fail() {
        let store = MemoryDocuments::new();
        assert!(matches!(
            store.update(Collection::Licenses, "nope", json!({})).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            store.delete(Collection::Licenses, "nope").await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryDocuments::new();
        store
            .put(Collection::About, "about", json!({ "shortName": "A" }))
            .await
            .expect("put");
        assert!(store.list(Collection::Portfolio).await.expect("list").is_empty());
        assert_eq!(store.list(Collection::About).await.expect("list").len(), 1);
    }
}
