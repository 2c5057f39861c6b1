//! Typed services over the portfolio, blog and license collections.

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::{
    application::{
        about::AboutService,
        repos::{DocumentStore, RepoError},
    },
    cache::ExpiringCache,
    domain::{
        content::{
            About, BlogPost, ContentRecord, License, Portfolio, Sluggable, decode_record,
            encode_record,
        },
        error::MalformedRecordError,
        slug::{SlugError, slugify},
    },
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("`{collection}` record `{id}` not found")]
    NotFound { collection: &'static str, id: String },
}

impl ContentError {
    fn not_found<T: ContentRecord>(id: &str) -> Self {
        Self::NotFound {
            collection: T::COLLECTION.as_str(),
            id: id.to_string(),
        }
    }
}

/// CRUD over one content collection, decoding every document into `T`.
pub struct CollectionService<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionService<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: ContentRecord> CollectionService<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Every decodable record; malformed documents are logged and skipped.
    pub async fn list(&self) -> Result<Vec<T>, ContentError> {
        let documents = self.store.list(T::COLLECTION).await?;
        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            match decode_record::<T>(&document.id, document.data) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    target = "folio::content",
                    collection = err.collection,
                    id = %err.id,
                    reason = %err.reason,
                    "skipping malformed record"
                ),
            }
        }
        Ok(records)
    }

    pub async fn count(&self) -> Result<usize, ContentError> {
        Ok(self.store.list(T::COLLECTION).await?.len())
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, ContentError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(document) => Ok(Some(decode_record(&document.id, document.data)?)),
            None => Ok(None),
        }
    }

    /// Like [`CollectionService::get`], but a missing record is an error.
    pub async fn require(&self, id: &str) -> Result<T, ContentError> {
        self.get(id)
            .await?
            .ok_or_else(|| ContentError::not_found::<T>(id))
    }

    /// Store a record that carries no slug and return it with its new id.
    pub async fn create_plain(&self, mut record: T) -> Result<T, ContentError> {
        let id = self
            .store
            .create(T::COLLECTION, encode_record(&record))
            .await?;
        record.set_id(id);
        Ok(record)
    }

    /// Replace the fields of an existing record.
    pub async fn update_plain(&self, id: &str, mut record: T) -> Result<T, ContentError> {
        self.store
            .update(T::COLLECTION, id, encode_record(&record))
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ContentError::not_found::<T>(id),
                other => ContentError::Repo(other),
            })?;
        record.set_id(id.to_string());
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        self.store
            .delete(T::COLLECTION, id)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ContentError::not_found::<T>(id),
                other => ContentError::Repo(other),
            })
    }
}

impl<T: Sluggable> CollectionService<T> {
    /// Look a record up by slug, falling back to its id.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<T>, ContentError> {
        let matches = self
            .store
            .find_by_field(T::COLLECTION, "slug", slug)
            .await?;
        if let Some(document) = matches.into_iter().next() {
            return Ok(Some(decode_record(&document.id, document.data)?));
        }
        self.get(slug).await
    }

    /// Store a new record under a freshly generated slug.
    pub async fn create(&self, mut record: T) -> Result<T, ContentError> {
        record.set_slug(slugify(record.title())?);
        self.create_plain(record).await
    }

    /// Update a record, keeping the slug it already has.
    ///
    /// A slug is only generated when the stored record never had one.
    pub async fn update(&self, id: &str, mut record: T) -> Result<T, ContentError> {
        let existing = self.require(id).await?;
        if existing.slug().is_empty() {
            record.set_slug(slugify(record.title())?);
        } else {
            record.set_slug(existing.slug().to_string());
        }
        self.update_plain(id, record).await
    }
}

/// Every content service, sharing one document store.
#[derive(Clone)]
pub struct ContentServices {
    pub about: AboutService,
    pub portfolio: CollectionService<Portfolio>,
    pub blog: CollectionService<BlogPost>,
    pub licenses: CollectionService<License>,
    store: Arc<dyn DocumentStore>,
}

impl ContentServices {
    pub fn new(store: Arc<dyn DocumentStore>, about_cache: ExpiringCache<About>) -> Self {
        Self {
            about: AboutService::new(store.clone(), about_cache),
            portfolio: CollectionService::new(store.clone()),
            blog: CollectionService::new(store.clone()),
            licenses: CollectionService::new(store.clone()),
            store,
        }
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::content::{BlogPost, Collection, License},
        infra::memory::MemoryDocuments,
    };
    use serde_json::json;

    fn post(title: &str) -> BlogPost {
        BlogPost {
            id: String::new(),
            title: title.to_string(),
            date: "2024-05-01".to_string(),
            tags: vec!["rust".to_string()],
            image: String::new(),
            content: "<p>Body</p>".to_string(),
            excerpt: None,
            slug: String::new(),
        }
    }

    fn service() -> (CollectionService<BlogPost>, Arc<MemoryDocuments>) {
        let store = Arc::new(MemoryDocuments::new());
        (CollectionService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_assigns_id_and_slug() {
        let (posts, _) = service();
        let created = posts.create(post("Hello, World!")).await.expect("create");
        assert!(!created.id.is_empty());
        assert!(created.slug.starts_with("hello-world-"), "{}", created.slug);

        let found = posts
            .find_by_slug(&created.slug)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn find_by_slug_falls_back_to_id() {
        let (posts, _) = service();
        let created = posts.create(post("Fallback")).await.expect("create");
        let found = posts
            .find_by_slug(&created.id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.slug, created.slug);
        assert!(posts.find_by_slug("missing").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn update_keeps_existing_slug() {
        let (posts, _) = service();
        let created = posts.create(post("Original")).await.expect("create");
        let updated = posts
            .update(&created.id, post("Renamed entirely"))
            .await
            .expect("update");
        assert_eq!(updated.slug, created.slug);
        assert_eq!(updated.title, "Renamed entirely");
    }

    #[tokio::test]
    async fn update_generates_slug_for_legacy_records() {
        let (posts, store) = service();
        store
            .put(
                Collection::BlogPosts,
                "legacy",
                json!({ "title": "Legacy", "date": "2020-01-01", "content": "" }),
            )
            .await
            .expect("put");
        let updated = posts.update("legacy", post("Legacy")).await.expect("update");
        assert!(updated.slug.starts_with("legacy-"), "{}", updated.slug);
    }

    #[tokio::test]
    async fn list_skips_malformed_documents() {
        let (posts, store) = service();
        posts.create(post("Good")).await.expect("create");
        store
            .put(Collection::BlogPosts, "bad", json!({ "title": 42 }))
            .await
            .expect("put");
        let listed = posts.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Good");
    }

    #[tokio::test]
    async fn missing_records_report_not_found() {
        let store = Arc::new(MemoryDocuments::new());
        let licenses: CollectionService<License> = CollectionService::new(store);
        assert!(matches!(
            licenses.delete("ghost").await,
            Err(ContentError::NotFound { collection: "licenses", .. })
        ));
    }
}
