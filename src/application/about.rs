//! The singleton profile document, read through the expiring cache.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::repos::{DocumentStore, RepoError},
    cache::ExpiringCache,
    domain::{
        content::{ABOUT_DOCUMENT_ID, About, Collection, Education, Experience, decode_about, encode_record},
        error::MalformedRecordError,
    },
};

/// Storage key of the cached profile; its store time lives under `aboutData_timestamp`.
pub const ABOUT_CACHE_KEY: &str = "aboutData";

const LOAD_FAILED_MESSAGE: &str = "Failed to load profile data. Showing default content.";

#[derive(Debug, Error)]
pub enum AboutError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),
    #[error("{kind} `{id}` not found in profile")]
    EntryNotFound { kind: &'static str, id: String },
}

/// Profile to display, plus a message when it is a fallback after a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct AboutOutcome {
    pub about: About,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct AboutService {
    store: Arc<dyn DocumentStore>,
    cache: ExpiringCache<About>,
}

impl AboutService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: ExpiringCache<About>) -> Self {
        Self { store, cache }
    }

    /// Profile for public pages.
    ///
    /// A fresh cache entry is served as is. Otherwise the document is fetched:
    /// a missing document yields the default profile (cached), a failed fetch
    /// yields the default profile with an error message (not cached).
    pub async fn load(&self) -> AboutOutcome {
        if let Some(about) = self.cache.get(ABOUT_CACHE_KEY).await {
            return AboutOutcome { about, error: None };
        }

        match self.fetch().await {
            Ok(fetched) => {
                let about = fetched.unwrap_or_default();
                self.remember(&about).await;
                AboutOutcome { about, error: None }
            }
            Err(err) => {
                warn!(
                    target = "folio::about",
                    error = %err,
                    "falling back to default profile"
                );
                AboutOutcome {
                    about: About::default(),
                    error: Some(LOAD_FAILED_MESSAGE.to_string()),
                }
            }
        }
    }

    /// Profile for the editor, read from the store and bypassing the cache.
    pub async fn load_for_edit(&self) -> Result<About, AboutError> {
        Ok(self.fetch().await?.unwrap_or_default())
    }

    /// Persist the whole profile and refresh the cache with it.
    pub async fn save(&self, about: About) -> Result<About, AboutError> {
        self.store
            .put(Collection::About, ABOUT_DOCUMENT_ID, encode_record(&about))
            .await?;
        self.remember(&about).await;
        info!(target = "folio::about", "profile saved");
        Ok(about)
    }

    pub async fn add_experience(&self, mut experience: Experience) -> Result<About, AboutError> {
        let mut about = self.load_for_edit().await?;
        experience.id = Uuid::new_v4().to_string();
        about.experiences.push(experience);
        self.save(about).await
    }

    pub async fn remove_experience(&self, id: &str) -> Result<About, AboutError> {
        let mut about = self.load_for_edit().await?;
        let before = about.experiences.len();
        about.experiences.retain(|entry| entry.id != id);
        if about.experiences.len() == before {
            return Err(AboutError::EntryNotFound {
                kind: "experience",
                id: id.to_string(),
            });
        }
        self.save(about).await
    }

    pub async fn add_education(&self, mut education: Education) -> Result<About, AboutError> {
        let mut about = self.load_for_edit().await?;
        education.id = Uuid::new_v4().to_string();
        about.educations.push(education);
        self.save(about).await
    }

    pub async fn remove_education(&self, id: &str) -> Result<About, AboutError> {
        let mut about = self.load_for_edit().await?;
        let before = about.educations.len();
        about.educations.retain(|entry| entry.id != id);
        if about.educations.len() == before {
            return Err(AboutError::EntryNotFound {
                kind: "education",
                id: id.to_string(),
            });
        }
        self.save(about).await
    }

    /// Write the default profile when the collection is empty. Returns whether it did.
    pub async fn seed(&self) -> Result<bool, AboutError> {
        if !self.store.list(Collection::About).await?.is_empty() {
            return Ok(false);
        }
        self.save(About::default()).await?;
        Ok(true)
    }

    async fn fetch(&self) -> Result<Option<About>, AboutError> {
        match self.store.get(Collection::About, ABOUT_DOCUMENT_ID).await? {
            Some(document) => Ok(Some(decode_about(document.data)?)),
            None => Ok(None),
        }
    }

    async fn remember(&self, about: &About) {
        if let Err(err) = self.cache.set(ABOUT_CACHE_KEY, about).await {
            warn!(
                target = "folio::about",
                error = %err,
                "failed to cache profile"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::{
            repos::Document,
            storage::{KeyValueStorage, MemoryStorage},
        },
        cache::DEFAULT_EXPIRY,
        infra::memory::MemoryDocuments,
        util::clock::ManualClock,
    };
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use time::macros::datetime;

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn list(&self, _: Collection) -> Result<Vec<Document>, RepoError> {
            Err(RepoError::Timeout)
        }
        async fn get(&self, _: Collection, _: &str) -> Result<Option<Document>, RepoError> {
            Err(RepoError::Timeout)
        }
        async fn find_by_field(
            &self,
            _: Collection,
            _: &str,
            _: &str,
        ) -> Result<Vec<Document>, RepoError> {
            Err(RepoError::Timeout)
        }
        async fn create(&self, _: Collection, _: Value) -> Result<String, RepoError> {
            Err(RepoError::Timeout)
        }
        async fn put(&self, _: Collection, _: &str, _: Value) -> Result<(), RepoError> {
            Err(RepoError::Timeout)
        }
        async fn update(&self, _: Collection, _: &str, _: Value) -> Result<(), RepoError> {
            Err(RepoError::Timeout)
        }
        async fn delete(&self, _: Collection, _: &str) -> Result<(), RepoError> {
            Err(RepoError::Timeout)
        }
        async fn health_check(&self) -> Result<(), RepoError> {
            Err(RepoError::Timeout)
        }
    }

    fn service_with(
        store: Arc<dyn DocumentStore>,
    ) -> (AboutService, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let cache = ExpiringCache::new(storage.clone(), clock.clone(), DEFAULT_EXPIRY);
        (AboutService::new(store, cache), storage, clock)
    }

    fn profile(name: &str) -> About {
        About {
            short_name: name.to_string(),
            ..About::default()
        }
    }

    #[tokio::test]
    async fn missing_document_yields_cached_default() {
        let (service, storage, _) = service_with(Arc::new(MemoryDocuments::new()));
        let outcome = service.load().await;
        assert_eq!(outcome.about, About::default());
        assert!(outcome.error.is_none());
        assert!(storage.get(ABOUT_CACHE_KEY).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn fetch_failure_yields_default_with_message_and_no_cache() {
        let (service, storage, _) = service_with(Arc::new(FailingStore));
        let outcome = service.load().await;
        assert_eq!(outcome.about, About::default());
        assert!(outcome.error.is_some());
        assert!(storage.get(ABOUT_CACHE_KEY).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn cached_profile_is_served_until_stale() {
        let store = Arc::new(MemoryDocuments::new());
        let (service, _, clock) = service_with(store.clone());
        service.save(profile("Ada")).await.expect("save");

        store
            .put(
                Collection::About,
                ABOUT_DOCUMENT_ID,
                encode_record(&profile("Grace")),
            )
            .await
            .expect("put");
        assert_eq!(service.load().await.about.short_name, "Ada");

        clock.advance(time::Duration::hours(24));
        assert_eq!(service.load().await.about.short_name, "Grace");
    }

    #[tokio::test]
    async fn malformed_profile_falls_back_to_default() {
        let store = Arc::new(MemoryDocuments::new());
        store
            .put(Collection::About, ABOUT_DOCUMENT_ID, json!({ "shortName": 7 }))
            .await
            .expect("put");
        let (service, _, _) = service_with(store);
        let outcome = service.load().await;
        assert_eq!(outcome.about, About::default());
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn experiences_are_added_and_removed_by_id() {
        let (service, _, _) = service_with(Arc::new(MemoryDocuments::new()));
        let about = service
            .add_experience(Experience {
                id: String::new(),
                company: "Acme".to_string(),
                position: "Engineer".to_string(),
                start_date: "2021-01-01".to_string(),
                end_date: String::new(),
                description: String::new(),
            })
            .await
            .expect("add");
        let id = about.experiences[0].id.clone();
        assert!(!id.is_empty());

        let about = service.remove_experience(&id).await.expect("remove");
        assert!(about.experiences.is_empty());
        assert!(matches!(
            service.remove_experience(&id).await,
            Err(AboutError::EntryNotFound { kind: "experience", .. })
        ));
    }

    #[tokio::test]
    async fn seed_only_writes_into_an_empty_collection() {
        let (service, _, _) = service_with(Arc::new(MemoryDocuments::new()));
        assert!(service.seed().await.expect("seed"));
        assert!(!service.seed().await.expect("seed"));
    }
}
