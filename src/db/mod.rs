pub(crate) mod file_store;
pub(crate) mod models;
pub(crate) mod redis_store;
pub(crate) mod types;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::config::{Settings, StoreBackend};

/// Named collections of the record store. Every collection except
/// `CurrentUser` holds a JSON array; `CurrentUser` holds one object or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collection {
    Assignments,
    Submissions,
    Folders,
    Users,
    CurrentUser,
}

impl Collection {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Assignments => "assignments",
            Self::Submissions => "submissions",
            Self::Folders => "folders",
            Self::Users => "users",
            Self::CurrentUser => "current_user",
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("i/o on collection {collection} failed: {source}")]
    Io {
        collection: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("collection {collection} holds corrupt JSON: {source}")]
    Corrupt {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize collection {collection}: {source}")]
    Serialize {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreHealth {
    Healthy,
    Unhealthy(String),
}

/// Raw durable key-value backend: one JSON document per collection.
#[async_trait]
pub(crate) trait RecordStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn read_raw(&self, collection: Collection) -> Result<Option<String>, StoreError>;

    async fn write_raw(&self, collection: Collection, payload: String) -> Result<(), StoreError>;

    async fn health(&self) -> StoreHealth;
}

/// Typed handle over a [`RecordStore`]. Every mutation is a full
/// read-modify-write of one collection, serialized process-wide so two
/// concurrent updates to different records of the same collection cannot
/// overwrite each other.
#[derive(Clone)]
pub(crate) struct Store {
    backend: Arc<dyn RecordStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    pub(crate) fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self { backend, write_lock: Arc::new(Mutex::new(())) }
    }

    pub(crate) fn backend_name(&self) -> &'static str {
        self.backend.backend()
    }

    pub(crate) async fn health(&self) -> StoreHealth {
        self.backend.health().await
    }

    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        let raw = self.backend.read_raw(collection).await?;
        decode(collection, raw.as_deref())
    }

    pub(crate) async fn mutate<T, R, F>(&self, collection: Collection, apply: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce(&mut Vec<T>) -> R + Send,
    {
        let _guard = self.write_lock.lock().await;

        let raw = self.backend.read_raw(collection).await?;
        let mut records: Vec<T> = decode(collection, raw.as_deref())?;
        let outcome = apply(&mut records);

        let payload = serde_json::to_string(&records)
            .map_err(|source| StoreError::Serialize { collection: collection.name(), source })?;
        self.backend.write_raw(collection, payload).await?;

        Ok(outcome)
    }

    pub(crate) async fn get_object<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Option<T>, StoreError> {
        let raw = match self.backend.read_raw(collection).await? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(None),
        };
        serde_json::from_str::<Option<T>>(&raw)
            .map_err(|source| StoreError::Corrupt { collection: collection.name(), source })
    }

    pub(crate) async fn put_object<T: Serialize + Sync>(
        &self,
        collection: Collection,
        value: Option<&T>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let payload = serde_json::to_string(&value)
            .map_err(|source| StoreError::Serialize { collection: collection.name(), source })?;
        self.backend.write_raw(collection, payload).await
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, raw: Option<&str>) -> Result<Vec<T>, StoreError> {
    match raw {
        None => Ok(Vec::new()),
        Some(text) if text.trim().is_empty() => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text)
            .map_err(|source| StoreError::Corrupt { collection: collection.name(), source }),
    }
}

pub(crate) async fn init_store(settings: &Settings) -> anyhow::Result<Store> {
    let store_settings = settings.store();
    let backend: Arc<dyn RecordStore> = match store_settings.backend {
        StoreBackend::File => Arc::new(
            file_store::FileStore::open(&store_settings.data_dir, &store_settings.namespace).await?,
        ),
        StoreBackend::Redis => Arc::new(
            redis_store::RedisStore::connect(
                &settings.redis().redis_url(),
                &store_settings.namespace,
            )
            .await?,
        ),
    };

    tracing::info!(
        backend = store_settings.backend.as_str(),
        namespace = %store_settings.namespace,
        "Record store ready"
    );

    Ok(Store::new(backend))
}
