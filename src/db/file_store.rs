use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Collection, RecordStore, StoreError, StoreHealth};

/// One JSON file per collection under a data directory. Writes go to a
/// sibling temp file first and are renamed into place, so a crash mid-write
/// leaves the previous version intact.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    root: PathBuf,
    namespace: String,
}

impl FileStore {
    pub(crate) async fn open(root: &Path, namespace: &str) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| StoreError::Io { collection: "<root>", source })?;

        Ok(Self { root: root.to_path_buf(), namespace: namespace.to_string() })
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.root.join(format!("{}_{}.json", self.namespace, collection.name()))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn read_raw(&self, collection: Collection) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(collection)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { collection: collection.name(), source }),
        }
    }

    async fn write_raw(&self, collection: Collection, payload: String) -> Result<(), StoreError> {
        let target = self.path_for(collection);
        let staging = self.root.join(format!(
            ".{}_{}.{}.tmp",
            self.namespace,
            collection.name(),
            Uuid::new_v4().simple()
        ));

        let io_error = |source| StoreError::Io { collection: collection.name(), source };

        tokio::fs::write(&staging, payload.as_bytes()).await.map_err(io_error)?;
        if let Err(source) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(source));
        }

        tracing::debug!(collection = collection.name(), bytes = payload.len(), "Collection flushed");
        Ok(())
    }

    async fn health(&self) -> StoreHealth {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => StoreHealth::Healthy,
            Ok(_) => StoreHealth::Unhealthy(format!("{} is not a directory", self.root.display())),
            Err(err) => StoreHealth::Unhealthy(err.to_string()),
        }
    }
}
