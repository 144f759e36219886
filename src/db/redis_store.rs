use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{cmd, Client};

use super::{Collection, RecordStore, StoreError, StoreHealth};

/// One Redis string key per collection, `<namespace>:<collection>`.
#[derive(Clone)]
pub(crate) struct RedisStore {
    manager: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    pub(crate) async fn connect(url: &str, namespace: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager, namespace: namespace.to_string() })
    }

    fn key_for(&self, collection: Collection) -> String {
        format!("{}:{}", self.namespace, collection.name())
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn read_raw(&self, collection: Collection) -> Result<Option<String>, StoreError> {
        let mut manager = self.manager.clone();
        let value = cmd("GET")
            .arg(self.key_for(collection))
            .query_async::<_, Option<String>>(&mut manager)
            .await?;
        Ok(value)
    }

    async fn write_raw(&self, collection: Collection, payload: String) -> Result<(), StoreError> {
        let mut manager = self.manager.clone();
        cmd("SET")
            .arg(self.key_for(collection))
            .arg(payload)
            .query_async::<_, ()>(&mut manager)
            .await?;
        Ok(())
    }

    async fn health(&self) -> StoreHealth {
        let mut manager = self.manager.clone();
        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => StoreHealth::Healthy,
            Err(err) => StoreHealth::Unhealthy(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;
    use crate::test_support;
    use uuid::Uuid;

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_HOST:REDIS_PORT"]
    async fn collections_round_trip_through_redis() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let namespace = format!("khtn-test-{}", Uuid::new_v4().simple());
        let store =
            RedisStore::connect(&settings.redis().redis_url(), &namespace).await.expect("connect");

        assert_eq!(store.health().await, StoreHealth::Healthy);
        assert_eq!(store.read_raw(Collection::Folders).await.expect("read"), None);

        store.write_raw(Collection::Folders, "[]".to_string()).await.expect("write");
        assert_eq!(store.read_raw(Collection::Folders).await.expect("read").as_deref(), Some("[]"));
    }
}
