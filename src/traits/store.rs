use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Generic key/value store contract.
///
/// The engine only ever calls `store`/`retrieve`/`delete`: for pattern
/// snapshots, event-handler registrations, and dead-letter records. Callers
/// may back it with anything; [`MemoryStore`] is the in-process default.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn store(&self, key: &str, value: Value) -> anyhow::Result<()>;

    async fn retrieve(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;
}

/// In-process store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, for tests and diagnostics.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Keys matching a prefix, in unspecified order.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContextStore for MemoryStore {
    async fn store(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}
