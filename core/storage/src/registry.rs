//! Store registry for resolving a queue store from configuration.

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::provider::PersistentQueueStore;
use accuread_common::{Error, Result};

/// Factory function type for creating stores.
pub type StoreFactory =
    Box<dyn Fn(Value) -> BoxFuture<'static, Result<Arc<dyn PersistentQueueStore>>> + Send + Sync>;

/// Registry for queue store factories.
///
/// Allows dynamic registration and resolution of stores by name and
/// configuration.
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a store factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: StoreFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Store '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a store by name and configuration.
    ///
    /// # Errors
    /// - Store not found
    /// - Configuration invalid
    pub async fn resolve(&self, name: &str, config: Value) -> Result<Arc<dyn PersistentQueueStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Store '{}' is not registered", name)))?;
        factory(config).await
    }

    /// Get list of registered store names.
    pub fn stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a store is registered.
    pub fn has_store(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in stores.
pub fn create_default_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();
    registry
        .factories
        .insert("memory".to_string(), Box::new(memory_factory));
    registry
        .factories
        .insert("local".to_string(), Box::new(local_factory));
    registry
}

fn memory_factory(_config: Value) -> BoxFuture<'static, Result<Arc<dyn PersistentQueueStore>>> {
    Box::pin(async {
        let store: Arc<dyn PersistentQueueStore> = Arc::new(crate::memory::MemoryQueueStore::new());
        Ok(store)
    })
}

/// Requires `{"root": "<dir>"}`.
fn local_factory(config: Value) -> BoxFuture<'static, Result<Arc<dyn PersistentQueueStore>>> {
    Box::pin(async move {
        let root = config
            .get("root")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .ok_or_else(|| Error::InvalidInput("Local store requires 'root' path".to_string()))?;
        let store: Arc<dyn PersistentQueueStore> =
            Arc::new(crate::local::LocalQueueStore::new(root).await?);
        Ok(store)
    })
}
