//! Capability Registry: stand-alone capabilities backed by the shared store.
//!
//! Native capabilities are registered with `source = "native"`; integrations
//! (MCP servers, plugins) register theirs with an explicit source and tags.
//! Several registries may share one [`Store`], in which case they see the
//! same catalog.

use std::sync::Arc;

use super::capability::{CapabilityDef, HandlerRef, StoredCapability, SOURCE_NATIVE};
use super::error::RegistryError;
use crate::store::{Store, StoreError, INDEX_SOURCE, INDEX_TAGS};

/// Registry of individually registered capabilities.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    store: Arc<Store>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    /// Create a registry over a fresh, private store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(Store::new()))
    }

    /// Create a registry sharing `store` with other components.
    pub fn with_store(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The underlying store, for cross-component queries.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Register a capability with `source = "native"` and no tags.
    pub fn register(
        &self,
        definition: CapabilityDef,
        handler: Option<HandlerRef>,
    ) -> Result<(), RegistryError> {
        self.register_with_source(definition, handler, SOURCE_NATIVE, Vec::new())
    }

    /// Register a capability with an explicit source and tag set.
    ///
    /// Re-registering a name replaces the previous record entirely.
    pub fn register_with_source(
        &self,
        definition: CapabilityDef,
        handler: Option<HandlerRef>,
        source: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<(), RegistryError> {
        let record = StoredCapability {
            definition,
            source: source.into(),
            tags,
            handler,
        };
        log::debug!(
            "registering capability '{}' from '{}'",
            record.name(),
            record.source
        );
        self.store.put(record)?;
        Ok(())
    }

    /// Remove a capability. Removing an unknown name is a no-op.
    pub fn remove(&self, name: &str) {
        self.store.delete::<StoredCapability>(name);
    }

    pub fn get(&self, name: &str) -> Option<StoredCapability> {
        self.store
            .get::<StoredCapability>(name)
            .map(|record| (*record).clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.store.get::<StoredCapability>(name).is_some()
    }

    /// Handler stored for `name`, if any.
    pub fn handler(&self, name: &str) -> Option<HandlerRef> {
        self.store
            .get::<StoredCapability>(name)
            .and_then(|record| record.handler.clone())
    }

    /// Handler for dispatch: an unknown capability, or one stored without a
    /// handler, is [`RegistryError::CapabilityNotFound`].
    pub fn require_handler(&self, name: &str) -> Result<HandlerRef, RegistryError> {
        self.handler(name)
            .ok_or_else(|| RegistryError::CapabilityNotFound(name.to_string()))
    }

    /// Every registered descriptor, ordered by name.
    pub fn definitions(&self) -> Vec<CapabilityDef> {
        self.store
            .list::<StoredCapability>()
            .iter()
            .map(|record| record.definition.clone())
            .collect()
    }

    pub fn by_tag(&self, tag: &str) -> Result<Vec<CapabilityDef>, RegistryError> {
        Ok(self
            .store
            .list_by::<StoredCapability>(INDEX_TAGS, tag)?
            .iter()
            .map(|record| record.definition.clone())
            .collect())
    }

    pub fn by_source(&self, source: &str) -> Result<Vec<CapabilityDef>, RegistryError> {
        Ok(self
            .store
            .list_by::<StoredCapability>(INDEX_SOURCE, source)?
            .iter()
            .map(|record| record.definition.clone())
            .collect())
    }

    /// Full stored records, including sources, tags and handlers.
    pub fn records(&self) -> Vec<StoredCapability> {
        self.store
            .list::<StoredCapability>()
            .iter()
            .map(|record| (**record).clone())
            .collect()
    }

    /// Copy every capability of `other` into this registry in one commit.
    /// Returns the number of records copied.
    pub fn merge(&self, other: &CapabilityRegistry) -> Result<usize, RegistryError> {
        if Arc::ptr_eq(&self.store, &other.store) {
            return Ok(0);
        }
        let incoming = other.store.list::<StoredCapability>();
        let count = incoming.len();
        self.store.write(|txn| {
            for record in incoming {
                txn.put((*record).clone())?;
            }
            Ok::<_, StoreError>(())
        })?;
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.store.snapshot().len::<StoredCapability>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = CapabilityRegistry::new();
        let handler = HandlerRef::new("echo");
        registry
            .register(CapabilityDef::new("echo", "Echo input"), Some(handler.clone()))
            .unwrap();

        assert!(registry.has("echo"));
        assert_eq!(registry.len(), 1);
        let record = registry.get("echo").unwrap();
        assert_eq!(record.source, "native");
        assert!(record.tags.is_empty());
        assert_eq!(registry.handler("echo"), Some(handler));
    }

    #[test]
    fn test_register_with_source_and_tags() {
        let registry = CapabilityRegistry::new();
        registry
            .register_with_source(
                CapabilityDef::new("read_file", "Read a file"),
                None,
                "mcp:filesystem",
                vec!["files".to_string()],
            )
            .unwrap();
        registry
            .register(CapabilityDef::new("now", "Current time"), None)
            .unwrap();

        let files = registry.by_tag("files").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "read_file");
        assert_eq!(registry.by_source("mcp:filesystem").unwrap().len(), 1);
        assert_eq!(registry.by_source("native").unwrap()[0].name, "now");
    }

    #[test]
    fn test_require_handler() {
        let registry = CapabilityRegistry::new();
        registry
            .register(CapabilityDef::new("bare", "No handler"), None)
            .unwrap();

        assert!(matches!(
            registry.require_handler("bare"),
            Err(RegistryError::CapabilityNotFound(name)) if name == "bare"
        ));
        assert!(matches!(
            registry.require_handler("missing"),
            Err(RegistryError::CapabilityNotFound(_))
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = CapabilityRegistry::new();
        registry
            .register(CapabilityDef::new("tmp", "Temporary"), None)
            .unwrap();
        registry.remove("tmp");
        registry.remove("tmp");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_merge_copies_records() {
        let target = CapabilityRegistry::new();
        let source = CapabilityRegistry::new();
        source
            .register(CapabilityDef::new("a", "A"), Some(HandlerRef::new(1u8)))
            .unwrap();
        source
            .register_with_source(CapabilityDef::new("b", "B"), None, "mcp:x", vec![])
            .unwrap();

        assert_eq!(target.merge(&source).unwrap(), 2);
        assert_eq!(target.records(), source.records());
        let names: Vec<String> = target.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_shared_store_is_visible_to_all_registries() {
        let store = Arc::new(Store::new());
        let first = CapabilityRegistry::with_store(Arc::clone(&store));
        let second = CapabilityRegistry::with_store(store);
        first
            .register(CapabilityDef::new("shared", "Shared"), None)
            .unwrap();
        assert!(second.has("shared"));
        assert_eq!(second.merge(&first).unwrap(), 0);
    }
}
