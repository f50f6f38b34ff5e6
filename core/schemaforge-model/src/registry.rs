//! Entity registry.
//!
//! Discovery fills a [`RegistryBuilder`] in a single pass and then freezes
//! it into an immutable [`EntityRegistry`], which request handlers share
//! through an `Arc`. Nothing is ever registered after the freeze, so
//! lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::CompiledEntity;
use crate::key::EntityKey;
use crate::shape::{StorageShape, ValidationShape};

/// One registered entity.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    key: EntityKey,
    entity: Arc<CompiledEntity>,
}

impl RegistryEntry {
    pub fn new(key: EntityKey, entity: CompiledEntity) -> Self {
        Self {
            key,
            entity: Arc::new(entity),
        }
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn entity(&self) -> &CompiledEntity {
        &self.entity
    }

    pub fn model(&self) -> &StorageShape {
        self.entity.storage()
    }

    pub fn create_schema(&self) -> &ValidationShape {
        self.entity.create_schema()
    }

    pub fn read_schema(&self) -> &ValidationShape {
        self.entity.read_schema()
    }

    pub fn update_schema(&self) -> &ValidationShape {
        self.entity.update_schema()
    }
}

/// Mutable registry used while discovery runs.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<EntityKey, RegistryEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entity` under `key`, replacing any earlier entry.
    /// Returns the replaced entry.
    pub fn register(&mut self, key: EntityKey, entity: CompiledEntity) -> Option<RegistryEntry> {
        let entry = RegistryEntry::new(key.clone(), entity);
        self.entries.insert(key, entry)
    }

    pub fn lookup(&self, key: &EntityKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Publishes the registry. The result is read-only.
    pub fn freeze(self) -> EntityRegistry {
        EntityRegistry {
            entries: self.entries,
        }
    }
}

/// Read-only registry of compiled entities.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: HashMap<EntityKey, RegistryEntry>,
}

impl EntityRegistry {
    pub fn lookup(&self, key: &EntityKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    /// Looks up by dotted key (`"crm.customer"`). Case-insensitive.
    pub fn lookup_str(&self, key: &str) -> Option<&RegistryEntry> {
        let key = EntityKey::parse(key).ok()?;
        self.entries.get(&key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries ordered by key.
    pub fn entries(&self) -> Vec<&RegistryEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn keys(&self) -> Vec<&EntityKey> {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
