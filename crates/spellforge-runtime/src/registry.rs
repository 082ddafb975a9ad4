//! Plugin registry
//!
//! Tracks loaded plugins by logical name: the compiled unit, the live
//! instance, and when it was registered. Registration is
//! last-writer-wins; `register` hands back the replaced entry so the
//! caller can detach it before the new instance goes live. Lookup is by
//! exact name only; fuzzy matching is a UI concern and lives elsewhere.

use crate::loader::LoadedInstance;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use spellforge_compile::CompiledUnit;
use std::sync::Arc;

/// Runtime record of a loaded plugin.
#[derive(Debug, Clone)]
pub struct PluginEntry {
    /// Logical plugin name
    pub name: String,
    /// Unit the instance was loaded from
    pub unit: Arc<CompiledUnit>,
    /// Live instance and its attachment target
    pub instance: LoadedInstance,
    /// Registration time
    pub registered_at: DateTime<Utc>,
}

/// Loaded plugins by logical name.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: DashMap<String, PluginEntry>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded plugin, returning any replaced entry.
    ///
    /// Callers intending replacement should detach the returned entry's
    /// instance through the host runtime.
    pub fn register(
        &self,
        name: impl Into<String>,
        unit: Arc<CompiledUnit>,
        instance: LoadedInstance,
    ) -> Option<PluginEntry> {
        let name = name.into();
        let entry = PluginEntry {
            name: name.clone(),
            unit,
            instance,
            registered_at: Utc::now(),
        };
        let replaced = self.entries.insert(name.clone(), entry);
        if replaced.is_some() {
            tracing::warn!(%name, "replaced existing plugin registration");
        } else {
            tracing::info!(%name, "registered plugin");
        }
        replaced
    }

    /// Look up a plugin by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<PluginEntry> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    /// Check whether a name is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered plugins.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the registry is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InstanceHandle;
    use crate::loader::LoadStrategy;

    fn unit() -> Arc<CompiledUnit> {
        Arc::new(CompiledUnit::empty())
    }

    fn instance(id: u64) -> LoadedInstance {
        LoadedInstance {
            type_name: "Fireball".to_string(),
            strategy: LoadStrategy::ComponentAttach,
            entity: None,
            handle: InstanceHandle {
                id,
                type_name: "Fireball".to_string(),
            },
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = PluginRegistry::new();
        assert!(registry.register("fireball", unit(), instance(1)).is_none());

        let entry = registry.get("fireball").unwrap();
        assert_eq!(entry.instance.handle.id, 1);
        assert!(registry.contains("fireball"));
        assert!(registry.get("FIREBALL").is_none()); // exact-name only
    }

    #[test]
    fn register_returns_replaced_entry() {
        let registry = PluginRegistry::new();
        registry.register("fireball", unit(), instance(1));

        let replaced = registry.register("fireball", unit(), instance(2)).unwrap();
        assert_eq!(replaced.instance.handle.id, 1);
        assert_eq!(registry.get("fireball").unwrap().instance.handle.id, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn list_is_sorted() {
        let registry = PluginRegistry::new();
        registry.register("storm", unit(), instance(1));
        registry.register("blink", unit(), instance(2));

        assert_eq!(registry.list(), vec!["blink", "storm"]);
    }
}
