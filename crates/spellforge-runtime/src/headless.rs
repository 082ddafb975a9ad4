//! Headless host runtime
//!
//! An engine-free [`HostRuntime`] that records entities and instances and
//! logs invocations. Backs the REPL binary and any embedder running the
//! pipeline without a real engine; tests use it to observe attach and
//! invoke traffic.

use crate::host::{EntityId, HostError, HostRuntime, InstanceHandle};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process recording host.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    next_id: AtomicU64,
    entities: Mutex<Vec<(EntityId, String)>>,
    instances: Mutex<Vec<InstanceHandle>>,
    invocations: Mutex<Vec<(u64, String)>>,
    detached: Mutex<Vec<u64>>,
    libraries: Vec<PathBuf>,
}

impl HeadlessHost {
    /// Create an empty host.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host reporting the given loaded-library locations.
    #[must_use]
    pub fn with_libraries(libraries: Vec<PathBuf>) -> Self {
        Self {
            libraries,
            ..Self::default()
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Names of spawned entities, in spawn order.
    #[must_use]
    pub fn entity_names(&self) -> Vec<String> {
        self.entities.lock().iter().map(|(_, n)| n.clone()).collect()
    }

    /// Live instance handles, in creation order.
    #[must_use]
    pub fn instances(&self) -> Vec<InstanceHandle> {
        self.instances.lock().clone()
    }

    /// Recorded `(instance id, operation)` invocations, in call order.
    #[must_use]
    pub fn invocations(&self) -> Vec<(u64, String)> {
        self.invocations.lock().clone()
    }

    /// Instance ids that have been detached.
    #[must_use]
    pub fn detached(&self) -> Vec<u64> {
        self.detached.lock().clone()
    }
}

impl HostRuntime for HeadlessHost {
    fn spawn_entity(&self, name: &str) -> EntityId {
        let id = EntityId(self.next_id());
        self.entities.lock().push((id, name.to_string()));
        tracing::debug!(%id, name, "spawned entity");
        id
    }

    fn attach_component(
        &self,
        entity: EntityId,
        type_name: &str,
    ) -> Result<InstanceHandle, HostError> {
        let handle = InstanceHandle {
            id: self.next_id(),
            type_name: type_name.to_string(),
        };
        self.instances.lock().push(handle.clone());
        tracing::debug!(%entity, %handle, "attached component");
        Ok(handle)
    }

    fn construct(&self, type_name: &str) -> Result<InstanceHandle, HostError> {
        let handle = InstanceHandle {
            id: self.next_id(),
            type_name: type_name.to_string(),
        };
        self.instances.lock().push(handle.clone());
        tracing::debug!(%handle, "constructed instance");
        Ok(handle)
    }

    fn invoke(&self, instance: &InstanceHandle, operation: &str) -> Result<(), HostError> {
        self.invocations.lock().push((instance.id, operation.to_string()));
        tracing::debug!(%instance, operation, "invoked operation");
        Ok(())
    }

    fn detach(&self, instance: &InstanceHandle) {
        self.detached.lock().push(instance.id);
        self.instances.lock().retain(|h| h.id != instance.id);
        tracing::debug!(%instance, "detached instance");
    }

    fn loaded_library_paths(&self) -> Vec<PathBuf> {
        self.libraries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_entities_and_instances() {
        let host = HeadlessHost::new();
        let entity = host.spawn_entity("A");
        let handle = host.attach_component(entity, "T").unwrap();

        assert_ne!(entity.0, handle.id);
    }

    #[test]
    fn detach_removes_instance() {
        let host = HeadlessHost::new();
        let handle = host.construct("T").unwrap();

        host.detach(&handle);
        assert!(host.instances().is_empty());
        assert_eq!(host.detached(), vec![handle.id]);
    }

    #[test]
    fn libraries_are_reported() {
        let host = HeadlessHost::with_libraries(vec![PathBuf::from("/libs/engine.rlib")]);
        assert_eq!(host.loaded_library_paths().len(), 1);
    }
}
