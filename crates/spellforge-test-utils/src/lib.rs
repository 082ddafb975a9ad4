//! Testing utilities for the spellforge workspace
//!
//! Shared fakes and source fixtures: a recording host runtime with
//! failure injection, capability helpers for "framework present/absent"
//! setups, and canonical script sources.

#![allow(missing_docs)]

use parking_lot::Mutex;
use spellforge_runtime::{
    EntityId, HostError, HostRuntime, InstanceHandle, NameChainCapabilities,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Recording host runtime with failure injection.
///
/// Records entities, attachments, constructions, invocations, and
/// detachments; individual type names or operations can be made to fail
/// to drive strategy-fallback paths.
#[derive(Debug, Default)]
pub struct FakeHost {
    next_id: AtomicU64,
    entities: Mutex<Vec<(EntityId, String)>>,
    attachments: Mutex<Vec<(EntityId, InstanceHandle)>>,
    constructions: Mutex<Vec<InstanceHandle>>,
    invocations: Mutex<Vec<(u64, String)>>,
    detached: Mutex<Vec<u64>>,
    fail_attach_types: Mutex<HashSet<String>>,
    fail_construct_types: Mutex<HashSet<String>>,
    fail_operations: Mutex<HashSet<String>>,
    libraries: Mutex<Vec<PathBuf>>,
    editor_reload_succeeds: Mutex<bool>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `attach_component` fail for a type name.
    pub fn fail_attach_for(&self, type_name: &str) {
        self.fail_attach_types.lock().insert(type_name.to_string());
    }

    /// Make `construct` fail for a type name.
    pub fn fail_construct_for(&self, type_name: &str) {
        self.fail_construct_types.lock().insert(type_name.to_string());
    }

    /// Make `invoke` fail for an operation name.
    pub fn fail_operation(&self, operation: &str) {
        self.fail_operations.lock().insert(operation.to_string());
    }

    /// Set the loaded-library locations the host reports.
    pub fn set_libraries(&self, libraries: Vec<PathBuf>) {
        *self.libraries.lock() = libraries;
    }

    /// Make the editor hot-reload hook claim success.
    pub fn set_editor_reload(&self, succeeds: bool) {
        *self.editor_reload_succeeds.lock() = succeeds;
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.lock().iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn attachments(&self) -> Vec<(EntityId, InstanceHandle)> {
        self.attachments.lock().clone()
    }

    pub fn attached_type_names(&self) -> Vec<String> {
        self.attachments
            .lock()
            .iter()
            .map(|(_, h)| h.type_name.clone())
            .collect()
    }

    pub fn constructions(&self) -> Vec<InstanceHandle> {
        self.constructions.lock().clone()
    }

    pub fn invocations(&self) -> Vec<(u64, String)> {
        self.invocations.lock().clone()
    }

    pub fn detached(&self) -> Vec<u64> {
        self.detached.lock().clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl HostRuntime for FakeHost {
    fn spawn_entity(&self, name: &str) -> EntityId {
        let id = EntityId(self.next_id());
        self.entities.lock().push((id, name.to_string()));
        id
    }

    fn attach_component(
        &self,
        entity: EntityId,
        type_name: &str,
    ) -> Result<InstanceHandle, HostError> {
        if self.fail_attach_types.lock().contains(type_name) {
            return Err(HostError::AttachFailed {
                type_name: type_name.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let handle = InstanceHandle {
            id: self.next_id(),
            type_name: type_name.to_string(),
        };
        self.attachments.lock().push((entity, handle.clone()));
        Ok(handle)
    }

    fn construct(&self, type_name: &str) -> Result<InstanceHandle, HostError> {
        if self.fail_construct_types.lock().contains(type_name) {
            return Err(HostError::ConstructionFailed {
                type_name: type_name.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let handle = InstanceHandle {
            id: self.next_id(),
            type_name: type_name.to_string(),
        };
        self.constructions.lock().push(handle.clone());
        Ok(handle)
    }

    fn invoke(&self, instance: &InstanceHandle, operation: &str) -> Result<(), HostError> {
        if self.fail_operations.lock().contains(operation) {
            return Err(HostError::InvokeFailed {
                operation: operation.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.invocations.lock().push((instance.id, operation.to_string()));
        Ok(())
    }

    fn detach(&self, instance: &InstanceHandle) {
        self.detached.lock().push(instance.id);
    }

    fn loaded_library_paths(&self) -> Vec<PathBuf> {
        self.libraries.lock().clone()
    }

    fn reload_in_editor(&self, _path: &Path) -> bool {
        *self.editor_reload_succeeds.lock()
    }
}

/// Capabilities with the default engine and framework bases present.
pub fn default_capabilities() -> NameChainCapabilities {
    NameChainCapabilities::new()
}

/// A component-capable script declaring `name` with the given base speed,
/// shaped like what a generator proposes for speed-change requests.
pub fn component_script_with_speed(name: &str, speed: &str) -> String {
    format!(
        "use engine::prelude::*;\n\npub struct {name} {{\n    pub movement_speed: f32,\n}}\n\nimpl {name} {{\n    pub fn base_speed() -> f32 {{\n        {speed}\n    }}\n}}\n\nimpl Behavior for {name} {{\n    fn on_enable(&mut self) {{}}\n    fn update(&mut self) {{}}\n}}\n"
    )
}

/// A script with a guaranteed syntax error.
pub fn broken_script() -> String {
    "pub struct Broken {\n    field f32\n".to_string()
}
