//! Host-runtime collaborator trait
//!
//! The core never talks to the engine directly; everything it needs from
//! the host process's type system goes through [`HostRuntime`]:
//! entity spawning, component attachment, default construction, reflective
//! zero-argument invocation, and the loaded-library listing the reference
//! resolver appends.

use std::path::{Path, PathBuf};

/// Identifier of a host scene entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Handle to a live instance created by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    /// Host-assigned instance id
    pub id: u64,
    /// Name of the instantiated type
    pub type_name: String,
}

impl std::fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

/// Failures reported by the host runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// The host could not attach the type as a component
    #[error("attach failed for `{type_name}`: {reason}")]
    AttachFailed {
        /// Type that failed to attach
        type_name: String,
        /// Host-reported reason
        reason: String,
    },

    /// Default construction failed
    #[error("construction failed for `{type_name}`: {reason}")]
    ConstructionFailed {
        /// Type that failed to construct
        type_name: String,
        /// Host-reported reason
        reason: String,
    },

    /// A reflective invocation failed
    #[error("invoking `{operation}` failed: {reason}")]
    InvokeFailed {
        /// Operation that was invoked
        operation: String,
        /// Host-reported reason
        reason: String,
    },
}

/// Capabilities the running host process must expose.
///
/// Implementations are engine glue and live with the embedder; everything
/// here is mutated only from the host's cooperative main thread.
pub trait HostRuntime: Send + Sync {
    /// Create a new named scene entity.
    fn spawn_entity(&self, name: &str) -> EntityId;

    /// Attach an instance of a component-capable type to an entity.
    fn attach_component(
        &self,
        entity: EntityId,
        type_name: &str,
    ) -> Result<InstanceHandle, HostError>;

    /// Default-construct an instance of a type.
    fn construct(&self, type_name: &str) -> Result<InstanceHandle, HostError>;

    /// Invoke a named zero-argument operation on an instance.
    fn invoke(&self, instance: &InstanceHandle, operation: &str) -> Result<(), HostError>;

    /// Detach and dispose an instance (best effort).
    fn detach(&self, instance: &InstanceHandle);

    /// File locations of the process's currently loaded libraries.
    fn loaded_library_paths(&self) -> Vec<PathBuf>;

    /// Editor-only hot-reload hook for an on-disk source file.
    ///
    /// Outside an editor context this refuses, and the caller falls
    /// through to in-memory compilation.
    fn reload_in_editor(&self, _path: &Path) -> bool {
        false
    }
}

/// Adapter exposing a host's loaded libraries to reference resolution.
pub struct HostLibraries(pub std::sync::Arc<dyn HostRuntime>);

impl spellforge_compile::LoadedLibraries for HostLibraries {
    fn loaded_libraries(&self) -> Vec<PathBuf> {
        self.0.loaded_library_paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display() {
        assert_eq!(EntityId(7).to_string(), "entity#7");
    }

    #[test]
    fn instance_handle_display() {
        let handle = InstanceHandle {
            id: 3,
            type_name: "FireballSpell".to_string(),
        };
        assert_eq!(handle.to_string(), "FireballSpell#3");
    }

    #[test]
    fn host_error_messages() {
        let err = HostError::AttachFailed {
            type_name: "X".to_string(),
            reason: "no scene".to_string(),
        };
        assert!(err.to_string().contains("attach failed for `X`"));
    }
}
