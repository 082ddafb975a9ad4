//! Spellforge runtime integration (spellforge-runtime)
//!
//! The seam between compiled units and the running host process:
//! - [`HostRuntime`] - the narrow collaborator trait for the host's type
//!   system (spawn, attach, construct, invoke)
//! - [`TypeCapabilities`] - name-based capability queries over type
//!   metadata, so the framework base can be detected without static linkage
//! - [`UnitLoader`] - ordered multi-strategy instantiation of unit types
//! - [`PluginRegistry`] - loaded plugins by logical name

pub mod capabilities;
pub mod headless;
pub mod host;
pub mod loader;
pub mod registry;

pub use capabilities::{NameChainCapabilities, TypeCapabilities};
pub use headless::HeadlessHost;
pub use host::{EntityId, HostError, HostLibraries, HostRuntime, InstanceHandle};
pub use loader::{LoadError, LoadStrategy, LoadedInstance, UnitLoader};
pub use registry::{PluginEntry, PluginRegistry};

/// Conventional enable lifecycle operation invoked after attach.
pub const ENABLE_OPERATION: &str = "on_enable";

/// Conventional entry operations tried, in order, after plain construction.
pub const RUN_OPERATIONS: &[&str] = &["run", "start"];

/// Default engine component base type name.
pub const ENGINE_BEHAVIOR_BASE: &str = "Behavior";

/// Default mod-framework script base type name.
pub const FRAMEWORK_SCRIPT_BASE: &str = "ModScript";
