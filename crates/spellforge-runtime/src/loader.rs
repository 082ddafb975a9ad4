//! Multi-strategy unit loading
//!
//! Loading is an ordered fan-out over capability-tagged strategies:
//! component attach, framework-script attach, plain instantiation. The
//! first strategy that succeeds wins; per-strategy failure reasons are
//! carried in the error when all of them fail. Loading is deliberately
//! not idempotent; de-duplication is the registry's job.

use crate::capabilities::TypeCapabilities;
use crate::host::{EntityId, HostRuntime, InstanceHandle};
use crate::{ENABLE_OPERATION, RUN_OPERATIONS};
use spellforge_compile::{CompiledUnit, TypeInfo};
use std::sync::Arc;

/// One attachment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Attach as an engine behavior component on a host entity
    ComponentAttach,
    /// Attach a framework-script type and invoke its enable operation
    FrameworkScriptAttach,
    /// Default-construct and invoke a conventional entry operation
    PlainInstantiate,
}

impl LoadStrategy {
    /// All strategies, in fallback order.
    pub const ALL: [LoadStrategy; 3] = [
        LoadStrategy::ComponentAttach,
        LoadStrategy::FrameworkScriptAttach,
        LoadStrategy::PlainInstantiate,
    ];

    /// Short name used in logs and summaries.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            LoadStrategy::ComponentAttach => "component-attach",
            LoadStrategy::FrameworkScriptAttach => "framework-script-attach",
            LoadStrategy::PlainInstantiate => "plain-instantiate",
        }
    }
}

impl std::fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A successfully instantiated unit type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedInstance {
    /// Name of the instantiated type
    pub type_name: String,
    /// Strategy that succeeded
    pub strategy: LoadStrategy,
    /// Entity the instance is attached to, for attach strategies
    pub entity: Option<EntityId>,
    /// Live instance handle
    pub handle: InstanceHandle,
}

/// Unit loading failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The requested type is not declared by the unit
    #[error("type `{type_name}` not found in the compiled unit")]
    TypeNotFound {
        /// Requested type name
        type_name: String,
    },

    /// Every strategy was tried and failed
    #[error("all load strategies failed for `{type_name}`")]
    AllStrategiesFailed {
        /// Requested type name
        type_name: String,
        /// Per-strategy failure reasons, in attempt order
        attempts: Vec<(LoadStrategy, String)>,
    },

    /// No type in the unit looked like a loadable plugin
    #[error("no plugin candidate found in unit `{unit_name}`")]
    NoPluginCandidate {
        /// Logical unit name
        unit_name: String,
    },
}

/// Instantiates compiled unit types through the host runtime.
pub struct UnitLoader {
    host: Arc<dyn HostRuntime>,
    capabilities: Arc<dyn TypeCapabilities>,
}

impl std::fmt::Debug for UnitLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitLoader").finish_non_exhaustive()
    }
}

impl UnitLoader {
    /// Create a loader over a host runtime and capability queries.
    #[must_use]
    pub fn new(host: Arc<dyn HostRuntime>, capabilities: Arc<dyn TypeCapabilities>) -> Self {
        Self { host, capabilities }
    }

    /// Load a named type from a unit, trying each strategy in order.
    ///
    /// `target` reuses an existing host entity for the attach strategies;
    /// without it a fresh entity is spawned per attach.
    ///
    /// # Errors
    /// - [`LoadError::TypeNotFound`] if the unit does not declare the type
    /// - [`LoadError::AllStrategiesFailed`] with per-strategy reasons
    pub fn load(
        &self,
        unit: &CompiledUnit,
        type_name: &str,
        target: Option<EntityId>,
    ) -> Result<LoadedInstance, LoadError> {
        let Some(ty) = unit.get(type_name) else {
            return Err(LoadError::TypeNotFound {
                type_name: type_name.to_string(),
            });
        };

        let mut attempts = Vec::new();
        for strategy in LoadStrategy::ALL {
            match self.try_strategy(strategy, ty, target) {
                Ok(instance) => {
                    tracing::info!(type_name, strategy = %strategy, "loaded unit type");
                    return Ok(instance);
                }
                Err(reason) => {
                    tracing::debug!(type_name, strategy = %strategy, %reason, "strategy failed");
                    attempts.push((strategy, reason));
                }
            }
        }

        Err(LoadError::AllStrategiesFailed {
            type_name: type_name.to_string(),
            attempts,
        })
    }

    /// Load through the component-attach strategy only.
    ///
    /// The narrower contract used for freshly generated scripts, which are
    /// assumed component-capable.
    pub fn load_component(
        &self,
        unit: &CompiledUnit,
        type_name: &str,
        target: Option<EntityId>,
    ) -> Result<LoadedInstance, LoadError> {
        let Some(ty) = unit.get(type_name) else {
            return Err(LoadError::TypeNotFound {
                type_name: type_name.to_string(),
            });
        };

        self.try_strategy(LoadStrategy::ComponentAttach, ty, target)
            .map_err(|reason| LoadError::AllStrategiesFailed {
                type_name: type_name.to_string(),
                attempts: vec![(LoadStrategy::ComponentAttach, reason)],
            })
    }

    /// Generic plugin-style load: scan the unit for any type that looks
    /// like a plugin and instantiate the first that loads.
    ///
    /// A type qualifies when its name suggests a plugin (`Plugin`, `Mod`,
    /// `Script`, or the logical unit name as a substring) or when a
    /// capability predicate matches.
    pub fn load_any_plugin(
        &self,
        unit: &CompiledUnit,
        unit_name: &str,
    ) -> Result<LoadedInstance, LoadError> {
        for ty in unit.types() {
            if !self.looks_like_plugin(ty, unit_name) {
                continue;
            }
            match self.load(unit, &ty.name, None) {
                Ok(instance) => return Ok(instance),
                Err(e) => {
                    tracing::warn!(type_name = %ty.name, error = %e, "plugin candidate failed to load");
                }
            }
        }

        Err(LoadError::NoPluginCandidate {
            unit_name: unit_name.to_string(),
        })
    }

    fn looks_like_plugin(&self, ty: &TypeInfo, unit_name: &str) -> bool {
        let name = &ty.name;
        name.contains("Plugin")
            || name.contains("Mod")
            || name.contains("Script")
            || (!unit_name.is_empty() && name.contains(unit_name))
            || self.capabilities.is_component_type(ty)
            || self.capabilities.is_framework_script_type(ty)
    }

    fn try_strategy(
        &self,
        strategy: LoadStrategy,
        ty: &TypeInfo,
        target: Option<EntityId>,
    ) -> Result<LoadedInstance, String> {
        match strategy {
            LoadStrategy::ComponentAttach => {
                if !self.capabilities.is_component_type(ty) {
                    return Err("not a component-capable type".to_string());
                }
                self.attach(strategy, ty, target)
            }
            LoadStrategy::FrameworkScriptAttach => {
                if !self.capabilities.is_framework_script_type(ty) {
                    return Err("not a framework script type".to_string());
                }
                self.attach(strategy, ty, target)
            }
            LoadStrategy::PlainInstantiate => {
                let handle = self.host.construct(&ty.name).map_err(|e| e.to_string())?;
                for op in RUN_OPERATIONS {
                    if self.capabilities.has_operation(ty, op) {
                        self.host.invoke(&handle, op).map_err(|e| e.to_string())?;
                        break;
                    }
                }
                Ok(LoadedInstance {
                    type_name: ty.name.clone(),
                    strategy,
                    entity: None,
                    handle,
                })
            }
        }
    }

    fn attach(
        &self,
        strategy: LoadStrategy,
        ty: &TypeInfo,
        target: Option<EntityId>,
    ) -> Result<LoadedInstance, String> {
        let entity = target.unwrap_or_else(|| self.host.spawn_entity(&format!("{}Object", ty.name)));
        let handle = self
            .host
            .attach_component(entity, &ty.name)
            .map_err(|e| e.to_string())?;

        if self.capabilities.has_operation(ty, ENABLE_OPERATION) {
            self.host
                .invoke(&handle, ENABLE_OPERATION)
                .map_err(|e| e.to_string())?;
        }

        Ok(LoadedInstance {
            type_name: ty.name.clone(),
            strategy,
            entity: Some(entity),
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::NameChainCapabilities;
    use crate::headless::HeadlessHost;
    use spellforge_compile::{ReferenceSet, SourceCompiler};

    fn compile(source: &str) -> CompiledUnit {
        let refs: ReferenceSet = ["engine".to_string()].into_iter().collect();
        SourceCompiler::new().compile(source, &refs).unwrap()
    }

    fn loader(host: Arc<HeadlessHost>) -> UnitLoader {
        UnitLoader::new(host, Arc::new(NameChainCapabilities::new()))
    }

    const COMPONENT: &str = r#"
pub struct Fireball;

impl Behavior for Fireball {
    fn on_enable(&mut self) {}
}
"#;

    const PLAIN: &str = r#"
pub struct Greeter;

impl Greeter {
    pub fn run(&self) {}
}
"#;

    #[test]
    fn component_type_attaches_and_enables() {
        let host = Arc::new(HeadlessHost::new());
        let unit = compile(COMPONENT);

        let instance = loader(Arc::clone(&host)).load(&unit, "Fireball", None).unwrap();

        assert_eq!(instance.strategy, LoadStrategy::ComponentAttach);
        assert!(instance.entity.is_some());
        assert_eq!(host.entity_names(), vec!["FireballObject"]);
        assert_eq!(host.invocations(), vec![(instance.handle.id, ENABLE_OPERATION.to_string())]);
    }

    #[test]
    fn component_attach_reuses_target_entity() {
        let host = Arc::new(HeadlessHost::new());
        let existing = host.spawn_entity("Arena");
        let unit = compile(COMPONENT);

        let instance = loader(Arc::clone(&host))
            .load(&unit, "Fireball", Some(existing))
            .unwrap();

        assert_eq!(instance.entity, Some(existing));
        assert_eq!(host.entity_names(), vec!["Arena"]);
    }

    #[test]
    fn framework_script_detected_through_ancestry() {
        let source = r#"
pub struct Storm;

impl SpellArc for Storm {
    fn on_enable(&mut self) {}
}
"#;
        let host = Arc::new(HeadlessHost::new());
        let caps = NameChainCapabilities::new().with_ancestor("SpellArc", "ModScript");
        let loader = UnitLoader::new(Arc::clone(&host) as Arc<dyn HostRuntime>, Arc::new(caps));

        let refs: ReferenceSet = ["engine".to_string()].into_iter().collect();
        let unit = SourceCompiler::new().compile(source, &refs).unwrap();
        let instance = loader.load(&unit, "Storm", None).unwrap();

        assert_eq!(instance.strategy, LoadStrategy::FrameworkScriptAttach);
    }

    #[test]
    fn plain_type_constructs_and_runs() {
        let host = Arc::new(HeadlessHost::new());
        let unit = compile(PLAIN);

        let instance = loader(Arc::clone(&host)).load(&unit, "Greeter", None).unwrap();

        assert_eq!(instance.strategy, LoadStrategy::PlainInstantiate);
        assert!(instance.entity.is_none());
        assert_eq!(host.invocations(), vec![(instance.handle.id, "run".to_string())]);
    }

    #[test]
    fn missing_type_is_reported() {
        let host = Arc::new(HeadlessHost::new());
        let unit = compile(PLAIN);

        let err = loader(host).load(&unit, "Ghost", None).unwrap_err();
        assert!(matches!(err, LoadError::TypeNotFound { .. }));
    }

    #[test]
    fn load_component_rejects_non_component() {
        let host = Arc::new(HeadlessHost::new());
        let unit = compile(PLAIN);

        let err = loader(host).load_component(&unit, "Greeter", None).unwrap_err();
        let LoadError::AllStrategiesFailed { attempts, .. } = err else {
            panic!("expected strategy failure");
        };
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].0, LoadStrategy::ComponentAttach);
    }

    #[test]
    fn plugin_scan_picks_component_candidate() {
        let host = Arc::new(HeadlessHost::new());
        let unit = compile(COMPONENT);

        let instance = loader(host).load_any_plugin(&unit, "Fireball").unwrap();
        assert_eq!(instance.type_name, "Fireball");
    }

    #[test]
    fn plugin_scan_matches_by_name_suffix() {
        let source = r#"
pub struct HasteMod;

impl HasteMod {
    pub fn start(&self) {}
}
"#;
        let host = Arc::new(HeadlessHost::new());
        let refs = ReferenceSet::new();
        let unit = SourceCompiler::new().compile(source, &refs).unwrap();

        let instance = loader(Arc::clone(&host)).load_any_plugin(&unit, "haste").unwrap();
        assert_eq!(instance.strategy, LoadStrategy::PlainInstantiate);
        assert_eq!(host.invocations(), vec![(instance.handle.id, "start".to_string())]);
    }

    #[test]
    fn plugin_scan_reports_no_candidate() {
        let source = "pub struct Quiet;";
        let host = Arc::new(HeadlessHost::new());
        let unit = SourceCompiler::new()
            .compile(source, &ReferenceSet::new())
            .unwrap();

        let err = loader(host).load_any_plugin(&unit, "unrelated").unwrap_err();
        assert!(matches!(err, LoadError::NoPluginCandidate { .. }));
    }

    #[test]
    fn loading_twice_creates_two_entities() {
        let host = Arc::new(HeadlessHost::new());
        let unit = compile(COMPONENT);
        let loader = loader(Arc::clone(&host));

        loader.load(&unit, "Fireball", None).unwrap();
        loader.load(&unit, "Fireball", None).unwrap();

        assert_eq!(host.entity_names().len(), 2);
    }
}
