//! Script-generation orchestrator
//!
//! The linear sibling of the modification pipeline: propose a name,
//! generate source, persist it, compile it, and optionally auto-attach.
//! New scripts are assumed component-capable, so attach goes through the
//! component strategy only; there is no legacy framework-script
//! expectation for brand-new code. No budget, no backups: there is no
//! prior version to protect.

use crate::compile_task::compile_in_background;
use crate::config::ForgeConfig;
use crate::textgen::{extract_field, generate_with_watchdog, strip_code_fences, GeneratorError, TextGenerator};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use spellforge_compile::{CompiledUnit, ReferenceResolver, SourceCompiler, SOURCE_SUFFIX};
use spellforge_runtime::{
    HostLibraries, HostRuntime, PluginRegistry, TypeCapabilities, UnitLoader,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Orchestrates creation of brand-new scripts from free-text requests.
pub struct ScriptGenerationOrchestrator {
    config: ForgeConfig,
    generator: Arc<dyn TextGenerator>,
    host: Arc<dyn HostRuntime>,
    registry: Arc<PluginRegistry>,
    compiler: SourceCompiler,
    resolver: ReferenceResolver,
    loader: UnitLoader,
    /// Compiled units by script name, for later `/instantiate`
    units: DashMap<String, Arc<CompiledUnit>>,
    /// Paths of scripts generated this session, in creation order
    generated: Mutex<Vec<PathBuf>>,
}

impl std::fmt::Debug for ScriptGenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptGenerationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScriptGenerationOrchestrator {
    /// Create an orchestrator over its collaborators.
    #[must_use]
    pub fn new(
        config: ForgeConfig,
        generator: Arc<dyn TextGenerator>,
        host: Arc<dyn HostRuntime>,
        capabilities: Arc<dyn TypeCapabilities>,
        registry: Arc<PluginRegistry>,
    ) -> Self {
        let mut resolver = ReferenceResolver::new()
            .with_libraries(Arc::new(HostLibraries(Arc::clone(&host))));
        for dir in &config.library_dirs {
            resolver = resolver.with_search_dir(dir.clone());
        }

        Self {
            loader: UnitLoader::new(Arc::clone(&host), capabilities),
            compiler: SourceCompiler::new(),
            resolver,
            units: DashMap::new(),
            generated: Mutex::new(Vec::new()),
            config,
            generator,
            host,
            registry,
        }
    }

    /// Generate, persist, compile, and (optionally) attach a new script.
    ///
    /// Returns a summary naming the save path and attach result, or a
    /// failure message naming the stage that failed.
    pub async fn generate_script(&self, request: &str) -> String {
        tracing::info!(request, "generating new script");

        let (name, functionality) = match self.analyze_script_request(request).await {
            Ok(parts) => parts,
            Err(e) => return format!("Script generation failed while analyzing the request: {e}"),
        };
        tracing::info!(script = %name, "proposed script name");

        let code = match self.generate_script_code(&name, &functionality).await {
            Ok(code) => code,
            Err(e) => {
                return format!("Script generation failed while generating code for '{name}': {e}")
            }
        };

        let path = match self.save_script(&name, &code) {
            Ok(path) => path,
            Err(e) => return format!("Script generation failed while saving '{name}': {e}"),
        };

        let references = self.resolver.resolve(&self.config.core_references);
        let unit = match compile_in_background(self.compiler, code.clone(), references).await {
            Ok(unit) => Arc::new(unit),
            Err(e) if e.is_toolchain() => {
                tracing::error!(error = %e, "toolchain unavailable");
                return format!("Script generation is unavailable: {e}");
            }
            Err(e) => {
                for diag in e.diagnostics() {
                    tracing::error!(script = %name, %diag, "generated code diagnostic");
                }
                return format!(
                    "Script generation failed for '{name}': the generated code did not compile ({} error(s)).",
                    e.diagnostics().len()
                );
            }
        };
        self.units.insert(name.clone(), Arc::clone(&unit));

        let attach_note = if self.config.auto_attach_scripts {
            self.attach(&name, &unit)
        } else {
            String::new()
        };

        let mut summary = format!(
            "Successfully generated and loaded '{name}' script!\nSaved to: {}",
            path.display()
        );
        if !attach_note.is_empty() {
            summary.push('\n');
            summary.push_str(&attach_note);
        }
        summary
    }

    /// Attach a previously generated script by name.
    ///
    /// A name already live in the registry is rejected unless `replace`
    /// is set, in which case the prior instance is detached first.
    pub fn instantiate(&self, name: &str, replace: bool) -> String {
        let name = name.strip_suffix(SOURCE_SUFFIX).unwrap_or(name);

        if !replace && self.registry.contains(name) {
            return format!("'{name}' is already loaded. Use --replace to reload it.");
        }

        let Some(unit) = self.units.get(name).map(|u| Arc::clone(u.value())) else {
            return format!("Script not found: {name}");
        };

        self.attach(name, &unit)
    }

    /// Paths of scripts generated this session.
    #[must_use]
    pub fn generated_scripts(&self) -> Vec<PathBuf> {
        self.generated.lock().clone()
    }

    async fn analyze_script_request(
        &self,
        request: &str,
    ) -> Result<(String, String), GeneratorError> {
        let prompt = format!(
            "Analyze this request for a new mod script:\n\n{request}\n\n\
             Return ONLY a JSON object with these properties:\n\
             1. \"script_name\": a suitable type name (PascalCase, no spaces)\n\
             2. \"functionality\": a brief description of what the script should do\n"
        );

        let response = self.call_generator(&prompt).await?;

        let name = extract_field(&response, "script_name")
            .and_then(|raw| sanitize_type_name(&raw))
            .unwrap_or_else(|| format!("GeneratedScript{}", Utc::now().timestamp_millis()));
        let functionality =
            extract_field(&response, "functionality").unwrap_or_else(|| request.to_string());

        Ok((name, functionality))
    }

    async fn generate_script_code(
        &self,
        name: &str,
        functionality: &str,
    ) -> Result<String, GeneratorError> {
        let prompt = format!(
            "Write a complete mod script declaring a public type named {name} that does the following:\n\n\
             {functionality}\n\n\
             Requirements:\n\
             - Complete, compilable source\n\
             - Implement the engine Behavior trait so the type can be attached\n\
             - Include the imports it needs; nothing beyond the engine prelude\n\
             - Return ONLY the code with no markdown formatting or explanations\n"
        );

        let response = self.call_generator(&prompt).await?;
        Ok(ensure_prelude(&strip_code_fences(&response)))
    }

    fn save_script(&self, name: &str, code: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.config.scripts_dir)?;

        let file_name = if name.ends_with(SOURCE_SUFFIX) {
            name.to_string()
        } else {
            format!("{name}{SOURCE_SUFFIX}")
        };
        let path = self.config.scripts_dir.join(file_name);
        std::fs::write(&path, code)?;

        let mut generated = self.generated.lock();
        if !generated.contains(&path) {
            generated.push(path.clone());
        }
        tracing::info!(path = %path.display(), "saved generated script");
        Ok(path)
    }

    fn attach(&self, name: &str, unit: &Arc<CompiledUnit>) -> String {
        match self.loader.load_component(unit, name, None) {
            Ok(instance) => {
                let note = match instance.entity {
                    Some(entity) => format!("Script attached to new entity {entity}."),
                    None => "Script attached.".to_string(),
                };
                if let Some(previous) =
                    self.registry
                        .register(name.to_string(), Arc::clone(unit), instance)
                {
                    self.host.detach(&previous.instance.handle);
                }
                note
            }
            Err(e) => {
                tracing::warn!(script = %name, error = %e, "auto-attach failed");
                format!("Could not attach script: {e}")
            }
        }
    }

    async fn call_generator(&self, prompt: &str) -> Result<String, GeneratorError> {
        let timeout = Duration::from_secs(self.config.generation_timeout_secs);
        generate_with_watchdog(self.generator.as_ref(), prompt, timeout).await
    }
}

/// Reduce a proposed script name to a valid PascalCase-ish type name.
fn sanitize_type_name(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .skip_while(|c| !c.is_alphabetic())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let mut chars = cleaned.chars();
    let first = chars.next()?.to_ascii_uppercase();
    Some(std::iter::once(first).chain(chars).collect())
}

/// Prepend the engine prelude when the script declares no imports.
fn ensure_prelude(code: &str) -> String {
    if code.contains("use ") {
        code.to_string()
    } else {
        format!("use engine::prelude::*;\n\n{code}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_accepts_clean_names() {
        assert_eq!(sanitize_type_name("FireballSpell").unwrap(), "FireballSpell");
    }

    #[test]
    fn sanitize_strips_noise_and_capitalizes() {
        assert_eq!(sanitize_type_name("  fireball spell!  ").unwrap(), "Fireballspell");
        assert_eq!(sanitize_type_name("42frost_bolt").unwrap(), "Frost_bolt");
    }

    #[test]
    fn sanitize_rejects_nameless_input() {
        assert!(sanitize_type_name("!!!").is_none());
        assert!(sanitize_type_name("").is_none());
    }

    #[test]
    fn prelude_added_only_when_missing() {
        assert!(ensure_prelude("pub struct S;").starts_with("use engine::prelude::*;"));

        let with_import = "use engine::prelude::*;\npub struct S;";
        assert_eq!(ensure_prelude(with_import), with_import);
    }
}
