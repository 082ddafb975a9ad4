//! Modification orchestrator
//!
//! The top-level state machine for "change existing code" requests:
//! analyze → locate files → generate replacements → back up → validate →
//! apply → reload. Single-flight: a second request while one is running
//! is refused, not queued. Per-file work happens in file-list order with
//! no cross-file atomicity; every file's outcome is collected explicitly
//! and rendered into the returned summary.

use crate::backup::BackupStore;
use crate::budget::SessionBudget;
use crate::compile_task::compile_in_background;
use crate::config::ForgeConfig;
use crate::error::ForgeError;
use crate::textgen::{extract_field, strip_code_fences, TextGenerator};
use parking_lot::Mutex;
use spellforge_compile::{ReferenceResolver, SourceCompiler, SourceUnit, SOURCE_SUFFIX};
use spellforge_runtime::{
    HostLibraries, HostRuntime, PluginRegistry, TypeCapabilities, UnitLoader,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use ulid::Ulid;

/// Refusal when a modification run is already in flight.
pub const ALREADY_PROCESSING_MESSAGE: &str = "Already processing a code change. Please wait.";

/// Refusal when the session budget is spent.
pub const BUDGET_EXHAUSTED_MESSAGE: &str =
    "Maximum number of code modifications reached for this session. Restart the session to continue modifying code.";

/// Result when no file on disk matches the analyzed target.
pub const NO_RELEVANT_FILES_MESSAGE: &str = "Could not find any relevant code files to modify.";

/// Result when every located file dropped out of generation.
pub const NO_GENERATED_CODE_MESSAGE: &str =
    "Could not generate modified code for any located file.";

/// Structured reading of a free-text modification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationPlan {
    /// System the change targets
    pub target_system: String,
    /// The specific change requested
    pub change: String,
    /// Why the change is wanted
    pub rationale: String,
}

/// Outcome of one file's modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationOutcome {
    /// Nothing has happened to this file yet
    NotAttempted,
    /// Proposed text was empty or identical to the original
    NoChangeNeeded,
    /// Proposed text compiled cleanly but is not yet written
    Validated,
    /// Proposed text was written to disk
    Applied,
    /// The file was abandoned for the given reason
    Failed(String),
}

/// One pending or applied change. The original text is captured before
/// any backup or write and is never altered: it is the recovery anchor.
#[derive(Debug, Clone)]
pub struct Modification {
    /// Target file
    pub path: PathBuf,
    /// Pre-modification text
    pub original: String,
    /// Proposed replacement text
    pub proposed: String,
    /// Current outcome
    pub outcome: ModificationOutcome,
}

/// Orchestrates modification of existing scripts from free-text requests.
pub struct ModificationOrchestrator {
    config: ForgeConfig,
    generator: Arc<dyn TextGenerator>,
    host: Arc<dyn HostRuntime>,
    registry: Arc<PluginRegistry>,
    budget: Arc<SessionBudget>,
    compiler: SourceCompiler,
    resolver: ReferenceResolver,
    loader: UnitLoader,
    backups: BackupStore,
    /// First-capture pristine text per file, kept for the whole session
    originals: Mutex<HashMap<PathBuf, String>>,
    /// Single-flight guard; the RAII lock cannot stay wedged past a return
    flight: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ModificationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModificationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModificationOrchestrator {
    /// Create an orchestrator over its collaborators.
    #[must_use]
    pub fn new(
        config: ForgeConfig,
        generator: Arc<dyn TextGenerator>,
        host: Arc<dyn HostRuntime>,
        capabilities: Arc<dyn TypeCapabilities>,
        registry: Arc<PluginRegistry>,
        budget: Arc<SessionBudget>,
    ) -> Self {
        let mut resolver = ReferenceResolver::new()
            .with_libraries(Arc::new(HostLibraries(Arc::clone(&host))));
        for dir in &config.library_dirs {
            resolver = resolver.with_search_dir(dir.clone());
        }

        Self {
            backups: BackupStore::new(&config.backups_dir),
            loader: UnitLoader::new(Arc::clone(&host), capabilities),
            compiler: SourceCompiler::new(),
            resolver,
            originals: Mutex::new(HashMap::new()),
            flight: tokio::sync::Mutex::new(()),
            config,
            generator,
            host,
            registry,
            budget,
        }
    }

    /// Process a free-text modification request.
    ///
    /// Always returns a human-readable summary; partial success is
    /// reported per file, never collapsed into a single verdict.
    pub async fn process_modification_request(&self, request: &str) -> String {
        let request_id = Ulid::new();
        tracing::info!(%request_id, request, "processing code modification request");

        match self.guarded_run(request).await {
            Ok(summary) => summary,
            Err(ForgeError::AlreadyProcessing) => {
                tracing::warn!(%request_id, "rejected: already processing");
                ALREADY_PROCESSING_MESSAGE.to_string()
            }
            Err(ForgeError::BudgetExceeded) => {
                tracing::warn!(%request_id, applied = self.budget.applied(), "rejected: budget exhausted");
                BUDGET_EXHAUSTED_MESSAGE.to_string()
            }
            Err(ForgeError::Resolution(reason)) => {
                tracing::info!(%request_id, %reason, "no modification targets");
                NO_RELEVANT_FILES_MESSAGE.to_string()
            }
            Err(e) if e.is_toolchain_fault() => {
                tracing::error!(%request_id, error = %e, "toolchain unavailable");
                format!("Code modification is unavailable: {e}")
            }
            Err(e) => {
                tracing::error!(%request_id, error = %e, "modification request failed");
                format!("Error during code modification: {e}")
            }
        }
    }

    async fn guarded_run(&self, request: &str) -> Result<String, ForgeError> {
        let _flight = self
            .flight
            .try_lock()
            .map_err(|_| ForgeError::AlreadyProcessing)?;

        if self.budget.is_exhausted() {
            return Err(ForgeError::BudgetExceeded);
        }

        self.run(request).await
    }

    async fn run(&self, request: &str) -> Result<String, ForgeError> {
        let plan = self.analyze_request(request).await?;
        tracing::info!(target = %plan.target_system, change = %plan.change, "analyzed request");

        let files = self.identify_relevant_files(&plan.target_system).await?;
        if files.is_empty() {
            return Err(ForgeError::Resolution(format!(
                "no files on disk match target `{}`",
                plan.target_system
            )));
        }
        tracing::info!(count = files.len(), "located candidate files");

        let mut modifications = self.generate_modifications(&files, &plan).await;
        if modifications.is_empty() {
            return Ok(NO_GENERATED_CODE_MESSAGE.to_string());
        }

        if self.config.create_backups {
            self.create_backups(&mut modifications);
        }

        let mut lines = self.apply_modifications(&mut modifications).await?;

        let applied: Vec<&Modification> = modifications
            .iter()
            .filter(|m| m.outcome == ModificationOutcome::Applied)
            .collect();
        if !applied.is_empty() {
            let reloaded = self.reload_applied(&applied);
            if reloaded > 0 {
                lines.push(format!("Reloaded {reloaded} modified file(s) into the running session."));
            }
        }

        self.budget.record(applied.len() as u32);
        Ok(lines.join("\n"))
    }

    /// Ask the generator what the request targets. Extraction is tolerant:
    /// any missing field falls back to a placeholder instead of failing
    /// the pipeline.
    async fn analyze_request(&self, request: &str) -> Result<ModificationPlan, ForgeError> {
        let prompt = format!(
            "Analyze this request for a code modification:\n\n{request}\n\n\
             Extract and return JSON with exactly these fields:\n\
             1. \"target_system\" (which system changes, e.g. \"enemy AI\", \"physics\", \"player controller\")\n\
             2. \"change\" (the specific code change needed)\n\
             3. \"rationale\" (why the change is needed)\n"
        );

        let response = self.call_generator(&prompt).await?;

        Ok(ModificationPlan {
            target_system: extract_field(&response, "target_system")
                .unwrap_or_else(|| "unknown".to_string()),
            change: extract_field(&response, "change").unwrap_or_else(|| request.to_string()),
            rationale: extract_field(&response, "rationale")
                .unwrap_or_else(|| "user request".to_string()),
        })
    }

    /// Ask for plausible filenames and keep the ones that exist on disk.
    async fn identify_relevant_files(&self, target: &str) -> Result<Vec<PathBuf>, ForgeError> {
        let prompt = format!(
            "Code related to '{target}' needs to change in a game project. \
             What script filenames most likely contain this functionality? \
             List only the 3-5 most likely filenames with the {SOURCE_SUFFIX} extension, \
             one per line, no explanations."
        );

        let response = self.call_generator(&prompt).await?;

        let mut found = Vec::new();
        for candidate in parse_candidate_filenames(&response) {
            let mut matches = Vec::new();
            find_source_files(&self.config.source_root, &candidate, &mut matches);
            for path in matches {
                if !found.contains(&path) {
                    found.push(path);
                }
            }
        }
        Ok(found)
    }

    /// Generate a complete replacement per file. A file whose read or
    /// generation fails is dropped from the set, not fatal to the run.
    async fn generate_modifications(
        &self,
        files: &[PathBuf],
        plan: &ModificationPlan,
    ) -> Vec<Modification> {
        let mut modifications = Vec::new();

        for path in files {
            let original = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };

            let prompt = format!(
                "Modify this mod script to {}.\nRationale: {}\n\nOriginal code:\n```rust\n{}\n```\n\n\
                 Return ONLY the complete modified source with no explanations or markdown.",
                plan.change, plan.rationale, original
            );

            let response = match self.call_generator(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "dropping file: generation failed");
                    continue;
                }
            };

            self.capture_original(path, &original);
            modifications.push(Modification {
                path: path.clone(),
                original,
                proposed: strip_code_fences(&response),
                outcome: ModificationOutcome::NotAttempted,
            });
        }

        modifications
    }

    fn capture_original(&self, path: &Path, original: &str) {
        self.originals
            .lock()
            .entry(path.to_path_buf())
            .or_insert_with(|| original.to_string());
    }

    /// Write a timestamped backup per pending file. Under the strict
    /// policy a failed backup blocks that file's apply; under the loose
    /// policy it only logs.
    fn create_backups(&self, modifications: &mut [Modification]) {
        for m in modifications {
            match self.backups.backup(&m.path, &m.original) {
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(file = %m.path.display(), error = %e, "backup failed");
                    if self.config.require_backup_for_apply {
                        m.outcome =
                            ModificationOutcome::Failed(format!("backup failed ({e})"));
                    }
                }
            }
        }
    }

    /// Validate and write each pending modification, in file-list order.
    /// Only a toolchain fault aborts; everything else is a per-file line.
    /// Validation compiles run on a blocking worker, awaited here.
    async fn apply_modifications(
        &self,
        modifications: &mut [Modification],
    ) -> Result<Vec<String>, ForgeError> {
        let mut lines = Vec::new();

        for m in modifications.iter_mut() {
            let name = display_name(&m.path);

            if let ModificationOutcome::Failed(reason) = &m.outcome {
                lines.push(format!("Skipped {name}: {reason}"));
                continue;
            }

            if m.proposed.is_empty() || m.proposed == m.original {
                m.outcome = ModificationOutcome::NoChangeNeeded;
                lines.push(format!("No changes needed for {name}"));
                continue;
            }

            if self.config.validate_before_apply {
                let references = self.resolver.resolve(&self.config.core_references);
                match compile_in_background(self.compiler, m.proposed.clone(), references).await {
                    Ok(_) => m.outcome = ModificationOutcome::Validated,
                    Err(e) if e.is_toolchain() => return Err(e.into()),
                    Err(e) => {
                        for diag in e.diagnostics() {
                            tracing::error!(file = %name, %diag, "validation diagnostic");
                        }
                        m.outcome = ModificationOutcome::Failed(format!(
                            "validation failed with {} error(s)",
                            e.diagnostics().len()
                        ));
                        lines.push(format!("Failed to validate modified code for {name}"));
                        continue;
                    }
                }
            }

            match std::fs::write(&m.path, &m.proposed) {
                Ok(()) => {
                    m.outcome = ModificationOutcome::Applied;
                    lines.push(format!("Successfully modified {name}"));
                }
                Err(e) => {
                    tracing::error!(file = %name, error = %e, "write failed");
                    m.outcome = ModificationOutcome::Failed(format!("write failed ({e})"));
                    lines.push(format!("Error modifying {name}: {e}"));
                }
            }
        }

        Ok(lines)
    }

    /// Hot-reload applied files: editor hook, then compile-and-load with
    /// the file-stem type name, then the generic plugin-style scan. All
    /// three failing is logged and never rolls back the write.
    fn reload_applied(&self, applied: &[&Modification]) -> usize {
        let mut reloaded = 0;

        for m in applied {
            let name = display_name(&m.path);

            if self.host.reload_in_editor(&m.path) {
                tracing::info!(file = %name, "reloaded via editor hook");
                reloaded += 1;
                continue;
            }

            let mut source_unit = match SourceUnit::from_file(&m.path) {
                Ok(unit) => unit,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "cannot re-read applied file");
                    continue;
                }
            };
            let stem = source_unit.name().to_string();

            let references = self.resolver.resolve(&self.config.core_references);
            let unit = match source_unit.compile(&self.compiler, &references) {
                Ok(unit) => unit,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "reload compile failed");
                    continue;
                }
            };

            let loaded = self.loader.load(&unit, &stem, None).or_else(|e| {
                tracing::debug!(file = %name, error = %e, "direct load failed, trying plugin scan");
                self.loader.load_any_plugin(&unit, &stem)
            });

            match loaded {
                Ok(instance) => {
                    if let Some(previous) =
                        self.registry.register(stem, Arc::clone(&unit), instance)
                    {
                        self.host.detach(&previous.instance.handle);
                    }
                    reloaded += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "failed to reload with any method");
                }
            }
        }

        reloaded
    }

    /// Watchdog-wrapped generator call: a stuck collaborator turns into a
    /// timeout error instead of wedging the single-flight guard.
    async fn call_generator(&self, prompt: &str) -> Result<String, ForgeError> {
        let timeout = Duration::from_secs(self.config.generation_timeout_secs);
        crate::textgen::generate_with_watchdog(self.generator.as_ref(), prompt, timeout)
            .await
            .map_err(ForgeError::ExternalCall)
    }
}

/// Display name for summary lines: the file name, not the full path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split a filename listing on newlines/commas/semicolons, trim list
/// markers, and normalize the source suffix.
fn parse_candidate_filenames(response: &str) -> Vec<String> {
    response
        .split(['\n', ',', ';'])
        .map(|raw| raw.trim().trim_start_matches(['-', '*', ' ']).trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            if name.ends_with(SOURCE_SUFFIX) {
                name.to_string()
            } else {
                format!("{name}{SOURCE_SUFFIX}")
            }
        })
        .collect()
}

/// Recursive case-sensitive exact-filename search.
fn find_source_files(root: &Path, file_name: &str, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            find_source_files(&path, file_name, out);
        } else if path.file_name() == Some(std::ffi::OsStr::new(file_name)) {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_parsing_normalizes_suffix() {
        let names = parse_candidate_filenames("PlayerController\nEnemyBrain.rs, Movement");
        assert_eq!(
            names,
            vec!["PlayerController.rs", "EnemyBrain.rs", "Movement.rs"]
        );
    }

    #[test]
    fn candidate_parsing_strips_list_markers() {
        let names = parse_candidate_filenames("- PlayerController.rs\n* EnemyBrain.rs\n\n");
        assert_eq!(names, vec!["PlayerController.rs", "EnemyBrain.rs"]);
    }

    #[test]
    fn file_search_is_recursive_and_exact() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("systems/movement");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("PlayerController.rs"), "x").unwrap();
        std::fs::write(dir.path().join("playercontroller.rs"), "x").unwrap();

        let mut out = Vec::new();
        find_source_files(dir.path(), "PlayerController.rs", &mut out);

        assert_eq!(out.len(), 1);
        assert!(out[0].ends_with("systems/movement/PlayerController.rs"));
    }

    #[test]
    fn modification_outcome_transitions_are_explicit() {
        let m = Modification {
            path: PathBuf::from("A.rs"),
            original: "a".to_string(),
            proposed: "b".to_string(),
            outcome: ModificationOutcome::NotAttempted,
        };
        assert_eq!(m.outcome, ModificationOutcome::NotAttempted);
    }
}
