//! Orchestrator configuration
//!
//! One serde-derived struct covering both orchestrators: directory
//! layout, safety switches, the per-session modification cap, and the
//! always-on reference set used for validation compiles.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the spellforge pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Root of the project's script source tree (searched recursively)
    pub source_root: PathBuf,
    /// Directory generated scripts are persisted under
    pub scripts_dir: PathBuf,
    /// Directory pre-modification backups are persisted under
    pub backups_dir: PathBuf,
    /// Library directories probed by reference resolution
    pub library_dirs: Vec<PathBuf>,
    /// Always-on reference names for validation compiles
    pub core_references: Vec<String>,
    /// Maximum modifications applied per session
    pub max_modifications_per_session: u32,
    /// Compile proposed text before writing it
    pub validate_before_apply: bool,
    /// Write timestamped backups before any destructive write
    pub create_backups: bool,
    /// Treat a failed backup as blocking that file's apply
    pub require_backup_for_apply: bool,
    /// Attach freshly generated scripts automatically
    pub auto_attach_scripts: bool,
    /// Watchdog timeout for text-generation calls, in seconds
    pub generation_timeout_secs: u64,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("scripts"),
            scripts_dir: PathBuf::from("generated_scripts"),
            backups_dir: PathBuf::from("backups"),
            library_dirs: Vec::new(),
            core_references: vec!["engine".to_string(), "spellforge".to_string()],
            max_modifications_per_session: 20,
            validate_before_apply: true,
            create_backups: true,
            require_backup_for_apply: true,
            auto_attach_scripts: true,
            generation_timeout_secs: 30,
        }
    }
}

impl ForgeConfig {
    /// Create the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, crate::error::ForgeError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| crate::error::ForgeError::Config(format!("{}: {e}", path.display())))
    }

    /// With a source root.
    #[inline]
    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    /// With a generated-scripts directory.
    #[inline]
    #[must_use]
    pub fn with_scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scripts_dir = dir.into();
        self
    }

    /// With a backups directory.
    #[inline]
    #[must_use]
    pub fn with_backups_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backups_dir = dir.into();
        self
    }

    /// With a library search directory.
    #[inline]
    #[must_use]
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dirs.push(dir.into());
        self
    }

    /// With a session modification cap.
    #[inline]
    #[must_use]
    pub fn with_max_modifications(mut self, max: u32) -> Self {
        self.max_modifications_per_session = max;
        self
    }

    /// With validation before apply toggled.
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_before_apply = enabled;
        self
    }

    /// With backups toggled.
    #[inline]
    #[must_use]
    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.create_backups = enabled;
        self
    }

    /// With the strict backup-before-apply policy toggled.
    ///
    /// Disabled restores the loose behavior where a failed backup merely
    /// logs and the destructive write proceeds.
    #[inline]
    #[must_use]
    pub fn with_backup_required(mut self, required: bool) -> Self {
        self.require_backup_for_apply = required;
        self
    }

    /// With auto-attach of generated scripts toggled.
    #[inline]
    #[must_use]
    pub fn with_auto_attach(mut self, enabled: bool) -> Self {
        self.auto_attach_scripts = enabled;
        self
    }

    /// Create the scripts and backups directories if absent.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.scripts_dir)?;
        std::fs::create_dir_all(&self.backups_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = ForgeConfig::default();
        assert_eq!(config.max_modifications_per_session, 20);
        assert!(config.validate_before_apply);
        assert!(config.create_backups);
        assert!(config.require_backup_for_apply);
        assert_eq!(config.core_references, vec!["engine", "spellforge"]);
    }

    #[test]
    fn builder_overrides() {
        let config = ForgeConfig::new()
            .with_max_modifications(3)
            .with_validation(false)
            .with_backup_required(false);

        assert_eq!(config.max_modifications_per_session, 3);
        assert!(!config.validate_before_apply);
        assert!(!config.require_backup_for_apply);
    }

    #[test]
    fn toml_round_trip() {
        let config = ForgeConfig::new().with_max_modifications(5);
        let text = toml::to_string(&config).unwrap();
        let parsed: ForgeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.max_modifications_per_session, 5);
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        let config = ForgeConfig::new().with_max_modifications(7);
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = ForgeConfig::from_path(&path).unwrap();
        assert_eq!(loaded.max_modifications_per_session, 7);
    }

    #[test]
    fn ensure_directories_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = ForgeConfig::new()
            .with_scripts_dir(dir.path().join("scripts"))
            .with_backups_dir(dir.path().join("backups"));

        config.ensure_directories().unwrap();
        assert!(config.scripts_dir.is_dir());
        assert!(config.backups_dir.is_dir());
    }
}
