//! Reference resolution
//!
//! Builds the [`ReferenceSet`] a compile links against. Resolution order
//! for each requested name: existing path verbatim, then a probe of the
//! configured library directories, then bare-name passthrough (deferring
//! to whatever downstream resolution exists). The host process's own
//! loaded libraries are appended so generated code can reference host
//! types. Resolution never fails; a bad set surfaces later as compile
//! diagnostics.

use crate::LIBRARY_SUFFIX;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of the host process's currently loaded libraries.
pub trait LoadedLibraries: Send + Sync {
    /// File locations of loaded libraries. Entries that do not resolve to
    /// an existing file are skipped by the resolver without error.
    fn loaded_libraries(&self) -> Vec<PathBuf>;
}

/// A [`LoadedLibraries`] source with no libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLibraries;

impl LoadedLibraries for NoLibraries {
    fn loaded_libraries(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// A fixed list of library locations.
#[derive(Debug, Clone, Default)]
pub struct StaticLibraries(pub Vec<PathBuf>);

impl LoadedLibraries for StaticLibraries {
    fn loaded_libraries(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

/// An ordered set of library identifiers, deduplicated by
/// case-insensitive base filename. First occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    entries: IndexMap<String, String>,
}

impl ReferenceSet {
    /// Create an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized dedup key for a path or bare name: base filename without
    /// extension, lowercased, hyphens folded to underscores.
    #[must_use]
    pub fn base_key(entry: &str) -> String {
        let base = Path::new(entry)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.to_string());
        base.to_lowercase().replace('-', "_")
    }

    /// Insert an entry (path or bare name). Returns `false` if an entry
    /// with the same base name is already present.
    pub fn insert(&mut self, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        let key = Self::base_key(&entry);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Check whether a base name is covered by this set.
    #[inline]
    #[must_use]
    pub fn contains_base(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::base_key(name))
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Normalized base names, in insertion order.
    #[must_use]
    pub fn base_names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<String> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}

/// Discovers and assembles the libraries a compile must link against.
pub struct ReferenceResolver {
    search_dirs: Vec<PathBuf>,
    libraries: Arc<dyn LoadedLibraries>,
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("search_dirs", &self.search_dirs)
            .finish_non_exhaustive()
    }
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    /// Create a resolver with no search directories and no host libraries.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            search_dirs: Vec::new(),
            libraries: Arc::new(NoLibraries),
        }
    }

    /// Add a library search directory (probed in insertion order).
    #[must_use]
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Set the host loaded-libraries source.
    #[must_use]
    pub fn with_libraries(mut self, libraries: Arc<dyn LoadedLibraries>) -> Self {
        self.libraries = libraries;
        self
    }

    /// Resolve the requested names into a [`ReferenceSet`].
    ///
    /// Never fails. The worst case is a set that causes a downstream
    /// compile failure, reported through compiler diagnostics.
    #[must_use]
    pub fn resolve(&self, requested: &[String]) -> ReferenceSet {
        let mut set = ReferenceSet::new();

        for name in requested {
            let entry = self.locate(name);
            if set.insert(entry.clone()) {
                tracing::debug!(reference = %entry, "resolved reference");
            }
        }

        // Host-process libraries come last so explicit requests win dedup.
        for lib in self.libraries.loaded_libraries() {
            if lib.is_file() {
                set.insert(lib.to_string_lossy().into_owned());
            } else {
                tracing::debug!(library = %lib.display(), "skipping library without a resolvable location");
            }
        }

        set
    }

    fn locate(&self, name: &str) -> String {
        let direct = Path::new(name);
        if direct.is_file() {
            return name.to_string();
        }

        let has_extension = direct.extension().is_some();
        for dir in &self.search_dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return candidate.to_string_lossy().into_owned();
            }
            if !has_extension {
                let with_suffix = dir.join(format!("{name}{LIBRARY_SUFFIX}"));
                if with_suffix.is_file() {
                    return with_suffix.to_string_lossy().into_owned();
                }
            }
        }

        // Bare passthrough: downstream resolution may still find it.
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_set_dedups_case_insensitively() {
        let mut set = ReferenceSet::new();
        assert!(set.insert("/libs/Engine.rlib"));
        assert!(!set.insert("engine"));
        assert!(!set.insert("other/ENGINE.rlib"));

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next(), Some("/libs/Engine.rlib"));
    }

    #[test]
    fn reference_set_folds_hyphens() {
        let mut set = ReferenceSet::new();
        set.insert("spell-forge");
        assert!(set.contains_base("spell_forge"));
    }

    #[test]
    fn resolver_uses_existing_path_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("engine.rlib");
        std::fs::write(&lib, b"lib").unwrap();

        let resolver = ReferenceResolver::new();
        let set = resolver.resolve(&[lib.to_string_lossy().into_owned()]);

        assert_eq!(set.iter().next(), Some(lib.to_string_lossy().as_ref()));
    }

    #[test]
    fn resolver_probes_search_dirs_and_appends_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("engine.rlib"), b"lib").unwrap();

        let resolver = ReferenceResolver::new().with_search_dir(dir.path());
        let set = resolver.resolve(&["engine".to_string()]);

        let entry = set.iter().next().unwrap().to_string();
        assert!(entry.ends_with("engine.rlib"), "got {entry}");
    }

    #[test]
    fn resolver_passes_unknown_names_through() {
        let resolver = ReferenceResolver::new();
        let set = resolver.resolve(&["mystery".to_string()]);

        assert_eq!(set.iter().next(), Some("mystery"));
        assert!(set.contains_base("mystery"));
    }

    #[test]
    fn resolver_appends_host_libraries_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("host.rlib");
        std::fs::write(&present, b"lib").unwrap();
        let missing = dir.path().join("gone.rlib");

        let resolver = ReferenceResolver::new()
            .with_libraries(Arc::new(StaticLibraries(vec![present, missing])));
        let set = resolver.resolve(&[]);

        assert_eq!(set.len(), 1);
        assert!(set.contains_base("host"));
        assert!(!set.contains_base("gone"));
    }

    #[test]
    fn explicit_request_wins_over_host_library() {
        let dir = tempfile::tempdir().unwrap();
        let host_copy = dir.path().join("engine.rlib");
        std::fs::write(&host_copy, b"lib").unwrap();

        let resolver = ReferenceResolver::new()
            .with_libraries(Arc::new(StaticLibraries(vec![host_copy])));
        let set = resolver.resolve(&["engine".to_string()]);

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next(), Some("engine"));
    }

    proptest! {
        #[test]
        fn prop_resolve_is_idempotent(names in proptest::collection::vec("[a-zA-Z][a-zA-Z0-9_-]{0,12}", 0..8)) {
            let resolver = ReferenceResolver::new();
            let first = resolver.resolve(&names);
            let second = resolver.resolve(&names);
            prop_assert_eq!(first.base_names(), second.base_names());
        }
    }
}
