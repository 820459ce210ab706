//! Path filtering for the source walk.
//!
//! Lets callers keep whole subtrees (VCS metadata, virtualenvs) and
//! individual files (office lock files) out of the mirror.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Configuration for walk filtering with glob patterns.
///
/// Patterns are matched against paths relative to the source root,
/// so `**/.git` matches a `.git` directory at any depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkFilterConfig {
    exclude_files: Vec<String>,
    exclude_directories: Vec<String>,
}

impl WalkFilterConfig {
    /// Creates an empty configuration that excludes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file exclusion patterns.
    #[must_use]
    pub fn exclude_files(mut self, patterns: Vec<String>) -> Self {
        self.exclude_files = patterns;
        self
    }

    /// Sets the directory exclusion patterns. A matching directory is
    /// not descended into.
    #[must_use]
    pub fn exclude_directories(mut self, patterns: Vec<String>) -> Self {
        self.exclude_directories = patterns;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct WalkFilter {
    exclude_files: GlobSet,
    exclude_directories: GlobSet,
}

impl WalkFilter {
    /// Compiles the configured globs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for a malformed glob.
    pub(crate) fn new(config: &WalkFilterConfig) -> Result<Self> {
        Ok(Self {
            exclude_files: Self::build_globset(&config.exclude_files)?,
            exclude_directories: Self::build_globset(&config.exclude_directories)?,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob =
                Glob::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
    }

    /// Whether the walk should descend into `relative` (a directory path
    /// relative to the source root).
    pub(crate) fn should_enter(&self, relative: &Path) -> bool {
        relative.as_os_str().is_empty() || !self.exclude_directories.is_match(relative)
    }

    /// Whether a file at `relative` should be considered at all.
    pub(crate) fn should_process(&self, relative: &Path) -> bool {
        !self.exclude_files.is_match(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(dirs: &[&str], files: &[&str]) -> WalkFilter {
        let config = WalkFilterConfig::new()
            .exclude_directories(dirs.iter().map(ToString::to_string).collect())
            .exclude_files(files.iter().map(ToString::to_string).collect());
        WalkFilter::new(&config).unwrap()
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let f = filter(&[], &[]);
        assert!(f.should_enter(Path::new("sub")));
        assert!(f.should_process(Path::new("sub/a.pdf")));
    }

    #[test]
    fn test_directory_exclusion_at_any_depth() {
        let f = filter(&["**/.git", "**/node_modules"], &[]);
        assert!(!f.should_enter(Path::new(".git")));
        assert!(!f.should_enter(Path::new("vendor/node_modules")));
        assert!(f.should_enter(Path::new("reports")));
    }

    #[test]
    fn test_root_is_always_entered() {
        let f = filter(&["**"], &[]);
        assert!(f.should_enter(Path::new("")));
    }

    #[test]
    fn test_office_lock_files_are_skipped() {
        let f = filter(&[], &["**/~$*"]);
        assert!(!f.should_process(Path::new("team/~$budget.xlsx")));
        assert!(f.should_process(Path::new("team/budget.xlsx")));
    }

    #[test]
    fn test_invalid_glob_is_reported() {
        let config = WalkFilterConfig::new().exclude_directories(vec!["a[".to_string()]);
        let err = WalkFilter::new(&config).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
