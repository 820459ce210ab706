//! Append-only merging of ignore patterns into an exclusion file
//! (`.cursorignore`, `.gitignore`, ...).
//!
//! Lines already present are never rewritten, reordered or removed; only
//! patterns that are not yet in the file are appended, in one batch.

use crate::config::{relative_canonical, PathStyle};
use crate::error::{Error, Result};
use crate::writer::append_lines;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Normalizes a raw ignore pattern: wildcards are stripped and
/// separators canonicalized to `/`. Returns `None` if nothing is left.
#[must_use]
pub fn clean_pattern(pattern: &str) -> Option<String> {
    let cleaned = pattern.replace('*', "").replace('\\', "/");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Builds the file-type and ignore patterns in the order they should be
/// appended: one `*.ext` per file type, then each cleaned ignore pattern.
#[must_use]
pub fn type_patterns(file_types: &[String], ignore_patterns: &[String], style: PathStyle) -> Vec<String> {
    let mut seen = HashSet::new();
    file_types
        .iter()
        .map(|ext| format!("*{ext}"))
        .chain(
            ignore_patterns
                .iter()
                .filter_map(|pattern| clean_pattern(pattern))
                .map(|pattern| style.render(&pattern)),
        )
        .filter(|pattern| seen.insert(pattern.clone()))
        .collect()
}

/// A persisted, line-oriented exclusion file.
#[derive(Debug, Clone)]
pub struct ExclusionFile {
    path: PathBuf,
    style: PathStyle,
}

impl ExclusionFile {
    /// Creates a handle; nothing is read or written until a sync.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, style: PathStyle) -> Self {
        Self {
            path: path.into(),
            style,
        }
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the trimmed, non-empty lines. A missing file has no lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exclusion`] if the file exists but cannot be read.
    pub fn read_lines(&self) -> Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::exclusion(&self.path, e)),
        }
    }

    /// Appends every pattern of `candidates` not contained in `known`.
    fn append_new(&self, candidates: Vec<String>, known: &HashSet<String>) -> Result<Vec<String>> {
        let new_patterns: Vec<String> = candidates
            .into_iter()
            .filter(|pattern| !known.contains(pattern))
            .collect();

        if new_patterns.is_empty() {
            debug!("{} already up to date", self.path.display());
            return Ok(new_patterns);
        }

        append_lines(&self.path, &new_patterns).map_err(|e| Error::exclusion(&self.path, e))?;
        Ok(new_patterns)
    }

    /// Appends the given patterns that are not already lines of the file.
    ///
    /// Returns the lines that were appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exclusion`] on read or append failure.
    pub fn append_missing(&self, patterns: &[String]) -> Result<Vec<String>> {
        let existing: HashSet<String> = self.read_lines()?.into_iter().collect();
        let mut seen = HashSet::new();
        let candidates = patterns
            .iter()
            .filter(|pattern| seen.insert(pattern.as_str()))
            .cloned()
            .collect();
        self.append_new(candidates, &existing)
    }

    /// First pass: file-type globs and cleaned ignore patterns.
    ///
    /// Idempotent: with unchanged inputs the second call appends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exclusion`] on read or append failure.
    pub fn sync_type_patterns(
        &self,
        file_types: &[String],
        ignore_patterns: &[String],
    ) -> Result<Vec<String>> {
        let appended = self.append_missing(&type_patterns(file_types, ignore_patterns, self.style))?;
        if !appended.is_empty() {
            info!(
                "Updated {} with: {}",
                self.path.display(),
                appended.join(", ")
            );
        }
        Ok(appended)
    }

    /// Second pass: folders that held converted documents, relative to
    /// `project_root`, each with a trailing separator.
    ///
    /// Only lines that already end with the separator count as known
    /// folder patterns. The project root itself and folders outside it
    /// are never written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exclusion`] on read or append failure.
    pub fn sync_folder_patterns<I, P>(&self, folders: I, project_root: &Path) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen = HashSet::new();
        let candidates: Vec<String> = folders
            .into_iter()
            .filter_map(|folder| {
                let folder = folder.as_ref();
                let relative = relative_canonical(folder, project_root);
                if relative.is_empty() || relative == ".." || relative.starts_with("../") {
                    debug!("Not excluding folder {}", folder.display());
                    return None;
                }
                Some(self.style.render_dir(&relative))
            })
            .filter(|pattern| seen.insert(pattern.clone()))
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let separator = self.style.separator();
        let known: HashSet<String> = self
            .read_lines()?
            .into_iter()
            .filter(|line| line.ends_with(separator))
            .collect();

        let appended = self.append_new(candidates, &known)?;
        if !appended.is_empty() {
            info!(
                "Added {} folders to {}",
                appended.len(),
                self.path.display()
            );
        }
        Ok(appended)
    }
}
