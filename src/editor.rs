//! Editor integration: exclusion of the output folder from VS Code and
//! git, and the Cursor rule pointing the agent at the converted docs.

use crate::config::{relative_canonical, PathStyle};
use crate::error::{Error, Result};
use crate::exclusion::ExclusionFile;
use crate::writer::write_file_atomic;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FILES_EXCLUDE_KEY: &str = "files.exclude";

/// Cursor rule installed when no other source is configured.
pub const DEFAULT_CURSOR_RULES: &str = include_str!("../cursor_rules/docs-search-standard.md");

const CURSOR_RULES_FILE: &str = "docs-search-standard.mdc";

/// `.vscode/settings.json` under a project root.
#[derive(Debug, Clone)]
pub struct EditorSettings {
    path: PathBuf,
}

impl EditorSettings {
    /// Settings file of the project at `project_root`.
    #[must_use]
    pub fn for_project(project_root: &Path) -> Self {
        Self {
            path: project_root.join(".vscode").join("settings.json"),
        }
    }

    /// Location of the settings file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets `files.exclude["<folder>"] = true`, where `folder` is
    /// relative to `project_root` with `/` separators.
    ///
    /// Other keys keep their values and order. A file that is not a JSON
    /// object is left untouched. Returns whether the file was rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn exclude_folder(&self, folder: &Path, project_root: &Path) -> Result<bool> {
        let relative = relative_canonical(folder, project_root);
        if relative.is_empty() {
            return Ok(false);
        }

        let mut settings = match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(
                        "Invalid VS Code settings file {}, leaving it unchanged",
                        self.path.display()
                    );
                    return Ok(false);
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let excludes = settings
            .entry(FILES_EXCLUDE_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(excludes) = excludes.as_object_mut() else {
            warn!(
                "'{}' in {} is not an object, leaving it unchanged",
                FILES_EXCLUDE_KEY,
                self.path.display()
            );
            return Ok(false);
        };

        if excludes.get(&relative) == Some(&Value::Bool(true)) {
            return Ok(false);
        }
        excludes.insert(relative.clone(), Value::Bool(true));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        Value::Object(settings).serialize(&mut serializer)?;
        buffer.push(b'\n');
        let text = String::from_utf8_lossy(&buffer);

        write_file_atomic(&self.path, &text).map_err(|e| Error::io(&self.path, e))?;
        info!("Updated VS Code settings to exclude {}", relative);
        Ok(true)
    }
}

/// `.cursor/rules/docs-search-standard.mdc` under a project root.
#[derive(Debug, Clone)]
pub struct CursorRules {
    path: PathBuf,
}

impl CursorRules {
    /// Rule file of the project at `project_root`.
    #[must_use]
    pub fn for_project(project_root: &Path) -> Self {
        Self {
            path: project_root
                .join(".cursor")
                .join("rules")
                .join(CURSOR_RULES_FILE),
        }
    }

    /// Location of the installed rule.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Installs the rule read from `source`, or the bundled one.
    ///
    /// The installed file always mirrors the source; it is rewritten only
    /// when its content differs. Returns whether the file was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the rule cannot be
    /// written.
    pub fn install(&self, source: Option<&Path>) -> Result<bool> {
        let content = match source {
            Some(source) => fs::read_to_string(source).map_err(|e| Error::io(source, e))?,
            None => DEFAULT_CURSOR_RULES.to_string(),
        };

        match fs::read_to_string(&self.path) {
            Ok(existing) if existing == content => return Ok(false),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&self.path, e)),
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        write_file_atomic(&self.path, &content).map_err(|e| Error::io(&self.path, e))?;
        info!("Cursor rules added to {}", self.path.display());
        Ok(true)
    }
}

/// Appends `<folder>/` to the project's `.gitignore` unless present.
///
/// Returns the appended line, if any.
///
/// # Errors
///
/// Returns an error if `.gitignore` cannot be read or appended to.
pub fn ignore_in_git(folder: &Path, project_root: &Path) -> Result<Option<String>> {
    let relative = relative_canonical(folder, project_root);
    if relative.is_empty() {
        return Ok(None);
    }

    let gitignore = ExclusionFile::new(project_root.join(".gitignore"), PathStyle::Unix);
    let pattern = PathStyle::Unix.render_dir(&relative);
    let appended = gitignore.append_missing(std::slice::from_ref(&pattern))?;

    if appended.is_empty() {
        Ok(None)
    } else {
        info!("Added {} to .gitignore", pattern);
        Ok(Some(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_creates_settings_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let settings = EditorSettings::for_project(temp.path());

        let changed = settings
            .exclude_folder(&temp.path().join("doc_base"), temp.path())
            .unwrap();

        assert!(changed);
        let text = std::fs::read_to_string(settings.path()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["files.exclude"]["doc_base"], Value::Bool(true));
    }

    #[test]
    fn test_existing_keys_are_kept_in_order() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".vscode/settings.json")
            .write_str(r#"{"editor.tabSize": 2, "files.exclude": {"**/.git": true}, "a.last": 1}"#)
            .unwrap();
        let settings = EditorSettings::for_project(temp.path());

        settings
            .exclude_folder(&temp.path().join("doc_base"), temp.path())
            .unwrap();

        let text = std::fs::read_to_string(settings.path()).unwrap();
        let tab = text.find("editor.tabSize").unwrap();
        let exclude = text.find("files.exclude").unwrap();
        let last = text.find("a.last").unwrap();
        assert!(tab < exclude && exclude < last);
        assert!(text.contains("\"**/.git\": true"));
        assert!(text.contains("\"doc_base\": true"));
    }

    #[test]
    fn test_second_call_is_noop() {
        let temp = assert_fs::TempDir::new().unwrap();
        let settings = EditorSettings::for_project(temp.path());
        let folder = temp.path().join("doc_base");

        assert!(settings.exclude_folder(&folder, temp.path()).unwrap());
        assert!(!settings.exclude_folder(&folder, temp.path()).unwrap());
    }

    #[test]
    fn test_invalid_json_is_left_alone() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(".vscode/settings.json");
        file.write_str("{ // comments are not JSON\n}").unwrap();
        let settings = EditorSettings::for_project(temp.path());

        let changed = settings
            .exclude_folder(&temp.path().join("doc_base"), temp.path())
            .unwrap();

        assert!(!changed);
        file.assert("{ // comments are not JSON\n}");
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("target/").unwrap();
        let folder = temp.path().join("doc_base");

        let first = ignore_in_git(&folder, temp.path()).unwrap();
        let second = ignore_in_git(&folder, temp.path()).unwrap();

        assert_eq!(first.as_deref(), Some("doc_base/"));
        assert!(second.is_none());
        temp.child(".gitignore").assert("target/\ndoc_base/\n");
    }

    #[test]
    fn test_bundled_cursor_rules_are_installed_once() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = CursorRules::for_project(temp.path());

        assert!(rules.install(None).unwrap());
        assert!(!rules.install(None).unwrap());

        temp.child(".cursor/rules/docs-search-standard.mdc")
            .assert(DEFAULT_CURSOR_RULES);
        assert!(DEFAULT_CURSOR_RULES.starts_with("---\n"));
    }

    #[test]
    fn test_cursor_rules_follow_custom_source() {
        let temp = assert_fs::TempDir::new().unwrap();
        let source = temp.child("team-rules.md");
        source.write_str("# Team rule\n").unwrap();
        let installed = temp.child(".cursor/rules/docs-search-standard.mdc");
        installed.write_str("outdated").unwrap();

        let changed = CursorRules::for_project(temp.path())
            .install(Some(source.path()))
            .unwrap();

        assert!(changed);
        installed.assert("# Team rule\n");
    }

    #[test]
    fn test_missing_cursor_rules_source_is_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();

        let err = CursorRules::for_project(temp.path())
            .install(Some(&temp.path().join("absent.md")))
            .unwrap_err();

        assert!(err.is_io());
        assert!(!temp.child(".cursor").exists());
    }
}
