//! On-disk JSON configuration (`convert_config.json`).
//!
//! A missing file is synthesized from defaults and written back once; a
//! malformed one is reported and replaced by defaults for the run without
//! touching the file.

use crate::error::{Error, Result};
use crate::file::normalize_extension;
use crate::writer::write_file_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Extensions converted when the configuration does not say otherwise.
pub const DEFAULT_FILE_TYPES: &[&str] = &[
    ".pdf", ".xlsx", ".docx", ".pptx", ".xls", ".doc", ".xlsm", ".png", ".jpg", ".jpeg",
];

/// Ignore patterns used when the configuration does not say otherwise.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["*"];

const DEFAULT_CONVERTER_COMMAND: &str = "markitdown";

/// External conversion engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterSettings {
    /// Executable to run; the source path is passed as the last argument
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra arguments placed before the source path
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
        }
    }
}

fn default_command() -> String {
    DEFAULT_CONVERTER_COMMAND.to_string()
}

fn default_file_types() -> Vec<String> {
    DEFAULT_FILE_TYPES.iter().map(ToString::to_string).collect()
}

fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(ToString::to_string).collect()
}

/// Contents of the JSON configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Extensions to convert, each with its leading dot
    #[serde(default = "default_file_types")]
    pub file_types: Vec<String>,

    /// Glob-like patterns merged into the exclusion file
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Conversion engine override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            file_types: default_file_types(),
            ignore_patterns: default_ignore_patterns(),
            converter: None,
        }
    }
}

impl Settings {
    /// Parses settings from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the text is not a valid settings
    /// object. An empty `file_types` list is valid and converts nothing.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut settings: Self = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("malformed settings: {e}")))?;

        settings.file_types = settings
            .file_types
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| ext.len() > 1)
            .collect();

        Ok(settings)
    }

    /// Reads settings from `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Loads settings, falling back to defaults.
    ///
    /// A missing file is created with the defaults for subsequent runs.
    /// Read or parse failures are logged and never fatal.
    #[must_use]
    pub fn load_or_init(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(settings)) => {
                info!("Loaded configuration from {}", path.display());
                settings
            }
            Ok(None) => {
                info!(
                    "Config file {} not found, using default configuration",
                    path.display()
                );
                let settings = Self::default();
                match settings.save(path) {
                    Ok(()) => info!("Default configuration saved to {}", path.display()),
                    Err(e) => warn!("Could not create default config file: {}", e),
                }
                settings
            }
            Err(e) => {
                warn!("{}; using default configuration instead", e);
                Self::default()
            }
        }
    }

    /// Loads settings like [`Settings::load_or_init`], but never creates
    /// the file. Used by dry runs.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                warn!("{}; using default configuration instead", e);
                Self::default()
            }
        }
    }

    /// Writes the settings as 4-space indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');

        let text = String::from_utf8(buffer)
            .map_err(|e| Error::config(format!("settings are not UTF-8: {e}")))?;
        write_file_atomic(path, &text).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_partial_settings_take_defaults() {
        let settings = Settings::from_json(r#"{"file_types": [".PDF", "docx"]}"#).unwrap();
        assert_eq!(settings.file_types, vec![".pdf", ".docx"]);
        assert_eq!(settings.ignore_patterns, vec!["*"]);
        assert!(settings.converter.is_none());
    }

    #[test]
    fn test_converter_section() {
        let settings = Settings::from_json(
            r#"{"file_types": [".pdf"], "converter": {"command": "/opt/bin/markitdown", "args": ["--use-plugins"]}}"#,
        )
        .unwrap();
        let converter = settings.converter.unwrap();
        assert_eq!(converter.command, "/opt/bin/markitdown");
        assert_eq!(converter.args, vec!["--use-plugins"]);
    }

    #[test]
    fn test_empty_file_types_are_kept() {
        let settings = Settings::from_json(r#"{"file_types": []}"#).unwrap();
        assert!(settings.file_types.is_empty());
        assert_eq!(settings.ignore_patterns, vec!["*"]);
    }

    #[test]
    fn test_empty_file_types_do_not_fall_back_to_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("convert_config.json");
        path.write_str(r#"{"file_types": [], "ignore_patterns": ["drafts/*"]}"#)
            .unwrap();

        let settings = Settings::load_or_init(path.path());

        assert!(settings.file_types.is_empty());
        assert_eq!(settings.ignore_patterns, vec!["drafts/*"]);
    }

    #[test]
    fn test_missing_file_is_created() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("convert_config.json");

        let settings = Settings::load_or_init(path.path());

        assert_eq!(settings, Settings::default());
        let text = std::fs::read_to_string(path.path()).unwrap();
        assert!(text.contains("    \"file_types\": ["));
        assert_eq!(Settings::from_json(&text).unwrap(), settings);
    }

    #[test]
    fn test_load_or_default_never_creates_the_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("convert_config.json");

        let settings = Settings::load_or_default(path.path());

        assert_eq!(settings, Settings::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_file_falls_back_and_is_kept() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("convert_config.json");
        path.write_str("{ not json").unwrap();

        let settings = Settings::load_or_init(path.path());

        assert_eq!(settings, Settings::default());
        assert_eq!(std::fs::read_to_string(path.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_existing_file_is_loaded() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("convert_config.json");
        path.write_str(r#"{"file_types": [".pdf"], "ignore_patterns": ["docs/*"]}"#)
            .unwrap();

        let settings = Settings::load_or_init(path.path());

        assert_eq!(settings.file_types, vec![".pdf"]);
        assert_eq!(settings.ignore_patterns, vec!["docs/*"]);
    }
}
