use crate::error::{Error, Result};
use crate::file::normalize_extension;
use crate::filter::{WalkFilter, WalkFilterConfig};
use crate::settings::{ConverterSettings, Settings, DEFAULT_FILE_TYPES, DEFAULT_IGNORE_PATTERNS};
use std::path::{Component, Path, PathBuf};

const DEFAULT_OUTPUT_DIR: &str = "doc_base";
const DEFAULT_OUTPUT_SUFFIX: &str = "md";
const DEFAULT_EXCLUSION_FILE: &str = ".cursorignore";
const LEDGER_FILE_NAME: &str = "metadata.md";

/// Separator convention used when paths are written to disk.
///
/// Internally every relative path is kept with `/`; the style is applied
/// only when a pattern or ledger row is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Forward slashes (`docs/sub/`)
    Unix,
    /// Backslashes (`docs\sub\`)
    Windows,
}

impl PathStyle {
    /// Returns the style of the current platform.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    /// Returns the folder separator for this style.
    #[must_use]
    pub const fn separator(self) -> char {
        match self {
            Self::Unix => '/',
            Self::Windows => '\\',
        }
    }

    /// Renders a canonical (`/`-separated) path in this style.
    #[must_use]
    pub fn render(self, canonical: &str) -> String {
        match self {
            Self::Unix => canonical.to_string(),
            Self::Windows => canonical.replace('/', "\\"),
        }
    }

    /// Renders a canonical path as a directory pattern, with a trailing
    /// separator.
    #[must_use]
    pub fn render_dir(self, canonical: &str) -> String {
        let mut rendered = self.render(canonical.trim_end_matches('/'));
        rendered.push(self.separator());
        rendered
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::native()
    }
}

/// Converts a relative path to its canonical `/`-separated form.
///
/// `.` components are dropped, so the root itself becomes the empty string.
#[must_use]
pub(crate) fn canonical_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical form of `path` relative to `base`.
#[must_use]
pub(crate) fn relative_canonical(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .map_or_else(|| canonical_path(path), |relative| canonical_path(&relative))
}

/// Configuration for a mirror run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Source tree to mirror
    pub input_dir: PathBuf,

    /// Root of the Markdown mirror
    pub output_dir: PathBuf,

    /// Project root; ledger and exclusion paths are relative to it
    pub project_root: PathBuf,

    /// Convertible extensions, lowercase with a leading dot
    pub file_types: Vec<String>,

    /// Raw ignore patterns merged into the exclusion file
    pub ignore_patterns: Vec<String>,

    /// Exclusion file consumed by the editor's indexer
    pub exclusion_file: PathBuf,

    /// Where the metadata ledger is written
    pub ledger_path: PathBuf,

    /// Separator convention for written patterns and ledger paths
    pub path_style: PathStyle,

    /// Suffix appended to every output file name (without the dot)
    pub output_suffix: String,

    /// Paths skipped during the walk
    pub walk_filter: WalkFilterConfig,

    /// External conversion engine
    pub converter: ConverterSettings,

    /// Dry run mode (decide but never write)
    pub dry_run: bool,

    /// Exclude the output folder in `.vscode/settings.json`
    pub editor_settings: bool,

    /// Append the output folder to `.gitignore`
    pub gitignore: bool,

    /// Install the docs search rule under `.cursor/rules`
    pub cursor_rules: bool,

    /// Rule file to install instead of the bundled one
    pub cursor_rules_source: Option<PathBuf>,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use doc2md::Config;
    ///
    /// let config = Config::builder()
    ///     .input_dir("./docs")
    ///     .output_dir("./doc_base")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// The input directory is allowed to be missing: a run against a
    /// missing tree is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A file type lacks its leading dot
    /// - The output suffix is empty or malformed
    /// - Input and output directories coincide
    /// - A walk filter glob is invalid
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .file_types
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(Error::config(format!(
                "file type '{bad}' must look like '.pdf'"
            )));
        }

        if self.output_suffix.is_empty()
            || self.output_suffix.starts_with('.')
            || self.output_suffix.contains(['/', '\\'])
        {
            return Err(Error::config(format!(
                "output suffix '{}' must be a bare extension such as 'md'",
                self.output_suffix
            )));
        }

        if self.input_dir == self.output_dir {
            return Err(Error::config(format!(
                "output directory must differ from input directory: {}",
                self.output_dir.display()
            )));
        }

        if self.exclusion_file.file_name().is_none() {
            return Err(Error::config(format!(
                "exclusion file path has no file name: {}",
                self.exclusion_file.display()
            )));
        }

        WalkFilter::new(&self.walk_filter)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            project_root: PathBuf::from("."),
            file_types: DEFAULT_FILE_TYPES.iter().map(ToString::to_string).collect(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect(),
            exclusion_file: PathBuf::from(DEFAULT_EXCLUSION_FILE),
            ledger_path: PathBuf::from(DEFAULT_OUTPUT_DIR).join(LEDGER_FILE_NAME),
            path_style: PathStyle::native(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            walk_filter: WalkFilterConfig::default(),
            converter: ConverterSettings::default(),
            dry_run: false,
            editor_settings: true,
            gitignore: true,
            cursor_rules: true,
            cursor_rules_source: None,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    project_root: Option<PathBuf>,
    file_types: Option<Vec<String>>,
    ignore_patterns: Option<Vec<String>>,
    exclusion_file: Option<PathBuf>,
    ledger_path: Option<PathBuf>,
    path_style: Option<PathStyle>,
    output_suffix: Option<String>,
    walk_filter: Option<WalkFilterConfig>,
    converter: Option<ConverterSettings>,
    dry_run: bool,
    editor_settings: Option<bool>,
    gitignore: Option<bool>,
    cursor_rules: Option<bool>,
    cursor_rules_source: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Sets the source tree to mirror.
    #[must_use]
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    /// Sets the output root. Relative paths resolve against the project root.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the project root. Defaults to the current directory.
    #[must_use]
    pub fn project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Sets the convertible extensions (`.pdf`, `docx`, ...).
    #[must_use]
    pub fn file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file_types = Some(types.into_iter().map(|t| normalize_extension(t.as_ref())).collect());
        self
    }

    /// Sets the raw ignore patterns merged into the exclusion file.
    #[must_use]
    pub fn ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Applies file types, ignore patterns and converter settings from a
    /// loaded settings file.
    #[must_use]
    pub fn settings(mut self, settings: &Settings) -> Self {
        self = self
            .file_types(&settings.file_types)
            .ignore_patterns(settings.ignore_patterns.iter().cloned());
        if let Some(converter) = &settings.converter {
            self.converter = Some(converter.clone());
        }
        self
    }

    /// Sets the exclusion file. Relative paths resolve against the
    /// project root.
    #[must_use]
    pub fn exclusion_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclusion_file = Some(path.into());
        self
    }

    /// Sets the ledger location. Defaults to `metadata.md` in the output root.
    #[must_use]
    pub fn ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = Some(path.into());
        self
    }

    /// Sets the separator convention for written paths.
    #[must_use]
    pub fn path_style(mut self, style: PathStyle) -> Self {
        self.path_style = Some(style);
        self
    }

    /// Sets the suffix appended to output file names.
    #[must_use]
    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = Some(suffix.into());
        self
    }

    /// Sets the walk filter.
    #[must_use]
    pub fn walk_filter(mut self, filter: WalkFilterConfig) -> Self {
        self.walk_filter = Some(filter);
        self
    }

    /// Sets the external conversion command.
    #[must_use]
    pub fn converter(mut self, converter: ConverterSettings) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Enables dry run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables the `.vscode/settings.json` update.
    #[must_use]
    pub fn editor_settings(mut self, enabled: bool) -> Self {
        self.editor_settings = Some(enabled);
        self
    }

    /// Enables or disables the `.gitignore` update.
    #[must_use]
    pub fn gitignore(mut self, enabled: bool) -> Self {
        self.gitignore = Some(enabled);
        self
    }

    /// Enables or disables installing the Cursor rule.
    #[must_use]
    pub fn cursor_rules(mut self, enabled: bool) -> Self {
        self.cursor_rules = Some(enabled);
        self
    }

    /// Installs the given rule file instead of the bundled one. Relative
    /// paths resolve against the project root.
    #[must_use]
    pub fn cursor_rules_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.cursor_rules_source = Some(path.into());
        self
    }

    /// Builds the configuration, resolving relative paths against the
    /// project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined or
    /// validation fails.
    pub fn build(self) -> Result<Config> {
        let project_root = match self.project_root {
            Some(root) => root,
            None => std::env::current_dir().map_err(|e| Error::io(".", e))?,
        };
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                project_root.join(path)
            }
        };

        let input_dir = resolve(self.input_dir.unwrap_or_else(|| PathBuf::from(".")));
        let output_dir = resolve(
            self.output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        );
        let ledger_path = self
            .ledger_path
            .map_or_else(|| output_dir.join(LEDGER_FILE_NAME), &resolve);
        let exclusion_file = resolve(
            self.exclusion_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXCLUSION_FILE)),
        );

        let mut file_types = Vec::new();
        for ext in self.file_types.unwrap_or_else(|| {
            DEFAULT_FILE_TYPES.iter().map(ToString::to_string).collect()
        }) {
            if !file_types.contains(&ext) {
                file_types.push(ext);
            }
        }

        let config = Config {
            input_dir,
            output_dir,
            ledger_path,
            exclusion_file,
            file_types,
            ignore_patterns: self.ignore_patterns.unwrap_or_else(|| {
                DEFAULT_IGNORE_PATTERNS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            }),
            path_style: self.path_style.unwrap_or_default(),
            output_suffix: self
                .output_suffix
                .unwrap_or_else(|| DEFAULT_OUTPUT_SUFFIX.to_string()),
            walk_filter: self.walk_filter.unwrap_or_default(),
            converter: self.converter.unwrap_or_default(),
            dry_run: self.dry_run,
            editor_settings: self.editor_settings.unwrap_or(true),
            gitignore: self.gitignore.unwrap_or(true),
            cursor_rules: self.cursor_rules.unwrap_or(true),
            cursor_rules_source: self.cursor_rules_source.map(&resolve),
            project_root,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .project_root(temp.path())
            .build()
            .unwrap();

        assert_eq!(config.output_dir, temp.path().join("doc_base"));
        assert_eq!(config.ledger_path, temp.path().join("doc_base/metadata.md"));
        assert_eq!(config.exclusion_file, temp.path().join(".cursorignore"));
        assert_eq!(config.output_suffix, "md");
        assert!(config.file_types.contains(&".pdf".to_string()));
    }

    #[test]
    fn test_missing_input_is_not_a_config_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .project_root(temp.path())
            .input_dir("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_file_types_are_normalized_and_deduplicated() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .project_root(temp.path())
            .file_types(["PDF", ".pdf", ".Docx"])
            .build()
            .unwrap();

        assert_eq!(config.file_types, vec![".pdf", ".docx"]);
    }

    #[test]
    fn test_empty_file_types_are_kept() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .project_root(temp.path())
            .file_types(Vec::<String>::new())
            .build()
            .unwrap();

        assert!(config.file_types.is_empty());
    }

    #[test]
    fn test_invalid_suffix() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .project_root(temp.path())
            .output_suffix(".md")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_output_equal_to_input_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .project_root(temp.path())
            .input_dir("docs")
            .output_dir("docs")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_walk_glob_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .project_root(temp.path())
            .walk_filter(WalkFilterConfig::new().exclude_directories(vec!["[".to_string()]))
            .build();

        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_path_style_rendering() {
        assert_eq!(PathStyle::Unix.render("docs/sub"), "docs/sub");
        assert_eq!(PathStyle::Windows.render("docs/sub"), "docs\\sub");
        assert_eq!(PathStyle::Unix.render_dir("docs/sub"), "docs/sub/");
        assert_eq!(PathStyle::Windows.render_dir("docs/sub/"), "docs\\sub\\");
    }

    #[test]
    fn test_relative_canonical() {
        let base = Path::new("/work/project");
        assert_eq!(
            relative_canonical(Path::new("/work/project/docs/sub"), base),
            "docs/sub"
        );
        assert_eq!(relative_canonical(Path::new("/work/project/./docs"), base), "docs");
        assert_eq!(relative_canonical(base, base), "");
        assert_eq!(relative_canonical(Path::new("/work/other"), base), "../other");
    }
}
