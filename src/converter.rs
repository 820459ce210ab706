//! Boundary to the external document→Markdown engine.
//!
//! The pipeline only sees the [`Converter`] trait. The default
//! implementation shells out to the `markitdown` command line tool, which
//! dispatches on file type (PDF, Office formats, OCR for images) on its own.

use crate::error::{Error, Result};
use crate::settings::ConverterSettings;
use crate::writer::write_file_atomic;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// Token some tabular extractions emit for empty numeric cells.
const EMPTY_CELL_PLACEHOLDER: &str = "NaN";

/// Turns a single document into Markdown text.
///
/// Implementations must be usable from one thread at a time; the
/// pipeline calls them sequentially.
pub trait Converter {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Converts the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] when the engine fails on this file.
    fn convert(&self, path: &Path) -> Result<String>;

    /// Checks that the engine can be invoked at all.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the engine is unavailable.
    fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/// Runs the `markitdown` CLI (or a compatible command) per document and
/// captures its standard output.
#[derive(Debug, Clone)]
pub struct MarkItDown {
    command: String,
    args: Vec<String>,
}

impl MarkItDown {
    /// Creates a converter from settings.
    #[must_use]
    pub fn new(settings: &ConverterSettings) -> Self {
        Self {
            command: settings.command.clone(),
            args: settings.args.clone(),
        }
    }

    fn launch_error(&self, path: &Path, e: &std::io::Error) -> Error {
        Error::conversion(path, format!("failed to launch '{}': {e}", self.command))
    }
}

impl Default for MarkItDown {
    fn default() -> Self {
        Self::new(&ConverterSettings::default())
    }
}

impl Converter for MarkItDown {
    fn name(&self) -> &str {
        &self.command
    }

    fn convert(&self, path: &Path) -> Result<String> {
        trace!("Running {} on {}", self.command, path.display());

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.launch_error(path, &e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(Error::conversion(
                path,
                if detail.is_empty() {
                    format!("{} exited with {}", self.command, output.status)
                } else {
                    format!("{} exited with {}: {detail}", self.command, output.status)
                },
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| Error::conversion(path, "engine produced non-UTF-8 output"))
    }

    fn probe(&self) -> Result<()> {
        let status = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                Error::config(format!(
                    "conversion engine '{}' is not available: {e}",
                    self.command
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "conversion engine '{}' failed its version check ({status})",
                self.command
            )))
        }
    }
}

/// Strips engine artifacts from converted text.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.replace(EMPTY_CELL_PLACEHOLDER, "")
}

/// Wraps a [`Converter`] with post-processing and output persistence.
pub(crate) struct ConversionAdapter {
    converter: Box<dyn Converter>,
}

impl ConversionAdapter {
    pub(crate) fn new(converter: Box<dyn Converter>) -> Self {
        Self { converter }
    }

    pub(crate) fn engine(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    /// Converts `source` and writes UTF-8 Markdown to `output`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns the engine failure, or an IO error if the write fails. The
    /// previous output, if any, is left untouched on failure.
    pub(crate) fn convert_to(&self, source: &Path, output: &Path) -> Result<usize> {
        let text = clean_text(&self.converter.convert(source)?);
        write_file_atomic(output, &text).map_err(|e| Error::io(output, e))?;

        debug!(
            "{} wrote {} bytes to {}",
            self.converter.name(),
            text.len(),
            output.display()
        );
        Ok(text.len())
    }
}
