//! Metadata ledger (`metadata.md`).
//!
//! The ledger is recomputed from scratch every run: one row per output
//! that exists after the run, in traversal order.

use crate::config::{relative_canonical, PathStyle};
use crate::error::{Error, Result};
use crate::writer::write_file_atomic;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

const LEDGER_TEMPLATE: &str = "\
# Metadata of Markdown Files

| Filename | Path | Last Modified |
|----------|------|---------------|
{% for row in rows -%}
| {{ row.filename }} | {{ row.path }} | {{ row.modified }} |
{% endfor -%}
";

/// One produced Markdown file as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRecord {
    /// Output file name (`report.pdf.md`)
    pub filename: String,

    /// Output path relative to the project root, in the configured style
    pub relative_path: String,

    /// Output modification time
    pub modified: DateTime<Local>,
}

impl ConversionRecord {
    /// Builds a record from an output file on disk.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the output cannot be inspected.
    pub fn from_output(output: &Path, project_root: &Path, style: PathStyle) -> Result<Self> {
        let modified = fs::metadata(output)
            .and_then(|m| m.modified())
            .map_err(|e| Error::io(output, e))?;

        Ok(Self {
            filename: output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            relative_path: style.render(&relative_canonical(output, project_root)),
            modified: DateTime::<Local>::from(modified),
        })
    }
}

#[derive(Serialize)]
struct LedgerRow {
    filename: String,
    path: String,
    modified: String,
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// The full set of records for one run.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<ConversionRecord>,
}

impl Ledger {
    /// Creates a ledger from already built records.
    #[must_use]
    pub fn new(records: Vec<ConversionRecord>) -> Self {
        Self { records }
    }

    /// Builds records for `outputs`, preserving their order.
    ///
    /// Outputs that can no longer be inspected are logged and left out,
    /// so every row refers to a file that exists.
    #[must_use]
    pub fn from_outputs(outputs: &[PathBuf], project_root: &Path, style: PathStyle) -> Self {
        let records = outputs
            .iter()
            .filter_map(|output| {
                ConversionRecord::from_output(output, project_root, style)
                    .map_err(|e| warn!("Error indexing {}: {}", output.display(), e))
                    .ok()
            })
            .collect();
        Self { records }
    }

    /// Returns the records in ledger order.
    #[must_use]
    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there is nothing to record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Renders the Markdown table.
    ///
    /// # Errors
    ///
    /// Returns a template error if rendering fails.
    pub fn render(&self) -> Result<String> {
        let rows: Vec<LedgerRow> = self
            .records
            .iter()
            .map(|record| LedgerRow {
                filename: escape_cell(&record.filename),
                path: escape_cell(&record.relative_path),
                modified: record.modified.format(TIMESTAMP_FORMAT).to_string(),
            })
            .collect();

        let mut context = tera::Context::new();
        context.insert("rows", &rows);

        tera::Tera::one_off(LEDGER_TEMPLATE, &context, false)
            .map_err(|e| Error::template("ledger", e))
    }

    /// Writes the ledger to `path`, replacing any previous one.
    ///
    /// An empty ledger is not written; returns whether a file was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<bool> {
        if self.is_empty() {
            info!("No files were converted, skipping metadata update");
            return Ok(false);
        }

        let content = self.render()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::ledger(path, e.to_string()))?;
        }
        write_file_atomic(path, &content).map_err(|e| Error::ledger(path, e.to_string()))?;

        info!("Metadata file updated: {}", path.display());
        Ok(true)
    }
}
