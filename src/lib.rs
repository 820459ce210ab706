//! # doc2md
//!
//! Incremental conversion of office documents and images into a mirrored
//! tree of Markdown files, for use as context by AI-assisted editors.
//!
//! ## Features
//!
//! - Mirrors the source tree: `docs/sub/b.docx` becomes `doc_base/sub/b.docx.md`
//! - Skips files whose Markdown is already up to date
//! - Rebuilds a Markdown ledger (`metadata.md`) of every produced file
//! - Keeps an editor ignore file (`.cursorignore`) in sync, append-only
//! - Hides the output folder from VS Code and git
//! - Installs a Cursor rule that points the agent at the converted docs
//!
//! ## Quick Start
//!
//! ```no_run
//! use doc2md::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .input_dir("./docs")
//!     .output_dir("./doc_base")
//!     .file_types([".pdf", ".docx"])
//!     .build()?;
//!
//! let stats = Pipeline::new(config)?.run()?;
//! println!("{} files converted", stats.converted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Scanner**: Walks the source tree and decides convert / skip per file
//! 2. **Converter**: Runs the external engine and writes the Markdown
//! 3. **Ledger**: Rewrites `metadata.md` from the files that exist
//! 4. **Exclusion**: Appends new patterns to the ignore file

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod converter;
mod editor;
mod error;
mod exclusion;
mod file;
mod filter;
mod ledger;
mod pipeline;
mod scanner;
mod settings;
mod writer;

pub use config::{Config, ConfigBuilder, PathStyle};
pub use converter::{clean_text, Converter, MarkItDown};
pub use editor::{ignore_in_git, CursorRules, EditorSettings, DEFAULT_CURSOR_RULES};
pub use error::{Error, Result};
pub use exclusion::{clean_pattern, type_patterns, ExclusionFile};
pub use file::{Decision, DocumentKind, PlannedFile, SourceEntry};
pub use filter::WalkFilterConfig;
pub use ledger::{ConversionRecord, Ledger};
pub use pipeline::{Pipeline, PipelineStats};
pub use settings::{ConverterSettings, Settings, DEFAULT_FILE_TYPES, DEFAULT_IGNORE_PATTERNS};

/// Runs the complete conversion pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The ledger cannot be written
/// - The exclusion file cannot be read or appended to
///
/// A missing input directory and per-file conversion failures are not
/// errors; they are logged and reflected in [`PipelineStats`].
///
/// # Examples
///
/// ```no_run
/// use doc2md::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .input_dir(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
