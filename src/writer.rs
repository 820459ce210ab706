use crate::error::{Error, Result};
use std::{
    collections::HashSet,
    ffi::OsString,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Creates mirror directories in the output tree, at most once per run.
#[derive(Debug, Default)]
pub(crate) struct OutputTree {
    ensured: HashSet<PathBuf>,
}

impl OutputTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes sure `dir` exists. Returns `true` if it had to be created.
    ///
    /// Ancestors without convertible files were never created, so the
    /// whole chain is created when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub(crate) fn ensure_dir(&mut self, dir: &Path) -> Result<bool> {
        if !self.ensured.insert(dir.to_path_buf()) || dir.is_dir() {
            return Ok(false);
        }

        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        debug!("Created output directory {}", dir.display());
        Ok(true)
    }

    /// Number of distinct directories checked during this run.
    pub(crate) fn ensured_count(&self) -> usize {
        self.ensured.len()
    }
}

/// Writes a file atomically.
///
/// # Process
///
/// 1. Writes content to a temporary sibling (`<name>.tmp`)
/// 2. Syncs the temporary file to disk
/// 3. Atomically renames it over the target path
///
/// An interrupted write never leaves a truncated target behind.
pub(crate) fn write_file_atomic(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    let result = (|| {
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.sync_all()?;
        drop(temp_file);
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Appends `lines` to `path` in a single write, creating the file if needed.
///
/// Existing content is never rewritten. If the file does not end with a
/// newline one is written first so the last existing line stays intact.
pub(crate) fn append_lines(path: &Path, lines: &[String]) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }

    let needs_newline = match fs::read(path) {
        Ok(bytes) => !bytes.is_empty() && !bytes.ends_with(b"\n"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };

    let mut batch = String::new();
    if needs_newline {
        batch.push('\n');
    }
    for line in lines {
        batch.push_str(line);
        batch.push('\n');
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(batch.as_bytes())?;
    file.flush()
}
