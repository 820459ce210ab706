use crate::{
    config::Config,
    error::{Error, Result},
    file::{dotted_extension, is_fresh, mirror_path, Decision, PlannedFile, SourceEntry},
    filter::WalkFilter,
};
use std::{
    cmp::Ordering,
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone)]
struct ScanStats {
    /// Directories entered
    directories: usize,

    /// Regular files seen
    total_files: usize,

    /// Files with a convertible extension
    convertible: usize,

    /// Convertible files dropped by the walk filter
    filtered: usize,

    /// Errors encountered
    errors: usize,
}

/// Walks the source tree and decides, per convertible file, whether it
/// must be converted.
pub(crate) struct Scanner {
    input_dir: PathBuf,
    output_dir: PathBuf,
    output_suffix: String,
    file_types: HashSet<String>,
    filter: WalkFilter,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the walk filter globs do not compile.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            output_suffix: config.output_suffix.clone(),
            file_types: config.file_types.iter().cloned().collect(),
            filter: WalkFilter::new(&config.walk_filter)?,
        })
    }

    /// Scans the source tree top-down and returns every convertible file
    /// with its mirrored output path and decision, in traversal order.
    ///
    /// Within a directory, files come first (by name), then
    /// subdirectories (by name). The order is stable across runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the source root is not a
    /// directory. Individual walk errors are logged and skipped.
    pub(crate) fn scan(&self) -> Result<Vec<PlannedFile>> {
        if !self.input_dir.is_dir() {
            return Err(Error::missing_input(&self.input_dir));
        }

        debug!("Starting scan of {}", self.input_dir.display());

        let mut stats = ScanStats::default();
        let mut planned = Vec::new();

        let walker = WalkDir::new(&self.input_dir)
            .follow_links(false)
            .sort_by(files_before_directories)
            .into_iter()
            .filter_entry(|entry| !entry.file_type().is_dir() || self.should_enter(entry.path()));

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                stats.directories += 1;
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            stats.total_files += 1;

            match self.plan_entry(&entry, &mut stats) {
                Ok(Some(file)) => planned.push(file),
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to inspect {}: {}", entry.path().display(), e);
                    stats.errors += 1;
                }
            }
        }

        debug!(
            "Scan complete: {} directories, {} files, {} convertible, {} filtered, {} errors",
            stats.directories, stats.total_files, stats.convertible, stats.filtered, stats.errors
        );

        if stats.errors > 0 {
            warn!(
                "Encountered {} errors during scanning (non-fatal)",
                stats.errors
            );
        }

        Ok(planned)
    }

    fn should_enter(&self, dir: &Path) -> bool {
        if dir == self.output_dir {
            trace!("Not descending into output tree {}", dir.display());
            return false;
        }

        let relative = dir.strip_prefix(&self.input_dir).unwrap_or(dir);
        let enter = self.filter.should_enter(relative);
        if !enter {
            debug!("Skipping excluded directory {}", dir.display());
        }
        enter
    }

    /// Builds the plan for one file, or `None` if it is not convertible.
    fn plan_entry(&self, entry: &DirEntry, stats: &mut ScanStats) -> Result<Option<PlannedFile>> {
        let path = entry.path();

        let Some(extension) = dotted_extension(path).filter(|ext| self.file_types.contains(ext))
        else {
            trace!("Ignoring {}", path.display());
            return Ok(None);
        };
        stats.convertible += 1;

        let relative = path.strip_prefix(&self.input_dir).unwrap_or(path);
        if !self.filter.should_process(relative) {
            debug!("Filtered out {}", path.display());
            stats.filtered += 1;
            return Ok(None);
        }

        let modified = entry
            .metadata()
            .map_err(|e| Error::io(path, e.into()))?
            .modified()
            .map_err(|e| Error::io(path, e))?;

        let output = mirror_path(path, &self.input_dir, &self.output_dir, &self.output_suffix)
            .ok_or_else(|| Error::config(format!("{} is outside the input tree", path.display())))?;

        let output_modified = fs::metadata(&output).and_then(|m| m.modified()).ok();
        let decision = if is_fresh(modified, output_modified) {
            Decision::SkipFresh
        } else {
            Decision::Convert
        };

        trace!("{} -> {} ({:?})", path.display(), output.display(), decision);

        Ok(Some(PlannedFile {
            source: SourceEntry {
                path: path.to_path_buf(),
                extension,
                modified,
            },
            output,
            decision,
        }))
    }
}

fn files_before_directories(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}
