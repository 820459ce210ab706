use crate::{
    config::Config,
    converter::{ConversionAdapter, Converter, MarkItDown},
    editor::{ignore_in_git, CursorRules, EditorSettings},
    error::Result,
    exclusion::ExclusionFile,
    file::{Decision, PlannedFile},
    ledger::Ledger,
    scanner::Scanner,
    writer::OutputTree,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Convertible files discovered under the input directory
    pub discovered: usize,

    /// Files converted this run (or that would be, in dry run mode)
    pub converted: usize,

    /// Files whose output was already up to date
    pub skipped_fresh: usize,

    /// Files whose conversion failed
    pub failed: usize,

    /// Successful conversions per document kind
    pub converted_by_kind: BTreeMap<String, usize>,

    /// Outputs represented in the ledger, in traversal order
    pub outputs: Vec<PathBuf>,

    /// Source folders that held at least one recorded output
    pub converted_folders: Vec<PathBuf>,

    /// Output directories created this run
    pub directories_created: usize,

    /// Lines appended to the exclusion file
    pub exclusion_lines_added: Vec<String>,

    /// Rows written to the ledger
    pub ledger_rows: usize,

    /// Ledger location, if it was written
    pub ledger_path: Option<PathBuf>,

    /// The input directory did not exist; nothing was done
    pub input_missing: bool,

    /// Nothing was written
    pub dry_run: bool,

    /// Total execution time
    pub duration: Duration,

    /// Time spent walking the tree
    pub scan_duration: Duration,

    /// Time spent converting
    pub convert_duration: Duration,

    /// Time spent writing the ledger and exclusion state
    pub sync_duration: Duration,
}

impl PipelineStats {
    /// Number of files represented in the ledger (converted plus fresh).
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.outputs.len()
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Conversion Summary                         ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Files Discovered:     {:>8}                        ║",
            self.discovered
        );
        println!(
            "║   - Converted:        {:>8}                        ║",
            self.converted
        );
        println!(
            "║   - Up to date:       {:>8}                        ║",
            self.skipped_fresh
        );
        println!(
            "║   - Failed:           {:>8}                        ║",
            self.failed
        );
        for (kind, count) in &self.converted_by_kind {
            println!("║     {kind:<17}{count:>8}                        ║");
        }
        println!("║                                                       ║");
        println!(
            "║ Ledger Rows:          {:>8}                        ║",
            self.ledger_rows
        );
        println!(
            "║ Exclusion Lines Added:{:>8}                        ║",
            self.exclusion_lines_added.len()
        );
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Scanning:         {:>8.2}s                     ║",
            self.scan_duration.as_secs_f64()
        );
        println!(
            "║   - Converting:       {:>8.2}s                     ║",
            self.convert_duration.as_secs_f64()
        );
        println!(
            "║   - Bookkeeping:      {:>8.2}s                     ║",
            self.sync_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        if self.dry_run {
            println!("║                                                       ║");
            println!("║ ⚠ No files were written (dry run mode)               ║");
        }
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Result of the conversion stage, handed explicitly to the bookkeeping
/// stage.
#[derive(Debug, Default)]
struct ConversionOutcome {
    outputs: Vec<PathBuf>,
    converted_folders: BTreeSet<PathBuf>,
    converted: usize,
    skipped_fresh: usize,
    failed: usize,
    converted_by_kind: BTreeMap<String, usize>,
    directories_created: usize,
}

impl ConversionOutcome {
    fn record(&mut self, file: &PlannedFile) {
        self.outputs.push(file.output.clone());
        self.converted_folders
            .insert(file.source.parent().to_path_buf());
    }
}

/// Main pipeline orchestrator: walk, convert, then record.
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    adapter: ConversionAdapter,
}

impl Pipeline {
    /// Creates a pipeline that converts with the configured external
    /// command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        let converter = MarkItDown::new(&config.converter);
        Self::with_converter(config, Box::new(converter))
    }

    /// Creates a pipeline around any conversion engine.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn with_converter(config: Config, converter: Box<dyn Converter>) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?;
        let adapter = ConversionAdapter::new(converter);

        Ok(Self {
            config,
            scanner,
            adapter,
        })
    }

    /// Executes the pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Scan**: walks the input tree and decides convert / skip
    /// 2. **Convert**: runs the engine on stale files, mirroring directories
    /// 3. **Record**: writes the ledger, merges exclusion patterns,
    ///    excludes the output folder in editor and VCS settings and installs
    ///    the Cursor rule
    ///
    /// A missing input directory is a no-op. Per-file failures are logged
    /// and excluded from the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger or the exclusion file cannot be
    /// written. Both are attempted before the first error is returned.
    #[instrument(skip(self), fields(input = %self.config.input_dir.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let mut stats = PipelineStats {
            dry_run: self.config.dry_run,
            ..PipelineStats::default()
        };

        if self.config.file_types.is_empty() {
            warn!("No file types configured, nothing will be converted");
        }

        info!("Stage 1/3: Scanning {}", self.config.input_dir.display());
        let scan_start = Instant::now();
        let planned = match self.scanner.scan() {
            Ok(planned) => planned,
            Err(e) if e.is_missing_input() => {
                warn!("{}", e);
                stats.input_missing = true;
                stats.duration = start_time.elapsed();
                return Ok(stats);
            }
            Err(e) => return Err(e),
        };
        stats.scan_duration = scan_start.elapsed();
        stats.discovered = planned.len();

        let pending = planned
            .iter()
            .filter(|f| f.decision == Decision::Convert)
            .count();
        info!(
            "✓ Found {} convertible files ({} to convert) in {:.2}s",
            planned.len(),
            pending,
            stats.scan_duration.as_secs_f64()
        );

        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping conversion and bookkeeping");
            for file in &planned {
                info!(
                    "{} {} -> {}",
                    if file.decision == Decision::Convert { "Would convert" } else { "Up to date" },
                    file.source.path.display(),
                    file.output.display()
                );
            }
            stats.converted = pending;
            stats.skipped_fresh = planned.len() - pending;
            stats.duration = start_time.elapsed();
            return Ok(stats);
        }

        info!(
            "Stage 2/3: Converting with {}",
            self.adapter.engine().name()
        );
        let convert_start = Instant::now();
        let outcome = self.convert_all(&planned);
        stats.convert_duration = convert_start.elapsed();

        info!(
            "✓ Converted {} files, {} up to date, {} failed in {:.2}s",
            outcome.converted,
            outcome.skipped_fresh,
            outcome.failed,
            stats.convert_duration.as_secs_f64()
        );

        info!("Stage 3/3: Updating ledger and exclusions");
        let sync_start = Instant::now();
        let ledger_result = self.write_ledger(&outcome, &mut stats);
        let exclusion_result = self.sync_exclusions(&outcome, &mut stats);
        self.exclude_output_folder(&outcome);
        self.install_cursor_rules();
        stats.sync_duration = sync_start.elapsed();

        stats.converted = outcome.converted;
        stats.skipped_fresh = outcome.skipped_fresh;
        stats.failed = outcome.failed;
        stats.converted_by_kind = outcome.converted_by_kind;
        stats.directories_created = outcome.directories_created;
        stats.converted_folders = outcome.converted_folders.into_iter().collect();
        stats.outputs = outcome.outputs;
        stats.duration = start_time.elapsed();

        ledger_result?;
        exclusion_result?;

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }

    /// Runs the engine on every stale file, in traversal order.
    fn convert_all(&self, planned: &[PlannedFile]) -> ConversionOutcome {
        let mut outcome = ConversionOutcome::default();
        let mut tree = OutputTree::new();

        for file in planned {
            match tree.ensure_dir(file.output_dir()) {
                Ok(true) => outcome.directories_created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Error converting {}: {}", file.source.path.display(), e);
                    outcome.failed += 1;
                    continue;
                }
            }

            match file.decision {
                Decision::SkipFresh => {
                    debug!("Skipping {}, already converted", file.source.path.display());
                    outcome.skipped_fresh += 1;
                    outcome.record(file);
                }
                Decision::Convert => match self.adapter.convert_to(&file.source.path, &file.output) {
                    Ok(_) => {
                        info!(
                            "Converted {} {} to {}",
                            file.source.kind().label(),
                            file.source.path.display(),
                            file.output.display()
                        );
                        outcome.converted += 1;
                        *outcome
                            .converted_by_kind
                            .entry(file.source.kind().label().to_string())
                            .or_default() += 1;
                        outcome.record(file);
                    }
                    Err(e) => {
                        warn!("Error converting {}: {}", file.source.path.display(), e);
                        outcome.failed += 1;
                    }
                },
            }
        }

        debug!("Checked {} output directories", tree.ensured_count());
        outcome
    }

    fn write_ledger(&self, outcome: &ConversionOutcome, stats: &mut PipelineStats) -> Result<()> {
        let ledger = Ledger::from_outputs(
            &outcome.outputs,
            &self.config.project_root,
            self.config.path_style,
        );

        if ledger.write(&self.config.ledger_path)? {
            stats.ledger_rows = ledger.len();
            stats.ledger_path = Some(self.config.ledger_path.clone());
        }
        Ok(())
    }

    fn sync_exclusions(&self, outcome: &ConversionOutcome, stats: &mut PipelineStats) -> Result<()> {
        let exclusion = ExclusionFile::new(&self.config.exclusion_file, self.config.path_style);

        let mut added =
            exclusion.sync_type_patterns(&self.config.file_types, &self.config.ignore_patterns)?;
        added.extend(
            exclusion.sync_folder_patterns(&outcome.converted_folders, &self.config.project_root)?,
        );

        stats.exclusion_lines_added = added;
        Ok(())
    }

    /// Best-effort: failures here never fail the run.
    fn exclude_output_folder(&self, outcome: &ConversionOutcome) {
        if outcome.outputs.is_empty() {
            return;
        }

        let root = &self.config.project_root;
        let output_dir = &self.config.output_dir;

        if self.config.editor_settings {
            if let Err(e) = EditorSettings::for_project(root).exclude_folder(output_dir, root) {
                warn!("Error updating VS Code settings: {}", e);
            }
        }

        if self.config.gitignore {
            if let Err(e) = ignore_in_git(output_dir, root) {
                warn!("Error updating .gitignore: {}", e);
            }
        }
    }

    /// Best-effort, like the editor exclusion.
    fn install_cursor_rules(&self) {
        if !self.config.cursor_rules {
            return;
        }

        let rules = CursorRules::for_project(&self.config.project_root);
        if let Err(e) = rules.install(self.config.cursor_rules_source.as_deref()) {
            warn!("Error installing Cursor rules: {}", e);
        }
    }
}
