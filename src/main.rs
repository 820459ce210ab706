use anyhow::Context;
use clap::Parser;
use doc2md::{
    Config, ConverterSettings, Converter, MarkItDown, PathStyle, Pipeline, Settings,
    WalkFilterConfig,
};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directories never worth descending into.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &["**/.git", "**/node_modules", "**/.venv", "**/__pycache__"];

/// Office lock files (`~$report.docx`).
const DEFAULT_EXCLUDED_FILES: &[&str] = &["**/~$*"];

#[derive(Parser, Debug)]
#[command(
    name = "cvmd",
    version,
    author,
    about = "Convert documents into a mirrored tree of Markdown files",
    long_about = "Convert office documents and images into Markdown for AI-assisted editors.\n\n\
    This tool walks an input directory, converts every document whose Markdown is missing \
    or out of date, mirrors the directory layout into the output folder and keeps a \
    metadata ledger and an editor ignore file in sync.\n\n\
    USAGE EXAMPLES:\n  \
      # Convert everything under the current directory\n  \
      cvmd\n\n  \
      # Convert a specific folder into ./knowledge\n  \
      cvmd --input ./contracts --output knowledge\n\n  \
      # Check that the conversion engine is installed\n  \
      cvmd --setup-only\n\n  \
      # Show what would be converted\n  \
      cvmd --dry-run -v"
)]
struct Cli {
    /// Input directory containing files to convert
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    input: PathBuf,

    /// Output directory for Markdown files, relative to the current directory
    #[arg(short, long, default_value = "doc_base", value_name = "PATH")]
    output: PathBuf,

    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "convert_config.json", value_name = "FILE")]
    config: PathBuf,

    /// Only check that the conversion engine is available
    #[arg(long)]
    setup_only: bool,

    /// Dry run (decide what to convert, write nothing)
    #[arg(long)]
    dry_run: bool,

    /// Editor ignore file that receives exclusion patterns
    #[arg(long, default_value = ".cursorignore", value_name = "FILE")]
    ignore_file: PathBuf,

    /// Separator style of paths written to the ledger and ignore file
    #[arg(long, value_enum, default_value = "native")]
    path_style: CliPathStyle,

    /// Conversion command, overriding the configuration file
    #[arg(long, env = "DOC2MD_CONVERTER", value_name = "COMMAND")]
    converter: Option<String>,

    /// Additional directory glob to skip while walking (repeatable)
    ///
    /// Example: cvmd --exclude-dir "**/archive" --exclude-dir "**/tmp"
    #[arg(long = "exclude-dir", value_name = "GLOB")]
    exclude_dirs: Vec<String>,

    /// Do not add the output folder to .vscode/settings.json
    #[arg(long)]
    no_editor_settings: bool,

    /// Do not add the output folder to .gitignore
    #[arg(long)]
    no_gitignore: bool,

    /// Do not install the Cursor docs search rule
    #[arg(long)]
    no_cursor_rules: bool,

    /// Rule file to install instead of the bundled docs search rule
    #[arg(long, value_name = "FILE")]
    cursor_rules: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliPathStyle {
    Native,
    Unix,
    Windows,
}

impl From<CliPathStyle> for PathStyle {
    fn from(style: CliPathStyle) -> Self {
        match style {
            CliPathStyle::Native => Self::native(),
            CliPathStyle::Unix => Self::Unix,
            CliPathStyle::Windows => Self::Windows,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    if cli.setup_only {
        let settings = Settings::load(&cli.config)
            .ok()
            .flatten()
            .and_then(|s| s.converter)
            .unwrap_or_default();
        let engine = MarkItDown::new(&converter_settings(settings, cli.converter));
        engine
            .probe()
            .with_context(|| format!("{} is not available", engine.name()))?;
        println!(
            "{} setup completed. Run cvmd without --setup-only to convert files.",
            engine.name()
        );
        return Ok(());
    }

    let settings = if cli.dry_run {
        Settings::load_or_default(&cli.config)
    } else {
        Settings::load_or_init(&cli.config)
    };
    let converter = converter_settings(settings.converter.clone().unwrap_or_default(), cli.converter);

    let probe = MarkItDown::new(&converter);
    if !cli.dry_run {
        if let Err(e) = probe.probe() {
            warn!("{}; conversions will fail until it is installed", e);
        }
    }

    let mut exclude_dirs: Vec<String> = DEFAULT_EXCLUDED_DIRS.iter().map(ToString::to_string).collect();
    exclude_dirs.extend(cli.exclude_dirs);

    let mut builder = Config::builder()
        .input_dir(&cli.input)
        .output_dir(cli.output)
        .settings(&settings)
        .converter(converter)
        .exclusion_file(cli.ignore_file)
        .path_style(cli.path_style.into())
        .walk_filter(
            WalkFilterConfig::new()
                .exclude_directories(exclude_dirs)
                .exclude_files(DEFAULT_EXCLUDED_FILES.iter().map(ToString::to_string).collect()),
        )
        .dry_run(cli.dry_run)
        .editor_settings(!cli.no_editor_settings)
        .gitignore(!cli.no_gitignore)
        .cursor_rules(!cli.no_cursor_rules);

    if let Some(source) = cli.cursor_rules {
        builder = builder.cursor_rules_source(source);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    if cli.verbose > 0 {
        stats.print_summary();
    }

    if stats.dry_run {
        println!("Would convert {} files", stats.converted);
    } else if stats.recorded() > 0 {
        println!("Successfully converted {} files", stats.recorded());
    } else {
        println!("No matching files found in {}", cli.input.display());
    }

    Ok(())
}

/// Applies the command-line override on top of the configured engine.
fn converter_settings(mut settings: ConverterSettings, command: Option<String>) -> ConverterSettings {
    if let Some(command) = command {
        settings.command = command;
        settings.args.clear();
    }
    settings
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("doc2md=info,cvmd=info"),
        1 => EnvFilter::new("doc2md=debug,cvmd=debug"),
        _ => EnvFilter::new("doc2md=trace,cvmd=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
