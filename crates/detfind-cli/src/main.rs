mod config;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use detfind_core::{ParserOptions, ReaderSource, Report, StreamParser};

use crate::config::{Config, SummaryFormat};

#[derive(Parser)]
#[command(
    name = "detfind",
    version,
    about = "Evaluate matrices embedded in a text file and annotate their determinants"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate every matrix in a file with its determinant
    Run {
        /// Input file containing one or more matrices
        input: PathBuf,

        /// Output file (created if missing). Defaults to stdout.
        output: Option<PathBuf>,

        /// Summary of computed determinants (overrides config)
        #[arg(short, long)]
        summary: Option<CliSummary>,
    },

    /// Compute determinants without writing annotated output
    Check {
        /// Input file containing one or more matrices
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum CliSummary {
    None,
    Text,
    Json,
}

impl From<CliSummary> for SummaryFormat {
    fn from(val: CliSummary) -> Self {
        match val {
            CliSummary::None => SummaryFormat::None,
            CliSummary::Text => SummaryFormat::Text,
            CliSummary::Json => SummaryFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        Commands::Run {
            input,
            output,
            summary,
        } => {
            let format = summary.map(Into::into).unwrap_or(cfg.report.format);
            cmd_run(&cfg, &input, output.as_deref(), format)
        }
        Commands::Check { input, json } => {
            let format = if json {
                SummaryFormat::Json
            } else {
                SummaryFormat::Text
            };
            cmd_check(&cfg, &input, format)
        }
        Commands::Config => cmd_config(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_run(
    cfg: &Config,
    input: &Path,
    output: Option<&Path>,
    format: SummaryFormat,
) -> Result<()> {
    check_input(input)?;
    let options = cfg.parser_options();

    match output {
        Some(path) => {
            let file = prepare_output(path, cfg.output.create_dirs)?;
            let report = annotate_file(input, BufWriter::new(file), options)?;
            info!(matrices = report.len(), output = %path.display(), "annotated");
            print!("{}", render_summary(&report, format)?);
        }
        None => {
            let stdout = io::stdout();
            let report = annotate_file(input, stdout.lock(), options)?;
            // Keep stdout clean for the annotated text.
            eprint!("{}", render_summary(&report, format)?);
        }
    }
    Ok(())
}

fn cmd_check(cfg: &Config, input: &Path, format: SummaryFormat) -> Result<()> {
    check_input(input)?;
    let report = annotate_file(input, io::sink(), cfg.parser_options())?;
    print!("{}", render_summary(&report, format)?);
    Ok(())
}

fn cmd_config(cfg: &Config) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[parser]");
    println!("  max_size = {}", cfg.parser.max_size);
    println!();
    println!("[output]");
    println!("  create_dirs = {}", cfg.output.create_dirs);
    println!();
    println!("[report]");
    println!("  format = {}", cfg.report.format);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("input path does not exist: {}", path.display());
    }
    Ok(())
}

/// Open the output file for writing, creating it (and, if allowed, its
/// parent directories) when missing.
fn prepare_output(path: &Path, create_dirs: bool) -> Result<File> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                if !create_dirs {
                    bail!("output directory does not exist: {}", parent.display());
                }
                debug!(dir = %parent.display(), "creating output directory");
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
    }
    File::create(path).with_context(|| format!("opening {} for writing", path.display()))
}

fn annotate_file<W: Write>(input: &Path, sink: W, options: ParserOptions) -> Result<Report> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut source = ReaderSource::new(file);
    let report = StreamParser::with_options(sink, options)
        .run(&mut source)
        .with_context(|| format!("evaluating matrices in {}", input.display()))?;
    if report.is_empty() {
        warn!(input = %input.display(), "no matrices found");
    }
    Ok(report)
}

fn render_summary(report: &Report, format: SummaryFormat) -> Result<String> {
    let out = match format {
        SummaryFormat::None => String::new(),
        SummaryFormat::Text => {
            let mut out = format!("Matrices: {}\n", report.len());
            for outcome in &report.matrices {
                out.push_str(&format!("  {outcome}\n"));
            }
            out
        }
        SummaryFormat::Json => {
            let mut out = serde_json::to_string_pretty(report)?;
            out.push('\n');
            out
        }
    };
    Ok(out)
}
