use clap::{Parser, Subcommand};
use console::Term;
use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use watermarker::config::{self, ConfigError};
use watermarker::imaging::{FontSearch, PreparedWatermark};
use watermarker::plan::{self, PlanError, PlanRequest};
use watermarker::run::{self, RunOptions};
use watermarker::types::{Opacity, Position, ValidationError, WatermarkSpec};
use watermarker::{output, wizard};

fn version_string() -> &'static str {
    let on_tag = env!("WATERMARKER_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("WATERMARKER_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "watermarker")]
#[command(about = "Batch image watermarking with a logo or text")]
#[command(long_about = "\
Batch image watermarking with a logo or text

Input can be a single image, a folder (use --recursive for subfolders) or a
glob pattern. Outputs are named <stem>_watermarked.<ext>. Batches go to a
'watermarked' folder beside the input folder (or in the current directory
for globs) unless --output says otherwise.

Supported formats: jpg, jpeg, png, webp, tif, tiff, bmp, gif

Examples:
  watermarker add -i photo.jpg -t \"(c) ACME\" --pos br --opacity 40
  watermarker add -i photos --recursive -w logo.png
  watermarker add -i './shoot/*.png' -w logo.png --dry-run

Settings can be kept in watermark.toml. Run 'watermarker gen-config' to
generate a documented one.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add an image or text watermark to one image or a batch
    Add(AddArgs),
    /// Print a stock watermark.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct AddArgs {
    /// Input image file, folder path, or glob pattern
    #[arg(short, long)]
    input: Option<String>,

    /// Output file (single image) or output folder (batch)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Watermark image path
    #[arg(short, long, conflicts_with = "text")]
    watermark: Option<PathBuf>,

    /// Text watermark content
    #[arg(short, long)]
    text: Option<String>,

    /// Watermark position
    #[arg(long, value_enum)]
    pos: Option<Position>,

    /// Opacity from 0 (invisible) to 100 (fully visible)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    opacity: Option<u32>,

    /// Distance in pixels from the anchored edges
    #[arg(long)]
    margin: Option<u32>,

    /// Font file for text watermarks
    #[arg(long)]
    font: Option<PathBuf>,

    /// Config file (default: ./watermark.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process subfolders recursively when --input is a folder
    #[arg(long)]
    recursive: bool,

    /// Overwrite output files that already exist
    #[arg(long)]
    overwrite: bool,

    /// Print planned outputs without writing files
    #[arg(long)]
    dry_run: bool,

    /// Show debug logs and full error chains
    #[arg(long)]
    verbose: bool,

    /// Print the plan and result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("Prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// `2` for bad arguments or input, `1` for runtime failures.
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Validation(_) => 2,
            CliError::Config(ConfigError::Io(_)) => 1,
            CliError::Config(_) => 2,
            CliError::Plan(PlanError::Io(_)) => 1,
            CliError::Plan(_) => 2,
            CliError::Prompt(_) | CliError::Io(_) | CliError::Json(_) => 1,
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,watermarker={level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = matches!(&cli.command, Command::Add(args) if args.verbose);
    init_tracing(verbose);

    let result = match cli.command {
        Command::Add(args) => add(args),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if verbose {
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("  caused by: {cause}");
                    source = cause.source();
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn add(args: AddArgs) -> Result<ExitCode, CliError> {
    let working_dir = std::env::current_dir()?;
    let config = config::load_config(args.config.as_deref(), &working_dir)?;

    let mut answers = wizard::Answers {
        input: args.input,
        output: args.output,
        watermark: args.watermark,
        text: args.text,
        position: args.pos,
        opacity: args.opacity,
        recursive: args.recursive,
    };
    if answers.needs_wizard() && wizard::is_interactive() {
        answers = wizard::run_wizard(
            &mut Term::stdout(),
            answers,
            config.placement.position,
            config.placement.opacity,
        )
        .map_err(CliError::Prompt)?;
    }

    let input = answers.input.ok_or(ValidationError::MissingInput)?;
    let watermark = WatermarkSpec::from_options(
        answers.watermark.map(|path| working_dir.join(path)),
        answers.text,
    )?;

    let mut placement = config.placement()?;
    if let Some(position) = answers.position {
        placement.position = position;
    }
    if let Some(opacity) = answers.opacity {
        placement.opacity = Opacity::new(opacity)?;
    }
    if let Some(margin) = args.margin {
        placement.margin = margin;
    }

    // A dry run only checks that the source exists
    let prepared = if args.dry_run {
        PreparedWatermark::check(&watermark)?;
        None
    } else {
        let font = args
            .font
            .or_else(|| config.text.font.clone())
            .map(|path| working_dir.join(path));
        let fonts = FontSearch::system(font, config.text.fallback_fonts.clone());
        Some(PreparedWatermark::prepare(&watermark, &fonts)?)
    };

    let request = PlanRequest {
        output: answers.output,
        recursive: answers.recursive,
        overwrite: args.overwrite,
        naming: config.naming(),
        folder_name: config.output.folder_name.clone(),
        ..PlanRequest::new(input, working_dir.clone())
    };
    let plan = plan::plan(&request)?;

    let options = RunOptions {
        overwrite: args.overwrite,
        dry_run: args.dry_run,
        sizing: config.sizing(),
        jpeg_quality: config.jpeg_quality(),
    };

    let execute = |events: Option<&Sender<run::RunEvent>>| match &prepared {
        Some(prepared) => run::run(&plan, prepared, &placement, &options, events),
        None => run::dry_run(&plan, events),
    };

    if args.json {
        let result = execute(None);
        output::print_json(&plan, &result)?;
        return Ok(exit_for(&result));
    }

    if args.dry_run {
        output::print_plan(&plan);
    }
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            if let Some(line) = output::format_run_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = execute(Some(&tx));
    drop(tx);
    if printer.join().is_err() {
        warn!("Progress printer stopped early");
    }
    output::print_summary(&result, args.verbose);

    Ok(exit_for(&result))
}

fn exit_for(result: &run::RunResult) -> ExitCode {
    if result.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
