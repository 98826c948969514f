use clap::{Parser, Subcommand};
use image_versions::config::{self, Configuration};
use image_versions::freshness::{AlwaysProcess, ChangeFilter, MtimeFilter};
use image_versions::imaging::RustBackend;
use image_versions::process::{self, FileResult, ProcessError, Report};
use image_versions::{logging, output, scan};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::Sender;

fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("GIT_HASH") {
        "" => "dev@unknown",
        // Leaked once at startup
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "image-versions")]
#[command(about = "Incremental batch image converter: sized JPEG/WebP/AVIF versions and LQIP placeholders")]
#[command(long_about = "\
Incremental batch image converter

Every source file (by extension, walked recursively) is resized and encoded
once per configured version and codec. Outputs mirror the source layout:

  imgs/a/cat.png  →  out/a/cat.lg.jpg   out/a/cat.lg.webp   out/a/cat.lg.avif
                     out/a/cat.sm.jpg   out/a/cat.sm.webp   out/a/cat.sm.avif

Placeholders are tiny blurred previews of PNG sources:

  imgs/a/cat.png  →  out/a/cat.webp

Files whose output is newer than the source are skipped; use --force to
rebuild everything.

Run 'image-versions gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults apply when the default file is absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the source directory
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Override the destination directory
    #[arg(long, global = true)]
    dest: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Structured JSON logs on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that write images.
#[derive(clap::Args, Clone, Copy)]
struct RunArgs {
    /// Ignore timestamps and re-encode every file
    #[arg(long)]
    force: bool,

    /// Print the final report as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the JPEG versions
    Jpeg(RunArgs),
    /// Generate the WebP versions
    Webp(RunArgs),
    /// Generate the AVIF versions
    Avif(RunArgs),
    /// Generate JPEG, WebP and AVIF versions together
    All(RunArgs),
    /// Generate low quality image placeholders from PNG sources
    Placeholders(RunArgs),
    /// Validate the config and list what would be processed
    Check,
    /// Print a stock config file with all options documented
    GenConfig,
}

#[derive(Clone, Copy)]
enum Job {
    Jpeg,
    Webp,
    Avif,
    All,
    Placeholders,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (job, args) = match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(ExitCode::SUCCESS);
        }
        Command::Check => {
            let config = resolve_config(&cli)?;
            config.validate()?;
            let sources = scan::discover(&config.source, &config.source_ext)?;
            output::print_check(&config, &sources);
            println!("==> Config is valid");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Jpeg(args) => (Job::Jpeg, *args),
        Command::Webp(args) => (Job::Webp, *args),
        Command::Avif(args) => (Job::Avif, *args),
        Command::All(args) => (Job::All, *args),
        Command::Placeholders(args) => (Job::Placeholders, *args),
    };

    logging::init(cli.verbose, cli.json_logs);
    let config = resolve_config(&cli)?;
    init_thread_pool(&config.processing);

    let (tx, rx) = std::sync::mpsc::channel::<FileResult>();
    let quiet = args.json;
    let printer = std::thread::spawn(move || {
        for event in rx {
            if !quiet {
                output::print_event(&event);
            }
        }
    });

    let result = if args.force {
        run_job(job, &config, &AlwaysProcess, Some(tx))
    } else {
        run_job(job, &config, &MtimeFilter, Some(tx))
    };
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_job(
    job: Job,
    config: &Configuration,
    filter: &impl ChangeFilter,
    events: Option<Sender<FileResult>>,
) -> Result<Report, ProcessError> {
    let backend = RustBackend::new();
    match job {
        Job::Jpeg => process::resize_jpeg(&backend, filter, config, events),
        Job::Webp => process::resize_webp(&backend, filter, config, events),
        Job::Avif => process::resize_avif(&backend, filter, config, events),
        Job::All => process::convert_all(&backend, filter, config, events),
        Job::Placeholders => process::placeholders_with_backend(&backend, filter, config, events),
    }
}

/// Load the config file (or defaults) and apply CLI overrides.
///
/// An explicit `--config` must exist; the default file is optional.
fn resolve_config(cli: &Cli) -> Result<Configuration, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            let default = PathBuf::from(config::DEFAULT_CONFIG_FILE);
            if default.is_file() {
                config::load_config(&default)?
            } else {
                Configuration::default()
            }
        }
    };
    if let Some(source) = &cli.source {
        config.source = source.clone();
    }
    if let Some(dest) = &cli.dest {
        config.dest = dest.clone();
    }
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
