//! CLI entry point for the CSV ETL tool.
//!
//! With no subcommand it behaves like `run`: download the configured CSV,
//! then write the values and missing-values reports next to it.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use csv_etl::aggregate::MalformedRowPolicy;
use csv_etl::fetch::{BasicClient, DEFAULT_DOWNLOAD_FILE, DEFAULT_TIMEOUT, fetch};
use csv_etl::output::{DEFAULT_MISSING_FILE, DEFAULT_VALUES_FILE, OutputPaths};
use csv_etl::pipeline::{DEFAULT_SOURCE_URL, RunConfig, run, run_transform};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "csv_etl")]
#[command(about = "Download a CSV and report per-row sums, averages and missing values", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the source CSV and transform it (the default)
    Run(RunArgs),
    /// Only download the source CSV
    Fetch(SourceArgs),
    /// Only transform a CSV file that is already on disk
    Transform(TransformArgs),
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// URL of the CSV to download
    #[arg(long, env = "ETL_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    url: String,

    /// Where to save the downloaded CSV
    #[arg(long, env = "ETL_DOWNLOAD_PATH", default_value = DEFAULT_DOWNLOAD_FILE)]
    download_to: PathBuf,

    /// Total request timeout in seconds
    #[arg(long, env = "ETL_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output file for id, sum and average
    #[arg(long, env = "ETL_VALUES_PATH", default_value = DEFAULT_VALUES_FILE)]
    values: PathBuf,

    /// Output file for the missing value positions
    #[arg(long, env = "ETL_MISSING_PATH", default_value = DEFAULT_MISSING_FILE)]
    missing: PathBuf,

    /// What to do with rows whose id or values are not numbers
    #[arg(long, env = "ETL_ON_MALFORMED", value_enum, default_value_t = MalformedRowPolicy::Fail)]
    on_malformed: MalformedRowPolicy,
}

impl OutputArgs {
    fn paths(&self) -> OutputPaths {
        OutputPaths {
            values: self.values.clone(),
            missing: self.missing.clone(),
        }
    }
}

#[derive(Args, Clone)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct TransformArgs {
    /// CSV file to read
    #[arg(value_name = "FILE", default_value = DEFAULT_DOWNLOAD_FILE)]
    input: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => {
            let client = BasicClient::with_timeout(Duration::from_secs(args.source.timeout_secs))
                .context("building HTTP client")?;
            let config = RunConfig {
                url: args.source.url,
                download_to: args.source.download_to,
                outputs: args.output.paths(),
                policy: args.output.on_malformed,
            };

            match run(&client, &config).await? {
                Some(summary) => info!(
                    rows_written = summary.rows_written,
                    rows_skipped = summary.rows_skipped,
                    "Run finished"
                ),
                None => {
                    error!(url = %config.url, "No input downloaded, skipping transform");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Fetch(args) => {
            let client = BasicClient::with_timeout(Duration::from_secs(args.timeout_secs))
                .context("building HTTP client")?;
            if fetch(&client, &args.url, &args.download_to).await.is_none() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Transform(args) => {
            run_transform(&args.input, &args.output.paths(), args.output.on_malformed)
                .with_context(|| format!("transforming {}", args.input.display()))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/csv_etl.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("csv_etl.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}
