use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use laundry_watch::config::{self, AppConfig};
use laundry_watch::models::TIMESTAMP_FORMAT;
use laundry_watch::pipeline::reader::ScreenshotReading;
use laundry_watch::pipeline::schedule::start_schedule;
use laundry_watch::pipeline::timestamp::extract_collected_at;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "laundry-watch", version)]
#[command(about = "Record laundry-room usage from status-display screenshots")]
struct Cli {
    /// Configuration file. Defaults to laundry-watch.toml in the working directory or a parent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every pending screenshot once.
    Run,
    /// Process pending screenshots on a fixed interval until interrupted.
    Watch {
        #[arg(long, default_value_t = config::DEFAULT_WATCH_INTERVAL.as_secs())]
        interval_secs: u64,
    },
    /// Read screenshots and print what was recognized. Nothing is stored or moved.
    Scan {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(Serialize)]
struct ScanReport {
    image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    collected_at: Option<String>,
    #[serde(flatten)]
    reading: ScreenshotReading,
}

fn main() -> ExitCode {
    laundry_watch::init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "{} failed", config::APP_NAME);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult {
    let cli = Cli::parse();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
    let app_config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_once(&app_config),
        Commands::Watch { interval_secs } => run_watch(&app_config, interval_secs),
        Commands::Scan { images } => run_scan(&app_config, images),
    }
}

fn run_once(app_config: &AppConfig) -> CliResult {
    let runner = app_config.build_runner()?;
    let summary = runner.run_batch()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_watch(app_config: &AppConfig, interval_secs: u64) -> CliResult {
    let runner = app_config.build_runner()?;
    let handle = start_schedule(runner, Duration::from_secs(interval_secs));
    // Runs until a fatal batch error or the process is killed.
    handle.join()?;
    Ok(())
}

fn run_scan(app_config: &AppConfig, images: Vec<PathBuf>) -> CliResult {
    let reader = app_config.build_reader()?;
    for image in images {
        let reading = reader.read(&image)?;
        let collected_at = image
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| extract_collected_at(n).ok())
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string());
        let report = ScanReport {
            image,
            collected_at,
            reading,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
