//! Command line interface for the voice authenticity classifier.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use verivoice::batch::{self, BatchArgs};
use verivoice::config::AppConfig;
use verivoice::pipeline::{Detection, DetectionPipeline};

#[derive(Parser)]
#[command(name = "verivoice")]
#[command(about = "Classify speech recordings as AI-generated or human", long_about = None)]
#[command(version)]
struct Cli {
    /// Audio file to classify, or a glob pattern with --batch
    #[arg(value_name = "INPUT")]
    input: String,

    /// Treat INPUT as a glob pattern and classify every match
    #[arg(long)]
    batch: bool,

    /// Classifier model artifact (JSON); overrides the config file
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => {
            let path = AppConfig::default_path();
            if path.exists() {
                AppConfig::load_or_default(path)
            } else {
                AppConfig::default()
            }
        }
    };
    if cli.model.is_some() {
        config.model.path = cli.model.clone();
    }

    let pipeline = DetectionPipeline::new(&config);

    if cli.batch {
        let outcomes = batch::run_batch(
            &pipeline,
            &config.metrics,
            &BatchArgs {
                input_pattern: cli.input,
            },
        )?;
        for outcome in &outcomes {
            print_detection(
                Some(&outcome.path.display().to_string()),
                &outcome.detection,
                cli.json,
            )?;
        }
    } else {
        let detection = batch::classify_file(&pipeline, Path::new(&cli.input))?;
        print_detection(None, &detection, cli.json)?;
        if detection.classification == verivoice::engine::Label::Error {
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_detection(source: Option<&str>, detection: &Detection, json: bool) -> Result<()> {
    if json {
        let line = match source {
            Some(path) => {
                serde_json::to_string(&serde_json::json!({ "path": path, "detection": detection }))?
            }
            None => serde_json::to_string(detection)?,
        };
        println!("{line}");
        return Ok(());
    }
    let prefix = source.map(|s| format!("{s}: ")).unwrap_or_default();
    println!(
        "{prefix}{} (confidence {:.2}, {} ms) - {}",
        detection.classification,
        detection.confidence,
        detection.processing_time_ms,
        detection.explanation
    );
    Ok(())
}
