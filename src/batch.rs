use crate::audio::RawAudio;
use crate::config::MetricsConfig;
use crate::metrics::AppMetrics;
use crate::pipeline::{Detection, DetectionPipeline};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Batch run parameters.
#[derive(Debug)]
pub struct BatchArgs {
    pub input_pattern: String,
}

/// Per-file result of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub path: PathBuf,
    pub detection: Detection,
}

/// Classify a single file from disk.
///
/// The file extension, when present, is forwarded to the loader as a format
/// hint. Decode failures surface as ERROR detections, not as `Err`; only
/// filesystem problems fail here.
pub fn classify_file(pipeline: &DetectionPipeline, path: &Path) -> Result<Detection> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read audio file {}", path.display()))?;

    let raw = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => RawAudio::with_hint(bytes, ext),
        None => RawAudio::new(bytes),
    };

    Ok(pipeline.run(raw))
}

/// Classify every file matching a glob pattern.
pub fn run_batch(
    pipeline: &DetectionPipeline,
    metrics_config: &MetricsConfig,
    args: &BatchArgs,
) -> Result<Vec<BatchOutcome>> {
    tracing::info!(pattern = %args.input_pattern, "Starting batch classification");

    let paths: Vec<PathBuf> = glob::glob(&args.input_pattern)
        .context("Failed to read glob pattern")?
        .filter_map(|entry| entry.ok())
        .collect();

    if paths.is_empty() {
        tracing::warn!("No files found matching pattern: {}", args.input_pattern);
        return Ok(Vec::new());
    }

    tracing::info!("Found {} files to classify", paths.len());

    let mut metrics = metrics_config.enabled.then(|| {
        AppMetrics::with_bounds(
            metrics_config.histogram_max_ms,
            metrics_config.histogram_precision,
        )
    });
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        match classify_file(pipeline, &path) {
            Ok(detection) => {
                tracing::info!(
                    path = %path.display(),
                    label = %detection.classification,
                    confidence = detection.confidence,
                    "Classified file"
                );
                if let Some(metrics) = metrics.as_mut() {
                    metrics
                        .record_classification(detection.classification, detection.processing_time_ms);
                }
                outcomes.push(BatchOutcome { path, detection });
            }
            Err(e) => tracing::error!("Failed to process {:?}: {}", path, e),
        }
    }

    if let Some(metrics) = &metrics {
        tracing::info!("Batch complete\n{}", metrics.summary().report());
    }

    Ok(outcomes)
}
