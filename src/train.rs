// -- submodules
mod metrics;

pub use metrics::{EpochMetrics, read_results_csv};

// -- external imports
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::backend::{DetectorBackend, TrainRequest};
use crate::dataset::DatasetLease;
use crate::error::{AppError, Result};
use crate::runs::{RunId, RunRecord, RunsLayout};

// -- args

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainArgs {
    /// Pre-trained checkpoint to fine-tune
    pub model: String,

    pub epochs: u32,

    /// Batch size (-1 lets the toolkit pick)
    pub batch: i32,

    /// Accelerator device index, or `cpu`
    pub device: String,

    /// Training image size
    pub imgsz: Option<u32>,

    /// Run id; generated from the clock when unset
    pub name: Option<RunId>,

    /// Extra toolkit overrides, passed as `key=value`
    pub extra: BTreeMap<String, String>,
}

impl Default for TrainArgs {
    fn default() -> Self {
        Self {
            model: "yolo11n.pt".to_string(),
            epochs: 150,
            batch: 32,
            device: "0".to_string(),
            imgsz: None,
            name: None,
            extra: BTreeMap::new(),
        }
    }
}

/// What a finished run left behind
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub record: RunRecord,
    pub epochs: Vec<EpochMetrics>,
}

/// Fine-tune on the leased dataset and record the run.
///
/// The lease is released only after the training call returns without error; on any
/// earlier failure it is dropped and the dataset stays on disk.
pub fn run_training(
    backend: &dyn DetectorBackend,
    layout: &RunsLayout,
    args: &TrainArgs,
    dataset: DatasetLease,
) -> Result<TrainOutcome> {
    let start_time = Instant::now();

    let run_id = args.name.clone().unwrap_or_else(RunId::generate);
    let run_dir = layout.run_dir(&run_id);
    if run_dir.exists() {
        return Err(AppError::RunExists(run_dir));
    }
    std::fs::create_dir_all(&layout.root)?;

    let request = TrainRequest {
        data: dataset.manifest_path().to_path_buf(),
        model: args.model.clone(),
        epochs: args.epochs,
        batch: args.batch,
        device: args.device.clone(),
        imgsz: args.imgsz,
        project: layout.root.clone(),
        name: run_id.to_string(),
        extra: args.extra.clone(),
    };

    tracing::info!("Training run: {}", run_id);
    tracing::info!("[Data]: {:?}", request.data);
    tracing::info!(
        "epochs={} batch={} device={} model={}",
        request.epochs,
        request.batch,
        request.device,
        request.model
    );
    tracing::info!("-----------------------------------------");

    backend.train(&request)?;
    dataset.release()?;

    let checkpoint = layout.best_weights(&run_id);
    if !checkpoint.is_file() {
        return Err(AppError::CheckpointNotFound(checkpoint));
    }

    let results_path = layout.results_csv(&run_id);
    let epochs = if results_path.is_file() {
        read_results_csv(&results_path)?
    } else {
        tracing::warn!("No per-epoch results at {:?}", results_path);
        Vec::new()
    };

    tracing::info!("Training results:");
    for row in &epochs {
        tracing::info!("{}", row.summary());
    }

    let record = RunRecord {
        run_id,
        checkpoint,
        data: request.data,
        base_model: request.model,
        epochs: request.epochs,
        batch: request.batch,
        device: request.device,
        created_at: Utc::now(),
    };
    record.save(layout)?;

    tracing::info!("Best weights: {:?}", record.checkpoint);
    tracing::info!("Total training time: {:.3?}", start_time.elapsed());

    Ok(TrainOutcome { record, epochs })
}
