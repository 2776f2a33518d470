mod annotate;
mod backend;
mod dataset;
mod error;
mod export;
mod logging;
mod predict;
mod progress_bar;
mod runs;
mod toml_utils;
mod train;

pub use annotate::{AnnotateConfigs, annotate_image};
pub use backend::{
    BackendConfig, DetectorBackend, ExportRequest, PredictRequest, ToolkitCommand, TrainRequest,
    UltralyticsCli,
};
pub use dataset::{
    ClassNames, DatasetConfig, DatasetLease, DatasetManifest, DownloadedDataset, ExportPolling,
    MANIFEST_FILE, RoboflowClient, RoboflowCredentials, VersionInfo, extract_zip, fetch_dataset,
};
pub use error::{AppError, Result};
pub use logging::init_logger;
pub use progress_bar::{download_bar_style, progress_bar_style};
pub use runs::{CheckpointRef, RunId, RunRecord, RunsLayout, resolve_checkpoint};
pub use toml_utils::{AppConfig, load_config};

// Entry point operations
pub use export::{ExportArgs, ExportFormat, run_export};
pub use predict::{Detection, PredictArgs, PredictEngine, predict_onnx, run_prediction, wait_for_close};
pub use train::{EpochMetrics, TrainArgs, TrainOutcome, read_results_csv, run_training};
