// -- submodules
mod ultralytics_cli;

pub use ultralytics_cli::{ToolkitCommand, UltralyticsCli};

// -- external imports
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::export::ExportFormat;

// -- requests

/// One fine-tuning run handed to the toolkit
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    /// Dataset manifest (`data.yaml`)
    pub data: PathBuf,
    /// Pre-trained checkpoint name or path
    pub model: String,
    pub epochs: u32,
    pub batch: i32,
    pub device: String,
    pub imgsz: Option<u32>,
    /// Runs root; the toolkit writes into `project/name`
    pub project: PathBuf,
    pub name: String,
    /// Extra `key=value` overrides passed through untouched
    pub extra: BTreeMap<String, String>,
}

/// Single-source prediction handed to the toolkit
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub model: PathBuf,
    pub source: PathBuf,
    pub conf: f32,
    pub iou: f32,
    pub max_det: usize,
    pub imgsz: Option<u32>,
    pub half: bool,
    pub device: Option<String>,
    pub show: bool,
    /// When set, annotated output is saved under this directory
    pub save_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub model: PathBuf,
    pub format: ExportFormat,
    pub imgsz: Option<u32>,
    pub half: bool,
    pub dynamic: bool,
    pub simplify: bool,
    pub opset: Option<u32>,
}

// -- trait

/// Seam between this crate and the detection toolkit that owns the model.
pub trait DetectorBackend {
    /// Blocks for the whole training run. Artifacts land in `project/name`.
    fn train(&self, request: &TrainRequest) -> Result<()>;

    fn predict(&self, request: &PredictRequest) -> Result<()>;

    /// Artifacts are written next to `request.model` by the toolkit's own convention.
    fn export(&self, request: &ExportRequest) -> Result<()>;
}

// -- config

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Toolkit executable
    pub program: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yolo"),
        }
    }
}

impl From<&BackendConfig> for UltralyticsCli {
    fn from(config: &BackendConfig) -> Self {
        UltralyticsCli::new(config.program.clone())
    }
}
