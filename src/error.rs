use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum AppError {
    #[error("TOML config file error: {0}")]
    TomlConfig(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML manifest error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dataset archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Training results error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Dataset host returned {status}: {message}")]
    Remote {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Invalid dataset manifest {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Checkpoint not found: {0:?}")]
    CheckpointNotFound(PathBuf),

    #[error("Invalid run id {0:?}: must be non-empty and must not contain path separators")]
    InvalidRunId(String),

    #[error("Run directory already exists: {0:?}")]
    RunExists(PathBuf),

    #[error("Failed to launch `{program}`: {source}")]
    BackendLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{task}` exited with {status}")]
    Backend { task: String, status: ExitStatus },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid device specification: {0}")]
    InvalidDevice(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image loading failed: {0}")]
    ImageLoad(String),

    #[error("YOLO inference error: {0}")]
    Inference(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type with default AppError
pub type Result<T, E = AppError> = std::result::Result<T, E>;
