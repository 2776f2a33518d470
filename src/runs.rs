// -- imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, Result};

// -- run id

/// Versioned name of one training run directory under the runs root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Generate a run id from the current local time, e.g. `train-20261019-142501`.
    pub fn generate() -> Self {
        Self(format!("train-{}", chrono::Local::now().format("%Y%m%d-%H%M%S")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RunId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = s.is_empty()
            || s == "."
            || s.contains("..")
            || s.contains('/')
            || s.contains('\\');
        if invalid {
            return Err(AppError::InvalidRunId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for RunId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -- layout

const LATEST_POINTER: &str = "latest.toml";
const RUN_RECORD: &str = "run.toml";
/// Directory name the toolkit uses when no run name is given.
const LEGACY_RUN: &str = "train";

/// Directory conventions shared by the trainer, the inference runner and the exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunsLayout {
    /// Root that holds one directory per run (`project=` for the toolkit)
    pub root: PathBuf,
}

impl Default for RunsLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("runs/detect"),
        }
    }
}

impl RunsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn run_dir(&self, run: &RunId) -> PathBuf {
        self.root.join(run.as_str())
    }

    pub fn best_weights(&self, run: &RunId) -> PathBuf {
        self.run_dir(run).join("weights").join("best.pt")
    }

    pub fn results_csv(&self, run: &RunId) -> PathBuf {
        self.run_dir(run).join("results.csv")
    }

    pub fn latest_pointer(&self) -> PathBuf {
        self.root.join(LATEST_POINTER)
    }

    fn legacy_weights(&self) -> PathBuf {
        self.root.join(LEGACY_RUN).join("weights").join("best.pt")
    }
}

// -- run record

/// What a finished training run produced, persisted next to its weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub checkpoint: PathBuf,
    pub data: PathBuf,
    pub base_model: String,
    pub epochs: u32,
    pub batch: i32,
    pub device: String,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    /// Write `run.toml` into the run directory and refresh the `latest.toml` pointer.
    pub fn save(&self, layout: &RunsLayout) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(layout.run_dir(&self.run_id).join(RUN_RECORD), &content)?;
        std::fs::write(layout.latest_pointer(), &content)?;
        tracing::debug!("Run record written for {}", self.run_id);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

// -- checkpoint resolution

/// A checkpoint that exists on disk, and the run it belongs to when known.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRef {
    pub path: PathBuf,
    pub run_id: Option<RunId>,
}

/// Resolve the checkpoint to load.
///
/// Order: explicit `model` path, explicit `run` id, the `latest.toml` pointer, and
/// finally the toolkit's unversioned `train/weights/best.pt`.
///
/// # Errors
///
/// Returns `AppError::CheckpointNotFound` if the chosen file does not exist.
pub fn resolve_checkpoint(
    layout: &RunsLayout,
    model: Option<&Path>,
    run: Option<&RunId>,
) -> Result<CheckpointRef> {
    let candidate = if let Some(path) = model {
        CheckpointRef {
            path: path.to_path_buf(),
            run_id: None,
        }
    } else if let Some(run) = run {
        CheckpointRef {
            path: layout.best_weights(run),
            run_id: Some(run.clone()),
        }
    } else if layout.latest_pointer().is_file() {
        let record = RunRecord::load(&layout.latest_pointer())?;
        tracing::info!("Using latest run: {}", record.run_id);
        CheckpointRef {
            path: record.checkpoint,
            run_id: Some(record.run_id),
        }
    } else {
        let path = layout.legacy_weights();
        tracing::warn!(
            "No run id given and no {} found, falling back to {:?}",
            LATEST_POINTER,
            path
        );
        CheckpointRef {
            path,
            run_id: None,
        }
    };

    if !candidate.path.is_file() {
        return Err(AppError::CheckpointNotFound(candidate.path));
    }
    Ok(candidate)
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch_weights(layout: &RunsLayout, run: &RunId) -> PathBuf {
        let path = layout.best_weights(run);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"weights").unwrap();
        path
    }

    fn record_for(layout: &RunsLayout, run: &RunId) -> RunRecord {
        RunRecord {
            run_id: run.clone(),
            checkpoint: layout.best_weights(run),
            data: PathBuf::from("datasets/chess-1/data.yaml"),
            base_model: "yolo11n.pt".to_string(),
            epochs: 150,
            batch: 32,
            device: "0".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_run_id_rejects_paths() {
        assert!("train-1".parse::<RunId>().is_ok());
        assert!("".parse::<RunId>().is_err());
        assert!("  ".parse::<RunId>().is_err());
        assert!("../etc".parse::<RunId>().is_err());
        assert!("a/b".parse::<RunId>().is_err());
        assert!("a\\b".parse::<RunId>().is_err());
    }

    #[test]
    fn test_generated_run_id_is_valid() {
        let id = RunId::generate();
        assert!(id.as_str().starts_with("train-"));
        assert!(id.as_str().parse::<RunId>().is_ok());
    }

    #[test]
    fn test_explicit_model_wins() {
        let temp_dir = TempDir::new().unwrap();
        let layout = RunsLayout::new(temp_dir.path().join("runs"));
        let model = temp_dir.path().join("custom.pt");
        fs::write(&model, b"weights").unwrap();

        let run: RunId = "other".parse().unwrap();
        let resolved = resolve_checkpoint(&layout, Some(&model), Some(&run)).unwrap();
        assert_eq!(resolved.path, model);
        assert!(resolved.run_id.is_none());
    }

    #[test]
    fn test_explicit_run_resolves_its_weights() {
        let temp_dir = TempDir::new().unwrap();
        let layout = RunsLayout::new(temp_dir.path());
        let run: RunId = "train-a".parse().unwrap();
        let weights = touch_weights(&layout, &run);

        let resolved = resolve_checkpoint(&layout, None, Some(&run)).unwrap();
        assert_eq!(resolved.path, weights);
        assert_eq!(resolved.run_id, Some(run));
    }

    #[test]
    fn test_latest_pointer_used_when_no_run_given() {
        let temp_dir = TempDir::new().unwrap();
        let layout = RunsLayout::new(temp_dir.path());
        let old: RunId = "train-old".parse().unwrap();
        let new: RunId = "train-new".parse().unwrap();
        touch_weights(&layout, &old);
        touch_weights(&layout, &new);
        record_for(&layout, &old).save(&layout).unwrap();
        record_for(&layout, &new).save(&layout).unwrap();

        let resolved = resolve_checkpoint(&layout, None, None).unwrap();
        assert_eq!(resolved.run_id, Some(new.clone()));
        assert_eq!(resolved.path, layout.best_weights(&new));

        let saved = RunRecord::load(&layout.run_dir(&old).join("run.toml")).unwrap();
        assert_eq!(saved.run_id, old);
    }

    #[test]
    fn test_legacy_path_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let layout = RunsLayout::new(temp_dir.path());
        let legacy: RunId = "train".parse().unwrap();
        let weights = touch_weights(&layout, &legacy);

        let resolved = resolve_checkpoint(&layout, None, None).unwrap();
        assert_eq!(resolved.path, weights);
        assert!(resolved.run_id.is_none());
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let layout = RunsLayout::new(temp_dir.path());
        let run: RunId = "absent".parse().unwrap();

        let err = resolve_checkpoint(&layout, None, Some(&run)).unwrap_err();
        assert!(matches!(err, AppError::CheckpointNotFound(p) if p == layout.best_weights(&run)));
        assert!(resolve_checkpoint(&layout, None, None).is_err());
    }
}
