// -- imports
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::backend::BackendConfig;
use crate::dataset::DatasetConfig;
use crate::error::{AppError, Result};
use crate::export::ExportArgs;
use crate::predict::PredictArgs;
use crate::runs::RunsLayout;
use crate::train::TrainArgs;

// -- config

/// Settings for all entry points; every section and field is optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub train: TrainArgs,
    pub predict: PredictArgs,
    pub export: ExportArgs,
    pub runs: RunsLayout,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Parse TOML config file with explicit project root for path resolution.
    ///
    /// # Arguments
    ///
    /// * `toml_path` - Path to the TOML config file
    /// * `project_root` - Base directory for resolving relative paths
    ///
    /// # Errors
    ///
    /// Returns `AppError` if:
    /// - The path is not a valid toml file
    /// - File read fails
    /// - TOML parsing fails
    pub fn from_toml(toml_path: &Path, project_root: &Path) -> Result<Self> {
        if !toml_path.is_file() || toml_path.extension().is_none_or(|ext| ext != "toml") {
            return Err(AppError::Config(format!(
                "TOML config path is not a valid .toml file: {:?}",
                toml_path
            )));
        }

        let content = std::fs::read_to_string(toml_path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.resolve_paths(project_root);
        Ok(config)
    }

    /// Defaults, with relative paths resolved against `project_root`
    pub fn defaults(project_root: &Path) -> Self {
        let mut config = Self::default();
        config.resolve_paths(project_root);
        config
    }

    /// Resolve relative paths against project root
    fn resolve_paths(&mut self, project_root: &Path) {
        resolve(&mut self.dataset.download_root, project_root);
        resolve(&mut self.runs.root, project_root);
        resolve(&mut self.predict.source, project_root);
        for path in [
            self.predict.model.as_mut(),
            self.predict.save_dir.as_mut(),
            self.export.model.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            resolve(path, project_root);
        }
    }
}

fn resolve(path: &mut PathBuf, project_root: &Path) {
    if !path.is_absolute() {
        *path = project_root.join(path.as_path());
    }
}

// -- public API

/// Load the config file if one is given, defaults otherwise.
///
/// # Errors
///
/// Returns `AppError` if TOML parsing or path validation fails.
pub fn load_config(toml_path: Option<&Path>, project_root: &Path) -> Result<AppConfig> {
    match toml_path {
        Some(path) => {
            tracing::info!("Loading config: {:?}", path);
            AppConfig::from_toml(path, project_root)
        }
        None => Ok(AppConfig::defaults(project_root)),
    }
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml_with_custom_values() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        let toml_content = r#"
[dataset]
format = "yolov11"
version = 3
keep = true

[train]
epochs = 20
batch = 16
device = "cpu"

[predict]
source = "boards/test.png"
conf = 0.4
show = false

[export]
format = "torchscript"
run = "train-20261019-101500"

[runs]
root = "out/runs"

[backend]
program = "/opt/venv/bin/yolo"
"#;
        fs::write(&toml_path, toml_content).unwrap();

        let config = AppConfig::from_toml(&toml_path, temp_dir.path()).unwrap();

        assert_eq!(config.dataset.format, "yolov11");
        assert_eq!(config.dataset.version, Some(3));
        assert!(config.dataset.keep);
        assert_eq!(config.dataset.download_root, temp_dir.path().join("datasets"));

        assert_eq!(config.train.epochs, 20);
        assert_eq!(config.train.batch, 16);
        assert_eq!(config.train.device, "cpu");
        assert_eq!(config.train.model, "yolo11n.pt");

        assert_eq!(config.predict.source, temp_dir.path().join("boards/test.png"));
        assert_eq!(config.predict.conf, 0.4);
        assert!(!config.predict.show);

        assert_eq!(config.export.format, ExportFormat::TorchScript);
        assert_eq!(
            config.export.run.as_ref().map(|r| r.as_str()),
            Some("train-20261019-101500")
        );

        assert_eq!(config.runs.root, temp_dir.path().join("out/runs"));
        assert_eq!(config.backend.program, PathBuf::from("/opt/venv/bin/yolo"));
    }

    #[test]
    fn test_defaults_match_fixed_script_values() {
        let root = PathBuf::from("/work");
        let config = load_config(None, &root).unwrap();

        assert_eq!(config.train.epochs, 150);
        assert_eq!(config.train.batch, 32);
        assert_eq!(config.train.device, "0");
        assert_eq!(config.predict.conf, 0.25);
        assert_eq!(config.predict.source, root.join("test_img.png"));
        assert_eq!(config.export.format, ExportFormat::Onnx);
        assert_eq!(config.runs.root, root.join("runs/detect"));
        assert_eq!(config.dataset.format, "yolov8");
    }

    #[test]
    fn test_shipped_config_parses() {
        let project_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let config_toml = project_root.join("assets/configs/default.toml");
        let config = AppConfig::from_toml(&config_toml, &project_root).unwrap();
        assert_eq!(config.train.epochs, 150);
        assert_eq!(config.predict.conf, 0.25);
    }

    #[test]
    fn test_from_toml_invalid_path() {
        let invalid_path = PathBuf::from("/nonexistent/config.toml");
        let project_root = PathBuf::from("/tmp");
        assert!(AppConfig::from_toml(&invalid_path, &project_root).is_err());
    }

    #[test]
    fn test_from_toml_invalid_extension() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_path = temp_dir.path().join("config.txt");
        fs::write(&invalid_path, "[train]\nepochs = 1\n").unwrap();
        assert!(AppConfig::from_toml(&invalid_path, temp_dir.path()).is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_toml_path = temp_dir.path().join("invalid.toml");
        fs::write(&invalid_toml_path, "invalid toml [[[").unwrap();
        assert!(load_config(Some(&invalid_toml_path), temp_dir.path()).is_err());
    }

    #[test]
    fn test_unknown_export_format_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[export]\nformat = \"pickle\"\n").unwrap();
        let err = AppConfig::from_toml(&toml_path, temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("onnx"));
    }
}
