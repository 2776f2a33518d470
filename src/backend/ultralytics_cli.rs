use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AppError, Result};

use super::{DetectorBackend, ExportRequest, PredictRequest, TrainRequest};

/// A fully rendered toolkit invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolkitCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolkitCommand {
    /// Run with inherited stdio and wait for exit.
    fn run(&self, task: &str) -> Result<()> {
        tracing::info!("Running: {}", self);
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| AppError::BackendLaunch {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(AppError::Backend {
                task: task.to_string(),
                status,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ToolkitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Drives the Ultralytics `yolo` command line.
#[derive(Debug, Clone)]
pub struct UltralyticsCli {
    program: PathBuf,
}

impl Default for UltralyticsCli {
    fn default() -> Self {
        Self::new("yolo")
    }
}

impl UltralyticsCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn train_command(&self, request: &TrainRequest) -> ToolkitCommand {
        let mut args = vec![
            "detect".to_string(),
            "train".to_string(),
            kv_path("data", &request.data),
            kv("model", &request.model),
            kv("epochs", request.epochs),
            kv("batch", request.batch),
            kv("device", &request.device),
        ];
        if let Some(sz) = request.imgsz {
            args.push(kv("imgsz", sz));
        }
        args.push(kv_path("project", &request.project));
        args.push(kv("name", &request.name));
        args.push(kv("exist_ok", py_bool(false)));
        args.extend(request.extra.iter().map(|(k, v)| kv(k, v)));

        self.command(args)
    }

    pub fn predict_command(&self, request: &PredictRequest) -> ToolkitCommand {
        let mut args = vec![
            "detect".to_string(),
            "predict".to_string(),
            kv_path("model", &request.model),
            kv_path("source", &request.source),
            kv("conf", request.conf),
            kv("iou", request.iou),
            kv("max_det", request.max_det),
            kv("half", py_bool(request.half)),
        ];
        if let Some(sz) = request.imgsz {
            args.push(kv("imgsz", sz));
        }
        if let Some(ref device) = request.device {
            args.push(kv("device", device));
        }
        args.push(kv("show", py_bool(request.show)));
        match &request.save_dir {
            Some(dir) => {
                args.push(kv("save", py_bool(true)));
                args.push(kv_path("project", dir));
                args.push(kv("name", "predict"));
                args.push(kv("exist_ok", py_bool(true)));
            }
            None => args.push(kv("save", py_bool(false))),
        }

        self.command(args)
    }

    pub fn export_command(&self, request: &ExportRequest) -> ToolkitCommand {
        let mut args = vec![
            "export".to_string(),
            kv_path("model", &request.model),
            kv("format", request.format),
        ];
        if let Some(sz) = request.imgsz {
            args.push(kv("imgsz", sz));
        }
        args.push(kv("half", py_bool(request.half)));
        args.push(kv("dynamic", py_bool(request.dynamic)));
        args.push(kv("simplify", py_bool(request.simplify)));
        if let Some(opset) = request.opset {
            args.push(kv("opset", opset));
        }

        self.command(args)
    }

    fn command(&self, args: Vec<String>) -> ToolkitCommand {
        ToolkitCommand {
            program: self.program.clone(),
            args,
        }
    }
}

impl DetectorBackend for UltralyticsCli {
    fn train(&self, request: &TrainRequest) -> Result<()> {
        self.train_command(request).run("train")
    }

    fn predict(&self, request: &PredictRequest) -> Result<()> {
        self.predict_command(request).run("predict")
    }

    fn export(&self, request: &ExportRequest) -> Result<()> {
        self.export_command(request).run("export")
    }
}

// -- argument helpers

fn kv(key: &str, value: impl fmt::Display) -> String {
    format!("{key}={value}")
}

fn kv_path(key: &str, path: &Path) -> String {
    kv(key, path.display())
}

/// The toolkit parses booleans the Python way.
const fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use std::collections::BTreeMap;

    fn train_request() -> TrainRequest {
        TrainRequest {
            data: PathBuf::from("datasets/chess-3/data.yaml"),
            model: "yolo11n.pt".to_string(),
            epochs: 150,
            batch: 32,
            device: "0".to_string(),
            imgsz: None,
            project: PathBuf::from("runs/detect"),
            name: "train-20261019-101500".to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_train_command_renders_hyperparameters() {
        let cli = UltralyticsCli::default();
        let cmd = cli.train_command(&train_request());

        assert_eq!(cmd.program, PathBuf::from("yolo"));
        assert_eq!(
            cmd.args,
            vec![
                "detect",
                "train",
                "data=datasets/chess-3/data.yaml",
                "model=yolo11n.pt",
                "epochs=150",
                "batch=32",
                "device=0",
                "project=runs/detect",
                "name=train-20261019-101500",
                "exist_ok=False",
            ]
        );
    }

    #[test]
    fn test_train_command_appends_imgsz_and_extra() {
        let mut request = train_request();
        request.imgsz = Some(640);
        request.extra.insert("patience".to_string(), "20".to_string());
        request.extra.insert("cos_lr".to_string(), "True".to_string());

        let cmd = UltralyticsCli::new("/opt/venv/bin/yolo").train_command(&request);
        assert_eq!(cmd.program, PathBuf::from("/opt/venv/bin/yolo"));
        assert!(cmd.args.contains(&"imgsz=640".to_string()));
        // extras are ordered by key and come last
        let tail = &cmd.args[cmd.args.len() - 2..];
        assert_eq!(tail, ["cos_lr=True", "patience=20"]);
    }

    #[test]
    fn test_predict_command() {
        let request = PredictRequest {
            model: PathBuf::from("runs/detect/train/weights/best.pt"),
            source: PathBuf::from("test_img.png"),
            conf: 0.25,
            iou: 0.45,
            max_det: 300,
            imgsz: None,
            half: false,
            device: None,
            show: true,
            save_dir: None,
        };
        let cmd = UltralyticsCli::default().predict_command(&request);

        assert_eq!(&cmd.args[..2], ["detect", "predict"]);
        assert!(cmd.args.contains(&"conf=0.25".to_string()));
        assert!(cmd.args.contains(&"show=True".to_string()));
        assert!(cmd.args.contains(&"save=False".to_string()));
        let sources: Vec<_> = cmd.args.iter().filter(|a| a.starts_with("source=")).collect();
        assert_eq!(sources, ["source=test_img.png"]);
    }

    #[test]
    fn test_export_command() {
        let request = ExportRequest {
            model: PathBuf::from("runs/detect/train/weights/best.pt"),
            format: ExportFormat::Onnx,
            imgsz: None,
            half: false,
            dynamic: false,
            simplify: true,
            opset: Some(12),
        };
        let cmd = UltralyticsCli::default().export_command(&request);
        assert_eq!(
            cmd.args,
            vec![
                "export",
                "model=runs/detect/train/weights/best.pt",
                "format=onnx",
                "half=False",
                "dynamic=False",
                "simplify=True",
                "opset=12",
            ]
        );
        assert_eq!(
            cmd.to_string(),
            "yolo export model=runs/detect/train/weights/best.pt format=onnx half=False dynamic=False simplify=True opset=12"
        );
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let cli = UltralyticsCli::new("/nonexistent/yolo-toolkit");
        let err = cli.train(&train_request()).unwrap_err();
        assert!(matches!(err, AppError::BackendLaunch { .. }));
    }
}
