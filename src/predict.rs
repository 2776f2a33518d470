// -- submodules
mod native;

pub use native::predict_onnx;

// -- external imports
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use strum::{Display, EnumString, VariantNames};

use crate::annotate::AnnotateConfigs;
use crate::backend::{DetectorBackend, PredictRequest};
use crate::error::{AppError, Result};
use crate::runs::{RunId, RunsLayout, resolve_checkpoint};

// -- enums

/// Where prediction runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum PredictEngine {
    /// `native` for `.onnx` checkpoints, `toolkit` otherwise
    #[default]
    Auto,
    /// In-process ONNX inference
    Native,
    /// Delegate to the detection toolkit
    Toolkit,
}

impl PredictEngine {
    /// Concrete engine for `checkpoint`
    pub fn resolve(self, checkpoint: &Path) -> Self {
        match self {
            Self::Auto => {
                let is_onnx = checkpoint
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));
                if is_onnx { Self::Native } else { Self::Toolkit }
            }
            other => other,
        }
    }
}

/// Custom deserializer with helpful error message
pub fn deserialize_engine<'de, D>(deserializer: D) -> Result<PredictEngine, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    PredictEngine::from_str(&value.to_lowercase()).map_err(|_| {
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", PredictEngine::VARIANTS.join(", ")).as_str(),
        )
    })
}

// -- structs

/// One detected object
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub name: String,
    pub confidence: f32,
    /// Box corners in pixels: x1, y1, x2, y2
    pub xyxy: [f32; 4],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictArgs {
    /// Explicit checkpoint (`.pt` or `.onnx`); overrides `run`
    pub model: Option<PathBuf>,

    /// Training run whose `best.pt` to load
    pub run: Option<RunId>,

    /// Test image
    pub source: PathBuf,

    /// Confidence threshold
    pub conf: f32,

    /// IoU threshold for NMS
    pub iou: f32,

    /// Maximum number of detections
    pub max_det: usize,

    /// Inference image size
    pub imgsz: Option<u32>,

    /// Use FP16 half-precision inference
    pub half: bool,

    /// Device to use (cpu, 0, cuda:0, mps, ...)
    pub device: Option<String>,

    /// Show the result and wait for a key press before exiting
    pub show: bool,

    /// Directory to save annotated results
    pub save_dir: Option<PathBuf>,

    #[serde(deserialize_with = "deserialize_engine")]
    pub engine: PredictEngine,

    /// Annotate configurations (native engine)
    pub annotate_cfg: AnnotateConfigs,
}

impl Default for PredictArgs {
    fn default() -> Self {
        Self {
            model: None,
            run: None,
            source: PathBuf::from("test_img.png"),
            conf: 0.25,
            iou: 0.45,
            max_det: 300,
            imgsz: None,
            half: false,
            device: None,
            show: true,
            save_dir: None,
            engine: PredictEngine::Auto,
            annotate_cfg: Default::default(),
        }
    }
}

impl PredictArgs {
    /// Predict with `run`'s weights, dropping any explicit `model` so the run is used.
    pub fn select_run(&mut self, run: RunId) {
        if let Some(model) = self.model.take() {
            tracing::info!("Run {} replaces configured model {:?}", run, model);
        }
        self.run = Some(run);
    }

    fn request_for(&self, model: PathBuf) -> PredictRequest {
        PredictRequest {
            model,
            source: self.source.clone(),
            conf: self.conf,
            iou: self.iou,
            max_det: self.max_det,
            imgsz: self.imgsz,
            half: self.half,
            device: self.device.clone(),
            show: self.show,
            save_dir: self.save_dir.clone(),
        }
    }
}

// -- public API

/// Predict on the single configured image with a trained checkpoint.
///
/// Returns the detections when running natively; the toolkit engine reports its own
/// output and returns `None`. Does not wait for a key press, see [`wait_for_close`].
pub fn run_prediction(
    backend: &dyn DetectorBackend,
    layout: &RunsLayout,
    args: &PredictArgs,
) -> Result<Option<Vec<Detection>>> {
    let start_time = Instant::now();

    if !args.source.is_file() {
        return Err(AppError::ImageLoad(format!(
            "source image not found: {:?}",
            args.source
        )));
    }
    let checkpoint = resolve_checkpoint(layout, args.model.as_deref(), args.run.as_ref())?;
    let engine = args.engine.resolve(&checkpoint.path);

    tracing::info!("[Model]: {:?} ({} engine)", checkpoint.path, engine);
    tracing::info!("[Source]: {:?}", args.source);

    let detections = match engine {
        PredictEngine::Native => {
            let detections = predict_onnx(&checkpoint.path, args)?;
            tracing::info!("{} detections", detections.len());
            for det in &detections {
                tracing::info!(
                    "{} {:.2} [{:.1}, {:.1}, {:.1}, {:.1}]",
                    det.name,
                    det.confidence,
                    det.xyxy[0],
                    det.xyxy[1],
                    det.xyxy[2],
                    det.xyxy[3]
                );
            }
            Some(detections)
        }
        PredictEngine::Toolkit | PredictEngine::Auto => {
            backend.predict(&args.request_for(checkpoint.path))?;
            None
        }
    };

    tracing::info!("Total prediction time: {:.3?}", start_time.elapsed());
    Ok(detections)
}

/// Block until the operator presses enter.
pub fn wait_for_close(input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
    write!(output, "press enter to close window")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use std::fs;
    use tempfile::TempDir;

    fn setup(temp_dir: &TempDir) -> (RunsLayout, PathBuf, PathBuf) {
        let layout = RunsLayout::new(temp_dir.path().join("runs/detect"));
        let run: RunId = "train".parse().unwrap();
        let weights = layout.best_weights(&run);
        fs::create_dir_all(weights.parent().unwrap()).unwrap();
        fs::write(&weights, b"weights").unwrap();
        let image = temp_dir.path().join("test_img.png");
        fs::write(&image, b"png").unwrap();
        (layout, weights, image)
    }

    #[test]
    fn test_engine_resolution() {
        let onnx = Path::new("best.onnx");
        let pt = Path::new("best.pt");
        assert_eq!(PredictEngine::Auto.resolve(onnx), PredictEngine::Native);
        assert_eq!(PredictEngine::Auto.resolve(pt), PredictEngine::Toolkit);
        assert_eq!(PredictEngine::Toolkit.resolve(onnx), PredictEngine::Toolkit);
    }

    #[test]
    fn test_toolkit_prediction_uses_fixed_threshold_and_one_image() {
        let temp_dir = TempDir::new().unwrap();
        let (layout, weights, image) = setup(&temp_dir);
        let backend = RecordingBackend::default();
        let args = PredictArgs {
            source: image.clone(),
            ..Default::default()
        };

        let out = run_prediction(&backend, &layout, &args).unwrap();
        assert!(out.is_none());

        let calls = backend.predict_calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].conf, 0.25);
        assert_eq!(calls[0].source, image);
        assert_eq!(calls[0].model, weights);
        assert!(calls[0].show);
    }

    #[test]
    fn test_missing_image_fails_before_backend() {
        let temp_dir = TempDir::new().unwrap();
        let (layout, _, _) = setup(&temp_dir);
        let backend = RecordingBackend::default();
        let args = PredictArgs {
            source: temp_dir.path().join("absent.png"),
            ..Default::default()
        };

        assert!(matches!(
            run_prediction(&backend, &layout, &args),
            Err(AppError::ImageLoad(_))
        ));
        assert!(backend.predict_calls.borrow().is_empty());
    }

    #[test]
    fn test_selected_run_overrides_configured_model() {
        let temp_dir = TempDir::new().unwrap();
        let (layout, weights, image) = setup(&temp_dir);
        let backend = RecordingBackend::default();
        let mut args = PredictArgs {
            model: Some(temp_dir.path().join("elsewhere/best.pt")),
            source: image,
            ..Default::default()
        };

        args.select_run("train".parse().unwrap());
        assert!(args.model.is_none());

        run_prediction(&backend, &layout, &args).unwrap();
        assert_eq!(backend.predict_calls.borrow()[0].model, weights);
    }

    #[test]
    fn test_missing_checkpoint_fails() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("test_img.png");
        fs::write(&image, b"png").unwrap();
        let layout = RunsLayout::new(temp_dir.path().join("runs/detect"));
        let args = PredictArgs {
            source: image,
            ..Default::default()
        };

        let err = run_prediction(&RecordingBackend::default(), &layout, &args).unwrap_err();
        assert!(matches!(err, AppError::CheckpointNotFound(_)));
    }

    #[test]
    fn test_predict_args_from_toml() {
        let args: PredictArgs = toml::from_str(
            r#"
source = "boards/a.png"
engine = "Native"
show = false

[annotate_cfg]
show_conf = false
"#,
        )
        .unwrap();
        assert_eq!(args.conf, 0.25);
        assert_eq!(args.engine, PredictEngine::Native);
        assert!(!args.show);
        assert!(!args.annotate_cfg.show_conf);

        assert!(toml::from_str::<PredictArgs>("engine = \"gpu\"").is_err());
    }

    #[test]
    fn test_wait_for_close_reads_one_line() {
        let mut input = std::io::Cursor::new(b"\nignored\n".to_vec());
        let mut output = Vec::new();
        wait_for_close(&mut input, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "press enter to close window");
        assert_eq!(input.position(), 1);
    }
}
