use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString, VariantNames};

use crate::backend::{DetectorBackend, ExportRequest};
use crate::error::{AppError, Result};
use crate::runs::{RunId, RunsLayout, resolve_checkpoint};

// -- enums

/// Portable formats the toolkit can export to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Onnx,
    TorchScript,
    OpenVino,
    /// TensorRT
    Engine,
    CoreMl,
}

impl ExportFormat {
    /// Where the toolkit places the artifact for `checkpoint`
    pub fn artifact_path(self, checkpoint: &Path) -> PathBuf {
        let stem = checkpoint
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        let dir = checkpoint.parent().unwrap_or_else(|| Path::new(""));
        match self {
            Self::Onnx => dir.join(format!("{stem}.onnx")),
            Self::TorchScript => dir.join(format!("{stem}.torchscript")),
            Self::OpenVino => dir.join(format!("{stem}_openvino_model")),
            Self::Engine => dir.join(format!("{stem}.engine")),
            Self::CoreMl => dir.join(format!("{stem}.mlpackage")),
        }
    }
}

/// Custom deserializer with helpful error message
pub fn deserialize_export_format<'de, D>(deserializer: D) -> Result<ExportFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    ExportFormat::from_str(&value.to_lowercase()).map_err(|_| {
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", ExportFormat::VARIANTS.join(", ")).as_str(),
        )
    })
}

// -- args

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExportArgs {
    /// Explicit checkpoint; overrides `run`
    pub model: Option<PathBuf>,

    /// Training run whose `best.pt` to export
    pub run: Option<RunId>,

    #[serde(deserialize_with = "deserialize_export_format")]
    pub format: ExportFormat,

    pub imgsz: Option<u32>,
    pub half: bool,
    pub dynamic: bool,
    pub simplify: bool,
    pub opset: Option<u32>,
}

impl ExportArgs {
    /// Export `run`'s weights, dropping any explicit `model` so the run is used.
    pub fn select_run(&mut self, run: RunId) {
        if let Some(model) = self.model.take() {
            tracing::info!("Run {} replaces configured model {:?}", run, model);
        }
        self.run = Some(run);
    }
}

/// Export a trained checkpoint and return the artifact path.
///
/// # Errors
///
/// Fails if no checkpoint resolves, the toolkit fails, or the artifact is not where the
/// toolkit's convention puts it.
pub fn run_export(
    backend: &dyn DetectorBackend,
    layout: &RunsLayout,
    args: &ExportArgs,
) -> Result<PathBuf> {
    let checkpoint = resolve_checkpoint(layout, args.model.as_deref(), args.run.as_ref())?;
    tracing::info!("Exporting {:?} to {}", checkpoint.path, args.format);

    let request = ExportRequest {
        model: checkpoint.path.clone(),
        format: args.format,
        imgsz: args.imgsz,
        half: args.half,
        dynamic: args.dynamic,
        simplify: args.simplify,
        opset: args.opset,
    };
    backend.export(&request)?;

    let artifact = args.format.artifact_path(&checkpoint.path);
    if !artifact.exists() {
        return Err(AppError::Export(format!(
            "expected {} artifact at {:?}",
            args.format, artifact
        )));
    }
    tracing::info!("Exported artifact: {:?}", artifact);
    Ok(artifact)
}
