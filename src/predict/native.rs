use std::path::{Path, PathBuf};
use ultralytics_inference as ul;

use crate::annotate::annotate_image;
use crate::error::{AppError, Result};

use super::{Detection, PredictArgs};

impl TryFrom<&PredictArgs> for ul::InferenceConfig {
    type Error = AppError;

    fn try_from(args: &PredictArgs) -> std::result::Result<Self, Self::Error> {
        let mut config = Self::new()
            .with_confidence(args.conf)
            .with_iou(args.iou)
            .with_half(args.half)
            .with_max_det(args.max_det)
            .with_batch(1);

        if let Some(sz) = args.imgsz {
            config = config.with_imgsz(sz as usize, sz as usize);
        }

        if let Some(ref device_str) = args.device {
            let device: ul::Device = device_str
                .parse()
                .map_err(|_| AppError::InvalidDevice(device_str.clone()))?;
            config = config.with_device(device);
        }

        Ok(config)
    }
}

/// Flatten the toolkit's box tensors into plain detections.
fn to_detections(result: &ul::Results) -> Vec<Detection> {
    let Some(boxes) = result.boxes.as_ref() else {
        return Vec::new();
    };
    let xyxy = boxes.xyxy();
    let conf = boxes.conf();
    let cls = boxes.cls();

    (0..boxes.len())
        .map(|i| {
            let class_id = cls[i] as usize;
            Detection {
                class_id,
                name: result
                    .names
                    .get(&class_id)
                    .cloned()
                    .unwrap_or_else(|| "object".to_string()),
                confidence: conf[i],
                xyxy: [xyxy[[i, 0]], xyxy[[i, 1]], xyxy[[i, 2]], xyxy[[i, 3]]],
            }
        })
        .collect()
}

/// `{dir}/{source stem}.png`
fn annotated_path(dir: &Path, source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    dir.join(format!("{stem}.png"))
}

/// Run an exported ONNX model in-process on one image.
pub fn predict_onnx(model_path: &Path, args: &PredictArgs) -> Result<Vec<Detection>> {
    let config: ul::InferenceConfig = args.try_into()?;
    let mut model = ul::YOLOModel::load_with_config(model_path, config)
        .map_err(|e| AppError::ModelLoad(e.to_string()))?;

    let image = image::open(&args.source)
        .map_err(|e| AppError::ImageLoad(format!("{:?}: {}", args.source, e)))?;

    let results = model
        .predict_image(&image, args.source.to_string_lossy().into_owned())
        .map_err(|e| AppError::Inference(e.to_string()))?;
    let result = results
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Inference(format!("no results for {:?}", args.source)))?;

    let detections = to_detections(&result);

    if let Some(dir) = &args.save_dir {
        let annotated = annotate_image(&image, &detections, &args.annotate_cfg)?;
        std::fs::create_dir_all(dir)?;
        let save_path = annotated_path(dir, &args.source);
        annotated
            .save(&save_path)
            .map_err(|e| AppError::ImageLoad(format!("saving {save_path:?}: {e}")))?;
        tracing::info!("Annotated image saved to {:?}", save_path);
    }

    Ok(detections)
}
