//! Run trained weights on a single test image.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use yolo_trainer::{
    PredictEngine, RunId, UltralyticsCli, init_logger, load_config, run_prediction, wait_for_close,
};

#[derive(Parser)]
#[command(name = "predict_main", about = "Predict on one image with a trained checkpoint")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training run to load weights from (defaults to the latest run)
    #[arg(long)]
    run: Option<RunId>,

    /// Explicit checkpoint (.pt or .onnx)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Test image
    #[arg(long)]
    source: Option<PathBuf>,

    /// auto, native or toolkit
    #[arg(long)]
    engine: Option<PredictEngine>,

    /// Do not show the result or wait for enter
    #[arg(long)]
    no_show: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let project_root = std::env::current_dir().context("Failed to read working directory")?;
    let config = load_config(args.config.as_deref(), &project_root)
        .context("Failed to load config")?;

    let mut predict = config.predict;
    if let Some(run) = args.run {
        predict.select_run(run);
    }
    if let Some(model) = args.model {
        predict.model = Some(project_root.join(model));
    }
    if let Some(source) = args.source {
        predict.source = project_root.join(source);
    }
    if let Some(engine) = args.engine {
        predict.engine = engine;
    }
    if args.no_show {
        predict.show = false;
    }

    let backend = UltralyticsCli::from(&config.backend);
    let detections = run_prediction(&backend, &config.runs, &predict)
        .with_context(|| format!("Failed to run prediction on {:?}", predict.source))?;

    if let Some(detections) = detections {
        tracing::info!("Total detections returned: {}", detections.len());
    }

    if predict.show {
        let stdin = std::io::stdin();
        wait_for_close(&mut stdin.lock(), &mut std::io::stdout())?;
    }
    Ok(())
}
