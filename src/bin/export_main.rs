//! Export trained weights to a portable inference format.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use yolo_trainer::{ExportFormat, RunId, UltralyticsCli, init_logger, load_config, run_export};

#[derive(Parser)]
#[command(name = "export_main", about = "Export a trained checkpoint (ONNX by default)")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training run to export (defaults to the latest run)
    #[arg(long)]
    run: Option<RunId>,

    /// Explicit checkpoint
    #[arg(long)]
    model: Option<PathBuf>,

    /// onnx, torchscript, openvino, engine or coreml
    #[arg(long)]
    format: Option<ExportFormat>,

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

    let mut export = config.export;
    if let Some(run) = args.run {
        export.select_run(run);
    }
    if let Some(model) = args.model {
        export.model = Some(project_root.join(model));
    }
    if let Some(format) = args.format {
        export.format = format;
    }

    let backend = UltralyticsCli::from(&config.backend);
    let artifact = run_export(&backend, &config.runs, &export).context("Failed to export model")?;

    println!("{}", artifact.display());
    Ok(())
}
