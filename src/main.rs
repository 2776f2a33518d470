//! Fetch the configured dataset version and fine-tune on it.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use yolo_trainer::{
    DownloadedDataset, RoboflowClient, RoboflowCredentials, RunId, UltralyticsCli, fetch_dataset,
    init_logger, load_config, run_training,
};

#[derive(Parser)]
#[command(name = "train_main", about = "Download a dataset and fine-tune a YOLO checkpoint")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Train on an existing data.yaml instead of downloading (the dataset is kept)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Run id for the output directory
    #[arg(long)]
    name: Option<RunId>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {:?}", path);
    }

    let project_root = std::env::current_dir().context("Failed to read working directory")?;
    let mut config = load_config(args.config.as_deref(), &project_root)
        .context("Failed to load config")?;
    if let Some(name) = args.name {
        config.train.name = Some(name);
    }

    let lease = match args.data {
        Some(ref manifest) => DownloadedDataset::from_manifest(manifest)
            .with_context(|| format!("Failed to read manifest: {:?}", manifest))?
            .into_lease(true),
        None => {
            let credentials = RoboflowCredentials::from_env()?;
            let client = RoboflowClient::new(&config.dataset.api_url, credentials)?
                .with_export_polling(config.dataset.export_polling());
            fetch_dataset(&client, &config.dataset)
                .context("Failed to fetch dataset")?
                .into_lease(config.dataset.keep)
        }
    };

    let backend = UltralyticsCli::from(&config.backend);
    let outcome = run_training(&backend, &config.runs, &config.train, lease)
        .context("Training failed")?;

    tracing::info!(
        "Run {} finished after {} epochs",
        outcome.record.run_id,
        outcome.epochs.len()
    );
    Ok(())
}
