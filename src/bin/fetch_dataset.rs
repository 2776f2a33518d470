//! Download the configured dataset version and keep it on disk.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use yolo_trainer::{RoboflowClient, RoboflowCredentials, fetch_dataset, init_logger, load_config};

#[derive(Parser)]
#[command(name = "fetch_dataset", about = "Download a labeled dataset version")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Version to fetch instead of the first listed one
    #[arg(long)]
    version: Option<u32>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);
    dotenvy::dotenv().ok();

    let project_root = std::env::current_dir().context("Failed to read working directory")?;
    let mut config = load_config(args.config.as_deref(), &project_root)
        .context("Failed to load config")?;
    if args.version.is_some() {
        config.dataset.version = args.version;
    }

    let credentials = RoboflowCredentials::from_env()?;
    let client = RoboflowClient::new(&config.dataset.api_url, credentials)?
        .with_export_polling(config.dataset.export_polling());
    let dataset = fetch_dataset(&client, &config.dataset).context("Failed to fetch dataset")?;

    println!("{}", dataset.manifest_path.display());
    Ok(())
}
