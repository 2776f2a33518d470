// -- submodules
mod archive;
mod client;
mod credentials;
mod lease;
mod manifest;

pub use archive::extract_zip;
pub use client::{DEFAULT_API_URL, ExportPolling, RoboflowClient, VersionInfo};
pub use credentials::RoboflowCredentials;
pub use lease::DatasetLease;
pub use manifest::{ClassNames, DatasetManifest, MANIFEST_FILE};

// -- external imports
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

const ARCHIVE_FILE: &str = "roboflow.zip";

// -- config

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset host API root
    pub api_url: String,

    /// Annotation layout to request
    pub format: String,

    /// Parent directory for downloaded versions
    pub download_root: PathBuf,

    /// Version to fetch; the first listed version when unset
    pub version: Option<u32>,

    /// Download again even if the version is already on disk
    pub overwrite: bool,

    /// Keep the dataset directory after a successful training run
    pub keep: bool,

    /// Seconds between checks while the host generates an export
    pub export_poll_secs: u64,

    /// Give up on export generation after this many seconds
    pub export_timeout_secs: u64,
}

impl DatasetConfig {
    pub fn export_polling(&self) -> ExportPolling {
        ExportPolling {
            interval: Duration::from_secs(self.export_poll_secs),
            deadline: Duration::from_secs(self.export_timeout_secs),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            format: "yolov8".to_string(),
            download_root: PathBuf::from("datasets"),
            version: None,
            overwrite: false,
            keep: false,
            export_poll_secs: 5,
            export_timeout_secs: 600,
        }
    }
}

// -- dataset

/// A dataset version on local disk with its parsed manifest
#[derive(Debug, Clone)]
pub struct DownloadedDataset {
    pub location: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: DatasetManifest,
    pub version: Option<u32>,
}

impl DownloadedDataset {
    /// Open an existing manifest, e.g. one passed on the command line.
    pub fn from_manifest(manifest_path: &Path) -> Result<Self> {
        let manifest = DatasetManifest::from_path(manifest_path)?;
        let location = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            location,
            manifest_path: manifest_path.to_path_buf(),
            manifest,
            version: None,
        })
    }

    /// Hand the directory to a lease that removes it on release.
    pub fn into_lease(self, keep: bool) -> DatasetLease {
        DatasetLease::new(self.location, self.manifest_path, keep)
    }
}

/// Pick the version to download from the host's list.
fn select_version(versions: &[VersionInfo], wanted: Option<u32>) -> Result<u32> {
    match wanted {
        Some(v) => versions
            .iter()
            .find(|info| info.number() == Some(v))
            .map(|_| v)
            .ok_or_else(|| AppError::Dataset(format!("project has no version {v}"))),
        None => versions
            .first()
            .ok_or_else(|| AppError::Dataset("project has no versions".to_string()))?
            .number()
            .ok_or_else(|| AppError::Dataset(format!("unparsable version id {:?}", versions[0].id))),
    }
}

fn staging_dir(location: &Path) -> PathBuf {
    let mut name = location.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    location.with_file_name(name)
}

/// Download a dataset version and parse its manifest.
///
/// # Errors
///
/// Any remote, archive or manifest failure is returned as is; nothing is retried.
pub fn fetch_dataset(client: &RoboflowClient, config: &DatasetConfig) -> Result<DownloadedDataset> {
    let versions = client.list_versions()?;
    let version = select_version(&versions, config.version)?;
    tracing::info!("Version ID: {}", version);

    let location = config
        .download_root
        .join(format!("{}-{}", client.credentials().project, version));
    let manifest_path = location.join(MANIFEST_FILE);

    if manifest_path.is_file() && !config.overwrite {
        tracing::info!("Dataset already present at {:?}, skipping download", location);
    } else {
        // Download and extract beside the final location; only a complete
        // extraction is moved into place.
        let staging = staging_dir(&location);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let link = client.export_link(version, &config.format)?;
        let archive_path = staging.join(ARCHIVE_FILE);
        client.download(&link, &archive_path)?;
        let files = extract_zip(&archive_path, &staging)?;
        std::fs::remove_file(&archive_path)?;

        if location.exists() {
            std::fs::remove_dir_all(&location)?;
        }
        std::fs::rename(&staging, &location)?;
        tracing::info!("Extracted {} files into {:?}", files, location);
    }

    if !manifest_path.is_file() {
        return Err(AppError::Dataset(format!(
            "downloaded dataset has no {MANIFEST_FILE} at {manifest_path:?}"
        )));
    }

    let mut manifest = DatasetManifest::from_path(&manifest_path)?;
    if manifest.normalize_splits(&location) {
        manifest.save(&manifest_path)?;
    }
    tracing::info!("Contents of {}: {:?}", MANIFEST_FILE, manifest);

    Ok(DownloadedDataset {
        location,
        manifest_path,
        manifest,
        version: Some(version),
    })
}
