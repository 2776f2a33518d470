use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;

use super::credentials::RoboflowCredentials;
use crate::error::{AppError, Result};
use crate::progress_bar::download_bar_style;

pub const DEFAULT_API_URL: &str = "https://api.roboflow.com";

// -- responses

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    #[serde(default)]
    versions: Vec<VersionInfo>,
}

/// One dataset version as listed by the host
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// `workspace/project/<n>`
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl VersionInfo {
    /// Version number, the last segment of `id`
    pub fn number(&self) -> Option<u32> {
        self.id.rsplit('/').next()?.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct ExportInfo {
    #[serde(default)]
    export: Option<ExportLink>,
    /// Present while the host is still generating the export
    #[serde(default)]
    progress: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExportLink {
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { message: String },
    Text(String),
}

// -- client

/// How long to wait for the host to generate an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPolling {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for ExportPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            deadline: Duration::from_secs(600),
        }
    }
}

/// Blocking client for the Roboflow REST API.
pub struct RoboflowClient {
    base_url: String,
    credentials: RoboflowCredentials,
    client: reqwest::blocking::Client,
    polling: ExportPolling,
}

impl RoboflowClient {
    /// # Errors
    ///
    /// Returns `AppError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: RoboflowCredentials) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
            polling: ExportPolling::default(),
        })
    }

    pub fn with_export_polling(mut self, polling: ExportPolling) -> Self {
        self.polling = polling;
        self
    }

    pub fn credentials(&self) -> &RoboflowCredentials {
        &self.credentials
    }

    /// Versions of the configured project, in the order the host lists them.
    pub fn list_versions(&self) -> Result<Vec<VersionInfo>> {
        let url = format!(
            "{}/{}/{}",
            self.base_url, self.credentials.workspace, self.credentials.project
        );
        let info: ProjectInfo = self.get_json(&url)?;
        Ok(info.versions)
    }

    /// Link to the zipped export of `version` in `format` (e.g. `yolov8`).
    ///
    /// Requesting a format the host has not built yet starts the export; the
    /// request is repeated every `interval` until a link appears or `deadline` passes.
    pub fn export_link(&self, version: u32, format: &str) -> Result<String> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.base_url, self.credentials.workspace, self.credentials.project, version, format
        );
        let started = Instant::now();

        loop {
            let info: ExportInfo = self.get_json(&url)?;
            if let Some(link) = info.export.and_then(|e| e.link) {
                return Ok(link);
            }
            let Some(progress) = info.progress else {
                return Err(AppError::Dataset(format!(
                    "host returned no export link for version {version} in format {format:?}"
                )));
            };
            if started.elapsed() + self.polling.interval > self.polling.deadline {
                return Err(AppError::Dataset(format!(
                    "export of version {version} in format {format:?} not ready after {:?}",
                    self.polling.deadline
                )));
            }

            tracing::info!(
                "Generating {} export of version {}: {:.0}%",
                format,
                version,
                progress * 100.0
            );
            std::thread::sleep(self.polling.interval);
        }
    }

    /// Stream `link` into `dest` with a byte progress bar.
    pub fn download(&self, link: &str, dest: &Path) -> Result<u64> {
        let response = self.client.get(link).send()?;
        let response = check_status(response)?;

        let bar = match response.content_length() {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::no_length(),
        }
        .with_style(download_bar_style())
        .with_message("Downloading dataset");

        let mut file = File::create(dest)?;
        let written = std::io::copy(&mut bar.wrap_read(response), &mut file)?;
        bar.finish_with_message("Downloaded");
        tracing::debug!("Wrote {} bytes to {:?}", written, dest);
        Ok(written)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(30))
            .query(&[("api_key", self.credentials.api_key.as_str())])
            .send()?;
        Ok(check_status(response)?.json()?)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            error: ErrorDetail::Message { message } | ErrorDetail::Text(message),
        }) => message,
        Err(_) if body.is_empty() => "no response body".to_string(),
        Err(_) => body,
    };
    Err(AppError::Remote { status, message })
}
