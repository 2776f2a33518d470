use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// File name of the manifest inside a downloaded dataset
pub const MANIFEST_FILE: &str = "data.yaml";

const SPLITS: [&str; 3] = ["train", "val", "test"];

/// Class names, either as a list or as an index → name map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

impl ClassNames {
    /// Names ordered by class index
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::List(names) => names.clone(),
            Self::Map(map) => map.values().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::List(names) => names.len(),
            Self::Map(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parsed `data.yaml` of a YOLO-layout dataset.
///
/// Unknown keys (`roboflow`, `path`, ...) are kept so that saving does not lose them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub names: ClassNames,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nc: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl DatasetManifest {
    /// Read and validate a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the file cannot be read, is not valid YAML, lacks `names`,
    /// or declares an `nc` that disagrees with `names`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_yaml::from_str(&content).map_err(|e| AppError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.names.is_empty() {
            return Err(AppError::Manifest {
                path: path.to_path_buf(),
                reason: "`names` is empty".to_string(),
            });
        }
        if let Some(nc) = self.nc
            && nc != self.names.len()
        {
            return Err(AppError::Manifest {
                path: path.to_path_buf(),
                reason: format!("`nc` is {nc} but {} names are listed", self.names.len()),
            });
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Point split paths written relative to a parent directory (`../train/images`) at
    /// the matching directory under `root`, when it exists.
    ///
    /// Returns whether anything changed.
    pub fn normalize_splits(&mut self, root: &Path) -> bool {
        let mut changed = false;
        for split in SPLITS {
            let slot = match split {
                "train" => &mut self.train,
                "val" => &mut self.val,
                _ => &mut self.test,
            };
            let Some(current) = slot.as_deref() else {
                continue;
            };
            let Some(relative) = current.strip_prefix("../") else {
                continue;
            };
            let candidate = root.join(relative);
            if candidate.is_dir() {
                *slot = Some(candidate.to_string_lossy().into_owned());
                changed = true;
            }
        }
        changed
    }

    /// Resolved directory for a split, if declared
    pub fn split_dir(&self, root: &Path, split: &str) -> Option<PathBuf> {
        let value = match split {
            "train" => self.train.as_deref(),
            "val" => self.val.as_deref(),
            "test" => self.test.as_deref(),
            _ => None,
        }?;
        let path = PathBuf::from(value);
        Some(if path.is_absolute() {
            path
        } else {
            root.join(path)
        })
    }
}
