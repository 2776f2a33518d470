use std::path::{Path, PathBuf};

use crate::error::Result;

/// Scoped owner of a downloaded dataset directory.
///
/// `release` deletes the directory (unless kept). A lease dropped without being
/// released leaves the directory in place and says so in the log.
#[derive(Debug)]
pub struct DatasetLease {
    root: PathBuf,
    manifest_path: PathBuf,
    keep: bool,
    released: bool,
}

impl DatasetLease {
    pub fn new(root: PathBuf, manifest_path: PathBuf, keep: bool) -> Self {
        Self {
            root,
            manifest_path,
            keep,
            released: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Give the directory back: remove it unless the lease was created with `keep`.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        if self.keep {
            tracing::info!("Keeping dataset at {:?}", self.root);
            return Ok(());
        }
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
            tracing::info!("Removed dataset directory {:?}", self.root);
        }
        Ok(())
    }
}

impl Drop for DatasetLease {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                "Dataset directory retained after failure: {:?}",
                self.root
            );
        }
    }
}
