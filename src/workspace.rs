//! Temporary artifact bookkeeping.
//!
//! Every input download and conversion output lives in one working directory
//! as `temp_<id>.<ext>`. Names are unique per allocation, so concurrent calls
//! never need to coordinate. Nothing here deletes files unless asked.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// The directory is not created until the first allocation.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh path `<dir>/temp_<id>.<extension>`.
    pub async fn allocate(&self, extension: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(self.dir.join(format!("{}.{}", fresh_stem(), extension)))
    }

    /// Reserve a fresh extension-less path `<dir>/temp_<id>`.
    pub async fn allocate_base(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(self.dir.join(fresh_stem()))
    }

    /// Best-effort removal. Failures are logged and skipped.
    ///
    /// Returns how many files were actually removed.
    pub async fn delete<P: AsRef<Path>>(&self, paths: &[P]) -> usize {
        let mut removed = 0;
        for path in paths {
            let path = path.as_ref();
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    debug!("Deleted {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
            }
        }
        removed
    }
}

fn fresh_stem() -> String {
    format!("temp_{}", Uuid::new_v4().simple())
}
