//! On-disk storage for job files.
//!
//! Layout: `<root>/<job_id>/files/<filename>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory.
    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join(job_id)
    }

    pub fn files_dir(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join("files")
    }

    pub async fn create_job_dir(&self, job_id: &str) -> std::io::Result<PathBuf> {
        let dir = self.files_dir(job_id);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Write a track file and return its path and size.
    pub async fn save_track(
        &self,
        job_id: &str,
        filename: &str,
        data: &[u8],
    ) -> std::io::Result<(PathBuf, u64)> {
        let dir = self.create_job_dir(job_id).await?;
        let path = dir.join(filename);

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok((path, data.len() as u64))
    }

    /// Remove a job's directory. A missing directory is not an error.
    pub async fn remove_job_dir(&self, job_id: &str) -> std::io::Result<()> {
        match fs::remove_dir_all(self.job_dir(job_id)).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
