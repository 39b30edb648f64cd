//! On-demand zip of whatever files a job has completed so far.

use std::fs::File;
use std::io::{ErrorKind, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::PlaylistError;
use super::file_store::FileStore;
use super::models::CompletedFile;
use super::naming;
use super::registry::JobRegistry;
use crate::server::metrics;

/// A built archive, spooled to an unnamed temporary file under the work
/// directory. The file is rewound and disappears once dropped.
#[derive(Debug)]
pub struct Archive {
    pub filename: String,
    pub file: File,
    pub size_bytes: u64,
    pub entries: usize,
}

pub struct ArchiveBuilder {
    registry: Arc<JobRegistry>,
    file_store: Arc<FileStore>,
}

impl ArchiveBuilder {
    pub fn new(registry: Arc<JobRegistry>, file_store: Arc<FileStore>) -> Self {
        Self {
            registry,
            file_store,
        }
    }

    /// Package the files completed at call time.
    ///
    /// Tracks still in progress are not waited for. An archive with no
    /// entries is valid.
    pub async fn build_archive(&self, job_id: &str) -> Result<Archive, PlaylistError> {
        let job = self.registry.get(job_id)?;
        let filename = naming::archive_filename(job.playlist_title.as_deref());

        let mut files = job.files;
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        let entries = files.len();

        let spool_dir = self.file_store.root().to_path_buf();
        let (file, size_bytes) = tokio::task::spawn_blocking(move || write_zip(spool_dir, &files))
            .await
            .map_err(|e| PlaylistError::Archive(format!("Archive task failed: {}", e)))??;

        debug!(
            "Built archive {} for job {}: {} entries, {} bytes",
            filename, job_id, entries, size_bytes
        );
        metrics::record_archive_built();

        Ok(Archive {
            filename,
            file,
            size_bytes,
            entries,
        })
    }
}

fn write_zip(spool_dir: PathBuf, files: &[CompletedFile]) -> Result<(File, u64), PlaylistError> {
    let spool = tempfile::tempfile_in(&spool_dir)?;
    let mut zip = ZipWriter::new(spool);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        let mut source = match File::open(&file.path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PlaylistError::FileGone(file.filename.clone()))
            }
            Err(e) => {
                error!("Failed to open {}: {}", file.path.display(), e);
                return Err(PlaylistError::Io(e));
            }
        };

        zip.start_file(file.filename.as_str(), options)
            .map_err(|e| PlaylistError::Archive(format!("Failed to add zip entry: {e}")))?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let mut spool = zip
        .finish()
        .map_err(|e| PlaylistError::Archive(format!("Failed to finish zip: {e}")))?;
    let size_bytes = spool.seek(SeekFrom::End(0))?;
    spool.rewind()?;

    Ok((spool, size_bytes))
}
