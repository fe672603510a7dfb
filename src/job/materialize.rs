use std::io::{self, Write as _};
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::foundation::error::{WorkerError, WorkerResult};
use crate::job::layout::ScratchLayout;

/// Owner-read/write only. Materialized markup is untrusted and must never be executable.
#[cfg(unix)]
pub const SCRATCH_MODE: u32 = 0o600;

/// A fully written job source on scratch storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchJob {
    /// Materialized source file.
    pub source: PathBuf,
    /// Conventional location of the compiler's artifact for this job.
    pub artifact: PathBuf,
    /// Directory the compiler writes into.
    pub output_dir: PathBuf,
    /// Job base name.
    pub job_name: String,
    /// Size of the materialized source.
    pub bytes: usize,
}

/// Writes request payloads into the scratch slot.
#[derive(Clone, Debug)]
pub struct Materializer {
    layout: ScratchLayout,
}

impl Materializer {
    /// Materializer writing into `layout`.
    pub fn new(layout: ScratchLayout) -> Self {
        Self { layout }
    }

    /// The scratch slot in use.
    pub fn layout(&self) -> &ScratchLayout {
        &self.layout
    }

    /// Persist `payload` as the current job.
    ///
    /// The source is written to a sibling temporary file, synced, restricted to
    /// [`SCRATCH_MODE`] and then renamed over the fixed path. On any error the fixed path
    /// still holds the previous job (or nothing), never a partial write.
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub fn materialize(&self, payload: &[u8]) -> WorkerResult<ScratchJob> {
        let source = self.layout.source_path();
        let artifact = self.layout.artifact_path();

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}-", self.layout.job_name))
            .tempfile_in(&self.layout.dir)
            .map_err(|e| {
                WorkerError::materialize(format!(
                    "failed to create temporary file in '{}': {e}",
                    self.layout.dir.display()
                ))
            })?;

        write_restricted(&mut tmp, payload).map_err(|e| {
            WorkerError::materialize(format!(
                "failed to write job source ({} bytes): {e}",
                payload.len()
            ))
        })?;

        tmp.persist(&source).map_err(|e| {
            WorkerError::materialize(format!(
                "failed to move job source into '{}': {}",
                source.display(),
                e.error
            ))
        })?;

        // A compiler that exits 0 without writing output must not pick up the last job's artifact.
        match std::fs::remove_file(&artifact) {
            Ok(()) => tracing::debug!(artifact = %artifact.display(), "removed stale artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WorkerError::materialize(format!(
                    "failed to clear stale artifact '{}': {e}",
                    artifact.display()
                )));
            }
        }

        Ok(ScratchJob {
            source,
            artifact,
            output_dir: self.layout.output_dir().to_path_buf(),
            job_name: self.layout.job_name.clone(),
            bytes: payload.len(),
        })
    }
}

fn write_restricted(tmp: &mut NamedTempFile, payload: &[u8]) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(SCRATCH_MODE))?;
    }
    tmp.write_all(payload)?;
    tmp.flush()?;
    tmp.as_file().sync_all()
}

#[cfg(test)]
#[path = "../../tests/unit/job/materialize.rs"]
mod tests;
