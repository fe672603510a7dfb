use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{WorkerError, WorkerResult};

/// Fixed on-disk slot for the single in-flight job.
///
/// Every path the pipeline touches is derived from this value, so two layouts with
/// different `dir`s never interfere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScratchLayout {
    /// Directory holding the source and the compiler's output.
    pub dir: PathBuf,
    /// Base name shared by the source and the intermediate artifact.
    pub job_name: String,
    /// Extension of the materialized source.
    pub source_ext: String,
    /// Extension of the artifact the compiler produces.
    pub artifact_ext: String,
}

impl Default for ScratchLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp"),
            job_name: "job".to_string(),
            source_ext: "tex".to_string(),
            artifact_ext: "pdf".to_string(),
        }
    }
}

impl ScratchLayout {
    /// Layout rooted at `dir` with the default names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Path of the materialized source.
    pub fn source_path(&self) -> PathBuf {
        self.dir.join(file_name(&self.job_name, &self.source_ext))
    }

    /// Path where the compiler is expected to leave its artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(file_name(&self.job_name, &self.artifact_ext))
    }

    /// Output directory handed to the compiler.
    pub fn output_dir(&self) -> &Path {
        &self.dir
    }

    /// Reject names that would escape `dir` or collide.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(WorkerError::config("scratch dir must not be empty"));
        }
        if self.job_name.is_empty() {
            return Err(WorkerError::config("scratch job_name must not be empty"));
        }
        for (what, value) in [
            ("job_name", &self.job_name),
            ("source_ext", &self.source_ext),
            ("artifact_ext", &self.artifact_ext),
        ] {
            if value.contains(['/', '\\']) || value == ".." {
                return Err(WorkerError::config(format!(
                    "scratch {what} must be a plain name, got '{value}'"
                )));
            }
        }
        if self.source_ext == self.artifact_ext {
            return Err(WorkerError::config(
                "scratch source_ext and artifact_ext must differ",
            ));
        }
        Ok(())
    }
}

fn file_name(stem: &str, ext: &str) -> String {
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{ext}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/layout.rs"]
mod tests;
