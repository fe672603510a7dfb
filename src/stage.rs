//! External pipeline stages.
//!
//! Both stages shell out to deployment-provided executables. The traits are the seam the
//! [`crate::Worker`] drives, so tests can substitute instrumented fakes.

use std::path::{Path, PathBuf};

use crate::job::materialize::ScratchJob;

/// Shared process helpers.
pub mod command;
/// Document compiler stage.
pub mod compile;
/// Rasterizer stage.
pub mod raster;

/// Result of the compile stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileResult {
    /// The artifact exists at its conventional path.
    Compiled {
        /// Path of the intermediate artifact.
        artifact: PathBuf,
    },
    /// The compiler rejected the job or could not run; combined output.
    Failed {
        /// Compiler output, or a description of why it could not start.
        diagnostics: Vec<u8>,
    },
}

/// Result of the raster stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RasterResult {
    /// Image bytes exactly as produced.
    Rasterized {
        /// Raster image bytes.
        image: Vec<u8>,
    },
    /// The rasterizer failed; diagnostics only when the capture policy keeps them.
    Failed {
        /// Rasterizer stderr under [`raster::RasterDiagnostics::Capture`].
        diagnostics: Option<Vec<u8>>,
    },
}

/// Markup → intermediate artifact.
///
/// Failures are values, never errors: a rejected document is an ordinary outcome.
pub trait Compile {
    /// Compile the materialized `job`.
    fn compile(&self, job: &ScratchJob) -> CompileResult;
}

/// Intermediate artifact → raster image.
pub trait Rasterize {
    /// Rasterize the artifact at `artifact`.
    fn rasterize(&self, artifact: &Path) -> RasterResult;
}

impl<T: Compile + ?Sized> Compile for Box<T> {
    fn compile(&self, job: &ScratchJob) -> CompileResult {
        (**self).compile(job)
    }
}

impl<T: Rasterize + ?Sized> Rasterize for Box<T> {
    fn rasterize(&self, artifact: &Path) -> RasterResult {
        (**self).rasterize(artifact)
    }
}
