use std::io::{Read, Write};
use std::time::Instant;

use crate::config::WorkerConfig;
use crate::foundation::error::{WorkerError, WorkerResult};
use crate::job::materialize::Materializer;
use crate::proto::codec::{FIELD_SIZE, Request, read_request};
use crate::proto::emit::{Outcome, ResponseEmitter};
use crate::proto::status::Status;
use crate::stage::compile::ProcessCompiler;
use crate::stage::raster::ProcessRasterizer;
use crate::stage::{Compile, CompileResult, RasterResult, Rasterize};

/// How many requests one process serves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServeMode {
    /// Serve exactly one request, then return.
    #[default]
    SingleShot,
    /// Serve requests until the input ends cleanly on a frame boundary.
    Persistent,
}

/// Counts of what a [`Worker::serve`] call emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Requests answered with a frame.
    pub requests: u64,
    /// Frames with [`Status::OK`].
    pub succeeded: u64,
    /// Frames with [`Status::COMPILE_ERROR`].
    pub compile_failures: u64,
    /// Frames with [`Status::RASTER_ERROR`].
    pub raster_failures: u64,
    /// Frames with any other status.
    pub other: u64,
}

impl ServeSummary {
    fn record(&mut self, status: Status) {
        self.requests += 1;
        match status {
            Status::OK => self.succeeded += 1,
            Status::COMPILE_ERROR => self.compile_failures += 1,
            Status::RASTER_ERROR => self.raster_failures += 1,
            _ => self.other += 1,
        }
    }
}

/// Sequential decode → materialize → compile → rasterize → emit driver.
pub struct Worker<C = Box<dyn Compile>, R = Box<dyn Rasterize>> {
    materializer: Materializer,
    compiler: C,
    rasterizer: R,
    max_request_bytes: u32,
}

impl Worker {
    /// Build a worker that runs the configured executables.
    pub fn new(cfg: WorkerConfig) -> WorkerResult<Self> {
        cfg.validate()?;
        let rasterizer =
            ProcessRasterizer::new(cfg.rasterizer)?.with_working_dir(cfg.scratch.dir.clone());
        Ok(Self {
            materializer: Materializer::new(cfg.scratch),
            compiler: Box::new(ProcessCompiler::new(cfg.compiler)),
            rasterizer: Box::new(rasterizer),
            max_request_bytes: cfg.max_request_bytes,
        })
    }
}

impl<C: Compile, R: Rasterize> Worker<C, R> {
    /// Build a worker around caller-provided stages.
    pub fn with_stages(
        materializer: Materializer,
        compiler: C,
        rasterizer: R,
        max_request_bytes: u32,
    ) -> Self {
        Self {
            materializer,
            compiler,
            rasterizer,
            max_request_bytes,
        }
    }

    /// Run one decoded request through the pipeline.
    ///
    /// Only materialization errors are returned as `Err`; stage failures are outcomes.
    #[tracing::instrument(skip(self, request), fields(bytes = request.payload.len()))]
    pub fn handle(&self, request: &Request) -> WorkerResult<Outcome> {
        let started_at = Instant::now();
        let job = self.materializer.materialize(&request.payload)?;

        let outcome = match self.compiler.compile(&job) {
            CompileResult::Compiled { artifact } => match self.rasterizer.rasterize(&artifact) {
                RasterResult::Rasterized { image } => Outcome::Success(image),
                RasterResult::Failed { diagnostics } => Outcome::RasterFailure(diagnostics),
            },
            CompileResult::Failed { diagnostics } => Outcome::CompileFailure(diagnostics),
        };
        tracing::info!(
            status = %outcome.status(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "request handled"
        );
        Ok(outcome)
    }

    /// Read one request from `input`, run it and emit its response.
    ///
    /// Returns the emitted status, or `Ok(None)` when `input` ends cleanly before a
    /// request starts.
    pub fn serve_one<I: Read, O: Write>(
        &self,
        input: &mut I,
        emitter: &mut ResponseEmitter<O>,
    ) -> WorkerResult<Option<Status>> {
        let Some(request) = read_request(input, self.max_request_bytes)? else {
            return Ok(None);
        };
        let outcome = self.handle(&request)?;
        let status = outcome.status();
        emitter.emit(outcome)?;
        Ok(Some(status))
    }

    /// Serve requests from `input` according to `mode`.
    ///
    /// In single-shot mode an empty input is a truncation error: the caller expected a
    /// request. Any fatal error stops serving immediately; nothing is written for the
    /// request that caused it.
    pub fn serve<I: Read, O: Write>(
        &self,
        input: &mut I,
        output: O,
        mode: ServeMode,
    ) -> WorkerResult<ServeSummary> {
        let mut emitter = ResponseEmitter::new(output);
        let mut summary = ServeSummary::default();
        loop {
            match self.serve_one(input, &mut emitter)? {
                Some(status) => summary.record(status),
                None if mode == ServeMode::SingleShot && summary.requests == 0 => {
                    return Err(WorkerError::truncated(FIELD_SIZE, 0));
                }
                None => break,
            }
            if mode == ServeMode::SingleShot {
                break;
            }
        }
        tracing::debug!(?summary, "serving finished");
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "../tests/unit/worker.rs"]
mod tests;
