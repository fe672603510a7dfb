use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{WorkerError, WorkerResult};
use crate::stage::command::{
    ArgVars, base_command, exit_code, expand_args, spawn_failure_message,
};
use crate::stage::{RasterResult, Rasterize};

/// What to do with the rasterizer's stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterDiagnostics {
    /// Capture stderr and return it in the raster-error frame.
    #[default]
    Capture,
    /// Discard stderr; raster-error frames carry an empty payload.
    Discard,
}

/// How to invoke the rasterizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterizerConfig {
    /// Rasterizer executable.
    pub program: PathBuf,
    /// Argument template. The rasterizer must write the image to stdout.
    ///
    /// `{artifact}`, `{output_dir}` and `{job}` are expanded; `{source}` is rejected.
    pub args: Vec<String>,
    /// Capture policy for stderr.
    pub diagnostics: RasterDiagnostics,
    /// Image format the output must sniff as (`"png"`, `"jpeg"`, ...). Unchecked if unset.
    pub expected_format: Option<String>,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/app/gs"),
            args: [
                "-q",
                "-sstdout=%stderr",
                "-dBATCH",
                "-dNOPAUSE",
                "-dSAFER",
                "-sOutputFile=-",
                "-dMaxBitmap=10485760",
                "-dTextAlphaBits=4",
                "-dGraphicsAlphaBits=4",
                "-r440",
                "-sDEVICE=png16m",
                "{artifact}",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            diagnostics: RasterDiagnostics::Capture,
            expected_format: Some("png".to_string()),
        }
    }
}

impl RasterizerConfig {
    /// Reject configurations that can never run.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(WorkerError::config("rasterizer program must not be empty"));
        }
        if self.args.iter().any(|arg| arg.contains("{source}")) {
            return Err(WorkerError::config(
                "rasterizer args cannot use {source}; the rasterizer reads {artifact}",
            ));
        }
        if let Some(name) = &self.expected_format {
            parse_format(name)?;
        }
        Ok(())
    }
}

fn parse_format(name: &str) -> WorkerResult<image::ImageFormat> {
    image::ImageFormat::from_extension(name).ok_or_else(|| {
        WorkerError::config(format!("unknown rasterizer expected_format '{name}'"))
    })
}

/// Runs the configured rasterizer as a child process.
#[derive(Clone, Debug)]
pub struct ProcessRasterizer {
    cfg: RasterizerConfig,
    expected: Option<image::ImageFormat>,
    cwd: Option<PathBuf>,
}

impl ProcessRasterizer {
    /// Fails only when `expected_format` names no known image format.
    pub fn new(cfg: RasterizerConfig) -> WorkerResult<Self> {
        cfg.validate()?;
        let expected = cfg.expected_format.as_deref().map(parse_format).transpose()?;
        Ok(Self {
            cfg,
            expected,
            cwd: None,
        })
    }

    /// Run the rasterizer from `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn failed(&self, diagnostics: Vec<u8>) -> RasterResult {
        RasterResult::Failed {
            diagnostics: match self.cfg.diagnostics {
                RasterDiagnostics::Capture => Some(diagnostics),
                RasterDiagnostics::Discard => None,
            },
        }
    }
}

impl Rasterize for ProcessRasterizer {
    #[tracing::instrument(skip(self, artifact), fields(artifact = %artifact.display()))]
    fn rasterize(&self, artifact: &Path) -> RasterResult {
        let started_at = Instant::now();
        let job = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_dir = artifact.parent().unwrap_or_else(|| Path::new("."));
        // `validate` keeps `{source}` out of the template.
        let vars = ArgVars {
            source: artifact,
            artifact,
            output_dir,
            job: &job,
        };

        let mut cmd = base_command(
            &self.cfg.program,
            expand_args(&self.cfg.args, &vars),
            self.cwd.as_deref(),
        );
        cmd.stdout(Stdio::piped());
        match self.cfg.diagnostics {
            RasterDiagnostics::Capture => cmd.stderr(Stdio::piped()),
            RasterDiagnostics::Discard => cmd.stderr(Stdio::null()),
        };

        // `output` drains stdout and stderr concurrently.
        let out = match cmd.output() {
            Ok(out) => out,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    program = %self.cfg.program.display(),
                    "rasterizer did not run"
                );
                let msg = spawn_failure_message("rasterizer", &self.cfg.program, &err);
                return self.failed(msg.into_bytes());
            }
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if !out.status.success() {
            tracing::warn!(
                exit_code = exit_code(out.status),
                elapsed_ms,
                stderr_bytes = out.stderr.len(),
                "rasterizer failed"
            );
            return self.failed(out.stderr);
        }

        if out.stdout.is_empty() {
            tracing::warn!(elapsed_ms, "rasterizer exited cleanly with no image");
            let mut diagnostics = out.stderr;
            diagnostics.extend_from_slice(b"rasterizer produced no image data\n");
            return self.failed(diagnostics);
        }

        if let Some(expected) = self.expected {
            let found = image::guess_format(&out.stdout).ok();
            if found != Some(expected) {
                tracing::warn!(?expected, ?found, "rasterizer output has unexpected format");
                let mut diagnostics = out.stderr;
                diagnostics.extend_from_slice(
                    format!("rasterizer output is not {expected:?} (detected {found:?})\n")
                        .as_bytes(),
                );
                return self.failed(diagnostics);
            }
        }

        tracing::debug!(elapsed_ms, image_bytes = out.stdout.len(), "rasterized");
        RasterResult::Rasterized { image: out.stdout }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/raster.rs"]
mod tests;
