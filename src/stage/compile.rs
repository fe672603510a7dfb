use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{WorkerError, WorkerResult};
use crate::job::materialize::ScratchJob;
use crate::stage::command::{
    ArgVars, base_command, exit_code, expand_args, run_combined, spawn_failure_message,
};
use crate::stage::{Compile, CompileResult};

/// How to invoke the document compiler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Compiler executable.
    pub program: PathBuf,
    /// Argument template; see [`expand_args`](crate::stage::command::expand_args).
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/app/texlive/texdir/bin/x86_64-linux/pdflatex"),
            args: [
                "-interaction=nonstopmode",
                "-halt-on-error",
                "-fmt=preamble",
                "-output-directory={output_dir}",
                "{source}",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl CompilerConfig {
    /// Reject configurations that can never run.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(WorkerError::config("compiler program must not be empty"));
        }
        Ok(())
    }
}

/// Runs the configured compiler as a child process.
#[derive(Clone, Debug)]
pub struct ProcessCompiler {
    cfg: CompilerConfig,
}

impl ProcessCompiler {
    /// Compiler driven by `cfg`.
    pub fn new(cfg: CompilerConfig) -> Self {
        Self { cfg }
    }
}

impl Compile for ProcessCompiler {
    #[tracing::instrument(skip(self, job), fields(source = %job.source.display()))]
    fn compile(&self, job: &ScratchJob) -> CompileResult {
        let started_at = Instant::now();
        let args = expand_args(&self.cfg.args, &ArgVars::for_job(job));
        let cmd = base_command(&self.cfg.program, args, Some(&job.output_dir));

        let (status, mut output) = match run_combined(cmd) {
            Ok(done) => done,
            Err(err) => {
                let msg = spawn_failure_message("compiler", &self.cfg.program, &err);
                tracing::warn!(
                    error = %err,
                    program = %self.cfg.program.display(),
                    "compiler did not run"
                );
                return CompileResult::Failed {
                    diagnostics: msg.into_bytes(),
                };
            }
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if !status.success() {
            tracing::info!(
                exit_code = exit_code(status),
                elapsed_ms,
                diagnostic_bytes = output.len(),
                "compiler rejected job"
            );
            return CompileResult::Failed {
                diagnostics: output,
            };
        }

        if !job.artifact.is_file() {
            tracing::warn!(
                elapsed_ms,
                artifact = %job.artifact.display(),
                "compiler exited cleanly without producing an artifact"
            );
            if !output.is_empty() && !output.ends_with(b"\n") {
                output.push(b'\n');
            }
            output.extend_from_slice(
                format!(
                    "compiler exited successfully but produced no output at '{}'\n",
                    job.artifact.display()
                )
                .as_bytes(),
            );
            return CompileResult::Failed {
                diagnostics: output,
            };
        }

        tracing::debug!(elapsed_ms, "compiled");
        CompileResult::Compiled {
            artifact: job.artifact.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/compile.rs"]
mod tests;
