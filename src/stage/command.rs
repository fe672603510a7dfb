use std::ffi::OsString;
use std::io::{self, Read as _};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::job::materialize::ScratchJob;

/// Placeholder values substituted into configured argument templates.
#[derive(Clone, Debug)]
pub struct ArgVars<'a> {
    /// `{source}`
    pub source: &'a Path,
    /// `{artifact}`
    pub artifact: &'a Path,
    /// `{output_dir}`
    pub output_dir: &'a Path,
    /// `{job}`
    pub job: &'a str,
}

impl<'a> ArgVars<'a> {
    /// Values for a materialized job.
    pub fn for_job(job: &'a ScratchJob) -> Self {
        Self {
            source: &job.source,
            artifact: &job.artifact,
            output_dir: &job.output_dir,
            job: &job.job_name,
        }
    }
}

/// Expand `{source}`, `{artifact}`, `{output_dir}` and `{job}` in each template argument.
///
/// Arguments that are exactly one placeholder are passed through as raw OS strings, so
/// non UTF-8 paths survive untouched.
pub fn expand_args(template: &[String], vars: &ArgVars<'_>) -> Vec<OsString> {
    template
        .iter()
        .map(|arg| match arg.as_str() {
            "{source}" => vars.source.as_os_str().to_owned(),
            "{artifact}" => vars.artifact.as_os_str().to_owned(),
            "{output_dir}" => vars.output_dir.as_os_str().to_owned(),
            "{job}" => OsString::from(vars.job),
            _ => OsString::from(
                arg.replace("{source}", &vars.source.to_string_lossy())
                    .replace("{artifact}", &vars.artifact.to_string_lossy())
                    .replace("{output_dir}", &vars.output_dir.to_string_lossy())
                    .replace("{job}", vars.job),
            ),
        })
        .collect()
}

/// Build a non-interactive command: stdin is never inherited, so a child can not read the
/// protocol stream.
pub fn base_command(program: &Path, args: Vec<OsString>, cwd: Option<&Path>) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd
}

/// Run `cmd` with stdout and stderr joined into a single pipe.
///
/// The pipe is read to end-of-stream before waiting, so the child can never block on a
/// full pipe. Output arrives in the order the child wrote it.
pub fn run_combined(mut cmd: Command) -> io::Result<(ExitStatus, Vec<u8>)> {
    let (mut reader, writer) = io::pipe()?;
    cmd.stdout(writer.try_clone()?).stderr(writer);

    let mut child = cmd.spawn()?;
    // `cmd` still owns the write ends; drop it or the read below never sees EOF.
    drop(cmd);

    let mut output = Vec::new();
    let read = reader.read_to_end(&mut output);
    let status = child.wait()?;
    read?;
    Ok((status, output))
}

/// Describe a spawn failure the way a caller can act on it.
pub fn spawn_failure_message(what: &str, program: &Path, err: &io::Error) -> String {
    if err.kind() == io::ErrorKind::NotFound {
        format!(
            "failed to start {what} '{}': executable not found",
            program.display()
        )
    } else {
        format!("failed to start {what} '{}': {err}", program.display())
    }
}

/// Exit code as a loggable integer (`-1` when killed by a signal).
pub fn exit_code(status: ExitStatus) -> i64 {
    status.code().map(i64::from).unwrap_or(-1)
}

#[cfg(test)]
#[path = "../../tests/unit/stage/command.rs"]
mod tests;
