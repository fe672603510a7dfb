//! Caller side of the protocol: run a worker process for one request.

use std::ffi::OsString;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use crate::foundation::error::WorkerError;
use crate::proto::codec::{Request, ResponseFrame, decode_response, encode_request};
use crate::proto::status::Status;

/// Errors seen by a caller of the worker.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The document was rejected by the compiler.
    #[error("compile error: {0}")]
    Compile(String),

    /// The rasterizer failed.
    #[error("raster error{}", detail(.0))]
    Raster(Option<String>),

    /// The worker answered with a status this client does not know.
    #[error("worker returned status {0}")]
    UnexpectedStatus(Status),

    /// The worker ended without a complete frame.
    #[error("worker failed (exit {exit_code:?}): {message}")]
    Worker {
        /// Worker exit code, if it exited normally.
        exit_code: Option<i32>,
        /// What went wrong, including the worker's stderr.
        message: String,
    },

    /// No response arrived in time; the worker was killed.
    #[error("worker timed out after {0:?}")]
    Timeout(Duration),

    /// Spawning or talking to the worker failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Spawns a fresh single-shot worker per render.
#[derive(Clone, Debug)]
pub struct RenderClient {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl RenderClient {
    /// Client running the worker executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a worker command-line argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Kill the worker if no response arrives within `timeout`.
    ///
    /// The deadline covers writing the request as well as reading the response. Only
    /// the worker itself is killed; a compiler or rasterizer it started is not reaped
    /// and runs until it exits on its own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Render `source` and return the image bytes.
    pub fn render(&self, source: &[u8]) -> Result<Vec<u8>, ClientError> {
        let frame = self.exchange(&Request::render(source.to_vec()))?;
        match frame.status {
            Status::OK => Ok(frame.payload),
            Status::COMPILE_ERROR => Err(ClientError::Compile(
                String::from_utf8_lossy(&frame.payload).into_owned(),
            )),
            Status::RASTER_ERROR => Err(ClientError::Raster(
                (!frame.payload.is_empty())
                    .then(|| String::from_utf8_lossy(&frame.payload).into_owned()),
            )),
            other => Err(ClientError::UnexpectedStatus(other)),
        }
    }

    /// Send one request and read back exactly one response frame.
    pub fn exchange(&self, request: &Request) -> Result<ResponseFrame, ClientError> {
        let bytes = encode_request(request).map_err(|e| ClientError::Worker {
            exit_code: None,
            message: e.to_string(),
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("worker stdin unavailable"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("worker stdout unavailable"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("worker stderr unavailable"))?;

        let stderr_drain = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = io::Read::read_to_end(&mut stderr, &mut buf);
            buf
        });

        // The request is written off-thread so a worker that never reads stdin cannot
        // outlast the timeout.
        let writer = std::thread::spawn(move || match stdin.write_all(&bytes) {
            // A worker that rejects the request early may close stdin before we finish.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        });

        let (tx, rx) = mpsc::channel();
        let reader = std::thread::spawn(move || {
            let _ = tx.send(decode_response(&mut stdout));
        });

        let received = match self.timeout {
            Some(limit) => match rx.recv_timeout(limit) {
                Ok(r) => Some(r),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    tracing::warn!(timeout = ?limit, "worker timed out; killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ClientError::Timeout(limit));
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => None,
            },
            None => rx.recv().ok(),
        };

        let status = child.wait()?;
        let _ = reader.join();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("request writer panicked")));
        let stderr_bytes = stderr_drain.join().unwrap_or_default();

        match (received, written) {
            (Some(Ok(frame)), _) => Ok(frame),
            (Some(Err(_)), Err(e)) => Err(e.into()),
            (Some(Err(err)), Ok(())) => Err(worker_failure(status.code(), &err, &stderr_bytes)),
            (None, _) => Err(ClientError::Worker {
                exit_code: status.code(),
                message: "response reader stopped unexpectedly".to_string(),
            }),
        }
    }
}

fn detail(diagnostics: &Option<String>) -> String {
    diagnostics
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

fn worker_failure(exit_code: Option<i32>, err: &WorkerError, stderr: &[u8]) -> ClientError {
    let stderr = String::from_utf8_lossy(stderr);
    let message = if stderr.trim().is_empty() {
        err.to_string()
    } else {
        format!("{err}; stderr: {}", stderr.trim())
    };
    ClientError::Worker { exit_code, message }
}
