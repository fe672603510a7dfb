//! texrender is a sandboxed render worker.
//!
//! It reads one length-prefixed render request from stdin, compiles the document source
//! with an external compiler, rasterizes the result with an external rasterizer, and
//! writes exactly one length-prefixed response frame to stdout.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: [`read_request`] reads `opcode, length, payload` (big-endian `u32`s)
//! 2. **Materialize**: [`Materializer`] writes the source to the fixed scratch slot
//! 3. **Compile**: a [`Compile`] stage turns the source into an intermediate artifact
//! 4. **Rasterize**: a [`Rasterize`] stage turns the artifact into image bytes
//! 5. **Emit**: [`ResponseEmitter`] writes `status, length, payload`
//!
//! Compiler and rasterizer failures are reported in-band as response statuses. Malformed
//! requests and scratch IO failures are fatal: no frame is written and the process exits
//! non-zero.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Caller side of the protocol.
pub mod client;
/// Deployment configuration.
pub mod config;
/// Scratch storage for the in-flight job.
pub mod job;
/// Wire protocol.
pub mod proto;
pub mod stage;
/// Request driver.
pub mod worker;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;

pub use client::{ClientError, RenderClient};
pub use config::WorkerConfig;
pub use foundation::error::{WorkerError, WorkerResult};
pub use job::layout::ScratchLayout;
pub use job::materialize::{Materializer, ScratchJob};
pub use proto::codec::{
    DEFAULT_MAX_PAYLOAD, FIELD_SIZE, Request, ResponseFrame, decode_request, decode_response,
    encode_request, encode_response, read_request,
};
pub use proto::emit::{Outcome, ResponseEmitter};
pub use proto::status::{Opcode, Status};
pub use stage::compile::{CompilerConfig, ProcessCompiler};
pub use stage::raster::{ProcessRasterizer, RasterDiagnostics, RasterizerConfig};
pub use stage::{Compile, CompileResult, RasterResult, Rasterize};
pub use worker::{ServeMode, ServeSummary, Worker};
