use std::io::Write;

use crate::foundation::error::WorkerResult;
use crate::proto::codec::{ResponseFrame, encode_response};
use crate::proto::status::Status;

/// Classified result of one render request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Both stages succeeded; carries the image exactly as the rasterizer produced it.
    Success(Vec<u8>),
    /// The compiler rejected the source; carries its combined output.
    CompileFailure(Vec<u8>),
    /// The rasterizer failed; diagnostics are present only when captured.
    RasterFailure(Option<Vec<u8>>),
}

impl Outcome {
    /// Wire status for this outcome.
    pub fn status(&self) -> Status {
        match self {
            Self::Success(_) => Status::OK,
            Self::CompileFailure(_) => Status::COMPILE_ERROR,
            Self::RasterFailure(_) => Status::RASTER_ERROR,
        }
    }

    /// Convert into the frame that reports it.
    pub fn into_frame(self) -> ResponseFrame {
        let status = self.status();
        let payload = match self {
            Self::Success(image) => image,
            Self::CompileFailure(diagnostics) => diagnostics,
            Self::RasterFailure(diagnostics) => diagnostics.unwrap_or_default(),
        };
        ResponseFrame { status, payload }
    }
}

/// Writes exactly one complete response frame per call.
pub struct ResponseEmitter<W: Write> {
    out: W,
    frames: u64,
}

impl<W: Write> ResponseEmitter<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    /// Encode `outcome` and write it in full, then flush.
    ///
    /// The whole frame is assembled before the first byte is written, so a failure to
    /// encode never leaves a partial frame on the stream.
    pub fn emit(&mut self, outcome: Outcome) -> WorkerResult<()> {
        let frame = outcome.into_frame();
        let bytes = encode_response(&frame)?;
        self.out.write_all(&bytes)?;
        self.out.flush()?;
        self.frames += 1;
        tracing::debug!(
            status = %frame.status,
            payload_bytes = frame.payload.len(),
            "response emitted"
        );
        Ok(())
    }

    /// Number of frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frames
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/proto/emit.rs"]
mod tests;
