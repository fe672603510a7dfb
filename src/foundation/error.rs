/// Convenience result type used across the worker.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Fatal error taxonomy.
///
/// Anything surfaced as a `WorkerError` ends the current process without a response
/// frame. Per-request failures that the caller must see (compiler or rasterizer
/// rejecting a job) are never errors; they travel as [`crate::Outcome`] values.
#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    /// The request opcode is not one the worker understands.
    #[error("protocol error: unsupported operation {opcode}")]
    UnsupportedOperation {
        /// Opcode as read from the wire.
        opcode: u32,
    },

    /// The stream closed before a complete frame arrived.
    #[error("protocol error: truncated input (expected {expected} bytes, received {received})")]
    TruncatedInput {
        /// Bytes the current field or payload required.
        expected: usize,
        /// Bytes actually read before end-of-stream.
        received: usize,
    },

    /// The declared payload length exceeds the configured limit.
    #[error("protocol error: declared payload of {declared} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Length field from the wire.
        declared: u32,
        /// Configured maximum.
        max: u32,
    },

    /// The scratch job could not be written.
    #[error("materialization error: {0}")]
    Materialize(String),

    /// Invalid worker configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO on the protocol streams.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkerError {
    /// Build a [`WorkerError::Materialize`] value.
    pub fn materialize(msg: impl Into<String>) -> Self {
        Self::Materialize(msg.into())
    }

    /// Build a [`WorkerError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`WorkerError::TruncatedInput`] value.
    pub fn truncated(expected: usize, received: usize) -> Self {
        Self::TruncatedInput { expected, received }
    }

    /// `true` for errors caused by a malformed request stream.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOperation { .. }
                | Self::TruncatedInput { .. }
                | Self::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
