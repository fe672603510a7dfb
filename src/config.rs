use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{WorkerError, WorkerResult};
use crate::job::layout::ScratchLayout;
use crate::proto::codec::DEFAULT_MAX_PAYLOAD;
use crate::stage::compile::CompilerConfig;
use crate::stage::raster::RasterizerConfig;

/// Deployment configuration for one worker process.
///
/// Every field has a default matching the stock container image, so an empty JSON object
/// is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Scratch slot for the in-flight job.
    pub scratch: ScratchLayout,
    /// Document compiler invocation.
    pub compiler: CompilerConfig,
    /// Rasterizer invocation.
    pub rasterizer: RasterizerConfig,
    /// Largest request payload accepted, in bytes.
    pub max_request_bytes: u32,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scratch: ScratchLayout::default(),
            compiler: CompilerConfig::default(),
            rasterizer: RasterizerConfig::default(),
            max_request_bytes: DEFAULT_MAX_PAYLOAD,
            log_filter: "warn".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> WorkerResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| WorkerError::config(format!("parse '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a JSON configuration string.
    pub fn from_json_str(s: &str) -> WorkerResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| WorkerError::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate every section.
    pub fn validate(&self) -> WorkerResult<()> {
        self.scratch.validate()?;
        self.compiler.validate()?;
        self.rasterizer.validate()?;
        if self.max_request_bytes == 0 {
            return Err(WorkerError::config("max_request_bytes must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
