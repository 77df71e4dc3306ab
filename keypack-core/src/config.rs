//! Analyzer configuration

use crate::codec::{Codec, CodecKind};
use crate::{PackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Records per batch when none is configured
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// zlib level used by the deflating codecs (zlib's own default)
pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;

/// Highest zlib compression level
pub const MAX_DEFLATE_LEVEL: u32 = 9;

/// Configuration for evaluating codecs over a record stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum records per batch
    pub batch_size: usize,
    /// zlib level for the deflating codecs
    pub deflate_level: u32,
    /// Codecs to evaluate, in report order
    pub codecs: Vec<CodecKind>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            codecs: CodecKind::ALL.to_vec(),
        }
    }
}

impl AnalyzerConfig {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PackError::Config(format!("invalid analyzer config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PackError::Config("batch size must be positive".into()));
        }
        if self.deflate_level > MAX_DEFLATE_LEVEL {
            return Err(PackError::Config(format!(
                "deflate level {} outside 0-{}",
                self.deflate_level, MAX_DEFLATE_LEVEL
            )));
        }
        if self.codecs.is_empty() {
            return Err(PackError::Config("no codecs selected".into()));
        }
        Ok(())
    }

    /// Instantiate the configured codecs
    pub fn build_codecs(&self) -> Vec<Box<dyn Codec>> {
        self.codecs
            .iter()
            .map(|kind| kind.build(self.deflate_level))
            .collect()
    }
}
