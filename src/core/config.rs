//! File system configuration
//!
//! Fixed for the lifetime of an instance. Loadable from TOML; every field has a
//! default so a config file only lists what it changes:
//!
//! ```toml
//! total_blocks = 256
//! block_size = 512
//! force_linked_prefixes = ["/scratch"]
//! ```

use crate::error::{FsError, Result};
use crate::validation::FsPath;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Default number of blocks in the store
pub const DEFAULT_TOTAL_BLOCKS: usize = 1000;

/// Default block size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Requests of at least this many blocks try indexed allocation first
pub const DEFAULT_LARGE_FILE_THRESHOLD: usize = 5;

/// Namespace whose files always try linked allocation first
pub const DEFAULT_FORCE_LINKED_PREFIX: &str = "/test/linked";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FsConfig {
    /// Number of blocks in the store
    #[validate(range(min = 1, max = 1000000))]
    pub total_blocks: usize,

    /// Bytes per block
    #[validate(range(min = 1))]
    pub block_size: usize,

    /// Block count at which indexed allocation is preferred
    #[validate(range(min = 1))]
    pub large_file_threshold: usize,

    /// Absolute path prefixes forced onto linked allocation
    pub force_linked_prefixes: Vec<String>,

    /// Defragment and retry when no contiguous run fits
    pub auto_defragment: bool,

    /// Populate the sample namespace at startup
    pub seed_sample: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        FsConfig {
            total_blocks: DEFAULT_TOTAL_BLOCKS,
            block_size: DEFAULT_BLOCK_SIZE,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            force_linked_prefixes: vec![DEFAULT_FORCE_LINKED_PREFIX.to_string()],
            auto_defragment: true,
            seed_sample: true,
        }
    }
}

impl FsConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: FsConfig =
            toml::from_str(source).map_err(|e| FsError::Config(e.to_string()))?;
        config.validate_config()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Check field ranges and that every prefix is a valid absolute path
    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| FsError::Config(e.to_string()))?;

        for prefix in &self.force_linked_prefixes {
            FsPath::parse(prefix).map_err(|e| {
                FsError::Config(format!("force_linked_prefixes entry '{}': {}", prefix, e))
            })?;
        }

        Ok(())
    }

    /// Same configuration with the sample namespace disabled
    pub fn without_sample(mut self) -> Self {
        self.seed_sample = false;
        self
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| FsError::Config(e.to_string()))
    }
}
