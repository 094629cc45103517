//! # blockfs - Block-Allocating File System Simulator
//!
//! `blockfs` simulates the block-management layer of a file system: a fixed
//! pool of fixed-size blocks, a tree of files and directories, and three
//! classical allocation strategies with automatic selection, fallback and
//! on-demand defragmentation.
//!
//! - **Contiguous** allocation for small files, first fit
//! - **Indexed** allocation (one index block plus data blocks) for large files
//! - **Linked** allocation as the last resort, or forced for configured namespaces
//! - **Defragmentation** when no contiguous run fits, rewriting every record
//! - **Snapshots** of the block map and **statistics** for inspection
//!
//! ## Quick Start
//!
//! ```rust
//! use blockfs::{BlockFs, Result};
//!
//! # fn main() -> Result<()> {
//! // 1000 blocks of 1KB, seeded with a sample namespace
//! let fs = BlockFs::new()?;
//!
//! fs.mkdir("/notes")?;
//! fs.create_or_overwrite("/notes/todo.txt", b"buy milk")?;
//! fs.append("/notes/todo.txt", b", eggs")?;
//!
//! assert_eq!(fs.read("/notes/todo.txt")?, b"buy milk, eggs");
//! println!("{}", fs.allocation("/notes/todo.txt")?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use blockfs::{BlockFsBuilder, Result, Strategy};
//!
//! # fn main() -> Result<()> {
//! let fs = BlockFsBuilder::new()
//!     .total_blocks(64)
//!     .block_size(16)
//!     .large_file_threshold(4)
//!     .without_sample()
//!     .build()?;
//!
//! fs.create_or_overwrite("/big.bin", &[0u8; 100])?;
//! assert_eq!(fs.allocation("/big.bin")?.strategy(), Strategy::Indexed);
//! # Ok(())
//! # }
//! ```

// Block-management core
pub mod core;

// Re-export core modules internally so crate:: paths in core resolve
#[allow(unused_imports)]
pub(crate) use self::core::{
    allocator, catalog, config, diagnostics, error, filesystem, sample, snapshot, validation,
};

pub mod api;
pub mod shell;

// Re-export core types that users need
pub use crate::core::{
    allocator::{AllocationRecord, BlockIndex, BlockRole, Strategy},
    catalog::{Entry, FileType},
    config::FsConfig,
    diagnostics::{FsStats, StrategyCounts},
    error::{ErrorKind, FsError, Result},
    snapshot::{BlockTag, FileView, Snapshot},
    validation::FsPath,
    FileSystem,
};

use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, info};

/// Thread-safe file system handle
///
/// Wraps a [`FileSystem`] behind a single reader-writer lock. Mutations hold
/// the write guard for their whole critical section, including any
/// defragmentation they trigger; reads share the read guard. Share it between
/// threads with `Arc`.
///
/// # Examples
///
/// ```rust
/// use blockfs::BlockFs;
/// use std::sync::Arc;
///
/// # fn main() -> blockfs::Result<()> {
/// let fs = Arc::new(BlockFs::new()?);
///
/// let writer = {
///     let fs = Arc::clone(&fs);
///     std::thread::spawn(move || fs.create_or_overwrite("/shared.txt", b"hi"))
/// };
/// writer.join().unwrap()?;
///
/// assert_eq!(fs.read("/shared.txt")?, b"hi");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BlockFs {
    inner: RwLock<FileSystem>,
}

impl BlockFs {
    /// Create a file system with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(FsConfig::default())
    }

    /// Create a file system from a configuration
    pub fn with_config(config: FsConfig) -> Result<Self> {
        let inner = FileSystem::new(config)?;
        Ok(BlockFs {
            inner: RwLock::new(inner),
        })
    }

    /// Create a file system from a TOML configuration file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading configuration from {:?}", path.as_ref());
        Self::with_config(FsConfig::load(path)?)
    }

    /// List a directory
    pub fn list<P: AsRef<str>>(&self, path: P) -> Result<Vec<Entry>> {
        self.inner.read().list(path.as_ref())
    }

    /// Create a directory; the parent must exist
    pub fn mkdir<P: AsRef<str>>(&self, path: P) -> Result<()> {
        self.inner.write().mkdir(path.as_ref())
    }

    /// Create a file, or replace an existing file's content
    pub fn create_or_overwrite<P: AsRef<str>>(&self, path: P, content: &[u8]) -> Result<()> {
        self.inner
            .write()
            .create_or_overwrite(path.as_ref(), content)
    }

    /// Replace (`append == false`) or extend an existing file's content
    ///
    /// On failure the file keeps its previous content and blocks.
    pub fn write<P: AsRef<str>>(&self, path: P, content: &[u8], append: bool) -> Result<()> {
        self.inner.write().write(path.as_ref(), content, append)
    }

    /// Append to an existing file
    pub fn append<P: AsRef<str>>(&self, path: P, content: &[u8]) -> Result<()> {
        self.write(path, content, true)
    }

    /// Read a file's content
    pub fn read<P: AsRef<str>>(&self, path: P) -> Result<Vec<u8>> {
        self.inner.read().read(path.as_ref())
    }

    /// Read a file's content as (lossy) UTF-8 text
    pub fn read_to_string<P: AsRef<str>>(&self, path: P) -> Result<String> {
        let content = self.read(path)?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    /// Delete a file, or a directory with everything below it
    pub fn delete<P: AsRef<str>>(&self, path: P) -> Result<()> {
        self.inner.write().delete(path.as_ref())
    }

    /// Move a file or directory
    pub fn rename<P: AsRef<str>, Q: AsRef<str>>(&self, old_path: P, new_path: Q) -> Result<()> {
        self.inner
            .write()
            .rename(old_path.as_ref(), new_path.as_ref())
    }

    pub fn exists<P: AsRef<str>>(&self, path: P) -> Result<bool> {
        self.inner.read().exists(path.as_ref())
    }

    pub fn is_directory<P: AsRef<str>>(&self, path: P) -> Result<bool> {
        self.inner.read().is_directory(path.as_ref())
    }

    /// Allocation record of a file
    pub fn allocation<P: AsRef<str>>(&self, path: P) -> Result<AllocationRecord> {
        self.inner.read().allocation(path.as_ref())
    }

    /// Compact the block store, returning how many blocks moved
    pub fn defragment(&self) -> usize {
        let moved = self.inner.write().defragment();
        debug!("Manual defragmentation moved {} blocks", moved);
        moved
    }

    /// Detached copy of the block map and every file
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().snapshot()
    }

    pub fn stats(&self) -> FsStats {
        self.inner.read().stats()
    }

    /// Verify that blocks and allocation records agree
    pub fn check_consistency(&self) -> Result<()> {
        self.inner.read().check_consistency()
    }

    /// Run `f` against the engine under one read guard
    pub fn inspect<R>(&self, f: impl FnOnce(&FileSystem) -> R) -> R {
        f(&self.inner.read())
    }

    /// Configuration the instance was built with
    pub fn config(&self) -> FsConfig {
        self.inner.read().config().clone()
    }
}

/// Builder for [`BlockFs`] with custom configuration
///
/// # Examples
///
/// ```rust
/// use blockfs::BlockFsBuilder;
///
/// # fn main() -> blockfs::Result<()> {
/// let fs = BlockFsBuilder::new()
///     .total_blocks(10)
///     .block_size(1)
///     .auto_defragment(false)
///     .force_linked_prefix("/scratch")
///     .without_sample()
///     .build()?;
///
/// assert_eq!(fs.stats().total_blocks, 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlockFsBuilder {
    config: FsConfig,
}

impl BlockFsBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        BlockFsBuilder {
            config: FsConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of blocks
    pub fn total_blocks(mut self, total_blocks: usize) -> Self {
        self.config.total_blocks = total_blocks;
        self
    }

    /// Set the block size in bytes
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Set the block count at which indexed allocation is preferred
    pub fn large_file_threshold(mut self, blocks: usize) -> Self {
        self.config.large_file_threshold = blocks;
        self
    }

    /// Add a namespace whose files always try linked allocation first
    pub fn force_linked_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.force_linked_prefixes.push(prefix.into());
        self
    }

    /// Drop every force-linked namespace, including the default one
    pub fn no_force_linked(mut self) -> Self {
        self.config.force_linked_prefixes.clear();
        self
    }

    /// Enable or disable defragment-and-retry on contiguous failure
    pub fn auto_defragment(mut self, enabled: bool) -> Self {
        self.config.auto_defragment = enabled;
        self
    }

    /// Start empty instead of with the sample namespace
    pub fn without_sample(mut self) -> Self {
        self.config.seed_sample = false;
        self
    }

    /// Validate the configuration and build the instance
    pub fn build(self) -> Result<BlockFs> {
        info!(
            "Building file system: {} blocks x {} bytes",
            self.config.total_blocks, self.config.block_size
        );
        BlockFs::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(total_blocks: usize, block_size: usize) -> BlockFs {
        BlockFsBuilder::new()
            .total_blocks(total_blocks)
            .block_size(block_size)
            .without_sample()
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validates() {
        let result = BlockFsBuilder::new().block_size(0).build();
        assert!(matches!(result, Err(FsError::Config(_))));

        let result = BlockFsBuilder::new()
            .force_linked_prefix("not/absolute")
            .build();
        assert!(matches!(result, Err(FsError::Config(_))));
    }

    #[test]
    fn test_default_is_seeded() {
        let fs = BlockFs::new().unwrap();
        assert!(fs.is_directory("/documents/work").unwrap());
        assert_eq!(
            fs.read_to_string("/music/song.mp3").unwrap(),
            "[BINARY AUDIO DATA]"
        );
    }

    #[test]
    fn test_basic_operations() {
        let fs = empty(100, 8);
        fs.mkdir("/d").unwrap();
        fs.create_or_overwrite("/d/f", b"one").unwrap();
        fs.append("/d/f", b" two").unwrap();
        assert_eq!(fs.read("/d/f").unwrap(), b"one two");

        fs.rename("/d/f", "/g").unwrap();
        assert!(!fs.exists("/d/f").unwrap());
        assert_eq!(fs.list("/").unwrap().len(), 2);

        fs.delete("/g").unwrap();
        assert_eq!(fs.stats().used_blocks, 0);
        fs.check_consistency().unwrap();
    }

    #[test]
    fn test_linked_reachable_without_defrag() {
        let fs = BlockFsBuilder::new()
            .total_blocks(10)
            .block_size(1)
            .large_file_threshold(100)
            .auto_defragment(false)
            .without_sample()
            .build()
            .unwrap();

        fs.create_or_overwrite("/a", b"aaaa").unwrap();
        fs.create_or_overwrite("/b", b"bbbb").unwrap();
        fs.delete("/a").unwrap();
        fs.create_or_overwrite("/c", b"ccccc").unwrap();

        assert_eq!(
            fs.allocation("/c").unwrap(),
            AllocationRecord::Linked {
                blocks: vec![0, 1, 2, 3, 8]
            }
        );
        fs.check_consistency().unwrap();
    }

    #[test]
    fn test_inspect_sees_one_state() {
        let fs = empty(20, 1);
        fs.create_or_overwrite("/x", b"xyz").unwrap();
        let (used, referenced) =
            fs.inspect(|engine| (engine.store().used_blocks(), engine.stats().blocks_by_strategy.total()));
        assert_eq!(used, referenced);
    }
}
