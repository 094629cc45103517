//! File system engine
//!
//! Combines the block store, the allocation policy and the namespace tree.
//! Every allocating mutation works on a copy of the store and publishes it
//! only once the allocation succeeded, so a failed call leaves both the store
//! and the tree exactly as they were.

use crate::allocator::{AllocationPolicy, AllocationRecord, BlockStore, Relocation};
use crate::catalog::{DirectoryNode, Entry, FileNode, NamespaceTree, Node};
use crate::config::FsConfig;
use crate::diagnostics::{self, FsStats};
use crate::error::{FsError, Result};
use crate::sample;
use crate::snapshot::Snapshot;
use crate::validation::FsPath;
use tracing::{debug, info};

/// Block-allocating file system over an in-memory disk
#[derive(Debug, Clone)]
pub struct FileSystem {
    /// The simulated disk
    store: BlockStore,

    /// Directory hierarchy; file nodes own their allocation records
    tree: NamespaceTree,

    /// Strategy selection
    policy: AllocationPolicy,

    config: FsConfig,
}

impl FileSystem {
    /// Create an engine from a configuration, seeding the sample namespace if
    /// the configuration asks for it
    pub fn new(config: FsConfig) -> Result<Self> {
        config.validate_config()?;
        let policy = AllocationPolicy::from_config(&config)?;

        let mut fs = FileSystem {
            store: BlockStore::new(config.total_blocks, config.block_size),
            tree: NamespaceTree::new(),
            policy,
            config,
        };

        info!(
            "Created file system: {} blocks of {} bytes",
            fs.store.total_blocks(),
            fs.store.block_size()
        );

        if fs.config.seed_sample {
            sample::seed(&mut fs)?;
        }

        Ok(fs)
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.tree.exists(&FsPath::parse(path)?))
    }

    /// Whether `path` names a directory; `NotFound` when it names nothing
    pub fn is_directory(&self, path: &str) -> Result<bool> {
        let path = FsPath::parse(path)?;
        self.tree
            .resolve(&path)
            .map(Node::is_directory)
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// List a directory
    pub fn list(&self, path: &str) -> Result<Vec<Entry>> {
        let path = FsPath::parse(path)?;
        debug!("list {}", path);
        self.tree.list(&path)
    }

    /// Create a directory
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = FsPath::parse(path)?;
        if path.is_root() {
            return Err(FsError::RootViolation("create"));
        }

        debug!("mkdir {}", path);
        self.tree
            .insert(&path, Node::Directory(DirectoryNode::new("")))
    }

    /// Create a file, or replace the content of an existing one
    pub fn create_or_overwrite(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let path = FsPath::parse(path)?;
        if path.is_root() {
            return Err(FsError::RootViolation("overwrite"));
        }

        match self.tree.resolve(&path).map(Node::is_directory) {
            Some(false) => return self.write_at(&path, content, false),
            Some(true) => return Err(FsError::NotAFile(path.to_string())),
            None => {}
        }

        // Parent must be a directory before any block is claimed
        if let Some(parent) = path.parent() {
            self.tree.directory(&parent)?;
        }

        debug!("create {} ({} bytes)", path, content.len());
        let mut txn = self.store.clone();
        let placement = self.policy.place(&mut txn, &path, content.len())?;

        self.publish(txn, placement.relocation.as_ref());
        self.tree.insert(
            &path,
            Node::File(FileNode::new("", content.to_vec(), placement.record)),
        )
    }

    /// Replace or extend the content of an existing file
    ///
    /// The old blocks are released and fresh ones claimed for the new content
    /// in one step. If no placement fits, the file keeps its old content and
    /// its old record.
    pub fn write(&mut self, path: &str, content: &[u8], append: bool) -> Result<()> {
        let path = FsPath::parse(path)?;
        self.write_at(&path, content, append)
    }

    fn write_at(&mut self, path: &FsPath, content: &[u8], append: bool) -> Result<()> {
        let file = self.tree.file(path)?;

        let new_content = if append {
            let mut joined = Vec::with_capacity(file.content.len() + content.len());
            joined.extend_from_slice(&file.content);
            joined.extend_from_slice(content);
            joined
        } else {
            content.to_vec()
        };
        debug!(
            "write {} ({} bytes, append={})",
            path,
            new_content.len(),
            append
        );

        let mut txn = self.store.clone();
        if let Some(old) = &file.allocation {
            txn.free_record(old);
        }
        let placement = self.policy.place(&mut txn, path, new_content.len())?;

        // The old record's blocks are gone in `txn`; it must not be relocated
        self.tree.file_mut(path)?.allocation = None;
        self.publish(txn, placement.relocation.as_ref());

        let file = self.tree.file_mut(path)?;
        file.content = new_content;
        file.allocation = Some(placement.record);
        file.touch();
        Ok(())
    }

    /// Content of a file
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = FsPath::parse(path)?;
        debug!("read {}", path);
        Ok(self.tree.file(&path)?.content.clone())
    }

    /// Remove a file, or a directory together with everything below it
    pub fn delete(&mut self, path: &str) -> Result<()> {
        let path = FsPath::parse(path)?;
        if path.is_root() {
            return Err(FsError::RootViolation("delete"));
        }
        if !self.tree.exists(&path) {
            return Err(FsError::NotFound(path.to_string()));
        }

        let records = self.tree.records_under(&path);
        let mut freed = 0;
        for (_, record) in &records {
            freed += self.store.free_record(record);
        }
        self.tree.detach(&path)?;

        debug!(
            "delete {} ({} files, {} blocks freed)",
            path,
            records.len(),
            freed
        );
        Ok(())
    }

    /// Move a file or directory to a new path
    ///
    /// Blocks of every moved file are re-tagged with the file's new path.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        let old_path = FsPath::parse(old_path)?;
        let new_path = FsPath::parse(new_path)?;
        if old_path.is_root() || new_path.is_root() {
            return Err(FsError::RootViolation("rename"));
        }
        if !self.tree.exists(&old_path) {
            return Err(FsError::NotFound(old_path.to_string()));
        }
        if self.tree.exists(&new_path) {
            return Err(FsError::AlreadyExists(new_path.to_string()));
        }
        if new_path.is_within(&old_path) {
            return Err(FsError::InvalidArgument(format!(
                "cannot move {} into its own subtree {}",
                old_path, new_path
            )));
        }
        if let Some(parent) = new_path.parent() {
            self.tree.directory(&parent)?;
        }

        debug!("rename {} -> {}", old_path, new_path);
        let node = self.tree.detach(&old_path)?;
        self.tree.insert(&new_path, node)?;

        for (path, record) in self.tree.records_under(&new_path) {
            self.store.retag(&record, path.as_str());
        }
        Ok(())
    }

    /// Compact the store, returning how many blocks moved
    pub fn defragment(&mut self) -> usize {
        let relocation = self.store.defragment();
        if !relocation.is_identity() {
            self.tree.relocate(&relocation);
        }
        relocation.moved_blocks()
    }

    /// Allocation record of a file
    pub fn allocation(&self, path: &str) -> Result<AllocationRecord> {
        let path = FsPath::parse(path)?;
        self.tree
            .file(&path)?
            .allocation
            .clone()
            .ok_or_else(|| FsError::Inconsistent(format!("{} has no allocation", path)))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.store, &self.tree)
    }

    pub fn stats(&self) -> FsStats {
        FsStats::collect(&self.store, &self.tree)
    }

    pub fn check_consistency(&self) -> Result<()> {
        diagnostics::check_consistency(&self.store, &self.tree)
    }

    /// Replace the live store with a transaction copy and bring every live
    /// record in line with the copy's relocation
    fn publish(&mut self, txn: BlockStore, relocation: Option<&Relocation>) {
        self.store = txn;
        if let Some(relocation) = relocation {
            if !relocation.is_identity() {
                self.tree.relocate(relocation);
            }
        }
    }
}
