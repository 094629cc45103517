//! Strategy selection and fallback chain
//!
//! Order of attempts for a request of `n` blocks:
//! 1. Path under a force-linked prefix: linked
//! 2. `n >= large_file_threshold`: indexed (n data blocks + 1 index block)
//! 3. Contiguous, first fit
//! 4. Defragment, then contiguous once more (when auto-defragmentation is on)
//! 5. Linked
//!
//! A step that fails rolls back its own claims before the next one runs.

use crate::allocator::store::{BlockStore, IndexedBlocks, Relocation};
use crate::allocator::AllocationRecord;
use crate::config::FsConfig;
use crate::error::{FsError, Result};
use crate::validation::FsPath;
use tracing::{debug, info};

/// Outcome of a successful placement
#[derive(Debug, Clone)]
pub struct Placement {
    /// Where the new file's blocks went
    pub record: AllocationRecord,

    /// Set when the chain had to defragment; every other live record must be
    /// rewritten through it
    pub relocation: Option<Relocation>,
}

/// Decides which strategy serves a request
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    /// Requests of at least this many blocks try indexed allocation first
    large_file_threshold: usize,

    /// Namespaces that always try linked allocation first
    force_linked_prefixes: Vec<FsPath>,

    /// Whether contiguous failure triggers a defragment-and-retry
    auto_defragment: bool,
}

impl AllocationPolicy {
    pub fn new(
        large_file_threshold: usize,
        force_linked_prefixes: Vec<FsPath>,
        auto_defragment: bool,
    ) -> Self {
        AllocationPolicy {
            large_file_threshold: large_file_threshold.max(1),
            force_linked_prefixes,
            auto_defragment,
        }
    }

    pub fn from_config(config: &FsConfig) -> Result<Self> {
        let prefixes = config
            .force_linked_prefixes
            .iter()
            .map(|p| FsPath::parse(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            config.large_file_threshold,
            prefixes,
            config.auto_defragment,
        ))
    }

    pub fn large_file_threshold(&self) -> usize {
        self.large_file_threshold
    }

    pub fn auto_defragment(&self) -> bool {
        self.auto_defragment
    }

    /// Whether `path` falls under one of the force-linked namespaces
    pub fn is_force_linked(&self, path: &FsPath) -> bool {
        self.force_linked_prefixes
            .iter()
            .any(|prefix| path.is_within(prefix))
    }

    fn is_large(&self, blocks_needed: usize) -> bool {
        blocks_needed >= self.large_file_threshold
    }

    /// Allocate room for `len` bytes owned by `path`
    ///
    /// The store may be defragmented along the way, so callers run this
    /// against a transaction copy of the store and publish it only on success.
    pub fn place(&self, store: &mut BlockStore, path: &FsPath, len: usize) -> Result<Placement> {
        let needed = store.blocks_needed(len);
        let owner = path.as_str();
        debug!("Placing {} bytes ({} blocks) for {}", len, needed, owner);

        if self.is_force_linked(path) {
            if let Some(blocks) = store.allocate_linked(needed, owner) {
                debug!("Forced linked allocation for {}", owner);
                return Ok(Placement {
                    record: AllocationRecord::Linked { blocks },
                    relocation: None,
                });
            }
            debug!("Forced linked allocation failed for {}, continuing", owner);
        }

        if self.is_large(needed) {
            if let Some(IndexedBlocks {
                index_block,
                data_blocks,
            }) = store.allocate_indexed(needed, owner)
            {
                debug!("Indexed allocation for {} (index block {})", owner, index_block);
                return Ok(Placement {
                    record: AllocationRecord::Indexed {
                        index_block,
                        data_blocks,
                    },
                    relocation: None,
                });
            }
            debug!("Indexed allocation failed for {}", owner);
        }

        if let Some(start) = store.allocate_contiguous(needed, owner) {
            return Ok(Placement {
                record: AllocationRecord::Contiguous {
                    start,
                    count: needed,
                },
                relocation: None,
            });
        }

        let mut relocation = None;
        if self.auto_defragment {
            info!(
                "No contiguous run of {} blocks for {}, defragmenting",
                needed, owner
            );
            let moved = store.defragment();
            let retry = store.allocate_contiguous(needed, owner);
            relocation = Some(moved);
            if let Some(start) = retry {
                return Ok(Placement {
                    record: AllocationRecord::Contiguous {
                        start,
                        count: needed,
                    },
                    relocation,
                });
            }
        }

        if let Some(blocks) = store.allocate_linked(needed, owner) {
            info!("Falling back to linked allocation for {}", owner);
            return Ok(Placement {
                record: AllocationRecord::Linked { blocks },
                relocation,
            });
        }

        Err(FsError::InsufficientStorage {
            requested: needed,
            free: store.free_blocks(),
        })
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy {
            large_file_threshold: 5,
            force_linked_prefixes: Vec::new(),
            auto_defragment: true,
        }
    }
}
