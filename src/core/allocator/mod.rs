//! Block allocation for the simulated disk
//!
//! The allocator is split in two layers:
//! - [`store::BlockStore`] owns the block array and the per-strategy primitives
//! - [`policy::AllocationPolicy`] picks a strategy and walks the fallback chain
//!
//! Every file owns exactly one [`AllocationRecord`] describing where its
//! blocks live.

pub mod policy;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use policy::{AllocationPolicy, Placement};
pub use store::{Block, BlockRole, BlockStore, IndexedBlocks, Relocation, StoreStats};

/// Position of a block in the store (0..N-1)
pub type BlockIndex = usize;

/// Allocation strategy a file ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Contiguous,
    Linked,
    Indexed,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Contiguous, Strategy::Linked, Strategy::Indexed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Contiguous => "contiguous",
            Strategy::Linked => "linked",
            Strategy::Indexed => "indexed",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a file's blocks live
///
/// Each variant carries only what its strategy needs, so freeing, relocating
/// and reporting are exhaustive matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AllocationRecord {
    /// Blocks `[start, start + count)`
    Contiguous { start: BlockIndex, count: usize },

    /// Scattered blocks in chain order
    Linked { blocks: Vec<BlockIndex> },

    /// One index block listing scattered data blocks
    Indexed {
        index_block: BlockIndex,
        data_blocks: Vec<BlockIndex>,
    },
}

impl AllocationRecord {
    pub fn strategy(&self) -> Strategy {
        match self {
            AllocationRecord::Contiguous { .. } => Strategy::Contiguous,
            AllocationRecord::Linked { .. } => Strategy::Linked,
            AllocationRecord::Indexed { .. } => Strategy::Indexed,
        }
    }

    /// Total blocks held, index block included
    pub fn block_count(&self) -> usize {
        match self {
            AllocationRecord::Contiguous { count, .. } => *count,
            AllocationRecord::Linked { blocks } => blocks.len(),
            AllocationRecord::Indexed { data_blocks, .. } => data_blocks.len() + 1,
        }
    }

    /// Every block the record names; for indexed records the index block comes first
    pub fn blocks(&self) -> Vec<BlockIndex> {
        match self {
            AllocationRecord::Contiguous { start, count } => (*start..*start + *count).collect(),
            AllocationRecord::Linked { blocks } => blocks.clone(),
            AllocationRecord::Indexed {
                index_block,
                data_blocks,
            } => {
                let mut all = Vec::with_capacity(data_blocks.len() + 1);
                all.push(*index_block);
                all.extend_from_slice(data_blocks);
                all
            }
        }
    }

    /// The index block, if this record has one
    pub fn index_block(&self) -> Option<BlockIndex> {
        match self {
            AllocationRecord::Indexed { index_block, .. } => Some(*index_block),
            _ => None,
        }
    }

    /// Rewrite every block index through a defragmentation relocation
    pub fn relocate(&self, relocation: &Relocation) -> AllocationRecord {
        match self {
            AllocationRecord::Contiguous { start, count } => AllocationRecord::Contiguous {
                // compaction keeps relative order, so a run stays a run
                start: relocation.map(*start),
                count: *count,
            },
            AllocationRecord::Linked { blocks } => AllocationRecord::Linked {
                blocks: blocks.iter().map(|&b| relocation.map(b)).collect(),
            },
            AllocationRecord::Indexed {
                index_block,
                data_blocks,
            } => AllocationRecord::Indexed {
                index_block: relocation.map(*index_block),
                data_blocks: data_blocks.iter().map(|&b| relocation.map(b)).collect(),
            },
        }
    }
}

impl fmt::Display for AllocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationRecord::Contiguous { start, count } => {
                write!(f, "contiguous [{}..{})", start, start + count)
            }
            AllocationRecord::Linked { blocks } => {
                let chain: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
                write!(f, "linked {}", chain.join(" -> "))
            }
            AllocationRecord::Indexed {
                index_block,
                data_blocks,
            } => {
                let data: Vec<String> = data_blocks.iter().map(|b| b.to_string()).collect();
                write!(f, "indexed index={} data=[{}]", index_block, data.join(", "))
            }
        }
    }
}
