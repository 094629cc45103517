//! Fixed-size block array with per-strategy allocation primitives
//!
//! Each block is either free or owned by a file path, with a role marker for
//! index blocks. All scans are first-fit in index order, and every multi-block
//! claim rolls back on shortfall so a failed call never leaves blocks behind.

use crate::allocator::{AllocationRecord, BlockIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an owned block holds for its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockRole {
    Data,
    Index,
}

/// One cell of the storage array
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Free,
    Owned { owner: Arc<str>, role: BlockRole },
}

impl Block {
    pub fn is_free(&self) -> bool {
        matches!(self, Block::Free)
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            Block::Free => None,
            Block::Owned { owner, .. } => Some(owner),
        }
    }
}

/// Blocks claimed by [`BlockStore::allocate_indexed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBlocks {
    pub index_block: BlockIndex,
    pub data_blocks: Vec<BlockIndex>,
}

/// Old-to-new block index map produced by [`BlockStore::defragment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    moves: Vec<Option<BlockIndex>>,
}

impl Relocation {
    /// New position of a block; blocks the map does not know keep their index
    pub fn map(&self, old: BlockIndex) -> BlockIndex {
        self.moves.get(old).copied().flatten().unwrap_or(old)
    }

    /// Number of owned blocks whose index changed
    pub fn moved_blocks(&self) -> usize {
        self.moves
            .iter()
            .enumerate()
            .filter(|(old, new)| matches!(new, Some(n) if n != old))
            .count()
    }

    pub fn is_identity(&self) -> bool {
        self.moved_blocks() == 0
    }
}

/// Used/free/total counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub used: usize,
    pub free: usize,
    pub total: usize,
}

/// The simulated disk
#[derive(Debug, Clone)]
pub struct BlockStore {
    /// Block states, indexed by block number
    blocks: Vec<Block>,

    /// Bytes per block
    block_size: usize,

    /// Number of free blocks (kept in step with `blocks`)
    free_blocks: usize,
}

impl BlockStore {
    /// Create a store with every block free
    pub fn new(total_blocks: usize, block_size: usize) -> Self {
        BlockStore {
            blocks: vec![Block::Free; total_blocks],
            block_size: block_size.max(1),
            free_blocks: total_blocks,
        }
    }

    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn free_blocks(&self) -> usize {
        self.free_blocks
    }

    pub fn used_blocks(&self) -> usize {
        self.blocks.len() - self.free_blocks
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block(&self, index: BlockIndex) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Blocks needed to hold `len` bytes; empty content still takes one block
    pub fn blocks_needed(&self, len: usize) -> usize {
        len.div_ceil(self.block_size).max(1)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            used: self.used_blocks(),
            free: self.free_blocks,
            total: self.blocks.len(),
        }
    }

    fn claim(&mut self, index: BlockIndex, owner: &Arc<str>, role: BlockRole) {
        debug_assert!(self.blocks[index].is_free());
        self.blocks[index] = Block::Owned {
            owner: Arc::clone(owner),
            role,
        };
        self.free_blocks -= 1;
    }

    fn release(&mut self, index: BlockIndex) {
        if !self.blocks[index].is_free() {
            self.blocks[index] = Block::Free;
            self.free_blocks += 1;
        }
    }

    /// First index of the first run of `count` free blocks
    pub fn find_contiguous_run(&self, count: usize) -> Option<BlockIndex> {
        if count == 0 || count > self.free_blocks {
            return None;
        }

        let mut run_start = 0;
        let mut run_len = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.is_free() {
                if run_len == 0 {
                    run_start = index;
                }
                run_len += 1;
                if run_len == count {
                    return Some(run_start);
                }
            } else {
                run_len = 0;
            }
        }
        None
    }

    /// Claim `count` adjacent blocks for `owner`
    pub fn allocate_contiguous(&mut self, count: usize, owner: &str) -> Option<BlockIndex> {
        let start = self.find_contiguous_run(count)?;
        let owner: Arc<str> = Arc::from(owner);
        for index in start..start + count {
            self.claim(index, &owner, BlockRole::Data);
        }
        Some(start)
    }

    /// Claim the first `count` free blocks in index order
    ///
    /// Returns the chain in claim order. On shortfall every block claimed by
    /// this call is released again.
    pub fn allocate_linked(&mut self, count: usize, owner: &str) -> Option<Vec<BlockIndex>> {
        if count == 0 {
            return None;
        }

        let owner: Arc<str> = Arc::from(owner);
        let mut claimed = Vec::with_capacity(count);
        for index in 0..self.blocks.len() {
            if claimed.len() == count {
                break;
            }
            if self.blocks[index].is_free() {
                self.claim(index, &owner, BlockRole::Data);
                claimed.push(index);
            }
        }

        if claimed.len() != count {
            // Rollback
            for &index in &claimed {
                self.release(index);
            }
            return None;
        }

        Some(claimed)
    }

    /// Claim one index block followed by `data_count` data blocks
    ///
    /// On shortfall both the index block and any claimed data blocks are
    /// released again.
    pub fn allocate_indexed(&mut self, data_count: usize, owner: &str) -> Option<IndexedBlocks> {
        let owner: Arc<str> = Arc::from(owner);

        let index_block = self.blocks.iter().position(Block::is_free)?;
        self.claim(index_block, &owner, BlockRole::Index);

        let mut data_blocks = Vec::with_capacity(data_count);
        for index in 0..self.blocks.len() {
            if data_blocks.len() == data_count {
                break;
            }
            // the index block is already owned, so the scan skips it
            if self.blocks[index].is_free() {
                self.claim(index, &owner, BlockRole::Data);
                data_blocks.push(index);
            }
        }

        if data_blocks.len() != data_count {
            // Rollback
            for &index in &data_blocks {
                self.release(index);
            }
            self.release(index_block);
            return None;
        }

        Some(IndexedBlocks {
            index_block,
            data_blocks,
        })
    }

    /// Mark blocks free, returning how many actually changed state
    ///
    /// Out-of-range indices and already-free blocks are skipped with a warning.
    pub fn free(&mut self, blocks: &[BlockIndex]) -> usize {
        let mut freed = 0;
        for &index in blocks {
            if index >= self.blocks.len() {
                tracing::warn!("Ignoring free of out-of-range block {}", index);
                continue;
            }

            if self.blocks[index].is_free() {
                tracing::warn!("Double-free detected for block {}", index);
                continue;
            }

            self.release(index);
            freed += 1;
        }
        freed
    }

    /// Free every block a record names
    pub fn free_record(&mut self, record: &AllocationRecord) -> usize {
        self.free(&record.blocks())
    }

    /// Point a record's blocks at a new owner path
    pub fn retag(&mut self, record: &AllocationRecord, new_owner: &str) {
        let owner: Arc<str> = Arc::from(new_owner);
        for index in record.blocks() {
            if let Some(Block::Owned { owner: current, .. }) = self.blocks.get_mut(index) {
                *current = Arc::clone(&owner);
            }
        }
    }

    /// Compact owned blocks toward index 0
    ///
    /// Relative order, owner tags and roles are preserved; the tail of the
    /// array becomes free. The returned map must be applied to every live
    /// allocation record before anything else reads them.
    pub fn defragment(&mut self) -> Relocation {
        let total = self.blocks.len();
        let mut moves = vec![None; total];
        let mut compacted = Vec::with_capacity(total);

        for (old, block) in std::mem::take(&mut self.blocks).into_iter().enumerate() {
            if !block.is_free() {
                moves[old] = Some(compacted.len());
                compacted.push(block);
            }
        }
        compacted.resize(total, Block::Free);
        self.blocks = compacted;

        let relocation = Relocation { moves };
        tracing::info!(
            "Defragmented store: {} blocks moved, {} contiguous blocks free",
            relocation.moved_blocks(),
            self.free_blocks
        );
        relocation
    }

    /// Length of the longest run of free blocks
    pub fn largest_free_run(&self) -> usize {
        let mut best = 0;
        let mut current = 0;
        for block in &self.blocks {
            if block.is_free() {
                current += 1;
                best = best.max(current);
            } else {
                current = 0;
            }
        }
        best
    }

    /// Free/owned transitions normalised by the block count
    ///
    /// 0.0 for an empty or perfectly packed store, higher when owned blocks
    /// are scattered.
    pub fn fragmentation_score(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }

        let transitions = self
            .blocks
            .windows(2)
            .filter(|pair| pair[0].is_free() != pair[1].is_free())
            .count();

        (transitions as f64) / (self.blocks.len() as f64)
    }
}
