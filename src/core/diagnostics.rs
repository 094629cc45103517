//! Aggregate statistics and invariant checks

use crate::allocator::{Block, BlockIndex, BlockRole, BlockStore, Strategy};
use crate::catalog::NamespaceTree;
use crate::error::{FsError, Result};
use crate::validation::FsPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-strategy counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCounts {
    pub contiguous: usize,
    pub linked: usize,
    pub indexed: usize,
}

impl StrategyCounts {
    pub fn get(&self, strategy: Strategy) -> usize {
        match strategy {
            Strategy::Contiguous => self.contiguous,
            Strategy::Linked => self.linked,
            Strategy::Indexed => self.indexed,
        }
    }

    fn add(&mut self, strategy: Strategy, n: usize) {
        match strategy {
            Strategy::Contiguous => self.contiguous += n,
            Strategy::Linked => self.linked += n,
            Strategy::Indexed => self.indexed += n,
        }
    }

    pub fn total(&self) -> usize {
        self.contiguous + self.linked + self.indexed
    }
}

/// File system statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    pub used_blocks: usize,
    pub free_blocks: usize,
    pub total_blocks: usize,
    pub block_size: usize,
    pub file_count: usize,
    pub directory_count: usize,
    pub files_by_strategy: StrategyCounts,
    /// Index blocks count under `indexed`
    pub blocks_by_strategy: StrategyCounts,
    pub fragmentation_score: f64,
    pub largest_free_run: usize,
}

impl FsStats {
    pub fn collect(store: &BlockStore, tree: &NamespaceTree) -> Self {
        let mut files_by_strategy = StrategyCounts::default();
        let mut blocks_by_strategy = StrategyCounts::default();

        for (_, file) in tree.files() {
            if let Some(record) = &file.allocation {
                files_by_strategy.add(record.strategy(), 1);
                blocks_by_strategy.add(record.strategy(), record.block_count());
            }
        }

        let (file_count, directory_count) = tree.counts();
        let counters = store.stats();
        FsStats {
            used_blocks: counters.used,
            free_blocks: counters.free,
            total_blocks: counters.total,
            block_size: store.block_size(),
            file_count,
            directory_count,
            files_by_strategy,
            blocks_by_strategy,
            fragmentation_score: store.fragmentation_score(),
            largest_free_run: store.largest_free_run(),
        }
    }
}

/// Verify that store and tree agree
///
/// - used + free == total
/// - no block is named by two records, and every named block is in range
/// - every named block is owned by that file's path with the right role
/// - every owned block is named by some record
pub fn check_consistency(store: &BlockStore, tree: &NamespaceTree) -> Result<()> {
    let owned = store.blocks().iter().filter(|b| !b.is_free()).count();
    if owned != store.used_blocks() || owned + store.free_blocks() != store.total_blocks() {
        return Err(FsError::Inconsistent(format!(
            "counters disagree: {} owned, {} used, {} free, {} total",
            owned,
            store.used_blocks(),
            store.free_blocks(),
            store.total_blocks()
        )));
    }

    let mut seen: HashMap<BlockIndex, FsPath> = HashMap::new();
    for (path, file) in tree.files() {
        let record = file
            .allocation
            .as_ref()
            .ok_or_else(|| FsError::Inconsistent(format!("{} has no allocation", path)))?;

        for index in record.blocks() {
            if let Some(other) = seen.get(&index) {
                return Err(FsError::Inconsistent(format!(
                    "block {} referenced by both {} and {}",
                    index, other, path
                )));
            }

            let expected_role = if record.index_block() == Some(index) {
                BlockRole::Index
            } else {
                BlockRole::Data
            };
            match store.block(index) {
                Some(Block::Owned { owner, role })
                    if &**owner == path.as_str() && *role == expected_role => {}
                Some(block) => {
                    return Err(FsError::Inconsistent(format!(
                        "block {} named by {} but holds {:?}",
                        index, path, block
                    )))
                }
                None => {
                    return Err(FsError::Inconsistent(format!(
                        "block {} named by {} is out of range",
                        index, path
                    )))
                }
            }
            seen.insert(index, path.clone());
        }
    }

    if seen.len() != owned {
        return Err(FsError::Inconsistent(format!(
            "{} owned blocks but only {} referenced by files",
            owned,
            seen.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::AllocationRecord;
    use crate::catalog::{FileNode, Node};

    fn add_file(tree: &mut NamespaceTree, p: &str, record: AllocationRecord) {
        tree.insert(
            &FsPath::parse(p).unwrap(),
            Node::File(FileNode::new("", Vec::new(), record)),
        )
        .unwrap();
    }

    #[test]
    fn test_stats_by_strategy() {
        let mut store = BlockStore::new(20, 1);
        let mut tree = NamespaceTree::new();

        let start = store.allocate_contiguous(3, "/c").unwrap();
        add_file(&mut tree, "/c", AllocationRecord::Contiguous { start, count: 3 });
        let chain = store.allocate_linked(2, "/l").unwrap();
        add_file(&mut tree, "/l", AllocationRecord::Linked { blocks: chain });
        let idx = store.allocate_indexed(5, "/i").unwrap();
        add_file(
            &mut tree,
            "/i",
            AllocationRecord::Indexed {
                index_block: idx.index_block,
                data_blocks: idx.data_blocks,
            },
        );

        let stats = FsStats::collect(&store, &tree);
        assert_eq!(stats.used_blocks, 11);
        assert_eq!(stats.free_blocks, 9);
        assert_eq!(stats.file_count, 3);
        assert_eq!(stats.files_by_strategy.total(), 3);
        assert_eq!(stats.blocks_by_strategy.get(Strategy::Indexed), 6);
        assert_eq!(stats.blocks_by_strategy.total(), stats.used_blocks);
        assert!(check_consistency(&store, &tree).is_ok());
    }

    #[test]
    fn test_detects_orphan_block() {
        let mut store = BlockStore::new(10, 1);
        let tree = NamespaceTree::new();
        store.allocate_contiguous(1, "/ghost").unwrap();

        assert!(matches!(
            check_consistency(&store, &tree),
            Err(FsError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_detects_wrong_owner() {
        let mut store = BlockStore::new(10, 1);
        let mut tree = NamespaceTree::new();
        let start = store.allocate_contiguous(2, "/someone-else").unwrap();
        add_file(&mut tree, "/a", AllocationRecord::Contiguous { start, count: 2 });

        assert!(check_consistency(&store, &tree).is_err());
    }

    #[test]
    fn test_detects_shared_block() {
        let mut store = BlockStore::new(10, 1);
        let mut tree = NamespaceTree::new();
        let start = store.allocate_contiguous(1, "/a").unwrap();
        add_file(&mut tree, "/a", AllocationRecord::Contiguous { start, count: 1 });
        add_file(&mut tree, "/b", AllocationRecord::Linked { blocks: vec![start] });

        let err = check_consistency(&store, &tree).unwrap_err();
        assert!(err.to_string().contains("referenced by both"));
    }
}
