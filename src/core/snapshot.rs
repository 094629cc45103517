//! Read-only snapshots of the block array and file tree for display
//!
//! A snapshot is a detached copy: building one never touches the store or the
//! tree, and nothing done to a snapshot flows back.

use crate::allocator::{AllocationRecord, Block, BlockRole, BlockStore};
use crate::catalog::NamespaceTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Display state of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum BlockTag {
    Free,
    Data { owner: String },
    Index { owner: String },
}

impl BlockTag {
    pub fn owner(&self) -> Option<&str> {
        match self {
            BlockTag::Free => None,
            BlockTag::Data { owner } | BlockTag::Index { owner } => Some(owner),
        }
    }
}

impl From<&Block> for BlockTag {
    fn from(block: &Block) -> Self {
        match block {
            Block::Free => BlockTag::Free,
            Block::Owned {
                owner,
                role: BlockRole::Data,
            } => BlockTag::Data {
                owner: owner.to_string(),
            },
            Block::Owned {
                owner,
                role: BlockRole::Index,
            } => BlockTag::Index {
                owner: owner.to_string(),
            },
        }
    }
}

/// One file as seen by the visualizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    /// Content decoded as UTF-8 (lossy)
    pub content: String,
    pub size_bytes: u64,
    pub allocation: Option<AllocationRecord>,
}

/// Flattened view of the whole file system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub block_size: usize,
    pub blocks: Vec<BlockTag>,
    pub files: BTreeMap<String, FileView>,
}

impl Snapshot {
    pub fn capture(store: &BlockStore, tree: &NamespaceTree) -> Self {
        let blocks = store.blocks().iter().map(BlockTag::from).collect();
        let files = tree
            .files()
            .into_iter()
            .map(|(path, file)| {
                (
                    path.to_string(),
                    FileView {
                        content: String::from_utf8_lossy(&file.content).into_owned(),
                        size_bytes: file.size(),
                        allocation: file.allocation.clone(),
                    },
                )
            })
            .collect();

        Snapshot {
            block_size: store.block_size(),
            blocks,
            files,
        }
    }

    /// Text rendering of the block array, `width` blocks per row
    ///
    /// Free blocks print as `.`, index blocks as `#`, data blocks as the
    /// owning file's legend symbol. The legend follows the map.
    pub fn render_block_map(&self, width: usize) -> String {
        const SYMBOLS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let width = width.max(1);

        let symbol_of: BTreeMap<&str, char> = self
            .files
            .keys()
            .enumerate()
            .map(|(i, path)| (path.as_str(), SYMBOLS[i % SYMBOLS.len()] as char))
            .collect();

        let mut out = String::new();
        for (row, chunk) in self.blocks.chunks(width).enumerate() {
            let _ = write!(out, "{:>5} | ", row * width);
            for tag in chunk {
                let c = match tag {
                    BlockTag::Free => '.',
                    BlockTag::Index { .. } => '#',
                    BlockTag::Data { owner } => symbol_of.get(owner.as_str()).copied().unwrap_or('?'),
                };
                out.push(c);
            }
            out.push('\n');
        }

        for (path, view) in &self.files {
            let symbol = symbol_of.get(path.as_str()).copied().unwrap_or('?');
            let strategy = view
                .allocation
                .as_ref()
                .map(|r| r.strategy().as_str())
                .unwrap_or("unallocated");
            let _ = writeln!(out, "{} = {} ({})", symbol, path, strategy);
        }
        out
    }
}
