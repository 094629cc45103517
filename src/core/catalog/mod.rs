//! Namespace tree for files and directories
//!
//! The tree owns every node. Lookups walk path segments from the root; bulk
//! operations (listing all files, rewriting records after defragmentation,
//! re-tagging a moved subtree) use an explicit worklist.

pub mod metadata;

pub use metadata::{DirectoryNode, FileNode, FileType, Node};

use crate::allocator::{AllocationRecord, Relocation};
use crate::error::{FsError, Result};
use crate::validation::FsPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Just the name (e.g., "report.txt")
    pub name: String,

    pub is_directory: bool,

    /// Content length; 0 for directories
    pub size_bytes: u64,

    pub modified_at: DateTime<Utc>,

    /// Full path (e.g., "/documents/work/report.txt")
    pub path: String,
}

/// Ownership tree rooted at `/`
#[derive(Debug, Clone)]
pub struct NamespaceTree {
    root: Node,
}

impl NamespaceTree {
    pub fn new() -> Self {
        NamespaceTree {
            root: Node::Directory(DirectoryNode::new("")),
        }
    }

    /// Walk `path` from the root
    ///
    /// `None` when a segment is missing or an intermediate segment is a file.
    pub fn resolve(&self, path: &FsPath) -> Option<&Node> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = match current {
                Node::Directory(dir) => dir.children.get(segment)?,
                Node::File(_) => return None,
            };
        }
        Some(current)
    }

    pub fn resolve_mut(&mut self, path: &FsPath) -> Option<&mut Node> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = match current {
                Node::Directory(dir) => dir.children.get_mut(segment)?,
                Node::File(_) => return None,
            };
        }
        Some(current)
    }

    pub fn exists(&self, path: &FsPath) -> bool {
        self.resolve(path).is_some()
    }

    pub fn directory(&self, path: &FsPath) -> Result<&DirectoryNode> {
        self.resolve(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?
            .as_directory()
            .ok_or_else(|| FsError::NotADirectory(path.to_string()))
    }

    pub fn directory_mut(&mut self, path: &FsPath) -> Result<&mut DirectoryNode> {
        self.resolve_mut(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?
            .as_directory_mut()
            .ok_or_else(|| FsError::NotADirectory(path.to_string()))
    }

    pub fn file(&self, path: &FsPath) -> Result<&FileNode> {
        self.resolve(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?
            .as_file()
            .ok_or_else(|| FsError::NotAFile(path.to_string()))
    }

    pub fn file_mut(&mut self, path: &FsPath) -> Result<&mut FileNode> {
        self.resolve_mut(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?
            .as_file_mut()
            .ok_or_else(|| FsError::NotAFile(path.to_string()))
    }

    /// Entries of a directory in name order
    pub fn list(&self, path: &FsPath) -> Result<Vec<Entry>> {
        let dir = self.directory(path)?;
        Ok(dir
            .children
            .iter()
            .map(|(name, child)| Entry {
                name: name.clone(),
                is_directory: child.is_directory(),
                size_bytes: child.size(),
                modified_at: child.modified_at(),
                path: path.child(name).to_string(),
            })
            .collect())
    }

    /// Attach `node` under the parent of `path`, named after its last segment
    pub fn insert(&mut self, path: &FsPath, mut node: Node) -> Result<()> {
        let (parent, name) = split(path)?;
        let dir = self.directory_mut(&parent)?;
        if dir.children.contains_key(name) {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        node.set_name(name);
        dir.children.insert(name.to_string(), node);
        dir.touch();
        Ok(())
    }

    /// Remove and return the node at `path`
    pub fn detach(&mut self, path: &FsPath) -> Result<Node> {
        let (parent, name) = split(path)?;
        let dir = self.directory_mut(&parent)?;
        let node = dir
            .children
            .remove(name)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        dir.touch();
        Ok(node)
    }

    /// Every file in the tree with its full path, in path order
    pub fn files(&self) -> Vec<(FsPath, &FileNode)> {
        self.files_under(&FsPath::root())
    }

    /// Every file at or below `path`, in path order
    pub fn files_under(&self, path: &FsPath) -> Vec<(FsPath, &FileNode)> {
        let mut out = Vec::new();
        let Some(start) = self.resolve(path) else {
            return out;
        };

        let mut stack = vec![(path.clone(), start)];
        while let Some((node_path, node)) = stack.pop() {
            match node {
                Node::File(file) => out.push((node_path, file)),
                Node::Directory(dir) => {
                    for (name, child) in dir.children.iter().rev() {
                        stack.push((node_path.child(name), child));
                    }
                }
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Allocation records of every file at or below `path`
    pub fn records_under(&self, path: &FsPath) -> Vec<(FsPath, AllocationRecord)> {
        self.files_under(path)
            .into_iter()
            .filter_map(|(p, file)| file.allocation.clone().map(|rec| (p, rec)))
            .collect()
    }

    /// Number of (files, directories), the root not counted
    pub fn counts(&self) -> (usize, usize) {
        let mut files = 0;
        let mut dirs = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if let Node::Directory(dir) = node {
                for child in dir.children.values() {
                    match child {
                        Node::File(_) => files += 1,
                        Node::Directory(_) => {
                            dirs += 1;
                            stack.push(child);
                        }
                    }
                }
            }
        }
        (files, dirs)
    }

    /// Visit every file at or below `path` mutably
    pub fn for_each_file_mut<F>(&mut self, path: &FsPath, mut f: F)
    where
        F: FnMut(&FsPath, &mut FileNode),
    {
        let Some(start) = self.resolve_mut(path) else {
            return;
        };

        let mut stack = vec![(path.clone(), start)];
        while let Some((node_path, node)) = stack.pop() {
            match node {
                Node::File(file) => f(&node_path, file),
                Node::Directory(dir) => {
                    for (name, child) in dir.children.iter_mut() {
                        stack.push((node_path.child(name), child));
                    }
                }
            }
        }
    }

    /// Rewrite every live record through a defragmentation relocation
    pub fn relocate(&mut self, relocation: &Relocation) {
        self.for_each_file_mut(&FsPath::root(), |_, file| {
            if let Some(record) = file.allocation.as_ref() {
                file.allocation = Some(record.relocate(relocation));
            }
        });
    }
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Parent path and last segment; the root has neither
fn split(path: &FsPath) -> Result<(FsPath, &str)> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok((parent, name)),
        _ => Err(FsError::RootViolation("modify")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> FsPath {
        FsPath::parse(p).unwrap()
    }

    fn file(start: usize) -> Node {
        Node::File(FileNode::new(
            "",
            b"x".to_vec(),
            AllocationRecord::Contiguous { start, count: 1 },
        ))
    }

    fn sample_tree() -> NamespaceTree {
        let mut tree = NamespaceTree::new();
        tree.insert(&path("/docs"), Node::Directory(DirectoryNode::new("")))
            .unwrap();
        tree.insert(&path("/docs/work"), Node::Directory(DirectoryNode::new("")))
            .unwrap();
        tree.insert(&path("/docs/b.txt"), file(1)).unwrap();
        tree.insert(&path("/docs/work/a.txt"), file(2)).unwrap();
        tree.insert(&path("/top.txt"), file(0)).unwrap();
        tree
    }

    #[test]
    fn test_resolve() {
        let tree = sample_tree();
        assert!(tree.resolve(&FsPath::root()).unwrap().is_directory());
        assert_eq!(tree.resolve(&path("/docs/work/a.txt")).unwrap().name(), "a.txt");
        assert!(tree.resolve(&path("/missing")).is_none());
        // intermediate segment is a file
        assert!(tree.resolve(&path("/top.txt/child")).is_none());
    }

    #[test]
    fn test_typed_lookups() {
        let tree = sample_tree();
        assert!(matches!(tree.file(&path("/docs")), Err(FsError::NotAFile(_))));
        assert!(matches!(
            tree.directory(&path("/top.txt")),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(tree.file(&path("/nope")), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_list_is_name_ordered() {
        let tree = sample_tree();
        let entries = tree.list(&path("/docs")).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "work"]);
        assert_eq!(entries[0].path, "/docs/b.txt");
        assert_eq!(entries[0].size_bytes, 1);
        assert!(entries[1].is_directory);
    }

    #[test]
    fn test_insert_collision_and_missing_parent() {
        let mut tree = sample_tree();
        assert!(matches!(
            tree.insert(&path("/top.txt"), file(5)),
            Err(FsError::AlreadyExists(_))
        ));
        assert!(matches!(
            tree.insert(&path("/nope/x"), file(5)),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            tree.insert(&path("/top.txt/x"), file(5)),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(
            tree.insert(&FsPath::root(), file(5)),
            Err(FsError::RootViolation(_))
        ));
    }

    #[test]
    fn test_files_and_counts() {
        let tree = sample_tree();
        let paths: Vec<String> = tree.files().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["/docs/b.txt", "/docs/work/a.txt", "/top.txt"]);
        assert_eq!(tree.files_under(&path("/docs/work")).len(), 1);
        assert_eq!(tree.counts(), (3, 2));
    }

    #[test]
    fn test_detach_subtree() {
        let mut tree = sample_tree();
        let node = tree.detach(&path("/docs")).unwrap();
        assert!(node.is_directory());
        assert_eq!(tree.counts(), (1, 0));
        assert!(matches!(
            tree.detach(&path("/docs")),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_relocate_rewrites_records() {
        let mut tree = NamespaceTree::new();
        tree.insert(&path("/a"), file(4)).unwrap();

        // leave block 4 as the only owned block
        let mut store = crate::allocator::BlockStore::new(8, 1);
        store.allocate_contiguous(5, "/a").unwrap();
        store.free(&[0, 1, 2, 3]);
        let relocation = store.defragment();

        tree.relocate(&relocation);
        assert_eq!(
            tree.file(&path("/a")).unwrap().allocation,
            Some(AllocationRecord::Contiguous { start: 0, count: 1 })
        );
    }
}
