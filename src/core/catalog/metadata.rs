//! Node types of the namespace tree

use crate::allocator::{AllocationRecord, Strategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// A regular file and the blocks backing it
///
/// The node exclusively owns its allocation record; deleting the node must
/// release exactly the blocks the record names.
#[derive(Debug, Clone)]
pub struct FileNode {
    pub name: String,

    /// Raw content bytes
    pub content: Vec<u8>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    /// `None` only between node construction and its first placement
    pub allocation: Option<AllocationRecord>,
}

impl FileNode {
    pub fn new(name: impl Into<String>, content: Vec<u8>, allocation: AllocationRecord) -> Self {
        let now = Utc::now();
        FileNode {
            name: name.into(),
            content,
            created_at: now,
            modified_at: now,
            allocation: Some(allocation),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.allocation.as_ref().map(AllocationRecord::strategy)
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// A directory; children are keyed by name in byte order
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub name: String,
    pub children: BTreeMap<String, Node>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        DirectoryNode {
            name: name.into(),
            children: BTreeMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// Tree node: a directory or a file
#[derive(Debug, Clone)]
pub enum Node {
    Directory(DirectoryNode),
    File(FileNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Directory(dir) => &dir.name,
            Node::File(file) => &file.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Node::Directory(dir) => dir.name = name.into(),
            Node::File(file) => file.name = name.into(),
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            Node::Directory(_) => FileType::Directory,
            Node::File(_) => FileType::File,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut DirectoryNode> {
        match self {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    /// Content length for files, 0 for directories
    pub fn size(&self) -> u64 {
        match self {
            Node::File(file) => file.size(),
            Node::Directory(_) => 0,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Node::Directory(dir) => dir.created_at,
            Node::File(file) => file.created_at,
        }
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        match self {
            Node::Directory(dir) => dir.modified_at,
            Node::File(file) => file.modified_at,
        }
    }
}
