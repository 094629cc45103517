use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Cannot {0} the root directory")]
    RootViolation(&'static str),

    #[error("Insufficient storage: {requested} blocks requested, {free} free")]
    InsufficientStorage { requested: usize, free: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inconsistent block state: {0}")]
    Inconsistent(String),
}

/// Machine-readable error category carried across the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NotADirectory,
    NotAFile,
    AlreadyExists,
    RootViolation,
    InsufficientStorage,
    InvalidArgument,
    Config,
    Inconsistent,
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::NotADirectory(_) => ErrorKind::NotADirectory,
            FsError::NotAFile(_) => ErrorKind::NotAFile,
            FsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FsError::RootViolation(_) => ErrorKind::RootViolation,
            FsError::InsufficientStorage { .. } => ErrorKind::InsufficientStorage,
            FsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FsError::Config(_) | FsError::Io(_) => ErrorKind::Config,
            FsError::Inconsistent(_) => ErrorKind::Inconsistent,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
