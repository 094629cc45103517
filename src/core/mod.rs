//! Block-management core
//!
//! - [`error`] - Error types and the machine-readable error kind
//! - [`validation`] - Path normalization ([`validation::FsPath`])
//! - [`config`] - Instance configuration, loadable from TOML
//! - [`allocator`] - Block store and allocation strategies:
//!   - [`allocator::store`] - Block array with contiguous, linked and indexed primitives
//!   - [`allocator::policy`] - Strategy selection and fallback chain
//! - [`catalog`] - Namespace tree of directories and files
//! - [`filesystem`] - Engine tying store, policy and tree together
//! - [`snapshot`] - Read-only export for visualization
//! - [`diagnostics`] - Statistics and consistency checks
//! - [`sample`] - Sample namespace for fresh instances

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filesystem;
pub mod sample;
pub mod snapshot;
pub mod validation;

pub use filesystem::FileSystem;
