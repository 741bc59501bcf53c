//! Error types for tree operations and persistence

use crate::BlockId;
use thiserror::Error;

/// A path or id could not be resolved against the current tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathResolutionError {
    #[error("Path must not be empty")]
    EmptyPath,

    #[error("Index {index} out of range at {path:?} (len {len})")]
    OutOfRange {
        path: Vec<usize>,
        index: usize,
        len: usize,
    },

    #[error("No block at parent path {0:?}")]
    MissingParent(Vec<usize>),

    #[error("Block at {0:?} cannot hold children")]
    NotAContainer(Vec<usize>),

    #[error("Block not found: {0}")]
    UnknownId(BlockId),
}

/// A save, load or publish call against the persistence layer failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Network, server or storage failure; the call may succeed on retry
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Not authorized for organization {0}")]
    Unauthorized(String),

    /// The backend refused the payload itself
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("No draft exists for widget {0}")]
    NoDraft(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PersistenceError {
    /// Flatten an `anyhow` chain into a storage error
    pub fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", err))
    }
}

/// Publish was refused and no version was created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Draft has {0} validation issue(s)")]
    InvalidDraft(usize),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
