//! # Drag Reorder Engine
//!
//! Turns a pointer drag gesture into one remove + insert pair on the forest.
//!
//! ## Drop targets
//!
//! - **Slot** `(parent, index)`: insert at `index` of `parent`'s children, where
//!   `index` is read against the list *after* the dragged block was removed.
//!   `ROOT_ID` addresses the root list.
//! - **Inside** `parent`: append to the end of `parent`'s children.
//! - **Block** `id`: reorder among siblings only. The dragged block lands at the
//!   index the target occupied before the move. Targets under a different
//!   parent are rejected; those drops go through a slot or inside target.
//!
//! ## Index shift
//!
//! Removing the dragged block shifts every later sibling down by one, so the
//! destination path is always resolved by id in the post-removal tree, never
//! computed up front.
//!
//! The whole gesture is built on a scratch copy. Any resolution failure drops
//! the copy and leaves the caller's tree untouched.

use crate::tree::{self, Path};
use crate::{Block, BlockId, PathResolutionError};
use serde::{Deserialize, Serialize};

/// Sentinel parent id addressing the root list
pub const ROOT_ID: &str = "__root__";

/// Where the pointer was released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropTarget {
    /// Another block; same-parent reorder only
    Block(BlockId),
    /// Explicit drop zone inside `parent` at `index`
    Slot { parent: BlockId, index: usize },
    /// A container's "drop inside" zone; appends
    Inside(BlockId),
}

impl DropTarget {
    /// Slot in the root list
    pub fn root_slot(index: usize) -> Self {
        Self::Slot {
            parent: BlockId::new(ROOT_ID),
            index,
        }
    }
}

/// A completed drag: the block being dragged and where it was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragGesture {
    pub active_id: BlockId,
    pub over: DropTarget,
}

impl DragGesture {
    pub fn new(active_id: impl Into<BlockId>, over: DropTarget) -> Self {
        Self {
            active_id: active_id.into(),
            over,
        }
    }
}

/// Result of interpreting a gesture
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// The forest changed
    Moved {
        blocks: Vec<Block>,
        from: Path,
        to: Path,
    },
    /// Dropped where it already was
    NoOp,
    /// Gesture abandoned; nothing changed
    Rejected(DragRejection),
}

/// Why a gesture was abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragRejection {
    /// The dragged block no longer exists
    StaleSource,
    /// Bare block target under a different parent
    CrossParent,
    /// Target parent is the dragged block or one of its descendants
    IntoOwnSubtree,
    /// A path or id failed to resolve mid-gesture
    Unresolved(PathResolutionError),
}

impl From<PathResolutionError> for DragRejection {
    fn from(err: PathResolutionError) -> Self {
        Self::Unresolved(err)
    }
}

/// Interprets drag gestures against a forest
pub struct DragReorderEngine;

impl DragReorderEngine {
    /// Apply `gesture` to `root`, returning the new forest on success
    pub fn apply(root: &[Block], gesture: &DragGesture) -> DragOutcome {
        match Self::plan(root, gesture) {
            Ok(Some((blocks, from, to))) => {
                tracing::debug!(
                    block_id = %gesture.active_id,
                    from = ?from,
                    to = ?to,
                    "drag moved block"
                );
                DragOutcome::Moved { blocks, from, to }
            }
            Ok(None) => {
                tracing::trace!(block_id = %gesture.active_id, "drag dropped in place");
                DragOutcome::NoOp
            }
            Err(reason) => {
                tracing::debug!(
                    block_id = %gesture.active_id,
                    reason = ?reason,
                    "drag gesture abandoned"
                );
                DragOutcome::Rejected(reason)
            }
        }
    }

    fn plan(
        root: &[Block],
        gesture: &DragGesture,
    ) -> Result<Option<(Vec<Block>, Path, Path)>, DragRejection> {
        let active = &gesture.active_id;
        let from = tree::find_path_by_id(root, active).ok_or(DragRejection::StaleSource)?;

        // Checks that need the pre-removal tree
        let reorder_index = match &gesture.over {
            DropTarget::Block(over) => {
                if over == active {
                    return Ok(None);
                }
                let to = tree::find_path_by_id(root, over)
                    .ok_or_else(|| PathResolutionError::UnknownId(over.clone()))?;
                if tree::parent_path(&to) != tree::parent_path(&from) {
                    return Err(DragRejection::CrossParent);
                }
                to.last().copied()
            }
            DropTarget::Slot { parent, .. } | DropTarget::Inside(parent) => {
                if parent == active {
                    return Err(DragRejection::IntoOwnSubtree);
                }
                let parent_path = resolve_parent(root, parent)?;
                if tree::is_ancestor_path(&from, &parent_path) {
                    return Err(DragRejection::IntoOwnSubtree);
                }
                None
            }
        };

        let (scratch, moved) = tree::remove_at_path(root, &from)?;

        let to = match &gesture.over {
            DropTarget::Slot { parent, index } => {
                let mut path = resolve_parent(&scratch, parent)?;
                path.push(*index);
                path
            }
            DropTarget::Inside(parent) => {
                let mut path = resolve_parent(&scratch, parent)?;
                let len = tree::children_at(&scratch, &path)
                    .ok_or_else(|| PathResolutionError::NotAContainer(path.clone()))?
                    .len();
                path.push(len);
                path
            }
            DropTarget::Block(_) => {
                let index = reorder_index.ok_or(PathResolutionError::EmptyPath)?;
                let mut path = match sibling_parent_id(root, &from) {
                    Some(parent) => resolve_parent(&scratch, &parent)?,
                    None => Vec::new(),
                };
                path.push(index);
                path
            }
        };

        if to == from {
            return Ok(None);
        }

        let blocks = tree::insert_at_path(&scratch, &to, moved)?;
        Ok(Some((blocks, from, to)))
    }
}

/// Path of `parent` in `root`; `ROOT_ID` is the root list
fn resolve_parent(root: &[Block], parent: &BlockId) -> Result<Path, PathResolutionError> {
    if parent.as_str() == ROOT_ID {
        return Ok(Vec::new());
    }
    tree::find_path_by_id(root, parent).ok_or_else(|| PathResolutionError::UnknownId(parent.clone()))
}

/// Id of the block whose children contain `path`, `None` for root-level blocks
fn sibling_parent_id(root: &[Block], path: &[usize]) -> Option<BlockId> {
    let parent = tree::parent_path(path)?;
    tree::get_at_path(root, parent).map(|block| block.id.clone())
}
