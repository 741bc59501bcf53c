//! Block id generator
//! Produces lowercase ULID strings, skipping any id already present in the forest.
//! Used for palette inserts and for paste/duplicate, which re-id a whole subtree.

use crate::tree;
use crate::{Block, BlockId};
use std::collections::HashSet;
use ulid::{Generator, Ulid};

pub struct IdGenerator {
    /// Monotonic within one session, so ids minted together sort in creation order
    generator: Generator,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    /// Generate an id that is not in `taken`
    pub fn next_id(&mut self, taken: &HashSet<BlockId>) -> BlockId {
        loop {
            // Overflow of the monotonic counter within one millisecond falls back to a random ULID
            let ulid = self.generator.generate().unwrap_or_else(|_| Ulid::new());
            let id = BlockId::new(ulid.to_string().to_ascii_lowercase());
            if !taken.contains(&id) {
                return id;
            }
        }
    }

    /// Deep copy of `block` where every id in the subtree is fresh.
    /// New ids are added to `taken` as they are minted.
    pub fn fresh_copy(&mut self, block: &Block, taken: &mut HashSet<BlockId>) -> Block {
        let id = self.next_id(taken);
        taken.insert(id.clone());

        let children = block.children.as_ref().map(|children| {
            children
                .iter()
                .map(|child| self.fresh_copy(child, taken))
                .collect()
        });

        Block {
            id,
            block_type: block.block_type.clone(),
            version: block.version,
            data: block.data.clone(),
            children,
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Every id currently used in the forest
pub fn taken_ids(root: &[Block]) -> HashSet<BlockId> {
    tree::collect_ids(root).into_iter().collect()
}
