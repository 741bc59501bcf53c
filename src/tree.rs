//! # Block Tree
//!
//! Path-addressed algebra over an ordered forest of blocks.
//!
//! A path is a sequence of child indices walked from the root list; the empty
//! path denotes the root list itself. Paths go stale after any mutation, so
//! callers resolve them by id right before each operation.
//!
//! Every mutating operation takes the forest by shared reference and returns a
//! new one. The input is never touched, which lets callers build a result in a
//! scratch copy and drop it on failure.

use crate::{Block, BlockId, PathResolutionError};

/// Index sequence locating a node
pub type Path = Vec<usize>;

/// Get the block at `path`. Stale or out-of-range paths yield `None`.
pub fn get_at_path<'a>(root: &'a [Block], path: &[usize]) -> Option<&'a Block> {
    let (first, rest) = path.split_first()?;
    let mut node = root.get(*first)?;
    for index in rest {
        node = node.children().get(*index)?;
    }
    Some(node)
}

/// Replace the block at `path` with `value`
pub fn set_at_path(
    root: &[Block],
    path: &[usize],
    value: Block,
) -> Result<Vec<Block>, PathResolutionError> {
    let (index, parent) = split_target(path)?;
    let mut next = root.to_vec();
    let siblings = children_at_mut(&mut next, parent)?;
    let len = siblings.len();
    let slot = siblings
        .get_mut(index)
        .ok_or_else(|| PathResolutionError::OutOfRange {
            path: path.to_vec(),
            index,
            len,
        })?;
    *slot = value;
    Ok(next)
}

/// Remove exactly one block; its descendants travel with it
pub fn remove_at_path(
    root: &[Block],
    path: &[usize],
) -> Result<(Vec<Block>, Block), PathResolutionError> {
    let (index, parent) = split_target(path)?;
    let mut next = root.to_vec();
    let siblings = children_at_mut(&mut next, parent)?;
    if index >= siblings.len() {
        return Err(PathResolutionError::OutOfRange {
            path: path.to_vec(),
            index,
            len: siblings.len(),
        });
    }
    let removed = siblings.remove(index);
    Ok((next, removed))
}

/// Insert `block` so that it ends up at `path`.
///
/// The last component is an index into the parent's children in `[0, len]`,
/// where `len` appends.
pub fn insert_at_path(
    root: &[Block],
    path: &[usize],
    block: Block,
) -> Result<Vec<Block>, PathResolutionError> {
    let (index, parent) = split_target(path)?;
    let mut next = root.to_vec();
    let siblings = children_at_mut(&mut next, parent)?;
    if index > siblings.len() {
        return Err(PathResolutionError::OutOfRange {
            path: path.to_vec(),
            index,
            len: siblings.len(),
        });
    }
    siblings.insert(index, block);
    Ok(next)
}

/// Depth-first search for `id`; the first match wins.
///
/// Ids are unique by invariant. A second match means the document is corrupt
/// and is reported as an error rather than silently ignored.
pub fn find_path_by_id(root: &[Block], id: &BlockId) -> Option<Path> {
    let mut found: Option<Path> = None;
    walk(root, &mut |block, path| {
        if &block.id != id {
            return;
        }
        match &found {
            None => found = Some(path.to_vec()),
            Some(first) => tracing::error!(
                block_id = %id,
                first = ?first,
                duplicate = ?path,
                "duplicate block id in forest"
            ),
        }
    });
    found
}

/// Child list under `parent`; the empty path is the root list.
/// `None` when the parent is missing or cannot hold children.
pub fn children_at<'a>(root: &'a [Block], parent: &[usize]) -> Option<&'a [Block]> {
    if parent.is_empty() {
        return Some(root);
    }
    get_at_path(root, parent)?.children.as_deref()
}

/// Path of the list containing `path`, `None` for the empty path
pub fn parent_path(path: &[usize]) -> Option<&[usize]> {
    path.split_last().map(|(_, parent)| parent)
}

/// Whether `ancestor` is a strict prefix of `path`
pub fn is_ancestor_path(ancestor: &[usize], path: &[usize]) -> bool {
    ancestor.len() < path.len() && path.starts_with(ancestor)
}

/// Pre-order traversal, handing each block its current path
pub fn walk<'a, F>(root: &'a [Block], visit: &mut F)
where
    F: FnMut(&'a Block, &[usize]),
{
    fn go<'a, F>(blocks: &'a [Block], path: &mut Path, visit: &mut F)
    where
        F: FnMut(&'a Block, &[usize]),
    {
        for (index, block) in blocks.iter().enumerate() {
            path.push(index);
            visit(block, path);
            go(block.children(), path, visit);
            path.pop();
        }
    }

    go(root, &mut Vec::new(), visit);
}

/// All ids in pre-order
pub fn collect_ids(root: &[Block]) -> Vec<BlockId> {
    let mut ids = Vec::new();
    walk(root, &mut |block, _| ids.push(block.id.clone()));
    ids
}

/// Total number of blocks, descendants included
pub fn count_blocks(root: &[Block]) -> usize {
    root.iter().map(|b| 1 + count_blocks(b.children())).sum()
}

pub fn contains_id(root: &[Block], id: &BlockId) -> bool {
    root.iter()
        .any(|b| &b.id == id || contains_id(b.children(), id))
}

fn split_target(path: &[usize]) -> Result<(usize, &[usize]), PathResolutionError> {
    path.split_last()
        .map(|(index, parent)| (*index, parent))
        .ok_or(PathResolutionError::EmptyPath)
}

fn children_at_mut<'a>(
    root: &'a mut Vec<Block>,
    parent: &[usize],
) -> Result<&'a mut Vec<Block>, PathResolutionError> {
    let mut list = root;
    for (depth, index) in parent.iter().enumerate() {
        let here = &parent[..=depth];
        list = match list.get_mut(*index) {
            Some(node) => node
                .children
                .as_mut()
                .ok_or_else(|| PathResolutionError::NotAContainer(here.to_vec()))?,
            None => return Err(PathResolutionError::MissingParent(here.to_vec())),
        };
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    /// a, b{c, d{e}}, f
    fn sample() -> Vec<Block> {
        vec![
            Block::text("a", "A"),
            Block::container(
                "b",
                vec![
                    Block::text("c", "C"),
                    Block::container("d", vec![Block::text("e", "E")]),
                ],
            ),
            Block::text("f", "F"),
        ]
    }

    fn ids(root: &[Block]) -> Vec<String> {
        collect_ids(root).iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_get_at_path() {
        let tree = sample();
        assert_eq!(get_at_path(&tree, &[0]).unwrap().id, BlockId::from("a"));
        assert_eq!(get_at_path(&tree, &[1, 1, 0]).unwrap().id, BlockId::from("e"));
        assert!(get_at_path(&tree, &[]).is_none());
        assert!(get_at_path(&tree, &[7]).is_none());
        assert!(get_at_path(&tree, &[0, 0]).is_none());
        assert!(get_at_path(&tree, &[1, 5]).is_none());
    }

    #[test]
    fn test_set_at_path_leaves_input_untouched() {
        let tree = sample();
        let next = set_at_path(&tree, &[1, 0], Block::text("x", "X")).unwrap();

        assert_eq!(get_at_path(&next, &[1, 0]).unwrap().id, BlockId::from("x"));
        assert_eq!(tree, sample());
    }

    #[test]
    fn test_set_at_path_errors() {
        let tree = sample();
        assert_eq!(
            set_at_path(&tree, &[], Block::text("x", "")),
            Err(PathResolutionError::EmptyPath)
        );
        assert_matches!(
            set_at_path(&tree, &[3], Block::text("x", "")),
            Err(PathResolutionError::OutOfRange { index: 3, len: 3, .. })
        );
    }

    #[test]
    fn test_remove_carries_subtree() {
        let tree = sample();
        let (next, removed) = remove_at_path(&tree, &[1]).unwrap();

        assert_eq!(removed.id, BlockId::from("b"));
        assert_eq!(ids(&[removed]), vec!["b", "c", "d", "e"]);
        assert_eq!(ids(&next), vec!["a", "f"]);
        assert_eq!(tree, sample());
    }

    #[test]
    fn test_remove_nested() {
        let tree = sample();
        let (next, removed) = remove_at_path(&tree, &[1, 1, 0]).unwrap();

        assert_eq!(removed.id, BlockId::from("e"));
        assert!(get_at_path(&next, &[1, 1]).unwrap().children().is_empty());
    }

    #[test]
    fn test_remove_out_of_range() {
        let tree = sample();
        assert_matches!(
            remove_at_path(&tree, &[1, 2]),
            Err(PathResolutionError::OutOfRange { index: 2, len: 2, .. })
        );
        assert_eq!(
            remove_at_path(&tree, &[9, 0]),
            Err(PathResolutionError::MissingParent(vec![9]))
        );
    }

    #[test]
    fn test_insert_index_bounds() {
        let tree = sample();

        let appended = insert_at_path(&tree, &[3], Block::text("z", "")).unwrap();
        assert_eq!(ids(&appended).last().map(String::as_str), Some("z"));

        let front = insert_at_path(&tree, &[1, 0], Block::text("z", "")).unwrap();
        assert_eq!(get_at_path(&front, &[1, 0]).unwrap().id, BlockId::from("z"));

        assert_matches!(
            insert_at_path(&tree, &[4], Block::text("z", "")),
            Err(PathResolutionError::OutOfRange { index: 4, len: 3, .. })
        );
    }

    #[test]
    fn test_insert_into_leaf_fails() {
        let tree = sample();
        assert_eq!(
            insert_at_path(&tree, &[0, 0], Block::text("z", "")),
            Err(PathResolutionError::NotAContainer(vec![0]))
        );
        assert_eq!(
            insert_at_path(&tree, &[5, 0], Block::text("z", "")),
            Err(PathResolutionError::MissingParent(vec![5]))
        );
        assert_eq!(
            insert_at_path(&tree, &[], Block::text("z", "")),
            Err(PathResolutionError::EmptyPath)
        );
    }

    #[test]
    fn test_find_path_by_id() {
        let tree = sample();
        assert_eq!(find_path_by_id(&tree, &"e".into()), Some(vec![1, 1, 0]));
        assert_eq!(find_path_by_id(&tree, &"f".into()), Some(vec![2]));
        assert_eq!(find_path_by_id(&tree, &"missing".into()), None);
    }

    #[test]
    fn test_find_path_with_duplicate_returns_first() {
        let tree = vec![
            Block::container("box", vec![Block::text("dup", "1")]),
            Block::text("dup", "2"),
        ];
        assert_eq!(find_path_by_id(&tree, &"dup".into()), Some(vec![0, 0]));
    }

    #[test]
    fn test_remove_then_insert_restores() {
        let tree = sample();
        for path in [vec![0], vec![1], vec![1, 1], vec![1, 1, 0], vec![2]] {
            let (without, removed) = remove_at_path(&tree, &path).unwrap();
            let restored = insert_at_path(&without, &path, removed).unwrap();
            assert_eq!(restored, tree, "path {:?}", path);
        }
    }

    #[test]
    fn test_helpers() {
        let tree = sample();
        assert_eq!(count_blocks(&tree), 6);
        assert!(contains_id(&tree, &"e".into()));
        assert!(!contains_id(&tree, &"q".into()));
        assert_eq!(children_at(&tree, &[]).map(<[Block]>::len), Some(3));
        assert_eq!(children_at(&tree, &[1]).map(<[Block]>::len), Some(2));
        assert!(children_at(&tree, &[0]).is_none());
        assert_eq!(parent_path(&[1, 1, 0]), Some(&[1, 1][..]));
        assert_eq!(parent_path(&[]), None);
        assert!(is_ancestor_path(&[1], &[1, 1, 0]));
        assert!(!is_ancestor_path(&[1, 1, 0], &[1, 1, 0]));
        assert!(!is_ancestor_path(&[2], &[1, 0]));
    }
}
