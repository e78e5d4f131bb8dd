//! Ordered forest with drag-and-drop style moves.
//!
//! Nodes live in nested `Vec`s; sibling order is the vector order. Moves are
//! pure in-memory operations, persistence is left to the caller through
//! [`flatten_order`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;
use utoipa::ToSchema;

/// Where a dragged node lands relative to the hovered one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Above,
    Below,
    Inside,
}

impl DropPosition {
    /// Top 20% of the row is `Above`, bottom 20% is `Below`, the rest `Inside`.
    pub fn from_pointer(offset_y: f64, height: f64) -> Self {
        if height <= 0.0 || !height.is_finite() || !offset_y.is_finite() {
            return Self::Inside;
        }
        let relative = offset_y / height;
        if relative < 0.2 {
            Self::Above
        } else if relative > 0.8 {
            Self::Below
        } else {
            Self::Inside
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<Id, T> {
    pub id: Id,
    pub data: T,
    pub children: Vec<TreeNode<Id, T>>,
    pub expanded: bool,
}

impl<Id, T> TreeNode<Id, T> {
    pub fn new(id: Id, data: T) -> Self {
        Self {
            id,
            data,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Number of levels in this subtree, counting the node itself
    pub fn height(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeNode::height)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError<Id: Debug> {
    #[error("Node {0:?} not found")]
    NodeNotFound(Id),
    #[error("Cannot move {dragged:?} into its own subtree at {target:?}")]
    CycleDetected { dragged: Id, target: Id },
    #[error("Move would nest items {depth} levels deep (max {max})")]
    MaxDepthExceeded { depth: usize, max: usize },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveOptions {
    /// Maximum number of levels, roots being level 1
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome<Id> {
    Unchanged,
    Moved { parent: Option<Id>, index: usize },
}

/// One row of the persisted ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatPosition<Id> {
    pub id: Id,
    pub parent_id: Option<Id>,
    pub order_index: usize,
}

pub fn find_node<'a, Id: PartialEq, T>(
    nodes: &'a [TreeNode<Id, T>],
    id: &Id,
) -> Option<&'a TreeNode<Id, T>> {
    for node in nodes {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut<'a, Id: PartialEq, T>(
    nodes: &'a mut [TreeNode<Id, T>],
    id: &Id,
) -> Option<&'a mut TreeNode<Id, T>> {
    for node in nodes {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// `None` when absent, `Some(None)` for a root, `Some(Some(parent))` otherwise.
pub fn find_parent<Id: PartialEq + Clone, T>(
    nodes: &[TreeNode<Id, T>],
    id: &Id,
) -> Option<Option<Id>> {
    if nodes.iter().any(|node| &node.id == id) {
        return Some(None);
    }
    nodes.iter().find_map(|node| {
        if node.children.iter().any(|child| &child.id == id) {
            Some(Some(node.id.clone()))
        } else {
            find_parent(&node.children, id)
        }
    })
}

/// 1-based level of `id`
/// 1-based level of `id`, roots being level 1
pub fn level_of<Id: PartialEq, T>(nodes: &[TreeNode<Id, T>], id: &Id) -> Option<usize> {
    for node in nodes {
        if &node.id == id {
            return Some(1);
        }
        if let Some(level) = level_of(&node.children, id) {
            return Some(level + 1);
        }
    }
    None
}

fn remove_node<Id: PartialEq, T>(
    nodes: &mut Vec<TreeNode<Id, T>>,
    id: &Id,
) -> Option<TreeNode<Id, T>> {
    if let Some(pos) = nodes.iter().position(|node| &node.id == id) {
        return Some(nodes.remove(pos));
    }
    for node in nodes.iter_mut() {
        if let Some(removed) = remove_node(&mut node.children, id) {
            return Some(removed);
        }
    }
    None
}

fn siblings_mut<'a, Id: PartialEq, T>(
    roots: &'a mut Vec<TreeNode<Id, T>>,
    parent: Option<&Id>,
) -> Option<&'a mut Vec<TreeNode<Id, T>>> {
    match parent {
        None => Some(roots),
        Some(parent) => find_node_mut(roots, parent).map(|node| &mut node.children),
    }
}

/// Moves `dragged` relative to `target`.
///
/// Same-parent `Above`/`Below` moves splice within the sibling list; every
/// other move detaches the node and reinserts it next to or inside the target.
/// A node can never land inside its own subtree.
pub fn move_node<Id, T>(
    roots: &mut Vec<TreeNode<Id, T>>,
    dragged: &Id,
    target: &Id,
    position: DropPosition,
    options: MoveOptions,
) -> Result<MoveOutcome<Id>, TreeError<Id>>
where
    Id: PartialEq + Clone + Debug,
{
    if dragged == target {
        return Ok(MoveOutcome::Unchanged);
    }

    let dragged_parent =
        find_parent(roots, dragged).ok_or_else(|| TreeError::NodeNotFound(dragged.clone()))?;
    let target_parent =
        find_parent(roots, target).ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;

    let dragged_node =
        find_node(roots, dragged).ok_or_else(|| TreeError::NodeNotFound(dragged.clone()))?;
    if find_node(&dragged_node.children, target).is_some() {
        return Err(TreeError::CycleDetected {
            dragged: dragged.clone(),
            target: target.clone(),
        });
    }

    if position == DropPosition::Inside && dragged_parent.as_ref() == Some(target) {
        return Ok(MoveOutcome::Unchanged);
    }

    if let Some(max) = options.max_depth {
        let target_level =
            level_of(roots, target).ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;
        let top = match position {
            DropPosition::Inside => target_level + 1,
            DropPosition::Above | DropPosition::Below => target_level,
        };
        let depth = top + dragged_node.height() - 1;
        if depth > max {
            return Err(TreeError::MaxDepthExceeded { depth, max });
        }
    }

    if position != DropPosition::Inside && dragged_parent == target_parent {
        let siblings = siblings_mut(roots, dragged_parent.as_ref())
            .ok_or_else(|| TreeError::NodeNotFound(dragged.clone()))?;
        let from = siblings
            .iter()
            .position(|node| &node.id == dragged)
            .ok_or_else(|| TreeError::NodeNotFound(dragged.clone()))?;
        let to = siblings
            .iter()
            .position(|node| &node.id == target)
            .ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;

        let mut index = to;
        if from < to {
            index -= 1;
        }
        if position == DropPosition::Below {
            index += 1;
        }
        if index == from {
            return Ok(MoveOutcome::Unchanged);
        }

        let node = siblings.remove(from);
        siblings.insert(index, node);
        return Ok(MoveOutcome::Moved {
            parent: dragged_parent,
            index,
        });
    }

    let node = remove_node(roots, dragged).ok_or_else(|| TreeError::NodeNotFound(dragged.clone()))?;

    match position {
        DropPosition::Inside => {
            let parent =
                find_node_mut(roots, target).ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;
            parent.children.push(node);
            parent.expanded = true;
            Ok(MoveOutcome::Moved {
                parent: Some(target.clone()),
                index: parent.children.len() - 1,
            })
        }
        DropPosition::Above | DropPosition::Below => {
            let siblings = siblings_mut(roots, target_parent.as_ref())
                .ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;
            let mut index = siblings
                .iter()
                .position(|candidate| &candidate.id == target)
                .ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;
            if position == DropPosition::Below {
                index += 1;
            }
            siblings.insert(index, node);
            Ok(MoveOutcome::Moved {
                parent: target_parent,
                index,
            })
        }
    }
}

/// Depth-first `(id, parent, index among siblings)` rows.
pub fn flatten_order<Id: Clone, T>(roots: &[TreeNode<Id, T>]) -> Vec<FlatPosition<Id>> {
    fn walk<Id: Clone, T>(
        nodes: &[TreeNode<Id, T>],
        parent: Option<&Id>,
        out: &mut Vec<FlatPosition<Id>>,
    ) {
        for (order_index, node) in nodes.iter().enumerate() {
            out.push(FlatPosition {
                id: node.id.clone(),
                parent_id: parent.cloned(),
                order_index,
            });
            walk(&node.children, Some(&node.id), out);
        }
    }

    let mut out = Vec::new();
    walk(roots, None, &mut out);
    out
}

/// Builds a forest from flat rows. Rows whose parent is unknown become roots;
/// siblings are sorted by `order`. Rows caught in a parent cycle are dropped.
pub fn build_forest<Id, T, K>(
    items: Vec<T>,
    id: impl Fn(&T) -> Id,
    parent: impl Fn(&T) -> Option<Id>,
    order: impl Fn(&T) -> K,
) -> Vec<TreeNode<Id, T>>
where
    Id: Eq + Hash + Clone,
    K: Ord,
{
    let known: std::collections::HashSet<Id> = items.iter().map(&id).collect();
    let mut by_parent: HashMap<Option<Id>, Vec<T>> = HashMap::new();
    for item in items {
        let parent_id = parent(&item).filter(|p| known.contains(p) && *p != id(&item));
        by_parent.entry(parent_id).or_default().push(item);
    }

    fn attach<Id, T, K>(
        parent: Option<Id>,
        by_parent: &mut HashMap<Option<Id>, Vec<T>>,
        id: &impl Fn(&T) -> Id,
        order: &impl Fn(&T) -> K,
    ) -> Vec<TreeNode<Id, T>>
    where
        Id: Eq + Hash + Clone,
        K: Ord,
    {
        let mut items = by_parent.remove(&parent).unwrap_or_default();
        items.sort_by_key(|item| order(item));
        items
            .into_iter()
            .map(|item| {
                let node_id = id(&item);
                let children = attach(Some(node_id.clone()), by_parent, id, order);
                TreeNode {
                    id: node_id,
                    data: item,
                    children,
                    expanded: false,
                }
            })
            .collect()
    }

    attach(None, &mut by_parent, &id, &order)
}
