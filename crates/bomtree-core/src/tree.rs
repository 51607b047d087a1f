use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::BomNode;

/// A node together with its materialised children, as returned by tree views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: BomNode,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Pre-order walk over this subtree.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Flatten a forest back to pre-order node references.
pub fn flatten(forest: &[TreeNode]) -> Vec<&BomNode> {
    forest
        .iter()
        .flat_map(|root| root.iter().map(|t| &t.node))
        .collect()
}

/// Index over a flat node list: id lookup plus parent -> children links.
///
/// A node whose parent is not part of the input becomes a root. Children
/// and roots are kept in `(path, id)` order.
pub struct Arena<'a> {
    nodes: &'a [BomNode],
    index: HashMap<Uuid, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl<'a> Arena<'a> {
    pub fn new(nodes: &'a [BomNode]) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id).or_insert(i);
        }

        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            if index.get(&node.id) != Some(&i) {
                log::warn!("Duplicate node id {} ignored", node.id);
                continue;
            }
            match node.parent_id.and_then(|p| index.get(&p)) {
                Some(&parent) => children[parent].push(i),
                None => roots.push(i),
            }
        }

        let by_path = |a: &usize, b: &usize| {
            let (a, b) = (&nodes[*a], &nodes[*b]);
            a.path.cmp(&b.path).then(a.id.cmp(&b.id))
        };
        for list in &mut children {
            list.sort_by(by_path);
        }
        roots.sort_by(by_path);

        Self {
            nodes,
            index,
            children,
            roots,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&'a BomNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node(&self, idx: usize) -> &'a BomNode {
        &self.nodes[idx]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Indices reachable from the roots, in pre-order.
    ///
    /// Nodes caught in a parent cycle are never reached and are reported once.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.children[idx].iter().rev());
        }

        let unique = self.index.len();
        if order.len() < unique {
            log::warn!(
                "{} BOM nodes are unreachable from any root and were skipped",
                unique - order.len()
            );
        }
        order
    }
}

/// Assemble a forest from a flat node list.
///
/// The result depends only on the input set, not its order, so building
/// twice from the same nodes yields identical forests.
pub fn build_hierarchical_tree(flat: &[BomNode]) -> Vec<TreeNode> {
    let arena = Arena::new(flat);
    let order = arena.preorder();

    // Children appear after their parent in pre-order, so walking it
    // backwards finishes every subtree before its parent is assembled.
    let mut built: Vec<Option<TreeNode>> = vec![None; flat.len()];
    for &idx in order.iter().rev() {
        let children = arena
            .children(idx)
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[idx] = Some(TreeNode {
            node: arena.node(idx).clone(),
            children,
        });
    }

    arena
        .roots()
        .iter()
        .filter_map(|&r| built[r].take())
        .collect()
}
