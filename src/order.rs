use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::lookup::LookupIndex;
use crate::tree::{NodeId, TreeNode};

/// User-chosen sibling order, keyed by parent id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomOrderMap {
    orders: HashMap<NodeId, Vec<NodeId>>,
}

impl CustomOrderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, parent: &NodeId) -> Option<&[NodeId]> {
        self.orders.get(parent).map(Vec::as_slice)
    }

    pub fn set_order(&mut self, parent: NodeId, order: Vec<NodeId>) {
        self.orders.insert(parent, order);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Reconcile every stored order with the live children sets in `index`.
    ///
    /// Parents that vanished or lost all children are dropped.
    pub fn repair(&mut self, index: &LookupIndex) {
        self.orders.retain(|parent, order| {
            let children = index.children_of(parent);
            if children.is_empty() {
                trace!(parent = %parent, "dropping order for childless parent");
                return false;
            }
            *order = repaired_order(order, children);
            true
        });
    }
}

/// Keep stored ids that still exist, then append new children in tree order.
pub fn repaired_order(stored: &[NodeId], children: &[NodeId]) -> Vec<NodeId> {
    let live: HashSet<&NodeId> = children.iter().collect();
    let mut seen: HashSet<&NodeId> = HashSet::new();
    let mut order: Vec<NodeId> = stored
        .iter()
        .filter(|id| live.contains(id) && seen.insert(*id))
        .cloned()
        .collect();
    for child in children {
        if !seen.contains(child) {
            order.push(child.clone());
        }
    }
    order
}

/// Permute children per `orders`; unlisted children follow the listed ones
/// in their original relative order. Applied independently at every level.
pub fn reorder(tree: &TreeNode, orders: &CustomOrderMap) -> TreeNode {
    let mut children: Vec<TreeNode> = tree
        .children
        .iter()
        .map(|child| reorder(child, orders))
        .collect();

    if let Some(order) = orders.get(&tree.id) {
        let rank: HashMap<&NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (id, i)).collect();
        // stable sort keeps original order among unlisted children
        children.sort_by_key(|child| rank.get(&child.id).copied().unwrap_or(usize::MAX));
    }

    TreeNode {
        id: tree.id.clone(),
        name: tree.name.clone(),
        folder: tree.folder.clone(),
        children,
        lineage: tree.lineage.clone(),
        service: tree.service,
    }
}
